//! UDP capture loop.
//!
//! One background task owns the socket and the store's [`StoreWriter`]. Each
//! iteration it polls the socket without blocking, decodes what arrived and
//! hands the packet to a [`SampleAssembler`]. Nothing a single datagram does
//! can stop the loop; only cancellation (or dropping the [`CaptureHandle`])
//! ends it.
//!
//! ```text
//! Binding -> Listening -> Stopped
//! ```
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use slipstream::{CaptureConfig, CaptureLoop, StoreConfig, TelemetryStore, UpdateRate};
//!
//! # async fn run() -> slipstream::Result<()> {
//! let (writer, reader) = TelemetryStore::new(&StoreConfig::default());
//! let capture = CaptureLoop::bind(CaptureConfig::default(), writer)?;
//!
//! let mut live = capture.subscribe(UpdateRate::Max(10));
//! while let Some(sample) = live.next().await {
//!     println!("{} km/h, lap {}", sample.speed, sample.lap_number);
//! }
//! # drop(reader);
//! # Ok(())
//! # }
//! ```

mod assembler;
mod source;
#[cfg(test)]
mod tests;

pub use assembler::{Dispatch, SampleAssembler};
pub use source::{DatagramSource, bind_udp};

use chrono::Utc;
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::packet::{self, MAX_PACKET_BYTES, PACKET_FORMAT_2025};
use crate::stream::ThrottleExt;
use crate::{
    CaptureConfig, DecodeError, StoreWriter, TelemetrySample, TransportError, UpdateRate,
};

/// Datagrams handled back to back before yielding to the runtime.
const YIELD_EVERY: u32 = 256;

/// Lifecycle of the capture loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
    Binding,
    Listening,
    Stopped,
}

/// Point-in-time copy of the loop's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureCounters {
    pub datagrams: u64,
    pub decode_errors: u64,
    pub receive_errors: u64,
    pub samples: u64,
    /// Car-Telemetry packets without a usable player slot.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    datagrams: AtomicU64,
    decode_errors: AtomicU64,
    receive_errors: AtomicU64,
    samples: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn load(&self) -> CaptureCounters {
        CaptureCounters {
            datagrams: self.datagrams.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            samples: self.samples.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// The capture task. Construct through [`CaptureLoop::bind`] or
/// [`CaptureLoop::spawn`]; both return a [`CaptureHandle`].
pub struct CaptureLoop<S: DatagramSource> {
    source: S,
    writer: StoreWriter,
    config: CaptureConfig,
    assembler: SampleAssembler,
    counters: Arc<Counters>,
    /// Last unsupported format reported at warn level.
    warned_format: Option<u16>,
    state: watch::Sender<CaptureState>,
    samples: watch::Sender<Option<Arc<TelemetrySample>>>,
    cancel: CancellationToken,
}

impl CaptureLoop<std::net::UdpSocket> {
    /// Bind the UDP socket and start capturing. Must be called inside a
    /// tokio runtime. A bind failure is returned and no task is started.
    pub fn bind(config: CaptureConfig, writer: StoreWriter) -> crate::Result<CaptureHandle> {
        debug!(addr = %config.bind_addr, "Binding telemetry socket");
        let socket = bind_udp(&config).inspect_err(|e| error!(error = %e, "Capture not started"))?;
        Ok(Self::spawn(socket, config, writer))
    }
}

impl<S: DatagramSource> CaptureLoop<S> {
    /// Start capturing from an already prepared source.
    pub fn spawn(source: S, config: CaptureConfig, writer: StoreWriter) -> CaptureHandle {
        let (state_tx, state_rx) = watch::channel(CaptureState::Binding);
        let (sample_tx, sample_rx) = watch::channel(None);
        let counters = Arc::new(Counters::default());
        let cancel = CancellationToken::new();
        let local_addr = source.local_addr();
        let send_rate_hz = config.send_rate_hz;

        let capture = Self {
            source,
            writer,
            config,
            assembler: SampleAssembler::new(),
            counters: counters.clone(),
            warned_format: None,
            state: state_tx,
            samples: sample_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(capture.run());

        CaptureHandle {
            state: state_rx,
            samples: sample_rx,
            counters,
            cancel,
            task: Some(task),
            local_addr,
            send_rate_hz,
        }
    }

    async fn run(mut self) {
        self.state.send_replace(CaptureState::Listening);
        info!(addr = ?self.source.local_addr(), "Capture loop listening");

        let idle = self.config.idle_sleep();
        let status_every = self.config.status_interval();
        let started = Instant::now();
        let mut last_status = started;
        let mut burst = 0u32;
        let mut buf = vec![0u8; MAX_PACKET_BYTES];

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.source.try_recv(&mut buf) {
                Ok(len) => {
                    self.handle_datagram(&buf[..len.min(buf.len())]);
                    burst += 1;
                    if burst >= YIELD_EVERY {
                        burst = 0;
                        tokio::task::yield_now().await;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    burst = 0;
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(idle) => {}
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    Counters::bump(&self.counters.receive_errors);
                    let err = TransportError::ReceiveFailed { source };
                    warn!(error = %err, cause = ?std::error::Error::source(&err), "Datagram lost");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(idle) => {}
                    }
                }
            }

            let now = Instant::now();
            if now.duration_since(last_status) >= status_every {
                last_status = now;
                let counts = self.counters.load();
                let elapsed = now.duration_since(started).as_secs_f64().max(1e-6);
                info!(
                    pps = format_args!("{:.1}", counts.datagrams as f64 / elapsed),
                    datagrams = counts.datagrams,
                    samples = counts.samples,
                    decode_errors = counts.decode_errors,
                    receive_errors = counts.receive_errors,
                    "Capture status"
                );
            }
        }

        let counts = self.counters.load();
        info!(
            datagrams = counts.datagrams,
            samples = counts.samples,
            "Capture loop stopped, socket closed"
        );
        self.state.send_replace(CaptureState::Stopped);
    }

    fn handle_datagram(&mut self, bytes: &[u8]) {
        Counters::bump(&self.counters.datagrams);

        let packet = match packet::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                Counters::bump(&self.counters.decode_errors);
                if let DecodeError::UnsupportedFormat { format } = e {
                    if self.warned_format != Some(format) {
                        self.warned_format = Some(format);
                        warn!(
                            format,
                            expected = PACKET_FORMAT_2025,
                            "Game is sending an unsupported UDP format, set it to 2025"
                        );
                    }
                }
                debug!(error = %e, len = bytes.len(), "Dropping undecodable datagram");
                return;
            }
        };

        match self.assembler.push(packet, Utc::now()) {
            Dispatch::Sample(sample) => {
                trace!(speed = sample.speed, lap = sample.lap_number, "Sample");
                self.writer.append(sample.clone());
                Counters::bump(&self.counters.samples);
                self.samples.send_replace(Some(Arc::new(sample)));
            }
            Dispatch::NoPlayer => Counters::bump(&self.counters.skipped),
            Dispatch::LapRetained | Dispatch::Discarded => {}
        }
    }
}

/// Control and observation side of a running capture loop. Dropping it
/// stops the loop.
pub struct CaptureHandle {
    state: watch::Receiver<CaptureState>,
    samples: watch::Receiver<Option<Arc<TelemetrySample>>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    send_rate_hz: u32,
}

impl CaptureHandle {
    pub fn state(&self) -> CaptureState {
        *self.state.borrow()
    }

    /// Receiver for state transitions.
    pub fn state_changes(&self) -> watch::Receiver<CaptureState> {
        self.state.clone()
    }

    pub fn counters(&self) -> CaptureCounters {
        self.counters.load()
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn latest_sample(&self) -> Option<Arc<TelemetrySample>> {
        self.samples.borrow().clone()
    }

    /// Live samples, starting with the latest one if any exists. Throttled
    /// with latest-wins semantics when `rate` is below the game's send
    /// rate. Ends when the loop stops.
    pub fn subscribe(&self, rate: UpdateRate) -> BoxStream<'static, Arc<TelemetrySample>> {
        let samples =
            WatchStream::new(self.samples.clone()).filter_map(|sample| async move { sample });

        match rate.throttle_interval(self.send_rate_hz) {
            None => samples.boxed(),
            Some(period) => samples.throttle(period).boxed(),
        }
    }

    /// Token that stops the loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loop and wait for it to release the socket.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "Capture task failed");
            }
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        debug!("Dropping capture handle");
        self.cancel.cancel();
    }
}
