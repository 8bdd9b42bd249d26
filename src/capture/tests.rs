//! Capture loop tests over a scripted source and real loopback UDP.

use super::*;
use crate::packet::{CarTelemetryData, LapData};
use crate::test_utils::{HeaderSpec, car_telemetry_packet, encode_header, lap_data_packet};
use crate::{StoreConfig, StoreReader, TelemetryError, TelemetryStore};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

struct ScriptedSource {
    script: VecDeque<io::Result<Vec<u8>>>,
}

impl ScriptedSource {
    fn new(script: impl IntoIterator<Item = io::Result<Vec<u8>>>) -> Self {
        Self { script: script.into_iter().collect() }
    }
}

impl DatagramSource for ScriptedSource {
    fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            Some(Ok(datagram)) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok(len)
            }
            Some(Err(e)) => Err(e),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }
}

fn scenario_lap() -> LapData {
    LapData {
        current_lap_num: 1,
        lap_distance: 120.5,
        current_lap_time_ms: 15_000,
        ..LapData::default()
    }
}

fn scenario_car() -> CarTelemetryData {
    CarTelemetryData {
        speed: 210,
        engine_rpm: 11_500,
        gear: 6,
        throttle: 1.0,
        brake: 0.0,
        ..CarTelemetryData::default()
    }
}

fn other_season_datagram() -> Vec<u8> {
    let mut datagram = encode_header(&HeaderSpec { packet_format: 2023, ..HeaderSpec::default() });
    datagram.extend_from_slice(&[0; 64]);
    datagram
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn spawn_scripted(script: Vec<io::Result<Vec<u8>>>) -> (CaptureHandle, StoreReader) {
    let (writer, reader) = TelemetryStore::new(&StoreConfig::default());
    let handle = CaptureLoop::spawn(ScriptedSource::new(script), CaptureConfig::default(), writer);
    (handle, reader)
}

async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    let polled = tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "timed out waiting for {what}");
}

fn assert_scenario_sample(reader: &StoreReader) {
    let snapshot = reader.snapshot();
    assert_eq!(snapshot.samples.len(), 1);
    let sample = &snapshot.samples[0];
    assert_eq!(sample.lap_number, 1);
    assert_eq!(sample.lap_distance, 120.5);
    assert_eq!(sample.lap_time_ms, 15_000);
    assert_eq!(sample.speed, 210);
    assert_eq!(sample.rpm, 11_500);
    assert_eq!(sample.gear, 6);
    assert_eq!(sample.throttle, 1.0);
    assert_eq!(sample.brake, 0.0);
}

#[tokio::test]
async fn lap_then_telemetry_appends_one_joined_sample() {
    let hdr = HeaderSpec::default();
    let (handle, reader) = spawn_scripted(vec![
        Ok(lap_data_packet(&hdr, 0, &scenario_lap())),
        Ok(car_telemetry_packet(&hdr, 0, &scenario_car())),
    ]);

    wait_until("one sample", || handle.counters().samples == 1).await;
    assert_eq!(handle.state(), CaptureState::Listening);
    assert_scenario_sample(&reader);
    assert_eq!(reader.stats().sequence_number, 1);

    let counters = handle.counters();
    assert_eq!(counters.datagrams, 2);
    assert_eq!(counters.decode_errors, 0);
    handle.stop().await;
}

#[tokio::test]
async fn bad_datagrams_and_receive_errors_do_not_stop_the_loop() {
    let hdr = HeaderSpec::default();
    let (handle, reader) = spawn_scripted(vec![
        Err(io::Error::from(io::ErrorKind::ConnectionReset)),
        Ok(vec![0xFF; 3]),
        Ok(other_season_datagram()),
        Ok(car_telemetry_packet(&hdr, 0, &scenario_car())),
    ]);

    wait_until("sample after errors", || handle.counters().samples == 1).await;
    let counters = handle.counters();
    assert_eq!(counters.receive_errors, 1);
    assert_eq!(counters.decode_errors, 2);
    assert_eq!(counters.datagrams, 3);

    // No lap data yet: lap context is zeroed, car data is intact.
    let sample = reader.snapshot().samples[0].clone();
    assert_eq!(sample.speed, 210);
    assert_eq!(sample.lap_number, 0);
    handle.stop().await;
}

#[tokio::test]
async fn unsupported_format_is_warned_once() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let (handle, _reader) = spawn_scripted(vec![
        Ok(other_season_datagram()),
        Ok(other_season_datagram()),
        Ok(other_season_datagram()),
    ]);
    wait_until("three rejected datagrams", || handle.counters().decode_errors == 3).await;
    handle.stop().await;

    let output = logs.contents();
    assert_eq!(output.matches("unsupported UDP format").count(), 1, "{output}");
    assert!(output.contains("format=2023"), "{output}");
}

#[tokio::test]
async fn spectator_packets_are_skipped() {
    let spectator = HeaderSpec { player_car_index: 255, ..HeaderSpec::default() };
    let (handle, reader) =
        spawn_scripted(vec![Ok(car_telemetry_packet(&spectator, 0, &scenario_car()))]);

    wait_until("skip counted", || handle.counters().skipped == 1).await;
    assert!(reader.is_empty());
    handle.stop().await;
}

#[tokio::test]
async fn subscribers_receive_latest_sample_and_end_on_stop() {
    let hdr = HeaderSpec::default();
    let (handle, _reader) =
        spawn_scripted(vec![Ok(car_telemetry_packet(&hdr, 0, &scenario_car()))]);

    wait_until("sample", || handle.latest_sample().is_some()).await;
    let mut live = handle.subscribe(UpdateRate::Native);
    let first = live.next().await.map(|s| s.speed);
    assert_eq!(first, Some(210));

    let states = handle.state_changes();
    handle.stop().await;
    assert_eq!(*states.borrow(), CaptureState::Stopped);
    assert!(live.next().await.is_none());
}

#[tokio::test]
async fn dropping_the_handle_stops_the_loop() {
    let (handle, _reader) = spawn_scripted(Vec::new());
    let mut states = handle.state_changes();
    drop(handle);

    let stopped = tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == CaptureState::Stopped),
    )
    .await;
    assert!(matches!(stopped, Ok(Ok(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loopback_udp_end_to_end() {
    let (writer, reader) = TelemetryStore::new(&StoreConfig::default());
    let config = CaptureConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        ..CaptureConfig::default()
    };
    let handle = CaptureLoop::bind(config, writer).unwrap();
    let target = handle.local_addr().unwrap();

    let sender = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let hdr = HeaderSpec::default();
    sender.send_to(&lap_data_packet(&hdr, 0, &scenario_lap()), target).unwrap();
    // keep lap data ahead of telemetry
    wait_until("lap datagram", || handle.counters().datagrams == 1).await;
    sender.send_to(&car_telemetry_packet(&hdr, 0, &scenario_car()), target).unwrap();

    wait_until("sample over UDP", || handle.counters().samples == 1).await;
    assert_scenario_sample(&reader);
    handle.stop().await;
}

#[tokio::test]
async fn bind_failure_is_reported_and_nothing_runs() {
    let holder = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    let (writer, _reader) = TelemetryStore::new(&StoreConfig::default());
    let config =
        CaptureConfig { bind_addr: holder.local_addr().unwrap(), ..CaptureConfig::default() };

    let result = CaptureLoop::bind(config, writer);
    assert!(matches!(
        result,
        Err(TelemetryError::Transport(TransportError::BindFailed { .. }))
    ));
}
