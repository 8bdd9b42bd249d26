//! Live capture and lap segmentation for the EA F1 25 UDP telemetry stream.
//!
//! The game broadcasts little-endian datagrams at up to 60 Hz per packet
//! kind. This crate turns that lossy stream into a bounded, consistently
//! readable history of [`TelemetrySample`]s and groups it into lap attempts.
//!
//! # Pieces
//!
//! - [`packet`]: panic-free decoding of the F1 25 wire format
//! - [`CaptureLoop`]: background task owning the UDP socket
//! - [`TelemetryStore`]: single-writer, many-reader rolling buffer
//! - [`LapIndex`]: incremental segmentation of snapshots into laps
//!
//! # Example
//!
//! ```rust,no_run
//! use slipstream::{CaptureLoop, Config, LapIndex, TelemetryStore};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> slipstream::Result<()> {
//!     let config = Config::load(None)?;
//!     let (writer, reader) = TelemetryStore::new(&config.store);
//!     let capture = CaptureLoop::bind(config.capture.clone(), writer)?;
//!
//!     let mut laps = LapIndex::new(config.segmentation.clone());
//!     loop {
//!         tokio::time::sleep(Duration::from_millis(500)).await;
//!         laps.update(&reader.snapshot());
//!         println!("laps seen: {:?}", laps.known_lap_numbers());
//!         # break;
//!     }
//!     capture.stop().await;
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod config;
mod error;
pub mod laps;
pub mod logging;
pub mod packet;
pub mod store;
pub mod stream;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub use capture::{CaptureCounters, CaptureHandle, CaptureLoop, CaptureState, DatagramSource};
pub use config::{CaptureConfig, Config, LogLevel, SegmentationConfig, StoreConfig};
pub use error::*;
pub use laps::{LapIndex, LapSegment};
pub use store::{Snapshot, StoreReader, StoreStats, StoreWriter, TelemetryStore};
pub use types::{TelemetrySample, UpdateRate};
