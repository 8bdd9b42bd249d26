//! Capture F1 25 telemetry until Ctrl+C, then dump the newest samples.
//!
//! Usage: `slipstream [config.yaml]`. Environment overrides apply on top of
//! the file; see `slipstream::config`.

use anyhow::Context;
use slipstream::logging::init_tracing;
use slipstream::{CaptureLoop, Config, LapIndex, TelemetryStore};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const STATUS_EVERY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("loading configuration")?;
    init_tracing(config.log_level);

    info!(
        addr = %config.capture.bind_addr,
        capacity = ?config.store.capacity(),
        "Starting capture; point the game's UDP telemetry at this host"
    );

    let (writer, reader) = TelemetryStore::new(&config.store);
    let capture = CaptureLoop::bind(config.capture.clone(), writer)
        .with_context(|| format!("binding {}", config.capture.bind_addr))?;

    let mut laps = LapIndex::new(config.segmentation.clone());
    let mut status = tokio::time::interval(STATUS_EVERY);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stop requested");
                break;
            }
            _ = status.tick() => {
                let snapshot = reader.snapshot();
                laps.update(&snapshot);
                match snapshot.latest() {
                    Some(s) => info!(
                        speed = s.speed,
                        position = s.car_position,
                        lap = s.lap_number,
                        last_lap_ms = s.last_lap_time_ms,
                        invalid = s.lap_invalid,
                        lap_time_ms = s.lap_time_ms,
                        laps_seen = laps.known_lap_numbers().len(),
                        current_lap_samples = laps.current_lap_samples().len(),
                        "Status"
                    ),
                    None => info!(counters = ?capture.counters(), "Waiting for telemetry"),
                }
            }
        }
    }

    capture.stop().await;
    if let Err(e) = reader.dump(config.store.dump_limit) {
        warn!(error = %e, "Snapshot not written");
    }
    Ok(())
}
