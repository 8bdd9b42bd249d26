//! Joins Lap-Data and Car-Telemetry packets into samples.

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::TelemetrySample;
use crate::packet::{EventKind, LapData, LapDataPacket, Packet};

/// What a single decoded packet produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// A Car-Telemetry packet joined into a sample.
    Sample(TelemetrySample),
    /// Lap data retained for later joins.
    LapRetained,
    /// Car telemetry whose header names no real player slot.
    NoPlayer,
    /// A packet kind that never produces samples.
    Discarded,
}

/// Holds the newest Lap-Data packet and builds a sample from every
/// Car-Telemetry packet that follows it.
#[derive(Debug, Default)]
pub struct SampleAssembler {
    last_lap: Option<LapDataPacket>,
}

impl SampleAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lap data currently used for joins.
    pub fn retained_lap_data(&self) -> Option<&LapDataPacket> {
        self.last_lap.as_ref()
    }

    pub fn push(&mut self, packet: Packet, wall_time: DateTime<Utc>) -> Dispatch {
        match packet {
            Packet::LapData(lap) => {
                trace!(frame = lap.header.frame_identifier, "Retaining lap data");
                self.last_lap = Some(lap);
                Dispatch::LapRetained
            }
            Packet::CarTelemetry(telemetry) => {
                let header = telemetry.header;
                let Some(slot) = header.player_slot() else {
                    trace!(player_car_index = header.player_car_index, "No player slot, skipping");
                    return Dispatch::NoPlayer;
                };
                let Some(car) = telemetry.car_telemetry.get(slot) else {
                    return Dispatch::NoPlayer;
                };

                if let Some(lap) = &self.last_lap {
                    if lap.header.session_uid != header.session_uid {
                        debug!(
                            old = lap.header.session_uid,
                            new = header.session_uid,
                            "Session changed, dropping retained lap data"
                        );
                        self.last_lap = None;
                    }
                }

                let neutral = LapData::default();
                let lap = self.last_lap.as_ref().and_then(|p| p.slot(slot)).unwrap_or(&neutral);
                Dispatch::Sample(TelemetrySample::from_parts(wall_time, &header, lap, car))
            }
            Packet::Event(event) => {
                if event.kind == EventKind::SessionStarted && self.last_lap.take().is_some() {
                    debug!("Session started, dropping retained lap data");
                }
                Dispatch::Discarded
            }
            Packet::Motion(_) | Packet::Session(_) | Packet::Unhandled { .. } => {
                Dispatch::Discarded
            }
        }
    }
}
