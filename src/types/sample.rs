//! The unit of telemetry the store and lap index operate on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::packet::{CarTelemetryData, LapData, PacketHeader};

/// One timestamped observation of the player's car.
///
/// Built by joining the latest Lap-Data record for the player slot with the
/// Car-Telemetry record that triggered the sample. Lap fields can therefore
/// lag the car fields by up to one Lap-Data interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Host clock when the sample was built.
    pub wall_time: DateTime<Utc>,
    /// Game session clock from the telemetry packet header, seconds.
    pub session_time: f32,
    /// Current lap time in milliseconds.
    pub lap_time_ms: u32,
    /// km/h
    pub speed: u16,
    pub rpm: u16,
    pub gear: i8,
    pub throttle: f32,
    pub brake: f32,
    /// 0 when no lap data has been received.
    pub lap_number: u8,
    pub lap_invalid: bool,
    /// Metres around the current lap.
    pub lap_distance: f32,
    pub car_position: u8,
    pub last_lap_time_ms: u32,
}

impl TelemetrySample {
    pub fn from_parts(
        wall_time: DateTime<Utc>,
        header: &PacketHeader,
        lap: &LapData,
        car: &CarTelemetryData,
    ) -> Self {
        Self {
            wall_time,
            session_time: header.session_time,
            lap_time_ms: lap.current_lap_time_ms,
            speed: car.speed,
            rpm: car.engine_rpm,
            gear: car.gear,
            throttle: car.throttle,
            brake: car.brake,
            lap_number: lap.current_lap_num,
            lap_invalid: lap.is_lap_invalid(),
            lap_distance: lap.lap_distance,
            car_position: lap.car_position,
            last_lap_time_ms: lap.last_lap_time_ms,
        }
    }
}
