//! Car Telemetry packet (id 6).

use serde::{Deserialize, Serialize};

use super::cursor::{ByteCursor, WireRecord};
use super::{MAX_CARS, PacketHeader};
use crate::DecodeError;

/// Size of one `CarTelemetryData` record.
pub const CAR_TELEMETRY_SIZE: usize = 60;

/// Minimum size of a complete Car Telemetry packet (all slots + trailer).
pub const CAR_TELEMETRY_PACKET_SIZE: usize =
    super::HEADER_SIZE + MAX_CARS * CAR_TELEMETRY_SIZE + 3;

/// Driver inputs and car sensors for one slot.
///
/// Wheel arrays are ordered RL, RR, FL, FR.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarTelemetryData {
    /// km/h
    pub speed: u16,
    /// 0.0 to 1.0
    pub throttle: f32,
    /// -1.0 (full lock left) to 1.0 (full lock right)
    pub steer: f32,
    /// 0.0 to 1.0
    pub brake: f32,
    /// 0 to 100
    pub clutch: u8,
    /// -1 = R, 0 = N, 1-8 forward
    pub gear: i8,
    pub engine_rpm: u16,
    pub drs: u8,
    pub rev_lights_percent: u8,
    /// Bit 0 = leftmost LED, bit 14 = rightmost LED
    pub rev_lights_bit_value: u16,
    /// Celsius
    pub brakes_temperature: [u16; 4],
    /// Celsius
    pub tyres_surface_temperature: [u8; 4],
    /// Celsius
    pub tyres_inner_temperature: [u8; 4],
    /// Celsius
    pub engine_temperature: u16,
    /// PSI
    pub tyres_pressure: [f32; 4],
    pub surface_type: [u8; 4],
}

impl WireRecord for CarTelemetryData {
    const SIZE: usize = CAR_TELEMETRY_SIZE;
    const NAME: &'static str = "car telemetry";

    fn read(r: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            speed: r.u16_le()?,
            throttle: r.f32_le()?,
            steer: r.f32_le()?,
            brake: r.f32_le()?,
            clutch: r.u8()?,
            gear: r.i8()?,
            engine_rpm: r.u16_le()?,
            drs: r.u8()?,
            rev_lights_percent: r.u8()?,
            rev_lights_bit_value: r.u16_le()?,
            brakes_temperature: r.u16_le_array::<4>()?,
            tyres_surface_temperature: r.u8_array::<4>()?,
            tyres_inner_temperature: r.u8_array::<4>()?,
            engine_temperature: r.u16_le()?,
            tyres_pressure: r.f32_le_array::<4>()?,
            surface_type: r.u8_array::<4>()?,
        })
    }
}

impl CarTelemetryData {
    pub fn drs_open(&self) -> bool {
        self.drs != 0
    }
}

/// Decoded Car Telemetry packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarTelemetryPacket {
    pub header: PacketHeader,
    /// Exactly [`MAX_CARS`] entries, indexed by car slot.
    pub car_telemetry: Vec<CarTelemetryData>,
    /// 255 when the MFD is closed.
    pub mfd_panel_index: u8,
    pub mfd_panel_index_secondary_player: u8,
    /// 0 when no gear is suggested.
    pub suggested_gear: i8,
}

impl CarTelemetryPacket {
    pub(crate) fn decode(
        header: PacketHeader,
        body: &mut ByteCursor<'_>,
    ) -> Result<Self, DecodeError> {
        let car_telemetry = body.records::<CarTelemetryData>(MAX_CARS)?;
        Ok(Self {
            header,
            car_telemetry,
            mfd_panel_index: body.u8()?,
            mfd_panel_index_secondary_player: body.u8()?,
            suggested_gear: body.i8()?,
        })
    }

    /// Telemetry for the car driven by the local player.
    pub fn player(&self) -> Option<&CarTelemetryData> {
        self.header.player_slot().and_then(|slot| self.car_telemetry.get(slot))
    }
}
