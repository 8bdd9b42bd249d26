//! Lap Data packet (id 2).
//!
//! 22 fixed 57-byte `LapData` records followed by the two time-trial car
//! indices. Inactive slots are zero-filled but still occupy wire space.

use serde::{Deserialize, Serialize};

use super::cursor::{ByteCursor, WireRecord};
use super::{MAX_CARS, PacketHeader};
use crate::DecodeError;

/// Size of one `LapData` record.
pub const LAP_DATA_SIZE: usize = 57;

/// Minimum size of a complete Lap Data packet.
pub const LAP_DATA_PACKET_SIZE: usize = super::HEADER_SIZE + MAX_CARS * LAP_DATA_SIZE + 2;

/// Lap and timing state for one car slot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LapData {
    pub last_lap_time_ms: u32,
    pub current_lap_time_ms: u32,
    pub sector1_time_ms_part: u16,
    pub sector1_time_minutes_part: u8,
    pub sector2_time_ms_part: u16,
    pub sector2_time_minutes_part: u8,
    pub delta_to_car_in_front_ms_part: u16,
    pub delta_to_car_in_front_minutes_part: u8,
    pub delta_to_race_leader_ms_part: u16,
    pub delta_to_race_leader_minutes_part: u8,
    /// Metres around the current lap; negative before crossing the line.
    pub lap_distance: f32,
    pub total_distance: f32,
    pub safety_car_delta: f32,
    pub car_position: u8,
    pub current_lap_num: u8,
    /// 0 = none, 1 = pitting, 2 = in pit area.
    pub pit_status: u8,
    pub num_pit_stops: u8,
    /// 0 = sector1, 1 = sector2, 2 = sector3.
    pub sector: u8,
    pub current_lap_invalid: u8,
    /// Accumulated time penalties in seconds.
    pub penalties: u8,
    pub total_warnings: u8,
    pub corner_cutting_warnings: u8,
    pub num_unserved_drive_through_pens: u8,
    pub num_unserved_stop_go_pens: u8,
    pub grid_position: u8,
    pub driver_status: u8,
    pub result_status: u8,
    pub pit_lane_timer_active: u8,
    pub pit_lane_time_in_lane_ms: u16,
    pub pit_stop_timer_ms: u16,
    pub pit_stop_should_serve_pen: u8,
    pub speed_trap_fastest_speed: f32,
    pub speed_trap_fastest_lap: u8,
}

impl WireRecord for LapData {
    const SIZE: usize = LAP_DATA_SIZE;
    const NAME: &'static str = "lap data";

    fn read(r: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            last_lap_time_ms: r.u32_le()?,
            current_lap_time_ms: r.u32_le()?,
            sector1_time_ms_part: r.u16_le()?,
            sector1_time_minutes_part: r.u8()?,
            sector2_time_ms_part: r.u16_le()?,
            sector2_time_minutes_part: r.u8()?,
            delta_to_car_in_front_ms_part: r.u16_le()?,
            delta_to_car_in_front_minutes_part: r.u8()?,
            delta_to_race_leader_ms_part: r.u16_le()?,
            delta_to_race_leader_minutes_part: r.u8()?,
            lap_distance: r.f32_le()?,
            total_distance: r.f32_le()?,
            safety_car_delta: r.f32_le()?,
            car_position: r.u8()?,
            current_lap_num: r.u8()?,
            pit_status: r.u8()?,
            num_pit_stops: r.u8()?,
            sector: r.u8()?,
            current_lap_invalid: r.u8()?,
            penalties: r.u8()?,
            total_warnings: r.u8()?,
            corner_cutting_warnings: r.u8()?,
            num_unserved_drive_through_pens: r.u8()?,
            num_unserved_stop_go_pens: r.u8()?,
            grid_position: r.u8()?,
            driver_status: r.u8()?,
            result_status: r.u8()?,
            pit_lane_timer_active: r.u8()?,
            pit_lane_time_in_lane_ms: r.u16_le()?,
            pit_stop_timer_ms: r.u16_le()?,
            pit_stop_should_serve_pen: r.u8()?,
            speed_trap_fastest_speed: r.f32_le()?,
            speed_trap_fastest_lap: r.u8()?,
        })
    }
}

impl LapData {
    pub fn is_lap_invalid(&self) -> bool {
        self.current_lap_invalid != 0
    }

    pub fn sector1_time_ms(&self) -> u32 {
        split_time_ms(self.sector1_time_minutes_part, self.sector1_time_ms_part)
    }

    pub fn sector2_time_ms(&self) -> u32 {
        split_time_ms(self.sector2_time_minutes_part, self.sector2_time_ms_part)
    }
}

fn split_time_ms(minutes: u8, ms: u16) -> u32 {
    u32::from(minutes) * 60_000 + u32::from(ms)
}

/// Decoded Lap Data packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapDataPacket {
    pub header: PacketHeader,
    /// Exactly [`MAX_CARS`] entries, indexed by car slot.
    pub lap_data: Vec<LapData>,
    /// 255 when no personal best car is shown.
    pub time_trial_pb_car_idx: u8,
    pub time_trial_rival_car_idx: u8,
}

impl LapDataPacket {
    pub(crate) fn decode(
        header: PacketHeader,
        body: &mut ByteCursor<'_>,
    ) -> Result<Self, DecodeError> {
        let lap_data = body.records::<LapData>(MAX_CARS)?;
        let time_trial_pb_car_idx = body.u8()?;
        let time_trial_rival_car_idx = body.u8()?;
        Ok(Self { header, lap_data, time_trial_pb_car_idx, time_trial_rival_car_idx })
    }

    /// Record for a car slot, if the slot exists.
    pub fn slot(&self, index: usize) -> Option<&LapData> {
        self.lap_data.get(index)
    }
}
