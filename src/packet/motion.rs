//! Motion packet (id 0). Decoded opportunistically; nothing downstream
//! depends on it.

use serde::{Deserialize, Serialize};

use super::cursor::{ByteCursor, WireRecord};
use super::{MAX_CARS, PacketHeader};
use crate::DecodeError;

pub const CAR_MOTION_SIZE: usize = 60;

pub const MOTION_PACKET_SIZE: usize = super::HEADER_SIZE + MAX_CARS * CAR_MOTION_SIZE;

/// World-space motion for one slot. Direction vectors are normalised and
/// scaled to `i16` (divide by 32767.0).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CarMotionData {
    pub world_position: [f32; 3],
    pub world_velocity: [f32; 3],
    pub world_forward_dir: [i16; 3],
    pub world_right_dir: [i16; 3],
    pub g_force_lateral: f32,
    pub g_force_longitudinal: f32,
    pub g_force_vertical: f32,
    /// Radians
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl WireRecord for CarMotionData {
    const SIZE: usize = CAR_MOTION_SIZE;
    const NAME: &'static str = "car motion";

    fn read(r: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            world_position: r.f32_le_array::<3>()?,
            world_velocity: r.f32_le_array::<3>()?,
            world_forward_dir: [r.i16_le()?, r.i16_le()?, r.i16_le()?],
            world_right_dir: [r.i16_le()?, r.i16_le()?, r.i16_le()?],
            g_force_lateral: r.f32_le()?,
            g_force_longitudinal: r.f32_le()?,
            g_force_vertical: r.f32_le()?,
            yaw: r.f32_le()?,
            pitch: r.f32_le()?,
            roll: r.f32_le()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionPacket {
    pub header: PacketHeader,
    pub car_motion: Vec<CarMotionData>,
}

impl MotionPacket {
    pub(crate) fn decode(
        header: PacketHeader,
        body: &mut ByteCursor<'_>,
    ) -> Result<Self, DecodeError> {
        Ok(Self { header, car_motion: body.records::<CarMotionData>(MAX_CARS)? })
    }
}
