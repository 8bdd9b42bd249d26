//! F1 25 packet header parsing.
//!
//! Every datagram starts with the same 29-byte header:
//! ```c
//! struct PacketHeader
//! {
//!     uint16 m_packetFormat;            // 2025
//!     uint8  m_gameYear;                // last two digits, e.g. 25
//!     uint8  m_gameMajorVersion;        // "X.00"
//!     uint8  m_gameMinorVersion;        // "1.XX"
//!     uint8  m_packetVersion;           // version of this packet type
//!     uint8  m_packetId;                // identifier for the packet type
//!     uint64 m_sessionUID;              // unique identifier for the session
//!     float  m_sessionTime;             // session timestamp
//!     uint32 m_frameIdentifier;         // frame the data was retrieved on
//!     uint32 m_overallFrameIdentifier;  // does not go back after flashbacks
//!     uint8  m_playerCarIndex;          // index of player's car in the array
//!     uint8  m_secondaryPlayerCarIndex; // 255 if no second player
//! };
//! ```

use serde::{Deserialize, Serialize};

use super::cursor::{ByteCursor, WireRecord};
use crate::DecodeError;

/// Size of the packet header in bytes.
pub const HEADER_SIZE: usize = 29;

/// Packet header common to every packet type.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PacketHeader {
    pub packet_format: u16,
    pub game_year: u8,
    pub game_major_version: u8,
    pub game_minor_version: u8,
    pub packet_version: u8,
    pub packet_id: u8,
    pub session_uid: u64,
    pub session_time: f32,
    pub frame_identifier: u32,
    pub overall_frame_identifier: u32,
    pub player_car_index: u8,
    pub secondary_player_car_index: u8,
}

impl WireRecord for PacketHeader {
    const SIZE: usize = HEADER_SIZE;
    const NAME: &'static str = "packet header";

    fn read(r: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            packet_format: r.u16_le()?,
            game_year: r.u8()?,
            game_major_version: r.u8()?,
            game_minor_version: r.u8()?,
            packet_version: r.u8()?,
            packet_id: r.u8()?,
            session_uid: r.u64_le()?,
            session_time: r.f32_le()?,
            frame_identifier: r.u32_le()?,
            overall_frame_identifier: r.u32_le()?,
            player_car_index: r.u8()?,
            secondary_player_car_index: r.u8()?,
        })
    }
}

impl PacketHeader {
    /// Resolve the packet id against the closed set of known kinds.
    pub fn kind(&self) -> Result<PacketId, DecodeError> {
        PacketId::try_from(self.packet_id)
    }

    /// Player slot as an index, if it addresses a real car slot.
    pub fn player_slot(&self) -> Option<usize> {
        let slot = usize::from(self.player_car_index);
        (slot < super::MAX_CARS).then_some(slot)
    }
}

/// Packet kinds defined by the F1 25 wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketId {
    Motion = 0,
    Session = 1,
    LapData = 2,
    Event = 3,
    Participants = 4,
    CarSetups = 5,
    CarTelemetry = 6,
    CarStatus = 7,
    FinalClassification = 8,
    LobbyInfo = 9,
    CarDamage = 10,
    SessionHistory = 11,
    TyreSets = 12,
    MotionEx = 13,
    TimeTrial = 14,
    LapPositions = 15,
}

impl TryFrom<u8> for PacketId {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => PacketId::Motion,
            1 => PacketId::Session,
            2 => PacketId::LapData,
            3 => PacketId::Event,
            4 => PacketId::Participants,
            5 => PacketId::CarSetups,
            6 => PacketId::CarTelemetry,
            7 => PacketId::CarStatus,
            8 => PacketId::FinalClassification,
            9 => PacketId::LobbyInfo,
            10 => PacketId::CarDamage,
            11 => PacketId::SessionHistory,
            12 => PacketId::TyreSets,
            13 => PacketId::MotionEx,
            14 => PacketId::TimeTrial,
            15 => PacketId::LapPositions,
            packet_id => return Err(DecodeError::UnknownType { packet_id }),
        })
    }
}
