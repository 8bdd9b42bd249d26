//! Session (id 1) and Event (id 3) packets.
//!
//! Only the leading session fields are decoded; the full Session packet
//! carries marshal zones and a weather forecast that nothing here uses.

use serde::{Deserialize, Serialize};

use super::PacketHeader;
use super::cursor::ByteCursor;
use crate::DecodeError;

/// Bytes of the Session body read by [`SessionSummary`].
pub const SESSION_SUMMARY_SIZE: usize = 8;

pub const SESSION_PACKET_MIN_SIZE: usize = super::HEADER_SIZE + SESSION_SUMMARY_SIZE;

/// The event code is required; detail bytes vary by event.
pub const EVENT_PACKET_MIN_SIZE: usize = super::HEADER_SIZE + 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub header: PacketHeader,
    /// 0 = clear, 1 = light cloud, 2 = overcast, 3 = light rain,
    /// 4 = heavy rain, 5 = storm
    pub weather: u8,
    pub track_temperature: i8,
    pub air_temperature: i8,
    pub total_laps: u8,
    /// Metres
    pub track_length: u16,
    pub session_type: u8,
    /// -1 for unknown
    pub track_id: i8,
}

impl SessionSummary {
    pub(crate) fn decode(
        header: PacketHeader,
        body: &mut ByteCursor<'_>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            header,
            weather: body.u8()?,
            track_temperature: body.i8()?,
            air_temperature: body.i8()?,
            total_laps: body.u8()?,
            track_length: body.u16_le()?,
            session_type: body.u8()?,
            track_id: body.i8()?,
        })
    }
}

/// Event kinds that influence capture state; everything else is carried as
/// its raw four-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    SessionStarted,
    SessionEnded,
    FastestLap,
    Flashback,
    Other([u8; 4]),
}

impl From<[u8; 4]> for EventKind {
    fn from(code: [u8; 4]) -> Self {
        match &code {
            b"SSTA" => EventKind::SessionStarted,
            b"SEND" => EventKind::SessionEnded,
            b"FTLP" => EventKind::FastestLap,
            b"FLBK" => EventKind::Flashback,
            _ => EventKind::Other(code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPacket {
    pub header: PacketHeader,
    pub code: [u8; 4],
    pub kind: EventKind,
    /// Event-specific union bytes, left undecoded.
    pub details: Vec<u8>,
}

impl EventPacket {
    pub(crate) fn decode(
        header: PacketHeader,
        body: &mut ByteCursor<'_>,
    ) -> Result<Self, DecodeError> {
        let code = body.u8_array::<4>()?;
        Ok(Self { header, code, kind: EventKind::from(code), details: body.rest().to_vec() })
    }

    /// The event code as text, e.g. `"SSTA"`.
    pub fn code_str(&self) -> String {
        String::from_utf8_lossy(&self.code).into_owned()
    }
}
