//! F1 25 UDP packet decoding.
//!
//! The game broadcasts little-endian binary datagrams, each starting with a
//! 29-byte [`PacketHeader`]. The header's packet id selects a fixed layout:
//! an array of [`MAX_CARS`] per-slot records, optionally followed by trailing
//! scalar fields.
//!
//! ## Decoding rules
//!
//! - Buffers shorter than the header, or shorter than the fixed layout of
//!   their packet type, return [`DecodeError::TooShort`].
//! - Ids outside the closed set 0..=15 return [`DecodeError::UnknownType`].
//! - Known ids without a decoder return [`Packet::Unhandled`] so that new
//!   packet kinds never destabilise the stream.
//! - Every slot is decoded, active or not; inactive slots are zero-filled
//!   on the wire and still advance the cursor.
//! - Reads go through [`ByteCursor`], so a bad layout surfaces as
//!   [`DecodeError::Malformed`] rather than a panic.
//!
//! ## Example
//!
//! ```rust
//! use slipstream::packet::{self, DecodeError};
//!
//! let garbage = [0u8; 12];
//! assert_eq!(
//!     packet::decode(&garbage),
//!     Err(DecodeError::TooShort { expected: 29, actual: 12 })
//! );
//! ```

mod car_telemetry;
mod cursor;
mod header;
mod lap_data;
mod motion;
mod session;

pub use crate::DecodeError;
pub use car_telemetry::{
    CAR_TELEMETRY_PACKET_SIZE, CAR_TELEMETRY_SIZE, CarTelemetryData, CarTelemetryPacket,
};
pub use cursor::{ByteCursor, WireRecord};
pub use header::{HEADER_SIZE, PacketHeader, PacketId};
pub use lap_data::{LAP_DATA_PACKET_SIZE, LAP_DATA_SIZE, LapData, LapDataPacket};
pub use motion::{CAR_MOTION_SIZE, CarMotionData, MOTION_PACKET_SIZE, MotionPacket};
pub use session::{
    EVENT_PACKET_MIN_SIZE, EventKind, EventPacket, SESSION_PACKET_MIN_SIZE, SessionSummary,
};

use tracing::trace;

/// Number of car slots in every per-car array.
pub const MAX_CARS: usize = 22;

/// The `m_packetFormat` value whose layouts this module implements.
pub const PACKET_FORMAT_2025: u16 = 2025;

/// Largest datagram the game sends, with headroom.
pub const MAX_PACKET_BYTES: usize = 2048;

/// One decoded datagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Motion(MotionPacket),
    Session(SessionSummary),
    LapData(LapDataPacket),
    Event(EventPacket),
    CarTelemetry(CarTelemetryPacket),
    /// A known packet kind this crate does not decode.
    Unhandled { header: PacketHeader, id: PacketId },
}

impl Packet {
    pub fn header(&self) -> &PacketHeader {
        match self {
            Packet::Motion(p) => &p.header,
            Packet::Session(p) => &p.header,
            Packet::LapData(p) => &p.header,
            Packet::Event(p) => &p.header,
            Packet::CarTelemetry(p) => &p.header,
            Packet::Unhandled { header, .. } => header,
        }
    }

    pub fn id(&self) -> PacketId {
        match self {
            Packet::Motion(_) => PacketId::Motion,
            Packet::Session(_) => PacketId::Session,
            Packet::LapData(_) => PacketId::LapData,
            Packet::Event(_) => PacketId::Event,
            Packet::CarTelemetry(_) => PacketId::CarTelemetry,
            Packet::Unhandled { id, .. } => *id,
        }
    }
}

impl PacketId {
    /// Minimum datagram size for kinds with a decoder, `None` otherwise.
    pub fn decoded_size(self) -> Option<usize> {
        match self {
            PacketId::Motion => Some(MOTION_PACKET_SIZE),
            PacketId::Session => Some(SESSION_PACKET_MIN_SIZE),
            PacketId::LapData => Some(LAP_DATA_PACKET_SIZE),
            PacketId::Event => Some(EVENT_PACKET_MIN_SIZE),
            PacketId::CarTelemetry => Some(CAR_TELEMETRY_PACKET_SIZE),
            PacketId::Participants
            | PacketId::CarSetups
            | PacketId::CarStatus
            | PacketId::FinalClassification
            | PacketId::LobbyInfo
            | PacketId::CarDamage
            | PacketId::SessionHistory
            | PacketId::TyreSets
            | PacketId::MotionEx
            | PacketId::TimeTrial
            | PacketId::LapPositions => None,
        }
    }
}

/// Decode one datagram.
pub fn decode(buf: &[u8]) -> Result<Packet, DecodeError> {
    if buf.len() < HEADER_SIZE {
        return Err(DecodeError::too_short(HEADER_SIZE, buf.len()));
    }

    let mut cursor = ByteCursor::new(buf);
    let header = cursor.record::<PacketHeader>()?;

    if header.packet_format != PACKET_FORMAT_2025 {
        return Err(DecodeError::UnsupportedFormat { format: header.packet_format });
    }

    let id = header.kind()?;
    match id.decoded_size() {
        Some(expected) if buf.len() < expected => {
            return Err(DecodeError::too_short(expected, buf.len()));
        }
        _ => {}
    }

    trace!(
        packet_id = header.packet_id,
        len = buf.len(),
        frame = header.frame_identifier,
        "Decoding packet"
    );

    match id {
        PacketId::Motion => MotionPacket::decode(header, &mut cursor).map(Packet::Motion),
        PacketId::Session => SessionSummary::decode(header, &mut cursor).map(Packet::Session),
        PacketId::LapData => LapDataPacket::decode(header, &mut cursor).map(Packet::LapData),
        PacketId::Event => EventPacket::decode(header, &mut cursor).map(Packet::Event),
        PacketId::CarTelemetry => {
            CarTelemetryPacket::decode(header, &mut cursor).map(Packet::CarTelemetry)
        }
        PacketId::Participants
        | PacketId::CarSetups
        | PacketId::CarStatus
        | PacketId::FinalClassification
        | PacketId::LobbyInfo
        | PacketId::CarDamage
        | PacketId::SessionHistory
        | PacketId::TyreSets
        | PacketId::MotionEx
        | PacketId::TimeTrial
        | PacketId::LapPositions => Ok(Packet::Unhandled { header, id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        HeaderSpec, car_telemetry_packet, encode_header, event_packet, lap_data_packet,
    };
    use proptest::prelude::*;

    fn header_only(packet_id: u8) -> Vec<u8> {
        encode_header(&HeaderSpec { packet_id, ..HeaderSpec::default() })
    }

    #[test]
    fn header_shorter_than_minimum_is_too_short() {
        for len in 0..HEADER_SIZE {
            let buf = vec![0u8; len];
            assert_eq!(decode(&buf), Err(DecodeError::TooShort { expected: 29, actual: len }));
        }
    }

    #[test]
    fn id_outside_closed_set_is_unknown_type() {
        assert_eq!(decode(&header_only(42)), Err(DecodeError::UnknownType { packet_id: 42 }));
    }

    #[test]
    fn known_id_without_decoder_is_unhandled() {
        let packet = decode(&header_only(PacketId::CarDamage as u8)).unwrap();
        assert_eq!(packet.id(), PacketId::CarDamage);
        assert!(matches!(packet, Packet::Unhandled { .. }));
    }

    #[test]
    fn other_season_format_is_rejected() {
        let buf = encode_header(&HeaderSpec { packet_format: 2024, ..HeaderSpec::default() });
        assert_eq!(decode(&buf), Err(DecodeError::UnsupportedFormat { format: 2024 }));
    }

    #[test]
    fn truncated_lap_data_reports_expected_size() {
        let mut buf = lap_data_packet(&HeaderSpec::default(), 0, &LapData::default());
        buf.truncate(LAP_DATA_PACKET_SIZE - 1);
        assert_eq!(
            decode(&buf),
            Err(DecodeError::TooShort { expected: 1285, actual: 1284 })
        );
    }

    #[test]
    fn every_slot_is_decoded_and_offsets_stay_aligned() {
        let lap = LapData {
            current_lap_num: 4,
            lap_distance: 812.25,
            speed_trap_fastest_lap: 3,
            ..LapData::default()
        };
        let buf = lap_data_packet(&HeaderSpec::default(), MAX_CARS - 1, &lap);

        let Packet::LapData(packet) = decode(&buf).unwrap() else {
            panic!("expected lap data");
        };
        assert_eq!(packet.lap_data.len(), MAX_CARS);
        assert_eq!(packet.lap_data[MAX_CARS - 1], lap);
        assert!(packet.lap_data[..MAX_CARS - 1].iter().all(|l| *l == LapData::default()));
        assert_eq!(packet.time_trial_pb_car_idx, 255);
        assert_eq!(packet.time_trial_rival_car_idx, 255);
    }

    #[test]
    fn oversized_datagram_is_accepted() {
        let mut buf = car_telemetry_packet(&HeaderSpec::default(), 0, &CarTelemetryData::default());
        buf.extend_from_slice(&[0xAB; 16]);
        assert!(matches!(decode(&buf), Ok(Packet::CarTelemetry(_))));
    }

    #[test]
    fn event_code_and_details_are_kept() {
        let buf = event_packet(&HeaderSpec::default(), *b"FTLP", &[7, 0, 0, 0]);
        let Packet::Event(event) = decode(&buf).unwrap() else {
            panic!("expected event");
        };
        assert_eq!(event.kind, EventKind::FastestLap);
        assert_eq!(event.code_str(), "FTLP");
        assert_eq!(event.details, vec![7, 0, 0, 0]);
    }

    prop_compose! {
        fn arb_lap_data()(
            times in any::<(u32, u32)>(),
            sectors in any::<(u16, u8, u16, u8)>(),
            distances in (-1.0e4f32..1.0e4, 0.0f32..1.0e6),
            lap in any::<(u8, u8, u8, u8)>(),
            pit in any::<(u16, u16)>(),
            trap in (0.0f32..400.0, any::<u8>()),
        ) -> LapData {
            LapData {
                last_lap_time_ms: times.0,
                current_lap_time_ms: times.1,
                sector1_time_ms_part: sectors.0,
                sector1_time_minutes_part: sectors.1,
                sector2_time_ms_part: sectors.2,
                sector2_time_minutes_part: sectors.3,
                lap_distance: distances.0,
                total_distance: distances.1,
                car_position: lap.0,
                current_lap_num: lap.1,
                current_lap_invalid: lap.2,
                penalties: lap.3,
                pit_lane_time_in_lane_ms: pit.0,
                pit_stop_timer_ms: pit.1,
                speed_trap_fastest_speed: trap.0,
                speed_trap_fastest_lap: trap.1,
                ..LapData::default()
            }
        }
    }

    prop_compose! {
        fn arb_car_telemetry()(
            speed in any::<u16>(),
            pedals in (0.0f32..=1.0, -1.0f32..=1.0, 0.0f32..=1.0),
            gear in -1i8..=8,
            engine_rpm in any::<u16>(),
            brakes_temperature in any::<[u16; 4]>(),
            tyres_surface_temperature in any::<[u8; 4]>(),
            tyres_pressure in prop::array::uniform4(15.0f32..35.0),
            surface_type in any::<[u8; 4]>(),
        ) -> CarTelemetryData {
            CarTelemetryData {
                speed,
                throttle: pedals.0,
                steer: pedals.1,
                brake: pedals.2,
                gear,
                engine_rpm,
                drs: 1,
                brakes_temperature,
                tyres_surface_temperature,
                tyres_pressure,
                surface_type,
                ..CarTelemetryData::default()
            }
        }
    }

    proptest! {
        #[test]
        fn arbitrary_bytes_never_panic(buf in prop::collection::vec(any::<u8>(), 0..2048)) {
            let _ = decode(&buf);
        }

        #[test]
        fn valid_header_with_short_body_is_too_short(
            id in prop::sample::select(vec![0u8, 1, 2, 3, 6]),
            body_len in 0usize..1400,
        ) {
            let id = PacketId::try_from(id).unwrap();
            let expected = id.decoded_size().unwrap();
            let mut buf = header_only(id as u8);
            buf.resize(HEADER_SIZE + body_len, 0);

            let result = decode(&buf);
            if buf.len() < expected {
                prop_assert_eq!(result, Err(DecodeError::TooShort { expected, actual: buf.len() }));
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn lap_data_round_trips(
            lap in arb_lap_data(),
            slot in 0usize..MAX_CARS,
            uid in any::<u64>(),
        ) {
            let hdr = HeaderSpec {
                session_uid: uid,
                player_car_index: slot as u8,
                ..HeaderSpec::default()
            };
            let Packet::LapData(packet) = decode(&lap_data_packet(&hdr, slot, &lap)).unwrap() else {
                return Err(TestCaseError::fail("expected lap data"));
            };
            prop_assert_eq!(packet.header.session_uid, uid);
            prop_assert_eq!(packet.slot(slot), Some(&lap));
        }

        #[test]
        fn car_telemetry_round_trips(car in arb_car_telemetry(), slot in 0usize..MAX_CARS) {
            let hdr = HeaderSpec { player_car_index: slot as u8, ..HeaderSpec::default() };
            let bytes = car_telemetry_packet(&hdr, slot, &car);
            let Packet::CarTelemetry(packet) = decode(&bytes).unwrap() else {
                return Err(TestCaseError::fail("expected car telemetry"));
            };
            prop_assert_eq!(packet.player(), Some(&car));
            prop_assert_eq!(packet.suggested_gear, 0);
        }
    }
}
