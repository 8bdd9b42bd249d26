//! Packet builders for tests and benchmarks.
//!
//! These encode the F1 25 wire layouts field by field, independently of the
//! decoders, so round-trip tests exercise real offsets.

#![cfg(any(test, feature = "benchmark"))]

use chrono::{DateTime, Utc};

use crate::TelemetrySample;
use crate::packet::{
    CarTelemetryData, HEADER_SIZE, LapData, MAX_CARS, PACKET_FORMAT_2025, PacketId,
};

/// Header fields a test usually cares about. Everything else is fixed.
#[derive(Debug, Clone, Copy)]
pub struct HeaderSpec {
    pub packet_format: u16,
    pub packet_id: u8,
    pub session_uid: u64,
    pub session_time: f32,
    pub frame_identifier: u32,
    pub player_car_index: u8,
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self {
            packet_format: PACKET_FORMAT_2025,
            packet_id: 0,
            session_uid: 0x5EED_0000_0000_0001,
            session_time: 0.0,
            frame_identifier: 0,
            player_car_index: 0,
        }
    }
}

impl HeaderSpec {
    pub fn with_id(self, id: PacketId) -> Self {
        Self { packet_id: id as u8, ..self }
    }
}

pub fn encode_header(hdr: &HeaderSpec) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE);
    out.extend_from_slice(&hdr.packet_format.to_le_bytes());
    out.push(25); // game year
    out.push(1); // major version
    out.push(4); // minor version
    out.push(1); // packet version
    out.push(hdr.packet_id);
    out.extend_from_slice(&hdr.session_uid.to_le_bytes());
    out.extend_from_slice(&hdr.session_time.to_le_bytes());
    out.extend_from_slice(&hdr.frame_identifier.to_le_bytes());
    out.extend_from_slice(&hdr.frame_identifier.to_le_bytes()); // overall frame
    out.push(hdr.player_car_index);
    out.push(255); // no secondary player
    debug_assert_eq!(out.len(), HEADER_SIZE);
    out
}

pub fn encode_lap_data(out: &mut Vec<u8>, lap: &LapData) {
    out.extend_from_slice(&lap.last_lap_time_ms.to_le_bytes());
    out.extend_from_slice(&lap.current_lap_time_ms.to_le_bytes());
    out.extend_from_slice(&lap.sector1_time_ms_part.to_le_bytes());
    out.push(lap.sector1_time_minutes_part);
    out.extend_from_slice(&lap.sector2_time_ms_part.to_le_bytes());
    out.push(lap.sector2_time_minutes_part);
    out.extend_from_slice(&lap.delta_to_car_in_front_ms_part.to_le_bytes());
    out.push(lap.delta_to_car_in_front_minutes_part);
    out.extend_from_slice(&lap.delta_to_race_leader_ms_part.to_le_bytes());
    out.push(lap.delta_to_race_leader_minutes_part);
    out.extend_from_slice(&lap.lap_distance.to_le_bytes());
    out.extend_from_slice(&lap.total_distance.to_le_bytes());
    out.extend_from_slice(&lap.safety_car_delta.to_le_bytes());
    out.extend_from_slice(&[
        lap.car_position,
        lap.current_lap_num,
        lap.pit_status,
        lap.num_pit_stops,
        lap.sector,
        lap.current_lap_invalid,
        lap.penalties,
        lap.total_warnings,
        lap.corner_cutting_warnings,
        lap.num_unserved_drive_through_pens,
        lap.num_unserved_stop_go_pens,
        lap.grid_position,
        lap.driver_status,
        lap.result_status,
        lap.pit_lane_timer_active,
    ]);
    out.extend_from_slice(&lap.pit_lane_time_in_lane_ms.to_le_bytes());
    out.extend_from_slice(&lap.pit_stop_timer_ms.to_le_bytes());
    out.push(lap.pit_stop_should_serve_pen);
    out.extend_from_slice(&lap.speed_trap_fastest_speed.to_le_bytes());
    out.push(lap.speed_trap_fastest_lap);
}

pub fn encode_car_telemetry(out: &mut Vec<u8>, car: &CarTelemetryData) {
    out.extend_from_slice(&car.speed.to_le_bytes());
    out.extend_from_slice(&car.throttle.to_le_bytes());
    out.extend_from_slice(&car.steer.to_le_bytes());
    out.extend_from_slice(&car.brake.to_le_bytes());
    out.push(car.clutch);
    out.extend_from_slice(&car.gear.to_le_bytes());
    out.extend_from_slice(&car.engine_rpm.to_le_bytes());
    out.push(car.drs);
    out.push(car.rev_lights_percent);
    out.extend_from_slice(&car.rev_lights_bit_value.to_le_bytes());
    for t in car.brakes_temperature {
        out.extend_from_slice(&t.to_le_bytes());
    }
    out.extend_from_slice(&car.tyres_surface_temperature);
    out.extend_from_slice(&car.tyres_inner_temperature);
    out.extend_from_slice(&car.engine_temperature.to_le_bytes());
    for p in car.tyres_pressure {
        out.extend_from_slice(&p.to_le_bytes());
    }
    out.extend_from_slice(&car.surface_type);
}

/// A Lap Data packet with `lap` in `slot` and zeroed records elsewhere.
pub fn lap_data_packet(hdr: &HeaderSpec, slot: usize, lap: &LapData) -> Vec<u8> {
    let mut out = encode_header(&hdr.with_id(PacketId::LapData));
    let empty = LapData::default();
    for i in 0..MAX_CARS {
        encode_lap_data(&mut out, if i == slot { lap } else { &empty });
    }
    out.extend_from_slice(&[255, 255]);
    out
}

/// A Car Telemetry packet with `car` in `slot` and zeroed records elsewhere.
pub fn car_telemetry_packet(hdr: &HeaderSpec, slot: usize, car: &CarTelemetryData) -> Vec<u8> {
    let mut out = encode_header(&hdr.with_id(PacketId::CarTelemetry));
    let empty = CarTelemetryData::default();
    for i in 0..MAX_CARS {
        encode_car_telemetry(&mut out, if i == slot { car } else { &empty });
    }
    out.extend_from_slice(&[255, 255, 0]);
    out
}

pub fn event_packet(hdr: &HeaderSpec, code: [u8; 4], details: &[u8]) -> Vec<u8> {
    let mut out = encode_header(&hdr.with_id(PacketId::Event));
    out.extend_from_slice(&code);
    out.extend_from_slice(details);
    out
}

/// A sample with the lap fields the segmentation logic reads. Wall time
/// advances with `lap_time_ms` so ordering is visible in dumps.
pub fn sample(lap_number: u8, lap_time_ms: u32, lap_distance: f32) -> TelemetrySample {
    let millis = 1_750_000_000_000 + i64::from(lap_time_ms);
    let wall_time = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();
    TelemetrySample {
        wall_time,
        session_time: lap_time_ms as f32 / 1000.0,
        lap_time_ms,
        speed: 200,
        rpm: 11_000,
        gear: 6,
        throttle: 1.0,
        brake: 0.0,
        lap_number,
        lap_invalid: false,
        lap_distance,
        car_position: 1,
        last_lap_time_ms: 0,
    }
}
