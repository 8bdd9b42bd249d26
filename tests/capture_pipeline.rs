//! End-to-end pipeline over loopback UDP: capture, store, lap index, dump.
//!
//! Packets are assembled by hand here so the wire offsets are checked
//! independently of the crate's own test builders.

use futures::StreamExt;
use slipstream::{
    CaptureConfig, CaptureLoop, CaptureState, LapIndex, SegmentationConfig, StoreConfig,
    TelemetryStore, UpdateRate,
};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

const MAX_CARS: usize = 22;

fn header(packet_id: u8, frame: u32) -> Vec<u8> {
    let mut h = Vec::with_capacity(29);
    h.extend_from_slice(&2025u16.to_le_bytes());
    h.extend_from_slice(&[25, 1, 0, 1, packet_id]);
    h.extend_from_slice(&42u64.to_le_bytes());
    h.extend_from_slice(&(frame as f32 / 60.0).to_le_bytes());
    h.extend_from_slice(&frame.to_le_bytes());
    h.extend_from_slice(&frame.to_le_bytes());
    h.extend_from_slice(&[0, 255]);
    h
}

fn lap_packet(frame: u32, lap: u8, lap_time_ms: u32, distance: f32) -> Vec<u8> {
    let mut p = header(2, frame);
    let mut record = [0u8; 57];
    record[4..8].copy_from_slice(&lap_time_ms.to_le_bytes());
    record[20..24].copy_from_slice(&distance.to_le_bytes());
    record[32] = 5; // position
    record[33] = lap;
    p.extend_from_slice(&record);
    p.extend(std::iter::repeat_n(0u8, (MAX_CARS - 1) * 57));
    p.extend_from_slice(&[255, 255]);
    p
}

fn telemetry_packet(frame: u32, speed: u16, rpm: u16, gear: i8) -> Vec<u8> {
    let mut p = header(6, frame);
    let mut record = [0u8; 60];
    record[0..2].copy_from_slice(&speed.to_le_bytes());
    record[2..6].copy_from_slice(&1.0f32.to_le_bytes());
    record[15] = gear as u8;
    record[16..18].copy_from_slice(&rpm.to_le_bytes());
    p.extend_from_slice(&record);
    p.extend(std::iter::repeat_n(0u8, (MAX_CARS - 1) * 60));
    p.extend_from_slice(&[255, 255, 0]);
    p
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loopback_capture_feeds_store_and_lap_index() {
    let _ = tracing_subscriber::fmt::try_init();

    let dump_dir = tempfile::tempdir().unwrap();
    let (writer, reader) = TelemetryStore::new(&StoreConfig {
        capacity: Some(1_000),
        dump_dir: dump_dir.path().to_path_buf(),
        ..StoreConfig::default()
    });
    let config = CaptureConfig {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        ..CaptureConfig::default()
    };
    let capture = CaptureLoop::bind(config, writer).unwrap();
    let target = capture.local_addr().unwrap();
    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

    for i in 0..10u32 {
        let lap = lap_packet(i * 2, 2, 1_000 + i * 100, 50.0 + i as f32 * 20.0);
        sender.send_to(&lap, target).unwrap();
        let sent = u64::from(i) * 2 + 1;
        wait_until(|| capture.counters().datagrams >= sent).await;
        sender.send_to(&telemetry_packet(i * 2 + 1, 200 + i as u16, 11_000, 6), target).unwrap();
    }
    wait_until(|| capture.counters().samples == 10).await;
    assert_eq!(capture.state(), CaptureState::Listening);

    let snapshot = reader.snapshot();
    assert_eq!(snapshot.samples.len(), 10);
    assert_eq!(snapshot.stats.sequence_number, 10);
    let last = snapshot.latest().unwrap();
    assert_eq!((last.speed, last.rpm, last.gear), (209, 11_000, 6));
    assert_eq!((last.lap_number, last.lap_time_ms, last.car_position), (2, 1_900, 5));

    let mut laps = LapIndex::new(SegmentationConfig::default());
    assert_eq!(laps.update(&snapshot), 10);
    assert_eq!(laps.known_lap_numbers().into_iter().collect::<Vec<_>>(), vec![2]);
    assert_eq!(laps.current_lap_samples().len(), 10);
    assert_eq!(laps.best_segment(2).map(|s| s.len()), Some(10));

    let mut live = capture.subscribe(UpdateRate::Max(5));
    assert_eq!(live.next().await.map(|s| s.speed), Some(209));

    let path = reader.dump(4).unwrap();
    let dumped: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert_eq!(dumped["points"].as_array().map(Vec::len), Some(4));

    capture.stop().await;
}
