//! Integration tests for the processing pipeline
//!
//! These tests drive a [`GloveSession`] the way a host would:
//! - Bytes through the reader thread into filters and pose
//! - Statistics over session time
//! - Calibration requested from another thread
//! - Configuration loaded from disk

mod common;

use common::builders::PacketBuilder;
use common::mock_helpers::{create_test_glove, create_test_rig, spawn_scripted};
use common::{assert_float_eq, wait_for_backlog};
use glam::{Quat, Vec3};
use handlink_rs::backend::{LinkBackend, PacketReceiver, ScriptedLink};
use handlink_rs::config::{AppConfig, ImuAxis};
use handlink_rs::pose::SkeletonRig;
use handlink_rs::session::GloveSession;
use handlink_rs::types::{Finger, LinkStatus};
use std::time::{Duration, Instant};

const DT: f32 = 1.0 / 60.0;

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn test_wire_bytes_to_filtered_state() {
    let config = AppConfig::default();
    let link = ScriptedLink::from_bytes(b"A1.0,B2.0,C3.0,D10,E20,F30,G40,H50,T1000#");
    let (packets, reader) = spawn_scripted(link, &config.link);
    assert!(wait_for_backlog(&packets, 1));

    let mut rig = create_test_rig(&config);
    let mut session = GloveSession::new(&config, packets, Some(reader), &rig);
    let report = session.tick(ms(16), DT, &mut rig);
    assert_eq!(report.packets, 1);

    let state = *session.filter_state();
    assert_eq!(state.gyro_raw, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(state.flex_raw, [10.0, 20.0, 30.0, 40.0, 50.0]);
    assert_float_eq(state.gyro_filtered.x as f64, 0.1, 1e-6);
    assert_float_eq(state.gyro_filtered.y as f64, 0.2, 1e-6);
    assert_float_eq(state.gyro_filtered.z as f64, 0.3, 1e-6);

    assert_eq!(session.link_status(), LinkStatus::Connected);
    let summary = session.shutdown();
    assert_eq!(summary.packets, 1);
    assert_eq!(session.link_status(), LinkStatus::Disconnected);
}

#[test]
fn test_rate_and_jitter_over_session_time() {
    let config = AppConfig::default();
    let (tx, packets) = PacketReceiver::channel();
    let mut rig = create_test_rig(&config);
    let mut session = GloveSession::new(&config, packets, None, &rig);

    // 100 Hz for one second; hardware deltas alternate 9 ms / 11 ms
    let mut hw = 0.0f32;
    for i in 0..100u64 {
        hw += if i % 2 == 0 { 9_000.0 } else { 11_000.0 };
        tx.send(PacketBuilder::new().gyro(1.0, 1.0, 1.0).timestamp(hw).build())
            .unwrap();
        session.tick(ms(i * 10), DT, &mut rig);
    }

    // Force a fresh snapshot at a display boundary
    session.tick(ms(1250), DT, &mut rig);
    let snapshot = session.snapshots().latest();
    assert_float_eq(snapshot.session_time_s, 1.25, 1e-9);
    // Arrivals at 260..990 ms are still inside the window
    assert_eq!(snapshot.stats.window_packets, 74);
    assert_float_eq(snapshot.stats.jitter_ms as f64, 1.0, 1e-3);
    assert_float_eq(snapshot.stats.mean_interval_ms as f64, 10.0, 0.1);

    // Long silence empties both windows
    session.tick(ms(5000), DT, &mut rig);
    let snapshot = session.snapshots().latest();
    assert_eq!(snapshot.stats.window_packets, 0);
    assert_eq!(snapshot.stats.jitter_ms, 0.0);
}

#[test]
fn test_calibration_from_another_thread() {
    let config = AppConfig::default();
    let (tx, packets) = PacketReceiver::channel();
    let mut rig = create_test_rig(&config);
    let baseline = Quat::from_rotation_y(0.5);
    rig.set_root_rotation(baseline);
    let mut session = GloveSession::new(&config, packets, None, &rig);

    for i in 0..50u64 {
        tx.send(PacketBuilder::new().gyro(40.0, -15.0, 5.0).build()).unwrap();
        session.tick(ms(i * 16), DT, &mut rig);
    }
    assert!(rig.root_rotation().angle_between(baseline) > 0.01);

    let trigger = session.calibration_trigger();
    std::thread::spawn(move || trigger.fire()).join().unwrap();

    let report = session.tick(ms(800), DT, &mut rig);
    assert!(report.calibrated);
    assert_eq!(rig.root_rotation(), baseline);

    // Only one reset per request
    let report = session.tick(ms(816), DT, &mut rig);
    assert!(!report.calibrated);
}

#[test]
fn test_fingers_close_fast_and_open_slow() {
    let mut config = AppConfig::default();
    config.filter.flex_alpha = 1.0;
    let (tx, packets) = PacketReceiver::channel();
    let mut rig = create_test_rig(&config);
    let mut session = GloveSession::new(&config, packets, None, &rig);
    let bent = Quat::from_rotation_x(90f32.to_radians());

    let flexed = [0.0, 0.0, 0.0, 1023.0, 0.0];
    tx.send(PacketBuilder::new().flex(flexed).build()).unwrap();
    let mut close_ticks = 0;
    while rig.bone_rotation("index.01").unwrap_or_default().angle_between(bent) > 1f32.to_radians() {
        session.tick(ms(close_ticks * 16), DT, &mut rig);
        close_ticks += 1;
        assert!(close_ticks < 1000);
    }

    tx.send(PacketBuilder::new().flex([0.0; 5]).build()).unwrap();
    let mut open_ticks = 0;
    while rig.bone_rotation("index.01").unwrap_or_default().angle_between(Quat::IDENTITY)
        > 1f32.to_radians()
    {
        session.tick(ms(10_000 + open_ticks * 16), DT, &mut rig);
        open_ticks += 1;
        assert!(open_ticks < 1000);
    }

    assert!(
        open_ticks > close_ticks,
        "opening ({open_ticks} ticks) should be slower than closing ({close_ticks} ticks)"
    );

    let snapshot = session.snapshots().latest();
    let index = snapshot
        .fingers
        .iter()
        .find(|f| f.finger == Finger::Index)
        .map(|f| f.angle_deg);
    assert_eq!(index, Some(0.0));
}

#[test]
fn test_config_file_drives_axis_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("handlink.toml");
    std::fs::write(
        &path,
        r#"
[filter]
gyro_alpha = 1.0

[axes]
rotation_scale = 2.0
pitch = { source = "X" }
yaw = { source = "Y" }
roll = { source = "Z" }
"#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.axes.pitch.source, ImuAxis::X);
    assert!(!config.axes.roll.invert);

    let (tx, packets) = PacketReceiver::channel();
    let mut rig = create_test_rig(&config);
    let mut session = GloveSession::new(&config, packets, None, &rig);

    // 45 deg/s of pitch, doubled, for one second of ticks
    for i in 0..60u64 {
        tx.send(PacketBuilder::new().gyro(45.0, 0.0, 0.0).build()).unwrap();
        session.tick(ms(i * 16), DT, &mut rig);
    }
    let expected = Quat::from_rotation_x(90f32.to_radians());
    assert!(rig.root_rotation().angle_between(expected) < 0.5f32.to_radians());
}

#[test]
fn test_synthetic_glove_drives_session() {
    let config = AppConfig::default();
    let (backend, packets) = LinkBackend::new(Box::new(create_test_glove(200.0)), &config.link);
    let reader = backend.spawn().unwrap();

    let mut rig = create_test_rig(&config);
    let mut session = GloveSession::new(&config, packets, Some(reader), &rig);

    let start = Instant::now();
    let mut last = start;
    let mut total = 0;
    while start.elapsed() < Duration::from_millis(600) {
        std::thread::sleep(Duration::from_millis(10));
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;
        total += session.tick(now.duration_since(start), dt, &mut rig).packets;
    }

    assert!(total > 10, "only {total} packets in 600 ms");
    assert!(rig.root_rotation().angle_between(Quat::IDENTITY) > 0.0);
    let index = rig.bone_rotation("index.02").unwrap_or_default();
    assert!(index.angle_between(Quat::IDENTITY) > 1f32.to_radians());

    let summary = session.shutdown();
    assert_eq!(summary.packets as usize, total);
}
