//! Glove session: the per-tick pipeline
//!
//! [`GloveSession::tick`] is called at the host's fixed cadence. Each call:
//!
//! 1. Drains the packets queued at the moment of the call
//! 2. Parses each one; packets with no valid token are dropped as non-events
//! 3. Feeds statistics, the session summary and the filters, once per packet
//! 4. Integrates the root orientation if fresh data arrived this tick
//! 5. Steps every finger joint toward its flex target
//! 6. Applies a pending calibration reset
//! 7. Advances the smoothed packet rate and, every display interval,
//!    publishes a new [`DisplaySnapshot`]
//!
//! Nothing in the tick blocks on I/O or returns an error.

use crate::backend::{LinkStats, PacketReceiver, ReaderHandle};
use crate::config::{AppConfig, FlexConfig};
use crate::display::{DisplaySnapshot, FingerReading, SnapshotSlot};
use crate::pose::{
    flex_to_angle, to_euler_degrees, Calibration, CalibrationTrigger, PoseMapper, SkeletonRig,
};
use crate::processing::{parse_packet, FilterEngine, FilterState, SessionSummary, StatsEngine};
use crate::types::{Finger, LinkStatus};
use std::time::Duration;

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Packets that carried at least one valid field
    pub packets: usize,
    /// Packets dropped for carrying nothing usable
    pub empty_packets: usize,
    /// A calibration reset was applied
    pub calibrated: bool,
    /// A new display snapshot was published
    pub snapshot_published: bool,
}

/// Processing state for one glove connection
///
/// The root orientation is integrated only on ticks that drained at least
/// one sample; on empty ticks the root stays where it is while joints keep
/// easing toward their last targets.
pub struct GloveSession {
    packets: PacketReceiver,
    reader: Option<ReaderHandle>,
    filter: FilterEngine,
    stats: StatsEngine,
    summary: SessionSummary,
    mapper: PoseMapper,
    flex: FlexConfig,
    calibration: Calibration,
    trigger: CalibrationTrigger,
    snapshots: SnapshotSlot,
    display_interval: Duration,
    last_display: Option<Duration>,
    last_status: LinkStatus,
    empty_packets: u64,
}

impl GloveSession {
    /// Create a session, capturing joint and orientation baselines from `rig`
    ///
    /// `reader` is `None` when the link could not be opened; the session then
    /// runs with no samples.
    pub fn new(
        config: &AppConfig,
        packets: PacketReceiver,
        reader: Option<ReaderHandle>,
        rig: &dyn SkeletonRig,
    ) -> Self {
        Self {
            packets,
            reader,
            filter: FilterEngine::new(&config.filter),
            stats: StatsEngine::new(config.stats.rate_smoothing),
            summary: SessionSummary::new(),
            mapper: PoseMapper::new(config, rig),
            flex: config.flex,
            calibration: Calibration::capture(rig),
            trigger: CalibrationTrigger::new(),
            snapshots: SnapshotSlot::new(),
            display_interval: Duration::from_millis(config.stats.display_interval_ms),
            last_display: None,
            last_status: LinkStatus::Disconnected,
            empty_packets: 0,
        }
    }

    /// Handle for requesting a calibration reset from another thread
    pub fn calibration_trigger(&self) -> CalibrationTrigger {
        self.trigger.clone()
    }

    /// Slot the display snapshot is published into
    pub fn snapshots(&self) -> SnapshotSlot {
        self.snapshots.clone()
    }

    pub fn filter_state(&self) -> &FilterState {
        self.filter.state()
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Current link status; `Disconnected` without a reader
    pub fn link_status(&self) -> LinkStatus {
        self.reader
            .as_ref()
            .map(ReaderHandle::status)
            .unwrap_or(LinkStatus::Disconnected)
    }

    /// Reader counters, if a reader is running
    pub fn link_stats(&self) -> Option<LinkStats> {
        self.reader.as_ref().map(ReaderHandle::stats)
    }

    /// Run one tick at session time `now`, `dt` seconds after the previous one
    ///
    /// The root is left untouched when no sample was drained.
    pub fn tick(&mut self, now: Duration, dt: f32, rig: &mut dyn SkeletonRig) -> TickReport {
        let mut report = TickReport::default();

        for packet in self.packets.drain() {
            let sample = parse_packet(&packet);
            if sample.is_empty() {
                report.empty_packets += 1;
                tracing::trace!("Dropping packet with no valid fields: {:?}", packet);
                continue;
            }
            self.stats.record_packet(now, &sample);
            self.summary.record(now, &sample);
            self.filter.update(&sample);
            report.packets += 1;
        }
        self.empty_packets += report.empty_packets as u64;

        if report.packets > 0 {
            self.mapper.apply_root(self.filter.state(), dt, rig);
        }
        self.mapper.apply_joints(self.filter.state(), dt, rig);

        if self.trigger.take() {
            report.calibrated = self.calibration.reset(rig);
        }

        self.stats.tick(now, dt);
        self.watch_link();

        let due = self
            .last_display
            .map_or(true, |last| now.saturating_sub(last) >= self.display_interval);
        if due {
            let snapshot = self.build_snapshot(now, rig);
            self.snapshots.publish(snapshot);
            self.last_display = Some(now);
            report.snapshot_published = true;
        }

        report
    }

    fn watch_link(&mut self) {
        let status = self.link_status();
        if status == self.last_status {
            return;
        }
        match status {
            LinkStatus::Broken => tracing::warn!("Link reported broken; still retrying"),
            LinkStatus::Connected if self.last_status == LinkStatus::Broken => {
                tracing::info!("Link recovered")
            }
            _ => tracing::debug!("Link status {} -> {}", self.last_status, status),
        }
        self.last_status = status;
    }

    fn build_snapshot(&mut self, now: Duration, rig: &dyn SkeletonRig) -> DisplaySnapshot {
        let state = *self.filter.state();
        let flex = self.flex;
        DisplaySnapshot {
            session_time_s: now.as_secs_f64(),
            link_status: self.link_status(),
            stats: self.stats.snapshot(now),
            gyro_raw: state.gyro_raw,
            gyro_filtered: state.gyro_filtered,
            root_euler_deg: to_euler_degrees(rig.root_rotation()),
            fingers: Finger::DISPLAY_ORDER.map(|finger| FingerReading {
                finger,
                raw: state.flex_raw[finger.channel()],
                angle_deg: flex_to_angle(state.flex_filtered[finger.channel()], &flex),
            }),
            packets_total: self.summary.packets,
        }
    }

    /// Stop the reader, log the session summary and return it
    pub fn shutdown(&mut self) -> SessionSummary {
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
            let stats = reader.stats();
            tracing::info!(
                "Link closed: {} bytes, {} packets framed, {} overflow resyncs, {} read errors",
                stats.bytes_read,
                stats.packets_framed,
                stats.overflow_resyncs,
                stats.read_errors
            );
        }
        if self.empty_packets > 0 {
            tracing::info!("{} packets carried no valid fields", self.empty_packets);
        }
        self.summary.log();
        self.summary.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::MemoryRig;
    use glam::{Quat, Vec3};

    const DT: f32 = 1.0 / 60.0;

    fn session(config: &AppConfig) -> (crossbeam_channel::Sender<String>, GloveSession, MemoryRig) {
        let (tx, packets) = PacketReceiver::channel();
        let rig = MemoryRig::for_chains(&config.fingers);
        let session = GloveSession::new(config, packets, None, &rig);
        (tx, session, rig)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_single_packet_end_to_end() {
        let config = AppConfig::default();
        let (tx, mut session, mut rig) = session(&config);
        tx.send("A1.0,B2.0,C3.0,D10,E20,F30,G40,H50,T1000".to_string())
            .unwrap();

        let report = session.tick(ms(16), DT, &mut rig);
        assert_eq!(report.packets, 1);

        let state = session.filter_state();
        assert!((state.gyro_filtered - Vec3::new(0.1, 0.2, 0.3)).length() < 1e-6);
        assert_eq!(state.flex_raw, [10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_ne!(rig.root_rotation(), Quat::IDENTITY);
    }

    #[test]
    fn test_empty_packets_are_non_events() {
        let config = AppConfig::default();
        let (tx, mut session, mut rig) = session(&config);
        for p in ["", "Zfoo", ",,", "A"] {
            tx.send(p.to_string()).unwrap();
        }

        let report = session.tick(ms(16), DT, &mut rig);
        assert_eq!(report.packets, 0);
        assert_eq!(report.empty_packets, 4);
        assert_eq!(session.summary().packets, 0);
        assert_eq!(*session.filter_state(), FilterState::default());
    }

    #[test]
    fn test_empty_queue_does_not_rotate_root() {
        let config = AppConfig::default();
        let (tx, mut session, mut rig) = session(&config);
        tx.send("A50,B50,C50".to_string()).unwrap();
        session.tick(ms(16), DT, &mut rig);
        let after_data = rig.root_rotation();

        let report = session.tick(ms(33), DT, &mut rig);
        assert_eq!(report.packets, 0);
        assert_eq!(rig.root_rotation(), after_data);
    }

    #[test]
    fn test_calibration_after_drift() {
        let config = AppConfig::default();
        let (tx, mut session, mut rig) = session(&config);
        let trigger = session.calibration_trigger();

        for i in 0..30u64 {
            tx.send(format!("A{},B-7,C3,T{}", 10 + i, i * 10_000))
                .unwrap();
            session.tick(ms(i * 16), DT, &mut rig);
        }
        assert_ne!(rig.root_rotation(), Quat::IDENTITY);

        trigger.fire();
        tx.send("A20,B20,C20".to_string()).unwrap();
        let report = session.tick(ms(500), DT, &mut rig);
        assert!(report.calibrated);
        assert_eq!(rig.root_rotation(), Quat::IDENTITY);
        // Filters are untouched by the reset
        assert_ne!(session.filter_state().gyro_filtered, Vec3::ZERO);
    }

    #[test]
    fn test_snapshot_cadence() {
        let config = AppConfig::default();
        let (_tx, mut session, mut rig) = session(&config);
        let slot = session.snapshots();

        assert!(session.tick(ms(0), DT, &mut rig).snapshot_published);
        assert!(!session.tick(ms(100), DT, &mut rig).snapshot_published);
        assert!(!session.tick(ms(249), DT, &mut rig).snapshot_published);
        assert!(session.tick(ms(250), DT, &mut rig).snapshot_published);
        assert_eq!(slot.latest().session_time_s, 0.25);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut config = AppConfig::default();
        config.filter.flex_alpha = 1.0;
        let (tx, mut session, mut rig) = session(&config);

        tx.send("A1,B1,C1,H1023,D0,T0".to_string()).unwrap();
        tx.send("A1,B1,C1,H1023,D0,T10000".to_string()).unwrap();
        session.tick(ms(0), DT, &mut rig);

        let snapshot = session.snapshots().latest();
        assert_eq!(snapshot.packets_total, 2);
        assert_eq!(snapshot.stats.window_packets, 2);
        assert_eq!(snapshot.link_status, LinkStatus::Disconnected);
        assert_eq!(snapshot.fingers[0].finger, Finger::Thumb);
        assert_eq!(snapshot.fingers[0].raw, 1023.0);
        assert!((snapshot.fingers[0].angle_deg - 90.0).abs() < 1e-4);
        assert_eq!(snapshot.fingers[4].angle_deg, 0.0);
    }

    #[test]
    fn test_shutdown_returns_summary() {
        let config = AppConfig::default();
        let (tx, mut session, mut rig) = session(&config);
        tx.send("A1,T5".to_string()).unwrap();
        session.tick(ms(0), DT, &mut rig);

        let summary = session.shutdown();
        assert_eq!(summary.packets, 1);
        assert_eq!(session.link_status(), LinkStatus::Disconnected);
    }
}
