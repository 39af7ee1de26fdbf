//! Display snapshot
//!
//! A [`DisplaySnapshot`] is rebuilt on a slower cadence than the tick and
//! published whole into a [`SnapshotSlot`]. Readers clone the `Arc` under
//! the lock and render outside it, so a render never sees a half-written
//! snapshot and never holds the lock while formatting.

use crate::processing::StatsSnapshot;
use crate::types::{Finger, LinkStatus, FLEX_CHANNELS};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Per-finger values for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerReading {
    pub finger: Finger,
    /// Last raw flex reading
    pub raw: f32,
    /// Filtered flex mapped to a bend angle, degrees
    pub angle_deg: f32,
}

/// Immutable copy of everything the operator sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    /// Session time the snapshot was built, seconds
    pub session_time_s: f64,
    pub link_status: LinkStatus,
    pub stats: StatsSnapshot,
    pub gyro_raw: Vec3,
    pub gyro_filtered: Vec3,
    /// Root orientation as signed Euler degrees (pitch, yaw, roll)
    pub root_euler_deg: Vec3,
    /// Thumb first
    pub fingers: [FingerReading; FLEX_CHANNELS],
    pub packets_total: u64,
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self {
            session_time_s: 0.0,
            link_status: LinkStatus::Disconnected,
            stats: StatsSnapshot::default(),
            gyro_raw: Vec3::ZERO,
            gyro_filtered: Vec3::ZERO,
            root_euler_deg: Vec3::ZERO,
            fingers: Finger::DISPLAY_ORDER.map(|finger| FingerReading {
                finger,
                raw: 0.0,
                angle_deg: 0.0,
            }),
            packets_total: 0,
        }
    }
}

impl DisplaySnapshot {
    /// Statistics header line
    pub fn stats_line(&self) -> String {
        format!(
            "Packets/s: {:.1}    Avg Jitter: {:.1} ms",
            self.stats.packet_rate, self.stats.jitter_ms
        )
    }

    /// Text block, one entry per line, grouped by blank lines
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(24);
        lines.push(self.stats_line());
        lines.push(format!("Link: {}", self.link_status));
        lines.push(String::new());

        for (axis, value) in ["X", "Y", "Z"].iter().zip(self.gyro_raw.to_array()) {
            lines.push(format!("Raw Gyro {}: {:.3}", axis, value));
        }
        lines.push(String::new());

        for reading in &self.fingers {
            let label = format!("Raw {}:", reading.finger);
            lines.push(format!("{:<12}{:.0}", label, reading.raw));
        }
        lines.push(String::new());

        for (axis, value) in ["X", "Y", "Z"].iter().zip(self.root_euler_deg.to_array()) {
            lines.push(format!("Filtered {}: {:.1}°", axis, value));
        }
        lines.push(String::new());

        for reading in &self.fingers {
            let label = format!("Filtered {}:", reading.finger);
            lines.push(format!("{:<17}{:.1}°", label, reading.angle_deg));
        }

        lines
    }

    /// Render as one string
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }

    /// Serialise for telemetry output
    pub fn to_json(&self) -> crate::error::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::HandLinkError::Serialization(e.to_string()))
    }
}

/// Single-slot latest-value cell shared between tick and render
#[derive(Debug, Clone, Default)]
pub struct SnapshotSlot {
    inner: Arc<Mutex<Arc<DisplaySnapshot>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the published snapshot
    pub fn publish(&self, snapshot: DisplaySnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.inner.lock() {
            Ok(mut slot) => *slot = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Arc<DisplaySnapshot> {
        match self.inner.lock() {
            Ok(slot) => Arc::clone(&slot),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }
}
