//! Statistics engine
//!
//! Two rolling aggregates over a trailing window of wall-clock arrival time
//! (session-relative, supplied by the caller so tests control the clock):
//!
//! - **Packet rate**: packets received in the last second, then smoothed
//!   with a frame-time-scaled exponential filter for display.
//! - **Jitter**: mean absolute deviation of the hardware-timestamp deltas
//!   between consecutive packets received in the last second.
//!
//! Both windows evict from the front of a deque before every read, so
//! memory is bounded by one second of traffic.
//!
//! [`SessionSummary`] keeps whole-session aggregates in O(1) memory for the
//! report logged at shutdown.

use crate::types::{IncrementalStats, RawSample};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Length of the rolling statistics window
pub const STATS_WINDOW: Duration = Duration::from_secs(1);

/// Drain intervals ignored at the start of a session summary
pub const WARMUP_INTERVALS: u64 = 6;

/// Frame rate the rate-smoothing factor is expressed against
const SMOOTHING_REFERENCE_HZ: f32 = 60.0;

/// Time-ordered values that expire after a fixed window
#[derive(Debug, Clone)]
pub struct TimestampWindow<T> {
    window: Duration,
    entries: VecDeque<(Duration, T)>,
}

impl<T> TimestampWindow<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: VecDeque::new(),
        }
    }

    /// Append an entry; `at` must not go backwards
    pub fn push(&mut self, at: Duration, value: T) {
        self.entries.push_back((at, value));
    }

    /// Drop every entry with `now - t >= window`
    pub fn evict(&mut self, now: Duration) {
        while let Some((t, _)) = self.entries.front() {
            if now.saturating_sub(*t) >= self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Values still inside the window
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Oldest retained timestamp
    pub fn oldest(&self) -> Option<Duration> {
        self.entries.front().map(|(t, _)| *t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Packets per second over the window, smoothed for display
#[derive(Debug, Clone)]
pub struct PacketRateTracker {
    arrivals: TimestampWindow<()>,
    smoothing: f32,
    smoothed: f32,
}

impl PacketRateTracker {
    pub fn new(smoothing: f32) -> Self {
        Self {
            arrivals: TimestampWindow::new(STATS_WINDOW),
            smoothing: smoothing.max(0.0),
            smoothed: 0.0,
        }
    }

    /// Record one packet arrival
    pub fn record(&mut self, now: Duration) {
        self.arrivals.push(now, ());
    }

    /// Evict, count, and advance the smoothed rate by one frame of `dt` seconds
    pub fn update(&mut self, now: Duration, dt: f32) -> f32 {
        self.arrivals.evict(now);
        let count = self.arrivals.len() as f32;
        let t = (self.smoothing * dt * SMOOTHING_REFERENCE_HZ).clamp(0.0, 1.0);
        self.smoothed += (count - self.smoothed) * t;
        self.smoothed
    }

    /// Raw count of packets in the window as of `now`
    pub fn windowed_count(&mut self, now: Duration) -> usize {
        self.arrivals.evict(now);
        self.arrivals.len()
    }

    /// Last smoothed rate
    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.arrivals.clear();
        self.smoothed = 0.0;
    }
}

/// Inter-packet timing irregularity from hardware timestamps
#[derive(Debug, Clone)]
pub struct JitterTracker {
    deltas_ms: TimestampWindow<f32>,
    last_timestamp_us: Option<f32>,
}

impl Default for JitterTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JitterTracker {
    pub fn new() -> Self {
        Self {
            deltas_ms: TimestampWindow::new(STATS_WINDOW),
            last_timestamp_us: None,
        }
    }

    /// Record a packet received at `now`
    ///
    /// A delta is only recorded when both this packet and the previous one
    /// carried a hardware timestamp; a packet without one breaks the chain.
    pub fn record(&mut self, now: Duration, timestamp_us: Option<f32>) {
        if let (Some(prev), Some(current)) = (self.last_timestamp_us, timestamp_us) {
            let delta_ms = (current - prev) * 1e-3;
            if delta_ms.is_finite() {
                self.deltas_ms.push(now, delta_ms);
            }
        }
        self.last_timestamp_us = timestamp_us;
    }

    /// Mean absolute deviation of in-window deltas, in milliseconds
    pub fn jitter_ms(&mut self, now: Duration) -> f32 {
        self.deltas_ms.evict(now);
        let n = self.deltas_ms.len();
        if n == 0 {
            return 0.0;
        }
        let mean = self.deltas_ms.values().sum::<f32>() / n as f32;
        self.deltas_ms.values().map(|d| (d - mean).abs()).sum::<f32>() / n as f32
    }

    /// Mean in-window delta, in milliseconds
    pub fn mean_delta_ms(&mut self, now: Duration) -> f32 {
        self.deltas_ms.evict(now);
        let n = self.deltas_ms.len();
        if n == 0 {
            0.0
        } else {
            self.deltas_ms.values().sum::<f32>() / n as f32
        }
    }

    /// Deltas currently retained
    pub fn sample_count(&self) -> usize {
        self.deltas_ms.len()
    }

    pub fn reset(&mut self) {
        self.deltas_ms.clear();
        self.last_timestamp_us = None;
    }
}

/// Point-in-time statistics for display
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Smoothed packets per second
    pub packet_rate: f32,
    /// Packets in the last second, unsmoothed
    pub window_packets: usize,
    /// Mean absolute deviation of hardware-timestamp deltas
    pub jitter_ms: f32,
    /// Mean hardware-timestamp delta
    pub mean_interval_ms: f32,
}

/// Rate and jitter together
#[derive(Debug, Clone)]
pub struct StatsEngine {
    rate: PacketRateTracker,
    jitter: JitterTracker,
}

impl StatsEngine {
    pub fn new(rate_smoothing: f32) -> Self {
        Self {
            rate: PacketRateTracker::new(rate_smoothing),
            jitter: JitterTracker::new(),
        }
    }

    /// Record one packet received at `now`
    pub fn record_packet(&mut self, now: Duration, sample: &RawSample) {
        self.rate.record(now);
        self.jitter.record(now, sample.timestamp_us());
    }

    /// Advance the smoothed rate by one tick
    pub fn tick(&mut self, now: Duration, dt: f32) -> f32 {
        self.rate.update(now, dt)
    }

    /// Current statistics; evicts expired entries first
    pub fn snapshot(&mut self, now: Duration) -> StatsSnapshot {
        StatsSnapshot {
            packet_rate: self.rate.smoothed(),
            window_packets: self.rate.windowed_count(now),
            jitter_ms: self.jitter.jitter_ms(now),
            mean_interval_ms: self.jitter.mean_delta_ms(now),
        }
    }

    pub fn reset(&mut self) {
        self.rate.reset();
        self.jitter.reset();
    }
}

/// Whole-session aggregates reported at shutdown
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub packets: u64,
    last_arrival: Duration,
    intervals_seen: u64,
    /// Arrival-to-arrival intervals after warm-up, in seconds
    pub drain_intervals: IncrementalStats,
    /// Hardware timestamp field, first packet excluded
    pub hw_timestamps: IncrementalStats,
}

impl Default for SessionSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSummary {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            packets: 0,
            last_arrival: Duration::ZERO,
            intervals_seen: 0,
            drain_intervals: IncrementalStats::new(),
            hw_timestamps: IncrementalStats::new(),
        }
    }

    /// Record one packet drained at `now`
    ///
    /// The first interval runs from session start to the first packet.
    pub fn record(&mut self, now: Duration, sample: &RawSample) {
        self.intervals_seen += 1;
        if self.intervals_seen > WARMUP_INTERVALS {
            self.drain_intervals
                .push(now.saturating_sub(self.last_arrival).as_secs_f64());
        }
        self.last_arrival = now;

        if self.packets > 0 {
            if let Some(ts) = sample.timestamp_us() {
                self.hw_timestamps.push(ts as f64);
            }
        }
        self.packets += 1;
    }

    /// Log the summary
    pub fn log(&self) {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        tracing::info!(
            "Session summary: {} packets over {:.1}s (started {})",
            self.packets,
            elapsed.num_milliseconds() as f64 / 1000.0,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if self.drain_intervals.count > 0 {
            let avg = self.drain_intervals.average();
            tracing::info!(
                "Mean read interval (after first {}): {:.4}s ({:.2}ms)",
                WARMUP_INTERVALS,
                avg,
                avg * 1000.0
            );
        }

        if self.hw_timestamps.count > 0 {
            let (min, max, avg) = self.hw_timestamps.as_tuple();
            tracing::info!(
                "Hardware timestamp field: min {:.0}us ({:.3}ms), max {:.0}us ({:.3}ms), mean {:.1}us ({:.3}ms)",
                min,
                min / 1000.0,
                max,
                max / 1000.0,
                avg,
                avg / 1000.0
            );
        } else {
            tracing::info!("No hardware timestamp values received");
        }
    }
}
