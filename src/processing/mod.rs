//! Per-packet processing stages
//!
//! - [`parser`] - Tagged-token packet text to [`RawSample`](crate::types::RawSample)
//! - [`filter`] - Exponential smoothing of gyro and flex channels
//! - [`stats`] - Windowed packet rate and jitter, plus the session summary

pub mod filter;
pub mod parser;
pub mod stats;

pub use filter::{ExponentialSmoother, FilterEngine, FilterState};
pub use parser::{field_for_tag, parse_packet};
pub use stats::{
    JitterTracker, PacketRateTracker, SessionSummary, StatsEngine, StatsSnapshot, TimestampWindow,
    STATS_WINDOW, WARMUP_INTERVALS,
};
