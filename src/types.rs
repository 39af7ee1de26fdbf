//! Core data types for HandLink-RS
//!
//! This module contains the value types shared between the link backend,
//! the processing stages and the pose mapper.
//!
//! # Main Types
//!
//! - [`RawSample`] - One parsed packet: gyro vector, five flex channels, hardware timestamp
//! - [`SampleField`] / [`FieldSet`] - Which tagged fields a packet actually carried
//! - [`Finger`] - Flex channel to finger assignment
//! - [`LinkStatus`] - Health of the byte link as seen by the reader thread
//! - [`IncrementalStats`] - O(1) running min/max/mean

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Number of flex channels on the glove
pub const FLEX_CHANNELS: usize = 5;

/// A single tagged field of the wire packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleField {
    GyroX,
    GyroY,
    GyroZ,
    /// Flex channel by index (0..FLEX_CHANNELS)
    Flex(usize),
    /// Hardware timestamp in microseconds
    Timestamp,
}

impl SampleField {
    fn bit(self) -> u16 {
        match self {
            SampleField::GyroX => 1 << 0,
            SampleField::GyroY => 1 << 1,
            SampleField::GyroZ => 1 << 2,
            SampleField::Flex(i) => 1 << (3 + i.min(FLEX_CHANNELS - 1)),
            SampleField::Timestamp => 1 << 8,
        }
    }
}

/// Set of fields present in a parsed packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSet(u16);

impl FieldSet {
    /// Mark a field as present
    #[inline]
    pub fn insert(&mut self, field: SampleField) {
        self.0 |= field.bit();
    }

    /// Check if a field was present
    #[inline]
    pub fn contains(&self, field: SampleField) -> bool {
        self.0 & field.bit() != 0
    }

    /// Number of distinct fields present
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// True if the packet carried no recognised field at all
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// One parsed sensor packet
///
/// Fields that were missing or unparseable in the packet are zero;
/// [`RawSample::fields`] records which ones were actually present.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawSample {
    /// Angular-rate-like gyro reading (x, y, z)
    pub gyro: Vec3,
    /// Flex channels, indexed by [`Finger::channel`]
    pub flex: [f32; FLEX_CHANNELS],
    /// Hardware timestamp in microseconds (arbitrary epoch)
    pub hw_timestamp_us: f32,
    /// Fields present on the wire
    pub fields: FieldSet,
}

impl RawSample {
    /// Hardware timestamp, if the packet carried one
    pub fn timestamp_us(&self) -> Option<f32> {
        self.fields
            .contains(SampleField::Timestamp)
            .then_some(self.hw_timestamp_us)
    }

    /// A packet with zero valid tokens is a non-event
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Finger driven by a flex channel
///
/// Channel order on the wire is pinky first, thumb last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finger {
    Pinky,
    Ring,
    Middle,
    Index,
    Thumb,
}

impl Finger {
    /// All fingers in wire channel order
    pub const CHANNEL_ORDER: [Finger; FLEX_CHANNELS] = [
        Finger::Pinky,
        Finger::Ring,
        Finger::Middle,
        Finger::Index,
        Finger::Thumb,
    ];

    /// All fingers in display order (thumb first)
    pub const DISPLAY_ORDER: [Finger; FLEX_CHANNELS] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Index of this finger's flex channel
    pub fn channel(self) -> usize {
        match self {
            Finger::Pinky => 0,
            Finger::Ring => 1,
            Finger::Middle => 2,
            Finger::Index => 3,
            Finger::Thumb => 4,
        }
    }

    /// Display name for this finger
    pub fn display_name(self) -> &'static str {
        match self {
            Finger::Pinky => "Pinky",
            Finger::Ring => "Ring",
            Finger::Middle => "Middle",
            Finger::Index => "Index",
            Finger::Thumb => "Thumb",
        }
    }
}

impl std::fmt::Display for Finger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Link health as reported by the reader thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinkStatus {
    /// No link open (connect failed or never attempted)
    #[default]
    Disconnected,
    /// Reader running, last read succeeded or had no data
    Connected,
    /// Consecutive read errors crossed the configured threshold
    Broken,
    /// Reader thread has exited
    Stopped,
}

impl LinkStatus {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            LinkStatus::Disconnected => 0,
            LinkStatus::Connected => 1,
            LinkStatus::Broken => 2,
            LinkStatus::Stopped => 3,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => LinkStatus::Connected,
            2 => LinkStatus::Broken,
            3 => LinkStatus::Stopped,
            _ => LinkStatus::Disconnected,
        }
    }
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Disconnected => write!(f, "Disconnected"),
            LinkStatus::Connected => write!(f, "Connected"),
            LinkStatus::Broken => write!(f, "Broken"),
            LinkStatus::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Incremental statistics that can be updated in O(1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncrementalStats {
    /// Current count of values
    pub count: u64,
    /// Running sum for average calculation
    pub sum: f64,
    /// Current minimum value
    pub min: f64,
    /// Current maximum value
    pub max: f64,
}

impl Default for IncrementalStats {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalStats {
    /// Create a new empty stats tracker
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::MAX,
            max: f64::MIN,
        }
    }

    /// Add a new value to the statistics
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Get the current average
    #[inline]
    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    /// Get statistics as (min, max, avg) tuple
    #[inline]
    pub fn as_tuple(&self) -> (f64, f64, f64) {
        if self.count == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (self.min, self.max, self.average())
        }
    }

    /// Reset the statistics
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
