//! In-memory links for testing and running without hardware
//!
//! - [`ScriptedLink`] replays a fixed sequence of bytes, idle polls and
//!   errors. Once the script runs out it reports "no data" forever.
//! - [`SyntheticGlove`] generates well-formed packets from per-channel
//!   patterns at a fixed rate, with a hardware timestamp that advances by
//!   the nominal packet period plus optional jitter.
//!
//! # Example
//!
//! ```ignore
//! use handlink_rs::backend::{ScriptedLink, SyntheticGlove, SignalPattern};
//!
//! let link = ScriptedLink::new()
//!     .bytes(b"A1.0,T100#")
//!     .error("cable wiggle")
//!     .bytes(b"A2.0,T200#");
//!
//! let glove = SyntheticGlove::new(100.0)
//!     .with_flex_pattern(0, SignalPattern::Sine { frequency: 0.5, amplitude: 400.0, offset: 500.0 });
//! ```

use crate::error::{HandLinkError, Result};
use crate::types::FLEX_CHANNELS;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::framer::PACKET_TERMINATOR;
use super::link::ByteLink;

/// One scripted link event
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScriptStep {
    Byte(u8),
    Idle,
    Error(String),
}

/// Link that replays a script of bytes, idle polls and errors
#[derive(Debug, Default)]
pub struct ScriptedLink {
    steps: VecDeque<ScriptStep>,
}

impl ScriptedLink {
    /// Create an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Script that yields exactly these bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new().bytes(bytes)
    }

    /// Append bytes
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.steps.extend(bytes.iter().map(|&b| ScriptStep::Byte(b)));
        self
    }

    /// Append `count` polls that report no data
    pub fn idle(mut self, count: usize) -> Self {
        self.steps
            .extend(std::iter::repeat(ScriptStep::Idle).take(count));
        self
    }

    /// Append a read error
    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.steps.push_back(ScriptStep::Error(message.into()));
        self
    }

    /// Steps left in the script
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl ByteLink for ScriptedLink {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        match self.steps.pop_front() {
            Some(ScriptStep::Byte(b)) => Ok(Some(b)),
            Some(ScriptStep::Idle) | None => Ok(None),
            Some(ScriptStep::Error(message)) => Err(HandLinkError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                message,
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("scripted ({} steps left)", self.steps.len())
    }
}

/// Pattern for generating one synthetic channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalPattern {
    /// Constant value
    Constant(f32),
    /// Sine wave
    Sine {
        frequency: f32,
        amplitude: f32,
        offset: f32,
    },
    /// Triangle wave between `min` and `max`
    Triangle { period: f32, min: f32, max: f32 },
}

impl SignalPattern {
    /// Value at `t` seconds
    pub fn sample(&self, t: f32) -> f32 {
        match *self {
            SignalPattern::Constant(v) => v,
            SignalPattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (std::f32::consts::TAU * frequency * t).sin(),
            SignalPattern::Triangle { period, min, max } => {
                if period <= 0.0 {
                    return min;
                }
                let phase = (t % period) / period;
                let ramp = if phase < 0.5 { phase * 2.0 } else { 2.0 - phase * 2.0 };
                min + (max - min) * ramp
            }
        }
    }
}

/// Simple pseudo-random number generator (no external dependency)
fn rand_simple(seed: &mut u64) -> f32 {
    let mut s = *seed;
    s ^= s << 13;
    s ^= s >> 7;
    s ^= s << 17;
    *seed = s;
    (s as f64 / u64::MAX as f64) as f32
}

/// Link that synthesises glove packets at a fixed rate
#[derive(Debug)]
pub struct SyntheticGlove {
    rate_hz: f32,
    gyro: [SignalPattern; 3],
    flex: [SignalPattern; FLEX_CHANNELS],
    /// Peak deviation of the hardware timestamp from the nominal period (us)
    timestamp_jitter_us: f32,
    seed: u64,
    start: Instant,
    next_due: Duration,
    packets_sent: u64,
    hw_clock_us: f32,
    pending: VecDeque<u8>,
}

impl SyntheticGlove {
    /// Create a glove that emits `rate_hz` packets per second
    pub fn new(rate_hz: f32) -> Self {
        let flex = std::array::from_fn(|i| SignalPattern::Triangle {
            period: 2.0 + i as f32 * 0.5,
            min: 0.0,
            max: 1023.0,
        });
        Self {
            rate_hz: rate_hz.max(1.0),
            gyro: [
                SignalPattern::Sine {
                    frequency: 0.2,
                    amplitude: 30.0,
                    offset: 0.0,
                },
                SignalPattern::Sine {
                    frequency: 0.3,
                    amplitude: 20.0,
                    offset: 0.0,
                },
                SignalPattern::Constant(0.5),
            ],
            flex,
            timestamp_jitter_us: 0.0,
            seed: 12345,
            start: Instant::now(),
            next_due: Duration::ZERO,
            packets_sent: 0,
            hw_clock_us: 0.0,
            pending: VecDeque::new(),
        }
    }

    /// Set the pattern of one gyro axis (0 = x, 1 = y, 2 = z)
    pub fn with_gyro_pattern(mut self, axis: usize, pattern: SignalPattern) -> Self {
        if let Some(slot) = self.gyro.get_mut(axis) {
            *slot = pattern;
        }
        self
    }

    /// Set the pattern of one flex channel
    pub fn with_flex_pattern(mut self, channel: usize, pattern: SignalPattern) -> Self {
        if let Some(slot) = self.flex.get_mut(channel) {
            *slot = pattern;
        }
        self
    }

    /// Add uniform jitter to the hardware timestamp
    pub fn with_timestamp_jitter(mut self, jitter_us: f32) -> Self {
        self.timestamp_jitter_us = jitter_us.max(0.0);
        self
    }

    /// Packets produced so far
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Render the packet for simulated time `t`
    fn render_packet(&mut self, t: f32) -> String {
        let period_us = 1_000_000.0 / self.rate_hz;
        let jitter = if self.timestamp_jitter_us > 0.0 {
            (rand_simple(&mut self.seed) - 0.5) * 2.0 * self.timestamp_jitter_us
        } else {
            0.0
        };
        self.hw_clock_us += period_us + jitter;

        let g: [f32; 3] = std::array::from_fn(|i| self.gyro[i].sample(t));
        let f: [f32; FLEX_CHANNELS] = std::array::from_fn(|i| self.flex[i].sample(t));

        format!(
            "A{:.3},B{:.3},C{:.3},D{:.0},E{:.0},F{:.0},G{:.0},H{:.0},T{:.0}",
            g[0], g[1], g[2], f[0], f[1], f[2], f[3], f[4], self.hw_clock_us
        )
    }
}

impl ByteLink for SyntheticGlove {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.pending.is_empty() {
            let elapsed = self.start.elapsed();
            if elapsed < self.next_due {
                return Ok(None);
            }
            let t = self.next_due.as_secs_f32();
            let packet = self.render_packet(t);
            self.pending.extend(packet.bytes());
            self.pending.push_back(PACKET_TERMINATOR);
            self.packets_sent += 1;
            self.next_due += Duration::from_secs_f32(1.0 / self.rate_hz);
        }
        Ok(self.pending.pop_front())
    }

    fn describe(&self) -> String {
        format!("synthetic glove @ {:.0} Hz", self.rate_hz)
    }
}
