//! Filter engine
//!
//! Single-pole exponential smoothing, `y <- y + alpha * (x - y)`, applied
//! once per parsed packet. Convergence speed is therefore tied to the packet
//! rate, not to the tick rate.
//!
//! The gyro channel treats an exact `(0, 0, 0)` reading as a dropout marker
//! and keeps smoothing toward the previous raw reference. Flex channels have
//! no such rule; zero is a valid bend reading.

use crate::config::FilterConfig;
use crate::types::{RawSample, FLEX_CHANNELS};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One-parameter recursive low-pass filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialSmoother {
    alpha: f32,
}

impl ExponentialSmoother {
    /// Create a smoother; `alpha` is clamped into (0, 1]
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_finite() {
            alpha.clamp(f32::EPSILON, 1.0)
        } else {
            1.0
        };
        Self { alpha }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Move `current` toward `target`
    #[inline]
    pub fn step(&self, current: f32, target: f32) -> f32 {
        current + self.alpha * (target - current)
    }

    /// Per-component step for a vector
    #[inline]
    pub fn step_vec3(&self, current: Vec3, target: Vec3) -> Vec3 {
        current + self.alpha * (target - current)
    }
}

/// Smoothed estimates of every channel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    /// Last accepted raw gyro reading (held across dropouts)
    pub gyro_raw: Vec3,
    pub gyro_filtered: Vec3,
    /// Last raw flex readings
    pub flex_raw: [f32; FLEX_CHANNELS],
    pub flex_filtered: [f32; FLEX_CHANNELS],
}

/// Maintains [`FilterState`] from incoming samples
#[derive(Debug, Clone)]
pub struct FilterEngine {
    gyro: ExponentialSmoother,
    flex: ExponentialSmoother,
    state: FilterState,
    dropouts: u64,
}

impl FilterEngine {
    /// Create with all channels at zero
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            gyro: ExponentialSmoother::new(config.gyro_alpha),
            flex: ExponentialSmoother::new(config.flex_alpha),
            state: FilterState::default(),
            dropouts: 0,
        }
    }

    /// Fold one sample into the state
    pub fn update(&mut self, sample: &RawSample) {
        if sample.gyro == Vec3::ZERO {
            self.dropouts += 1;
        } else {
            self.state.gyro_raw = sample.gyro;
        }
        self.state.gyro_filtered = self
            .gyro
            .step_vec3(self.state.gyro_filtered, self.state.gyro_raw);

        self.state.flex_raw = sample.flex;
        for (filtered, &raw) in self.state.flex_filtered.iter_mut().zip(&sample.flex) {
            *filtered = self.flex.step(*filtered, raw);
        }
    }

    /// Current state
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Number of all-zero gyro readings held over
    pub fn dropouts(&self) -> u64 {
        self.dropouts
    }

    /// Return every channel to zero
    pub fn reset(&mut self) {
        self.state = FilterState::default();
        self.dropouts = 0;
    }
}
