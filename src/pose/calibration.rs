//! Calibration control
//!
//! The root orientation captured at startup is the reference every reset
//! returns to. A reset is a momentary command, not a state: it replaces the
//! live root rotation and touches nothing else.

use crate::pose::rig::SkeletonRig;
use glam::Quat;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Startup root orientation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Calibration {
    baseline: Option<Quat>,
}

impl Calibration {
    /// No baseline yet; resets are no-ops
    pub fn new() -> Self {
        Self { baseline: None }
    }

    /// Capture the rig's current root orientation as the baseline
    pub fn capture(rig: &dyn SkeletonRig) -> Self {
        Self {
            baseline: Some(rig.root_rotation()),
        }
    }

    pub fn baseline(&self) -> Option<Quat> {
        self.baseline
    }

    /// Restore the baseline; returns false if none was captured
    pub fn reset(&self, rig: &mut dyn SkeletonRig) -> bool {
        match self.baseline {
            Some(baseline) => {
                rig.set_root_rotation(baseline);
                tracing::info!("Orientation reset to calibration baseline");
                true
            }
            None => {
                tracing::debug!("Calibration reset ignored: no baseline captured");
                false
            }
        }
    }
}

/// Edge-triggered reset request, safe to fire from any thread
#[derive(Debug, Clone, Default)]
pub struct CalibrationTrigger {
    pending: Arc<AtomicBool>,
}

impl CalibrationTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a reset on the next tick
    pub fn fire(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume a pending request
    ///
    /// Several `fire` calls between two ticks collapse into one reset.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}
