//! Skeleton actuation
//!
//! - [`rig`] - The [`SkeletonRig`] output port and an in-memory rig
//! - [`mapper`] - Gyro to root delta, flex to joint targets
//! - [`calibration`] - Startup baseline and edge-triggered reset

pub mod calibration;
pub mod mapper;
pub mod rig;

pub use calibration::{Calibration, CalibrationTrigger};
pub use mapper::{
    euler_degrees, flex_to_angle, map_axis, mapped_rates, select_rate, step_joint,
    to_euler_degrees, JointBaseline, JointRate, PoseMapper,
};
pub use rig::{MemoryRig, SkeletonRig};
