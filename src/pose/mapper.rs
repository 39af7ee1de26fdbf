//! Pose mapper
//!
//! Turns filtered signals into rig actuation once per tick:
//!
//! - The filtered gyro vector is remapped onto pitch/yaw/roll, scaled by
//!   `rotation_scale * dt` and post-multiplied onto the root as an Euler
//!   delta. This is an open-loop integrator; drift is corrected only by
//!   calibration.
//! - Each filtered flex value is clamped to the configured input range and
//!   mapped linearly onto `[0, max_angle_deg]`. Every bone in the finger's
//!   chain is slerped toward `baseline * Rx(angle)`.
//!
//! Joint interpolation is asymmetric: if the bone is not already at the
//! target and the target is less bent than the bone currently is, the
//! slower relax rate applies; every other case, including the exact tie,
//! uses the flex rate.

use crate::config::{AppConfig, AxisConfig, AxisSource, FingerChain, FlexConfig, ImuAxis};
use crate::pose::rig::SkeletonRig;
use crate::processing::FilterState;
use crate::types::{Finger, FLEX_CHANNELS};
use glam::{EulerRot, Quat, Vec3};

/// Read one logical axis from a gyro vector
#[inline]
pub fn map_axis(gyro: Vec3, axis: AxisSource) -> f32 {
    let value = match axis.source {
        ImuAxis::X => gyro.x,
        ImuAxis::Y => gyro.y,
        ImuAxis::Z => gyro.z,
    };
    if axis.invert {
        -value
    } else {
        value
    }
}

/// Remap a gyro vector to (pitch, yaw, roll)
pub fn mapped_rates(gyro: Vec3, axes: &AxisConfig) -> Vec3 {
    Vec3::new(
        map_axis(gyro, axes.pitch),
        map_axis(gyro, axes.yaw),
        map_axis(gyro, axes.roll),
    )
}

/// Rotation from Euler degrees (pitch about X, yaw about Y, roll about Z)
///
/// Roll is applied first, then pitch, then yaw.
#[inline]
pub fn euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        degrees.y.to_radians(),
        degrees.x.to_radians(),
        degrees.z.to_radians(),
    )
}

/// Inverse of [`euler_degrees`], each angle wrapped into (-180, 180]
pub fn to_euler_degrees(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(
        wrap_degrees(pitch.to_degrees()),
        wrap_degrees(yaw.to_degrees()),
        wrap_degrees(roll.to_degrees()),
    )
}

fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Map a flex reading to a bend angle in degrees
pub fn flex_to_angle(value: f32, flex: &FlexConfig) -> f32 {
    let span = flex.max - flex.min;
    if span <= 0.0 {
        return 0.0;
    }
    let t = (value.clamp(flex.min, flex.max) - flex.min) / span;
    t * flex.max_angle_deg
}

/// Dot products above this count as the same rotation
const SAME_ROTATION_DOT: f32 = 1.0 - 1e-6;

/// Angle between two rotations in degrees, exactly zero for equal rotations
#[inline]
fn angle_deg(a: Quat, b: Quat) -> f32 {
    let dot = a.dot(b).abs().min(1.0);
    if dot > SAME_ROTATION_DOT {
        0.0
    } else {
        (dot.acos() * 2.0).to_degrees()
    }
}

/// Which interpolation rate a joint uses this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointRate {
    Flex,
    Relax,
}

/// Pick the rate for a bone moving toward `target_angle` degrees of bend
pub fn select_rate(baseline: Quat, current: Quat, target_angle: f32) -> JointRate {
    let target = baseline * Quat::from_rotation_x(target_angle.to_radians());
    let remaining = angle_deg(current, target);
    let current_bend = angle_deg(baseline, current);
    if remaining > 0.0 && target_angle < current_bend {
        JointRate::Relax
    } else {
        JointRate::Flex
    }
}

/// One interpolation step of a bone toward `target_angle`
pub fn step_joint(
    baseline: Quat,
    current: Quat,
    target_angle: f32,
    flex: &FlexConfig,
    dt: f32,
) -> Quat {
    let target = baseline * Quat::from_rotation_x(target_angle.to_radians());
    let rate = match select_rate(baseline, current, target_angle) {
        JointRate::Flex => flex.flex_rate,
        JointRate::Relax => flex.relax_rate,
    };
    let t = (rate * dt).clamp(0.0, 1.0);
    current.slerp(target, t)
}

/// Startup rotations of every mapped bone
#[derive(Debug, Clone, Default)]
pub struct JointBaseline {
    fingers: Vec<(Finger, Vec<(String, Quat)>)>,
}

impl JointBaseline {
    /// Record the rig's current bone rotations for every chain
    ///
    /// Bones the rig does not know are left out.
    pub fn capture(rig: &dyn SkeletonRig, chains: &[FingerChain]) -> Self {
        let mut fingers = Vec::with_capacity(chains.len());
        for chain in chains {
            let mut bones = Vec::with_capacity(chain.bones.len());
            for bone in &chain.bones {
                match rig.bone_rotation(bone) {
                    Some(rotation) => bones.push((bone.clone(), rotation)),
                    None => tracing::warn!("Rig has no bone '{}' for {}", bone, chain.finger),
                }
            }
            fingers.push((chain.finger, bones));
        }
        Self { fingers }
    }

    /// Baseline of one bone
    pub fn bone(&self, name: &str) -> Option<Quat> {
        self.fingers
            .iter()
            .flat_map(|(_, bones)| bones.iter())
            .find(|(bone, _)| bone == name)
            .map(|(_, q)| *q)
    }

    /// Number of captured bones
    pub fn len(&self) -> usize {
        self.fingers.iter().map(|(_, bones)| bones.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drives the root and finger bones from filtered signals
#[derive(Debug, Clone)]
pub struct PoseMapper {
    axes: AxisConfig,
    flex: FlexConfig,
    baseline: JointBaseline,
}

impl PoseMapper {
    /// Create a mapper, capturing bone baselines from `rig`
    pub fn new(config: &AppConfig, rig: &dyn SkeletonRig) -> Self {
        let baseline = JointBaseline::capture(rig, &config.fingers);
        tracing::debug!("Captured baseline for {} bones", baseline.len());
        Self {
            axes: config.axes,
            flex: config.flex,
            baseline,
        }
    }

    pub fn baseline(&self) -> &JointBaseline {
        &self.baseline
    }

    /// Root rotation increment for one tick of `dt` seconds
    pub fn orientation_delta(&self, gyro: Vec3, dt: f32) -> Quat {
        euler_degrees(mapped_rates(gyro, &self.axes) * self.axes.rotation_scale * dt)
    }

    /// Target bend per finger, in wire channel order
    pub fn finger_angles(&self, state: &FilterState) -> [f32; FLEX_CHANNELS] {
        state.flex_filtered.map(|v| flex_to_angle(v, &self.flex))
    }

    /// Apply one tick to the rig
    pub fn apply(&self, state: &FilterState, dt: f32, rig: &mut dyn SkeletonRig) {
        self.apply_root(state, dt, rig);
        self.apply_joints(state, dt, rig);
    }

    /// Integrate one tick of filtered gyro into the root
    pub fn apply_root(&self, state: &FilterState, dt: f32, rig: &mut dyn SkeletonRig) {
        rig.set_root_delta(self.orientation_delta(state.gyro_filtered, dt));
    }

    /// Step every mapped bone toward its flex target
    pub fn apply_joints(&self, state: &FilterState, dt: f32, rig: &mut dyn SkeletonRig) {
        let angles = self.finger_angles(state);
        for (finger, bones) in &self.baseline.fingers {
            let angle = angles[finger.channel()];
            for (bone, base) in bones {
                let Some(current) = rig.bone_rotation(bone) else {
                    continue;
                };
                rig.set_bone_target(bone, step_joint(*base, current, angle, &self.flex, dt));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::rig::MemoryRig;

    const DT: f32 = 1.0 / 60.0;

    fn flex_config() -> FlexConfig {
        FlexConfig::default()
    }

    #[test]
    fn test_axis_mapping_and_inversion() {
        let gyro = Vec3::new(1.0, 2.0, 3.0);
        let rates = mapped_rates(gyro, &AxisConfig::default());
        // pitch <- -Y, yaw <- X, roll <- -Z
        assert_eq!(rates, Vec3::new(-2.0, 1.0, -3.0));
    }

    #[test]
    fn test_euler_matches_single_axis_rotations() {
        let q = euler_degrees(Vec3::new(0.0, 90.0, 0.0));
        assert!(q.abs_diff_eq(Quat::from_rotation_y(90f32.to_radians()), 1e-6));

        let q = euler_degrees(Vec3::new(30.0, 40.0, 50.0));
        let expected = Quat::from_rotation_y(40f32.to_radians())
            * Quat::from_rotation_x(30f32.to_radians())
            * Quat::from_rotation_z(50f32.to_radians());
        assert!(q.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_euler_round_trip_is_signed() {
        let angles = to_euler_degrees(euler_degrees(Vec3::new(-20.0, -170.0, 45.0)));
        assert!((angles - Vec3::new(-20.0, -170.0, 45.0)).abs().max_element() < 1e-3);
    }

    #[test]
    fn test_flex_to_angle_clamps() {
        let flex = flex_config();
        assert_eq!(flex_to_angle(-50.0, &flex), 0.0);
        assert_eq!(flex_to_angle(0.0, &flex), 0.0);
        assert!((flex_to_angle(511.5, &flex) - 45.0).abs() < 1e-4);
        assert_eq!(flex_to_angle(5000.0, &flex), 90.0);
    }

    #[test]
    fn test_orientation_delta_integrates_rate() {
        let config = AppConfig::default();
        let mapper = PoseMapper::new(&config, &MemoryRig::new());

        // X feeds yaw un-inverted: 60 deg/s for one second in 60 ticks
        let mut rig = MemoryRig::new();
        for _ in 0..60 {
            rig.set_root_delta(mapper.orientation_delta(Vec3::new(60.0, 0.0, 0.0), DT));
        }
        let euler = to_euler_degrees(rig.root_rotation());
        assert!((euler.y - 60.0).abs() < 1e-2, "yaw {}", euler.y);
    }

    #[test]
    fn test_rate_selection() {
        let base = Quat::IDENTITY;
        let bent = Quat::from_rotation_x(60f32.to_radians());

        assert_eq!(select_rate(base, base, 45.0), JointRate::Flex);
        assert_eq!(select_rate(base, bent, 10.0), JointRate::Relax);
        // Further bend from an already bent pose
        assert_eq!(select_rate(base, bent, 80.0), JointRate::Flex);
        // Baseline tie: nothing to relax toward
        assert_eq!(select_rate(base, base, 0.0), JointRate::Flex);
    }

    #[test]
    fn test_target_at_current_pose_uses_flex_rate() {
        let rotated = Quat::from_euler(EulerRot::YXZ, 0.7, -0.4, 0.25);
        for base in [Quat::IDENTITY, rotated] {
            for deg in 1..=90 {
                let angle = deg as f32;
                let current = base * Quat::from_rotation_x(angle.to_radians());
                assert_eq!(
                    select_rate(base, current, angle),
                    JointRate::Flex,
                    "tie at {angle} deg from {base:?}"
                );
            }
        }
    }

    #[test]
    fn test_equal_rotations_have_zero_angle() {
        let q = Quat::from_euler(EulerRot::YXZ, 0.3, 1.1, -0.6);
        assert_eq!(angle_deg(q, q), 0.0);
        assert_eq!(angle_deg(q, -q), 0.0);
        assert!((angle_deg(Quat::IDENTITY, Quat::from_rotation_x(0.5)) - 0.5f32.to_degrees()).abs() < 1e-2);
    }

    #[test]
    fn test_closing_is_faster_than_opening() {
        let flex = flex_config();
        let base = Quat::IDENTITY;

        // Closing: baseline -> 60 degrees
        let closed = step_joint(base, base, 60.0, &flex, DT);
        let closing_progress = angle_deg(base, closed);

        // Opening: 60 degrees -> baseline
        let start = Quat::from_rotation_x(60f32.to_radians());
        let opened = step_joint(base, start, 0.0, &flex, DT);
        let opening_progress = angle_deg(start, opened);

        assert!((closing_progress - 60.0 * flex.flex_rate * DT).abs() < 1e-2);
        assert!((opening_progress - 60.0 * flex.relax_rate * DT).abs() < 1e-2);
        assert!(closing_progress > opening_progress);
    }

    #[test]
    fn test_large_dt_does_not_overshoot() {
        let flex = flex_config();
        let q = step_joint(Quat::IDENTITY, Quat::IDENTITY, 30.0, &flex, 5.0);
        assert!(q.abs_diff_eq(Quat::from_rotation_x(30f32.to_radians()), 1e-5));
    }

    #[test]
    fn test_apply_drives_chain_from_baseline() {
        let config = AppConfig::default();
        let mut rig = MemoryRig::for_chains(&config.fingers);
        let base = Quat::from_rotation_z(0.25);
        rig.insert_bone("index.02", base);

        let mapper = PoseMapper::new(&config, &rig);
        assert_eq!(mapper.baseline().len(), 15);
        assert_eq!(mapper.baseline().bone("index.02"), Some(base));

        let mut state = FilterState::default();
        state.flex_filtered[Finger::Index.channel()] = config.flex.max;

        for _ in 0..300 {
            mapper.apply(&state, DT, &mut rig);
        }

        let target = base * Quat::from_rotation_x(config.flex.max_angle_deg.to_radians());
        let bone = rig.bone_rotation("index.02").unwrap_or_default();
        assert!(angle_deg(bone, target) < 0.1);

        // Untouched finger stays at baseline
        let pinky = rig.bone_rotation("pinky.01").unwrap_or_default();
        assert!(angle_deg(pinky, Quat::IDENTITY) < 1e-3);
    }

    #[test]
    fn test_missing_bones_are_skipped() {
        let config = AppConfig::default();
        let mut rig = MemoryRig::with_bones(["thumb.01"]);
        let mapper = PoseMapper::new(&config, &rig);
        assert_eq!(mapper.baseline().len(), 1);

        let state = FilterState::default();
        mapper.apply(&state, DT, &mut rig);
        assert_eq!(rig.bone_count(), 1);
    }
}
