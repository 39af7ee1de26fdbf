//! Skeleton output port
//!
//! The pose mapper never owns bone transforms. It reads the rig's current
//! rotations and writes new ones through [`SkeletonRig`], which a host
//! (a 3-D engine, a network sink, a test recorder) implements.

use glam::Quat;
use std::collections::HashMap;

/// Host-owned skeleton the mapper drives
///
/// All rotations are local-space unit quaternions.
pub trait SkeletonRig {
    /// Current root orientation
    fn root_rotation(&self) -> Quat;

    /// Current local rotation of a bone, `None` if the rig has no such bone
    fn bone_rotation(&self, bone: &str) -> Option<Quat>;

    /// Compose an incremental rotation onto the root (post-multiplied)
    fn set_root_delta(&mut self, delta: Quat) {
        let next = self.root_rotation() * delta;
        self.set_root_rotation(next);
    }

    /// Replace the root orientation outright
    fn set_root_rotation(&mut self, rotation: Quat);

    /// Set a bone's local rotation; unknown bones are ignored
    fn set_bone_target(&mut self, bone: &str, rotation: Quat);
}

/// In-memory rig for headless runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryRig {
    root: Quat,
    bones: HashMap<String, Quat>,
}

impl MemoryRig {
    /// Rig with an identity root and no bones
    pub fn new() -> Self {
        Self {
            root: Quat::IDENTITY,
            bones: HashMap::new(),
        }
    }

    /// Rig with every named bone at identity
    pub fn with_bones<I, S>(bones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rig = Self::new();
        for bone in bones {
            rig.bones.insert(bone.into(), Quat::IDENTITY);
        }
        rig
    }

    /// Rig with every bone named by `chains`
    pub fn for_chains(chains: &[crate::config::FingerChain]) -> Self {
        Self::with_bones(chains.iter().flat_map(|c| c.bones.iter().cloned()))
    }

    /// Add or overwrite a bone
    pub fn insert_bone(&mut self, bone: impl Into<String>, rotation: Quat) {
        self.bones.insert(bone.into(), rotation);
    }

    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }
}

impl SkeletonRig for MemoryRig {
    fn root_rotation(&self) -> Quat {
        self.root
    }

    fn bone_rotation(&self, bone: &str) -> Option<Quat> {
        self.bones.get(bone).copied()
    }

    fn set_root_rotation(&mut self, rotation: Quat) {
        self.root = rotation;
    }

    fn set_bone_target(&mut self, bone: &str, rotation: Quat) {
        if let Some(slot) = self.bones.get_mut(bone) {
            *slot = rotation;
        }
    }
}
