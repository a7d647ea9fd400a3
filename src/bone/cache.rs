use super::Bone;

/// Flattened world-space pose cached next to each keyframe slot.
///
/// Lets the host draw keyframe thumbnails without re-propagating the rig.
/// Never read back for interpolation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSnapshot {
    /// Joint positions, 3 floats per bone
    pub translations: Vec<f32>,
    /// Joint orientations as xyzw quaternions, 4 floats per bone
    pub rotations: Vec<f32>,
}

impl PoseSnapshot {
    pub fn capture(bones: &[Bone]) -> Self {
        Self {
            translations: flat_translations(bones),
            rotations: flat_rotations(bones),
        }
    }
}

pub fn flat_translations(bones: &[Bone]) -> Vec<f32> {
    let mut out = Vec::with_capacity(bones.len() * 3);
    for bone in bones {
        out.extend_from_slice(&bone.position.to_array());
    }
    out
}

pub fn flat_rotations(bones: &[Bone]) -> Vec<f32> {
    let mut out = Vec::with_capacity(bones.len() * 4);
    for bone in bones {
        out.extend_from_slice(&bone.rotation.to_array());
    }
    out
}
