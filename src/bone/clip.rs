use super::cache::PoseSnapshot;
use super::pose::Keyframe;
use crate::error::{Result, RigError};
use crate::math::normalized_rotation;
use glam::Quat;
use serde::{Deserialize, Serialize};

// ============================================================================
// Keyframe timeline
// ============================================================================

/// Ordered keyframe slots of one mesh. Slot index is the time in seconds.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
    /// Parallel to `keyframes`
    snapshots: Vec<PoseSnapshot>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Last valid time on this timeline, 0 when fewer than two slots exist
    pub fn max_time(&self) -> f32 {
        self.keyframes.len().saturating_sub(1) as f32
    }

    pub fn keyframe(&self, index: usize) -> &Keyframe {
        &self.keyframes[index]
    }

    pub fn snapshot(&self, index: usize) -> &PoseSnapshot {
        &self.snapshots[index]
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Store `keyframe` at `index`: appends when `index == len`, overwrites
    /// when `index < len`. Any other index panics.
    pub fn put(&mut self, index: usize, keyframe: Keyframe, snapshot: PoseSnapshot) {
        let len = self.keyframes.len();
        if index == len {
            self.keyframes.push(keyframe);
            self.snapshots.push(snapshot);
        } else {
            assert!(index < len, "keyframe slot {index} out of range (len {len})");
            self.keyframes[index] = keyframe;
            self.snapshots[index] = snapshot;
        }
    }

    /// Remove slot `index`, shifting later slots down by one
    pub fn remove(&mut self, index: usize) -> Keyframe {
        self.snapshots.remove(index);
        self.keyframes.remove(index)
    }

    /// The two slots bracketing time `t` and the blend factor between them.
    ///
    /// Returns None when the upper slot does not exist.
    pub fn bracket(&self, t: f32) -> Option<(&Keyframe, &Keyframe, f32)> {
        if !(t >= 0.0) {
            return None;
        }
        let lo = t.floor();
        let hi = t.ceil() as usize;
        if hi >= self.keyframes.len() {
            return None;
        }
        Some((&self.keyframes[lo as usize], &self.keyframes[hi], t - lo))
    }

    /// Serialize the keyframe rotations of a rig with `bone_count` bones to JSON
    pub fn to_json_string(
        &self,
        bone_count: usize,
    ) -> std::result::Result<String, serde_json::Error> {
        let json = TimelineJson {
            version: default_version(),
            bone_count,
            keyframes: self
                .keyframes
                .iter()
                .map(|kf| KeyframeJson {
                    rotations: kf.quats().collect(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&json)
    }

    /// Parse keyframe rotations for a rig with `bone_count` bones.
    ///
    /// Snapshots are left empty; the caller re-derives them by applying each
    /// keyframe to the rig.
    pub fn keyframes_from_json(json: &str, bone_count: usize) -> Result<Vec<Keyframe>> {
        let parsed: TimelineJson = serde_json::from_str(json)?;
        parsed.into_keyframes(bone_count)
    }
}

/// JSON format for a single keyframe
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyframeJson {
    /// Local rotation per bone, xyzw
    pub rotations: Vec<Quat>,
}

/// JSON format for a timeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimelineJson {
    #[serde(default = "default_version")]
    pub version: u32,
    pub bone_count: usize,
    pub keyframes: Vec<KeyframeJson>,
}

impl TimelineJson {
    /// Check bone counts and rotations, then convert to keyframes
    pub fn into_keyframes(self, bone_count: usize) -> Result<Vec<Keyframe>> {
        if self.bone_count != bone_count {
            return Err(RigError::BoneCountMismatch {
                expected: bone_count,
                found: self.bone_count,
            });
        }
        self.keyframes
            .into_iter()
            .enumerate()
            .map(|(keyframe, kf)| {
                if kf.rotations.len() != bone_count {
                    return Err(RigError::BoneCountMismatch {
                        expected: bone_count,
                        found: kf.rotations.len(),
                    });
                }
                let rotations = kf
                    .rotations
                    .into_iter()
                    .enumerate()
                    .map(|(bone, q)| {
                        normalized_rotation(q)
                            .ok_or(RigError::InvalidRotation { keyframe, bone })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Keyframe::from_quats(rotations))
            })
            .collect()
    }
}

fn default_version() -> u32 {
    1
}
