//! Rig Editor - Wasm Core
//!
//! Bone hierarchy, ray picking and keyframe playback for a browser-hosted
//! skeletal pose editor. Rendering stays on the JS side; this crate hands it
//! flat column-major buffers.

pub mod animation;
pub mod bone;
pub mod config;
#[cfg(target_arch = "wasm32")]
pub mod editor;
pub mod error;
mod math;
pub mod mesh;
pub mod picking;
pub mod skeleton;
pub mod state;

/// Squared lengths below this count as zero-length bones
pub const EPSILON: f32 = 1e-6;

pub use animation::{AnimationClock, Mode};
pub use bone::{Bone, BoneDef, Keyframe, SkeletonDef, Timeline};
pub use config::EditorConfig;
pub use error::{Result, RigError};
pub use math::{Mat3, Mat4, Mat4Extended, Quat, Vec3};
pub use mesh::Mesh;
pub use picking::{Ray, Selection};
pub use skeleton::{BoneBuffers, Skeleton};
pub use state::SceneState;

#[cfg(target_arch = "wasm32")]
pub use editor::*;
