//! Bones, poses and keyframe storage.
//!
//! A bone carries two transform chains:
//!
//! - **U**: the bind chain, built from joint-to-joint translations only
//! - **D**: the current chain, U interleaved with every ancestor's local rotation `R`
//!
//! World-space `position`, `endpoint` and `rotation` are always decoded from D.

pub mod cache;
pub mod clip;
pub mod id;
pub mod pose;

pub use cache::*;
pub use clip::*;
pub use id::*;
pub use pose::*;

use crate::math::{rotate_onto_z, translation, Mat3, Mat4, Mat4Extended, Quat, Vec3, Vec4};

/// A node of the skeletal hierarchy, stored in the skeleton's arena
#[derive(Debug, Clone)]
pub struct Bone {
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Joint position in world space
    pub position: Vec3,
    /// Tip position in world space
    pub endpoint: Vec3,
    /// World orientation of the joint
    pub rotation: Quat,
    /// Local incremental rotation accumulated by edits
    pub r: Mat3,
    /// Bind translation relative to the parent joint (world for roots)
    pub t: Mat4,
    /// Translation from joint to tip
    pub t_n: Mat4,
    /// Bind chain
    pub u: Mat4,
    /// Current chain
    pub d: Mat4,
    pub local_position: Vec4,
    pub local_endpoint: Vec4,
}

impl Bone {
    /// Bone in its loaded state. Transforms stay identity until
    /// `instantiate_transforms` runs over the hierarchy.
    pub fn from_def(def: &BoneDef) -> Self {
        Self {
            parent: def.parent,
            children: def.children.clone(),
            position: def.position,
            endpoint: def.endpoint,
            rotation: def.rotation,
            r: Mat3::IDENTITY,
            t: Mat4::IDENTITY,
            t_n: Mat4::IDENTITY,
            u: Mat4::IDENTITY,
            d: Mat4::IDENTITY,
            local_position: Vec4::W,
            local_endpoint: Vec4::W,
        }
    }

    /// Joint-to-tip vector in world space
    #[inline]
    pub fn axis(&self) -> Vec3 {
        self.endpoint - self.position
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.axis().length()
    }

    /// Transform from world space into the bone's picking frame: joint at
    /// the origin, bone along +Z, tip at z = 1.
    pub fn uniform_rotate_transform(&self) -> Mat4 {
        let dir = self.axis();
        let scale = Mat4::from_scale(Vec3::new(1.0, 1.0, 1.0 / dir.length()));
        scale * rotate_onto_z(dir) * translation(-self.position)
    }

    /// Recompute D and the world-space decoding from the parent's D
    pub(crate) fn update_world(&mut self, parent_d: Option<&Mat4>) {
        let local = self.t * Mat4::from_mat3(self.r);
        self.d = match parent_d {
            Some(parent_d) => *parent_d * local,
            None => local,
        };
        self.rotation = self.d.rotation_quat();
        self.position = self.d.transform_origin();
        self.endpoint = (self.d * self.t_n).transform_origin();
    }
}

/// Set up bind transforms for `index` and, pre-order, its whole subtree.
///
/// Must be called on roots; a child reads its parent's U, which is only valid
/// once the parent has been visited.
pub fn instantiate_transforms(bones: &mut [Bone], index: usize) {
    let parent = bones[index].parent.map(|p| (bones[p].position, bones[p].u));

    let bone = &mut bones[index];
    bone.t_n = translation(bone.endpoint - bone.position);
    match parent {
        None => {
            bone.t = translation(bone.position);
            bone.u = bone.t;
        }
        Some((parent_position, parent_u)) => {
            bone.t = translation(bone.position - parent_position);
            bone.u = parent_u * bone.t;
        }
    }
    bone.d = bone.u;
    bone.r = Mat3::IDENTITY;

    bone.local_position = bone.u.inverse() * bone.position.extend(1.0);
    bone.local_endpoint = (bone.u * bone.t_n).inverse() * bone.endpoint.extend(1.0);

    let children = bone.children.clone();
    for child in children {
        instantiate_transforms(bones, child);
    }
}
