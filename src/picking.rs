//! Mouse picking and drag-to-rotate against the bone rig.
//!
//! Each bone is approximated by a thin capped cylinder around its
//! joint-to-tip segment. Rays arrive already in world space.

use crate::bone::Bone;
use crate::config::PICK_RADIUS;
use crate::mesh::Mesh;
use glam::{Quat, Vec3, Vec4};
use serde::Serialize;

/// Projected vectors shorter than this are treated as parallel to the view
const DRAG_DEGENERATE_LENGTH: f32 = 1e-3;

/// Below this `dx² + dy²` a local ray runs along the bone axis
const PARALLEL_EPSILON: f32 = 1e-10;

/// Slack on the cap test for rays that start on a cap plane
const CAP_TOLERANCE: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Ray parameter of the nearest hit with `bone`'s picking cylinder
    pub fn intersect_bone(&self, bone: &Bone) -> Option<f32> {
        self.intersect_bone_with_radius(bone, PICK_RADIUS)
    }

    pub fn intersect_bone_with_radius(&self, bone: &Bone, radius: f32) -> Option<f32> {
        if bone.length() < f32::EPSILON {
            return None;
        }
        let to_local = bone.uniform_rotate_transform();
        let origin = to_local * self.origin.extend(1.0);
        let dir = to_local * Vec4::new(self.dir.x, self.dir.y, self.dir.z, 0.0);

        let (px, py) = (origin.x, origin.y);
        let (dx, dy) = (dir.x, dir.y);

        let a = dx * dx + dy * dy;
        let b = 2.0 * (px * dx + py * dy);
        let c = px * px + py * py - radius * radius;

        if a < PARALLEL_EPSILON {
            return if c > 0.0 {
                None
            } else {
                along_axis(origin.z, dir.z)
            };
        }

        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }

        // a > 0, so t1 <= t2: the smaller root is tried first
        let sqrt_d = discriminant.sqrt();
        let t1 = (-b - sqrt_d) / (2.0 * a);
        let t2 = (-b + sqrt_d) / (2.0 * a);

        [t1, t2]
            .into_iter()
            .find(|&t| t >= 0.0 && (0.0..=1.0).contains(&(origin.z + dir.z * t)))
    }

    /// Where the ray meets the plane through `point` with normal `normal`
    pub fn intersect_plane(&self, normal: Vec3, point: Vec3) -> Option<Vec3> {
        let denom = normal.dot(self.dir);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        let t = normal.dot(point - self.origin) / denom;
        Some(self.at(t))
    }
}

/// First `t >= 0` at which a ray running inside the cylinder has local z in `[0, 1]`
fn along_axis(origin_z: f32, dir_z: f32) -> Option<f32> {
    if (-CAP_TOLERANCE..=1.0 + CAP_TOLERANCE).contains(&origin_z) {
        return Some(0.0);
    }
    if dir_z.abs() < f32::EPSILON {
        return None;
    }
    let cap = if origin_z < 0.0 { 0.0 } else { 1.0 };
    let t = (cap - origin_z) / dir_z;
    (t >= 0.0).then_some(t)
}

/// The single bone currently under edit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    pub mesh: usize,
    pub bone: usize,
    /// Running index over the bones of all meshes, for highlighting
    pub flat: usize,
    /// Ray parameter of the hit
    pub t: f32,
}

/// Nearest bone hit by `ray` across all meshes; the first bone found wins ties
pub fn pick(meshes: &[Mesh], ray: &Ray, radius: f32) -> Option<Selection> {
    let mut best: Option<Selection> = None;
    let mut flat = 0;
    for (mesh_index, mesh) in meshes.iter().enumerate() {
        for (bone_index, bone) in mesh.skeleton().bones().iter().enumerate() {
            if let Some(t) = ray.intersect_bone_with_radius(bone, radius) {
                if best.is_none_or(|b| t < b.t) {
                    best = Some(Selection {
                        mesh: mesh_index,
                        bone: bone_index,
                        flat,
                        t,
                    });
                }
            }
            flat += 1;
        }
    }
    log::debug!("Pick result: {:?}", best);
    best
}

/// Incremental rotation that swings `bone` toward the cursor during a drag.
///
/// `ray` and `prev_ray` are the cursor rays of this and the previous mouse
/// event. The target is the point on `ray` closest to the bone joint's
/// projection onto the plane spanned by the two rays. The bone turns about
/// `view_forward` by at most `max_step` radians. When either direction is
/// nearly parallel to the view axis the rotation falls back to the bone axis.
pub fn drag_rotation(
    bone: &Bone,
    ray: &Ray,
    prev_ray: &Ray,
    view_forward: Vec3,
    max_step: f32,
) -> Option<Quat> {
    let plane_normal = ray.dir.cross(prev_ray.dir).normalize_or_zero();
    if plane_normal == Vec3::ZERO {
        return None;
    }

    let joint = bone.position;
    let dist = (joint - ray.origin).dot(plane_normal);
    let on_plane = joint - plane_normal * dist;
    let dir = ray.dir.normalize();
    let target = ray.at((on_plane - ray.origin).dot(dir) / ray.dir.length());

    let forward = view_forward.normalize();
    let to_target = (target - joint).normalize_or_zero();
    let bone_dir = bone.axis().normalize_or_zero();
    let target_flat = to_target - forward * to_target.dot(forward);
    let bone_flat = bone_dir - forward * bone_dir.dot(forward);

    if target_flat.length() < DRAG_DEGENERATE_LENGTH || bone_flat.length() < DRAG_DEGENERATE_LENGTH {
        if bone_dir == Vec3::ZERO {
            return None;
        }
        let cos = target_flat
            .normalize_or_zero()
            .dot(bone_flat.normalize_or_zero())
            .clamp(-1.0, 1.0);
        return Some(Quat::from_axis_angle(bone_dir, cos.acos()).normalize());
    }

    let a = target_flat.normalize();
    let b = bone_flat.normalize();
    let angle = a.dot(b).clamp(-1.0, 1.0).acos();
    let sign = if b.cross(a).dot(forward) < 0.0 { -1.0 } else { 1.0 };
    let step = sign * angle.min(max_step);
    Some(Quat::from_axis_angle(forward, step).normalize())
}
