//! Skeleton: the bone arena of one mesh.
//!
//! Bones reference each other by index only. Edits go through `rotate_bone`
//! and `roll_bone`, which re-propagate the edited subtree before returning,
//! so every public field is consistent whenever control is back with the caller.

use crate::bone::{flat_rotations, flat_translations, instantiate_transforms, Bone, SkeletonDef};
use crate::error::Result;
use crate::math::{flatten_mat4, Mat3, Mat4, Mat4Extended, Quat};
use crate::EPSILON;

/// Read-only view the renderer pulls per-bone data from.
///
/// Matrices are column-major, 16 floats per bone; quaternions are xyzw.
pub trait BoneBuffers {
    fn bone_translations(&self) -> Vec<f32>;
    fn bone_rotations(&self) -> Vec<f32>;
    fn d_matrices(&self) -> Vec<f32>;
    /// Inverse bind chains, so the shader can go from world to bind-local space
    fn inv_u_matrices(&self) -> Vec<f32>;
}

#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
    roots: Vec<usize>,
}

impl Skeleton {
    /// Build the bind pose from a loader description
    pub fn from_def(def: &SkeletonDef) -> Result<Self> {
        def.validate()?;

        let mut bones: Vec<Bone> = def.bones.iter().map(Bone::from_def).collect();
        let roots = def.roots();
        for &root in &roots {
            instantiate_transforms(&mut bones, root);
        }
        let mut skeleton = Self { bones, roots };
        // Loader orientations are replaced by the decoding of D
        skeleton.propagate_all();

        log::info!(
            "Skeleton bound: {} bones, {} roots",
            skeleton.bones.len(),
            skeleton.roots.len()
        );
        Ok(skeleton)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> &Bone {
        &self.bones[index]
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Pre-multiply bone `index`'s local rotation by `delta`
    pub fn rotate_bone(&mut self, index: usize, delta: Quat) {
        let bone = &mut self.bones[index];
        bone.r = Mat3::from_quat(delta) * bone.r;
        self.propagate_rot(index);
    }

    /// Twist bone `index` about its own joint-to-tip axis by `theta` radians.
    ///
    /// `R` lives in the parent's rotated frame, so the world axis is carried
    /// back into that frame first; otherwise a roll under a rotated parent
    /// would swing the bone instead of twisting it.
    pub fn roll_bone(&mut self, index: usize, theta: f32) {
        let axis = self.bones[index].axis();
        if axis.length_squared() < EPSILON {
            log::debug!("Skipping roll of zero-length bone {}", index);
            return;
        }
        let parent_rotation = self.bones[index]
            .parent
            .map_or(Quat::IDENTITY, |p| self.bones[p].d.rotation_quat());
        let local_axis = (parent_rotation.inverse() * axis).normalize();
        self.rotate_bone(index, Quat::from_axis_angle(local_axis, theta));
    }

    /// Overwrite local rotations for every bone and re-propagate from the roots
    pub fn set_local_rotations(&mut self, rotations: impl IntoIterator<Item = Mat3>) {
        for (bone, r) in self.bones.iter_mut().zip(rotations) {
            bone.r = r;
        }
        self.propagate_all();
    }

    /// Recompute D and the world decoding for `index` and all its descendants.
    ///
    /// Bones outside the subtree are not touched.
    pub fn propagate_rot(&mut self, index: usize) {
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            let parent_d = self.bones[current].parent.map(|p| self.bones[p].d);
            let bone = &mut self.bones[current];
            bone.update_world(parent_d.as_ref());
            stack.extend_from_slice(&bone.children);
        }
    }

    pub fn propagate_all(&mut self) {
        for i in 0..self.roots.len() {
            self.propagate_rot(self.roots[i]);
        }
    }
}

impl BoneBuffers for Skeleton {
    fn bone_translations(&self) -> Vec<f32> {
        flat_translations(&self.bones)
    }

    fn bone_rotations(&self) -> Vec<f32> {
        flat_rotations(&self.bones)
    }

    fn d_matrices(&self) -> Vec<f32> {
        let ds: Vec<Mat4> = self.bones.iter().map(|b| b.d).collect();
        flatten_mat4(&ds)
    }

    fn inv_u_matrices(&self) -> Vec<f32> {
        let inv_us: Vec<Mat4> = self.bones.iter().map(|b| b.u.inverse()).collect();
        flatten_mat4(&inv_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::BoneDef;
    use crate::math::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-4;

    /// root -> a -> b, root -> c
    fn forked() -> Skeleton {
        let def = SkeletonDef::from_parents(vec![
            BoneDef::new(None, Vec3::ZERO, Vec3::Y),
            BoneDef::new(Some(0), Vec3::Y, Vec3::new(0.0, 2.0, 0.0)),
            BoneDef::new(Some(1), Vec3::new(0.0, 2.0, 0.0), Vec3::new(1.0, 2.0, 0.0)),
            BoneDef::new(Some(0), Vec3::Y, Vec3::new(-1.0, 1.0, 0.0)),
        ]);
        Skeleton::from_def(&def).unwrap()
    }

    fn random_quat(rng: &mut StdRng) -> Quat {
        let axis = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        )
        .normalize_or(Vec3::X);
        Quat::from_axis_angle(axis, rng.random_range(-3.0..3.0))
    }

    #[test]
    fn test_bind_pose_round_trip() {
        let skeleton = forked();
        for bone in skeleton.bones() {
            let position = bone.d.transform_origin();
            let endpoint = (bone.d * bone.t_n).transform_origin();
            assert!(position.distance(bone.position) < EPS);
            assert!(endpoint.distance(bone.endpoint) < EPS);
        }
    }

    #[test]
    fn test_propagation_keeps_bind_pose_when_unrotated() {
        let mut skeleton = forked();
        let before: Vec<(Vec3, Vec3)> =
            skeleton.bones().iter().map(|b| (b.position, b.endpoint)).collect();
        skeleton.propagate_all();
        for (bone, (position, endpoint)) in skeleton.bones().iter().zip(before) {
            assert!(bone.position.distance(position) < EPS);
            assert!(bone.endpoint.distance(endpoint) < EPS);
        }
    }

    #[test]
    fn test_rotate_then_inverse_restores_r() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut skeleton = forked();
        skeleton.rotate_bone(1, Quat::from_rotation_z(0.3));

        for _ in 0..32 {
            let bone = rng.random_range(0..skeleton.len());
            let delta = random_quat(&mut rng);
            let before = skeleton.bone(bone).r;

            skeleton.rotate_bone(bone, delta);
            skeleton.rotate_bone(bone, delta.inverse());

            assert!(
                skeleton.bone(bone).r.abs_diff_eq(before, EPS),
                "R of bone {} drifted: {:?} vs {:?}",
                bone,
                skeleton.bone(bone).r,
                before
            );
        }
    }

    #[test]
    fn test_edit_leaves_other_subtrees_untouched() {
        let mut skeleton = forked();
        let c = skeleton.bone(3).clone();
        let root = skeleton.bone(0).clone();

        skeleton.rotate_bone(1, Quat::from_rotation_x(0.9));

        assert_eq!(skeleton.bone(3).position, c.position);
        assert_eq!(skeleton.bone(3).endpoint, c.endpoint);
        assert_eq!(skeleton.bone(3).rotation, c.rotation);
        assert_eq!(skeleton.bone(3).d, c.d);
        assert_eq!(skeleton.bone(0).d, root.d);

        // Descendant b follows a
        assert!(skeleton.bone(2).position.distance(skeleton.bone(1).endpoint) < EPS);
    }

    #[test]
    fn test_two_bone_chain_rotate_root() {
        let def = SkeletonDef::from_parents(vec![
            BoneDef::new(None, Vec3::ZERO, Vec3::Y),
            BoneDef::new(Some(0), Vec3::Y, Vec3::new(0.0, 2.0, 0.0)),
        ]);
        let mut skeleton = Skeleton::from_def(&def).unwrap();

        skeleton.rotate_bone(0, Quat::from_rotation_x(FRAC_PI_2));

        let child = skeleton.bone(1);
        assert!(
            child.position.distance(Vec3::Z) < EPS,
            "child joint at {:?}",
            child.position
        );
        assert!(child.endpoint.distance(Vec3::new(0.0, 0.0, 2.0)) < EPS);
        assert_eq!(child.r, Mat3::IDENTITY);
        assert!(skeleton.bone(0).endpoint.distance(Vec3::Z) < EPS);
    }

    #[test]
    fn test_world_rotation_composes_ancestors() {
        let mut skeleton = forked();
        let qa = Quat::from_rotation_x(0.4);
        let qb = Quat::from_rotation_y(-0.7);
        skeleton.rotate_bone(1, qa);
        skeleton.rotate_bone(2, qb);

        let expected = qa * qb;
        assert!(skeleton.bone(2).rotation.dot(expected).abs() > 1.0 - EPS);
    }

    #[test]
    fn test_roll_preserves_bone_axis() {
        let mut skeleton = forked();
        skeleton.rotate_bone(1, Quat::from_rotation_y(0.8));
        let axis = skeleton.bone(2).axis();
        let child_free_joint = skeleton.bone(2).position;

        skeleton.roll_bone(2, 1.3);

        let bone = skeleton.bone(2);
        assert!(bone.axis().distance(axis) < EPS);
        assert!(bone.position.distance(child_free_joint) < EPS);
        assert!(!bone.r.abs_diff_eq(Mat3::IDENTITY, 1e-3));
    }

    #[test]
    fn test_roll_zero_length_bone_is_noop() {
        let def = SkeletonDef::from_parents(vec![BoneDef::new(None, Vec3::X, Vec3::X)]);
        let mut skeleton = Skeleton::from_def(&def).unwrap();
        skeleton.roll_bone(0, 0.5);
        assert_eq!(skeleton.bone(0).r, Mat3::IDENTITY);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_bone_panics() {
        let mut skeleton = forked();
        skeleton.rotate_bone(10, Quat::IDENTITY);
    }

    #[test]
    fn test_buffers_sizes_and_inverse_u() {
        let skeleton = forked();
        assert_eq!(skeleton.bone_translations().len(), 12);
        assert_eq!(skeleton.bone_rotations().len(), 16);
        assert_eq!(skeleton.d_matrices().len(), 64);

        let inv_u = skeleton.inv_u_matrices();
        let m = Mat4::from_cols_slice(&inv_u[16..32]);
        let local = m.transform_point3(skeleton.bone(1).position);
        assert!(local.length() < EPS);
    }

    #[test]
    fn test_invalid_description_is_rejected() {
        let def = SkeletonDef {
            bones: vec![BoneDef::new(Some(3), Vec3::ZERO, Vec3::Y)],
        };
        assert!(Skeleton::from_def(&def).is_err());
    }
}
