//! A loaded rig: its skeleton plus the keyframe timeline that animates it.

use crate::bone::{Keyframe, PoseSnapshot, SkeletonDef, Timeline};
use crate::error::Result;
use crate::skeleton::{BoneBuffers, Skeleton};
use glam::Quat;

#[derive(Debug, Clone)]
pub struct Mesh {
    skeleton: Skeleton,
    timeline: Timeline,
}

impl Mesh {
    pub fn new(def: &SkeletonDef) -> Result<Self> {
        Ok(Self {
            skeleton: Skeleton::from_def(def)?,
            timeline: Timeline::new(),
        })
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn bone_count(&self) -> usize {
        self.skeleton.len()
    }

    pub fn keyframe_count(&self) -> usize {
        self.timeline.len()
    }

    pub fn rotate_bone(&mut self, bone: usize, delta: Quat) {
        self.skeleton.rotate_bone(bone, delta);
    }

    pub fn roll_bone(&mut self, bone: usize, theta: f32) {
        self.skeleton.roll_bone(bone, theta);
    }

    /// Snapshot the current pose into slot `index` (append at `len`,
    /// overwrite below it)
    pub fn add_keyframe(&mut self, index: usize) {
        let bones = self.skeleton.bones();
        let keyframe = Keyframe::capture(bones);
        let snapshot = PoseSnapshot::capture(bones);
        let appended = index == self.timeline.len();
        self.timeline.put(index, keyframe, snapshot);
        log::info!(
            "{} keyframe {} ({} total)",
            if appended { "Added" } else { "Updated" },
            index,
            self.timeline.len()
        );
    }

    pub fn delete_keyframe(&mut self, index: usize) {
        self.timeline.remove(index);
        log::info!("Removed keyframe {} ({} left)", index, self.timeline.len());
    }

    /// Jump the rig to keyframe `index`
    pub fn set_frame(&mut self, index: usize) {
        let rotations = self.timeline.keyframe(index).rotations.clone();
        self.skeleton.set_local_rotations(rotations);
    }

    /// Pose the rig at playback time `t` by slerping the bracketing slots.
    ///
    /// Times whose upper slot does not exist leave the pose as it is.
    pub fn set_bone_pos(&mut self, t: f32) {
        let Some((lo, hi, frac)) = self.timeline.bracket(t) else {
            return;
        };
        let rotations: Vec<_> = (0..self.skeleton.len())
            .map(|bone| Keyframe::blend_bone(lo, hi, bone, frac))
            .collect();
        self.skeleton.set_local_rotations(rotations);
    }

    pub fn keyframe_translations(&self, index: usize) -> &[f32] {
        &self.timeline.snapshot(index).translations
    }

    pub fn keyframe_rotations(&self, index: usize) -> &[f32] {
        &self.timeline.snapshot(index).rotations
    }

    pub fn export_timeline(&self) -> std::result::Result<String, serde_json::Error> {
        self.timeline.to_json_string(self.skeleton.len())
    }

    /// Parse keyframes for this rig without touching the timeline
    pub fn parse_timeline(&self, json: &str) -> Result<Vec<Keyframe>> {
        Timeline::keyframes_from_json(json, self.skeleton.len())
    }

    pub fn import_timeline(&mut self, json: &str) -> Result<()> {
        let keyframes = self.parse_timeline(json)?;
        self.replace_keyframes(keyframes);
        Ok(())
    }

    /// Replace the timeline with already checked keyframes.
    ///
    /// Snapshots are rebuilt by posing the rig at each keyframe; the current
    /// pose is restored afterwards.
    pub fn replace_keyframes(&mut self, keyframes: Vec<Keyframe>) {
        let current = Keyframe::capture(self.skeleton.bones());

        let mut timeline = Timeline::new();
        for (index, keyframe) in keyframes.into_iter().enumerate() {
            self.skeleton.set_local_rotations(keyframe.rotations.iter().copied());
            let snapshot = PoseSnapshot::capture(self.skeleton.bones());
            timeline.put(index, keyframe, snapshot);
        }
        self.skeleton.set_local_rotations(current.rotations);

        log::info!("Imported {} keyframes", timeline.len());
        self.timeline = timeline;
    }
}

impl BoneBuffers for Mesh {
    fn bone_translations(&self) -> Vec<f32> {
        self.skeleton.bone_translations()
    }

    fn bone_rotations(&self) -> Vec<f32> {
        self.skeleton.bone_rotations()
    }

    fn d_matrices(&self) -> Vec<f32> {
        self.skeleton.d_matrices()
    }

    fn inv_u_matrices(&self) -> Vec<f32> {
        self.skeleton.inv_u_matrices()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bone::BoneDef;
    use crate::error::RigError;
    use glam::{Mat3, Vec3};
    use std::f32::consts::FRAC_PI_4;

    const EPS: f32 = 1e-5;

    fn two_bone_chain() -> Mesh {
        let def = SkeletonDef::from_parents(vec![
            BoneDef::new(None, Vec3::ZERO, Vec3::Y),
            BoneDef::new(Some(0), Vec3::Y, Vec3::new(0.0, 2.0, 0.0)),
        ]);
        Mesh::new(&def).unwrap()
    }

    #[test]
    fn test_slerp_midpoint_between_keyframes() {
        let mut mesh = two_bone_chain();
        mesh.add_keyframe(0);
        mesh.rotate_bone(1, Quat::from_rotation_z(FRAC_PI_4));
        mesh.add_keyframe(1);

        mesh.set_bone_pos(0.5);

        let r = mesh.skeleton().bone(1).r;
        let expected = Mat3::from_rotation_z(FRAC_PI_4 / 2.0);
        assert!(r.abs_diff_eq(expected, EPS), "got {:?}", r);

        // A linear blend of the matrices would not stay orthonormal
        let lerped = (Mat3::IDENTITY + Mat3::from_rotation_z(FRAC_PI_4)) * 0.5;
        assert!(!lerped.abs_diff_eq(expected, 1e-3));
        assert!((r.determinant() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_integer_time_reproduces_keyframe_exactly() {
        let mut mesh = two_bone_chain();
        mesh.rotate_bone(0, Quat::from_rotation_x(0.3));
        mesh.add_keyframe(0);
        mesh.rotate_bone(1, Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 1.7));
        mesh.add_keyframe(1);
        mesh.rotate_bone(0, Quat::from_rotation_y(2.5));
        mesh.add_keyframe(2);

        for slot in 0..3 {
            mesh.set_bone_pos(slot as f32);
            let keyframe = mesh.timeline().keyframe(slot).clone();
            for (bone, expected) in mesh.skeleton().bones().iter().zip(&keyframe.rotations) {
                assert_eq!(bone.r, *expected, "slot {}", slot);
            }
        }
    }

    #[test]
    fn test_set_bone_pos_past_end_is_noop() {
        let mut mesh = two_bone_chain();
        mesh.add_keyframe(0);
        mesh.rotate_bone(0, Quat::from_rotation_x(0.5));
        mesh.add_keyframe(1);
        mesh.rotate_bone(0, Quat::from_rotation_x(0.5));

        let before = mesh.skeleton().bone(0).r;
        mesh.set_bone_pos(1.5);
        assert_eq!(mesh.skeleton().bone(0).r, before);
    }

    #[test]
    fn test_set_frame_restores_pose() {
        let mut mesh = two_bone_chain();
        mesh.add_keyframe(0);
        let bind_tip = mesh.skeleton().bone(1).endpoint;

        mesh.rotate_bone(0, Quat::from_rotation_z(1.0));
        assert!(mesh.skeleton().bone(1).endpoint.distance(bind_tip) > 0.1);

        mesh.set_frame(0);
        assert!(mesh.skeleton().bone(1).endpoint.distance(bind_tip) < EPS);
    }

    #[test]
    fn test_add_overwrites_and_delete_shifts() {
        let mut mesh = two_bone_chain();
        mesh.add_keyframe(0);
        mesh.rotate_bone(0, Quat::from_rotation_x(0.2));
        mesh.add_keyframe(1);
        mesh.rotate_bone(0, Quat::from_rotation_x(0.2));
        mesh.add_keyframe(2);
        assert_eq!(mesh.keyframe_count(), 3);

        // Overwrite slot 0 with the current pose
        mesh.add_keyframe(0);
        assert_eq!(mesh.keyframe_count(), 3);
        assert_eq!(mesh.timeline().keyframe(0), mesh.timeline().keyframe(2));

        let third = mesh.timeline().keyframe(2).clone();
        mesh.delete_keyframe(1);
        assert_eq!(mesh.keyframe_count(), 2);
        assert_eq!(mesh.timeline().keyframe(1), &third);
    }

    #[test]
    fn test_keyframe_snapshots_follow_slots() {
        let mut mesh = two_bone_chain();
        mesh.add_keyframe(0);
        mesh.rotate_bone(0, Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        mesh.add_keyframe(1);

        assert_eq!(mesh.keyframe_translations(0), &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let moved = mesh.keyframe_translations(1);
        assert!((moved[5] - 1.0).abs() < EPS, "child joint z {}", moved[5]);
        assert_eq!(mesh.keyframe_rotations(1).len(), 8);

        // Snapshots are not touched by later edits
        mesh.rotate_bone(0, Quat::from_rotation_y(1.0));
        assert_eq!(mesh.keyframe_translations(0), &[0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        mesh.delete_keyframe(0);
        assert!((mesh.keyframe_translations(0)[5] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_import_rebuilds_snapshots_and_keeps_pose() {
        let mut source = two_bone_chain();
        source.add_keyframe(0);
        source.rotate_bone(0, Quat::from_rotation_x(std::f32::consts::FRAC_PI_2));
        source.add_keyframe(1);
        let json = source.export_timeline().unwrap();

        let mut mesh = two_bone_chain();
        mesh.rotate_bone(1, Quat::from_rotation_y(0.4));
        let pose = mesh.skeleton().bone(1).r;

        mesh.import_timeline(&json).unwrap();
        assert_eq!(mesh.keyframe_count(), 2);
        assert_eq!(mesh.skeleton().bone(1).r, pose);

        let original = source.keyframe_translations(1);
        for (a, b) in mesh.keyframe_translations(1).iter().zip(original) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_timeline_export_imports_back() {
        let mut mesh = two_bone_chain();
        let json = mesh.export_timeline().unwrap();
        mesh.import_timeline(&json).unwrap();
        assert_eq!(mesh.keyframe_count(), 0);
    }

    #[test]
    fn test_zero_quaternion_import_is_rejected() {
        let mut mesh = two_bone_chain();
        mesh.add_keyframe(0);
        let json = r#"{ "bone_count": 2, "keyframes": [
            { "rotations": [[0, 0, 0, 0], [0, 0, 0, 1]] }
        ] }"#;
        assert!(matches!(
            mesh.import_timeline(json),
            Err(RigError::InvalidRotation { keyframe: 0, bone: 0 })
        ));
        assert_eq!(mesh.keyframe_count(), 1);
        assert!(mesh.skeleton().bones().iter().all(|b| b.r.is_finite()));
    }
}
