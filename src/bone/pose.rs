use super::Bone;
use glam::{Mat3, Quat};

/// Snapshot of every bone's local rotation `R`, in bone order.
///
/// This is the source of truth for interpolation; world-space data is always
/// re-derived by propagation after a keyframe is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    pub rotations: Vec<Mat3>,
}

impl Keyframe {
    /// Capture the current local rotations of `bones`
    pub fn capture(bones: &[Bone]) -> Self {
        Self {
            rotations: bones.iter().map(|b| b.r).collect(),
        }
    }

    pub fn bone_count(&self) -> usize {
        self.rotations.len()
    }

    /// Local rotations as unit quaternions
    pub fn quats(&self) -> impl Iterator<Item = Quat> + '_ {
        self.rotations.iter().map(|r| Quat::from_mat3(r).normalize())
    }

    /// Quaternions must be finite and non-zero; data from outside the crate
    /// goes through `math::normalized_rotation` first
    pub fn from_quats(quats: impl IntoIterator<Item = Quat>) -> Self {
        Self {
            rotations: quats
                .into_iter()
                .map(|q| Mat3::from_quat(q.normalize()))
                .collect(),
        }
    }

    /// Rotation of bone `bone` at fraction `t` between `a` and `b`.
    ///
    /// Slerps along the shorter arc. At `t == 0` the stored matrix of `a` is
    /// returned untouched so sampling exactly on a keyframe is lossless.
    pub fn blend_bone(a: &Keyframe, b: &Keyframe, bone: usize, t: f32) -> Mat3 {
        if t == 0.0 {
            return a.rotations[bone];
        }
        let qa = Quat::from_mat3(&a.rotations[bone]).normalize();
        let qb = Quat::from_mat3(&b.rotations[bone]).normalize();
        Mat3::from_quat(shortest_slerp(qa, qb, t))
    }
}

/// Spherical interpolation that never takes the long way around.
///
/// `q` and `-q` encode the same rotation; flipping the target into the same
/// hemisphere as the source keeps the blend on the short arc.
pub fn shortest_slerp(from: Quat, to: Quat, t: f32) -> Quat {
    let to = if from.dot(to) < 0.0 { -to } else { to };
    from.slerp(to, t).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_blend_at_zero_is_exact() {
        let a = Keyframe {
            rotations: vec![Mat3::from_rotation_z(0.3) * Mat3::from_rotation_x(1.1)],
        };
        let b = Keyframe {
            rotations: vec![Mat3::IDENTITY],
        };
        assert_eq!(Keyframe::blend_bone(&a, &b, 0, 0.0), a.rotations[0]);
    }

    #[test]
    fn test_blend_midpoint_is_half_angle() {
        let a = Keyframe::from_quats([Quat::IDENTITY]);
        let b = Keyframe::from_quats([Quat::from_rotation_y(FRAC_PI_2)]);

        let mid = Keyframe::blend_bone(&a, &b, 0, 0.5);
        let expected = Mat3::from_rotation_y(FRAC_PI_2 / 2.0);
        assert!(mid.abs_diff_eq(expected, 1e-5), "got {:?}", mid);
    }

    #[test]
    fn test_shortest_slerp_handles_sign_flip() {
        let from = Quat::from_rotation_z(0.2);
        // Same orientation as rotation_z(1.0), stored in the opposite hemisphere
        let to = -Quat::from_rotation_z(1.0);
        assert!(from.dot(to) < 0.0);

        let mid = shortest_slerp(from, to, 0.5);
        let expected = Quat::from_rotation_z(0.6);
        assert!(mid.dot(expected).abs() > 1.0 - 1e-5, "got {:?}", mid);
    }

    #[test]
    fn test_quats_round_trip() {
        let rotations = [Quat::from_rotation_x(0.4), Quat::from_axis_angle(Vec3::ONE.normalize(), 2.0)];
        let kf = Keyframe::from_quats(rotations);
        for (q, original) in kf.quats().zip(rotations) {
            assert!(q.dot(original).abs() > 1.0 - 1e-5);
        }
        assert_eq!(kf.bone_count(), 2);
    }
}
