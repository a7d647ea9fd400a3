//! Linear algebra helpers on top of glam.
//!
//! Everything here is column-major, matching glam and the GPU-side consumers of
//! the flattened bone buffers.

pub use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

use static_assertions::assert_eq_size;

// Flattening relies on these layouts being tightly packed.
assert_eq_size!(Mat4, [f32; 16]);
assert_eq_size!(Vec3, [f32; 3]);
assert_eq_size!(Quat, [f32; 4]);

/// Angles closer than this to 0 or PI are treated as degenerate axis alignments
pub const ANGLE_EPSILON: f32 = 1e-6;

/// Squared quaternion lengths at or below this carry no usable rotation
pub const MIN_QUAT_LENGTH_SQUARED: f32 = 1e-12;

/// `q` scaled to unit length, or None when it is not finite or too short to normalize
pub fn normalized_rotation(q: Quat) -> Option<Quat> {
    (q.is_finite() && q.length_squared() > MIN_QUAT_LENGTH_SQUARED).then(|| q.normalize())
}

/// Extra operations on `Mat4` used by the bone transform chain.
pub trait Mat4Extended {
    /// Image of the homogeneous origin `(0, 0, 0, 1)`
    fn transform_origin(&self) -> Vec3;

    /// Orientation part of a rigid transform as a unit quaternion
    fn rotation_quat(&self) -> Quat;
}

impl Mat4Extended for Mat4 {
    #[inline]
    fn transform_origin(&self) -> Vec3 {
        self.w_axis.truncate()
    }

    fn rotation_quat(&self) -> Quat {
        Quat::from_mat3(&Mat3::from_mat4(*self)).normalize()
    }
}

/// Pure translation matrix
#[inline]
pub fn translation(offset: Vec3) -> Mat4 {
    Mat4::from_translation(offset)
}

/// Flatten a slice of matrices into column-major floats, 16 per matrix
pub fn flatten_mat4(matrices: &[Mat4]) -> Vec<f32> {
    bytemuck::cast_slice::<Mat4, f32>(matrices).to_vec()
}

/// Rotation that maps `dir` onto +Z using the minimal axis-angle construction.
///
/// When `dir` already points along +Z this is the identity. When it points
/// along -Z the cross product vanishes, so Z is flipped instead. That flip leaves
/// an arbitrary roll around the bone axis, which is harmless for anything
/// circularly symmetric around Z.
pub fn rotate_onto_z(dir: Vec3) -> Mat4 {
    let dir = dir.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Mat4::IDENTITY;
    }
    let angle = Vec3::Z.dot(dir).clamp(-1.0, 1.0).acos();

    if angle.abs() < ANGLE_EPSILON {
        Mat4::IDENTITY
    } else if (angle - std::f32::consts::PI).abs() < ANGLE_EPSILON {
        Mat4::from_diagonal(Vec4::new(1.0, 1.0, -1.0, 1.0))
    } else {
        let axis = dir.cross(Vec3::Z).normalize();
        Mat4::from_axis_angle(axis, angle)
    }
}
