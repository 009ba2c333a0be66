//! Transform component for scene objects.
//!
//! # Example
//!
//! ```
//! use glimmer_scene::Transform;
//! use glam::Vec3;
//!
//! let transform = Transform::new()
//!     .with_translation(Vec3::new(0.0, 1.0, -2.5))
//!     .with_scale(Vec3::splat(0.5));
//! let model = transform.matrix();
//! ```

use glam::{Mat4, Quat, Vec3};

/// Translation/rotation/scale of a scene object.
#[derive(Clone, Debug)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Identity transform at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Model matrix for this transform.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Normal matrix (inverse transpose of the model matrix).
    ///
    /// Falls back to identity for non-invertible transforms (zero scale)
    /// to keep NaNs out of the vertex stream.
    pub fn normal_matrix(&self) -> Mat4 {
        const EPSILON: f32 = 1e-6;
        let model = self.matrix();
        if model.determinant().abs() < EPSILON {
            Mat4::IDENTITY
        } else {
            model.inverse().transpose()
        }
    }

    /// Forward direction (-Z rotated by this transform).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Right direction (+X rotated by this transform).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Up direction (+Y rotated by this transform).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
        assert_eq!(t.normal_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn matrix_applies_translation() {
        let t = Transform::new().with_translation(Vec3::new(1.0, 2.0, 3.0));
        let pos = t.matrix().transform_point3(Vec3::ZERO);
        assert!((pos - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn normal_matrix_is_inverse_transpose() {
        let t = Transform::new().with_scale(Vec3::new(1.0, 2.0, 4.0));
        let expected = t.matrix().inverse().transpose();
        assert_eq!(t.normal_matrix(), expected);
    }

    #[test]
    fn normal_matrix_survives_zero_scale() {
        let t = Transform::new().with_scale(Vec3::ZERO);
        let normal = t.normal_matrix();
        assert_eq!(normal, Mat4::IDENTITY);
    }

    #[test]
    fn direction_vectors_at_identity() {
        let t = Transform::default();
        assert_eq!(t.forward(), Vec3::NEG_Z);
        assert_eq!(t.right(), Vec3::X);
        assert_eq!(t.up(), Vec3::Y);
    }

    #[test]
    fn yaw_rotates_forward() {
        let t =
            Transform::new().with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let forward = t.forward();
        assert!((forward - Vec3::NEG_X).length() < 1e-5);
    }
}
