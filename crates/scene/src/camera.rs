//! Camera with view and projection matrices.

use glam::{Mat4, Vec3};

/// A free camera described by position plus euler rotation (radians).
///
/// `rotation.x` is pitch, `rotation.y` is yaw, `rotation.z` is roll.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Vec3,
    fov_y_radians: f32,
    aspect: f32,
    z_near: f32,
    z_far: f32,
}

impl Camera {
    pub fn new(fov_y_radians: f32, aspect: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            fov_y_radians,
            aspect,
            z_near,
            z_far,
        }
    }

    /// Update the aspect ratio, typically after a window resize.
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// View direction derived from yaw and pitch.
    pub fn forward(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.rotation.y.sin_cos();
        let (sin_pitch, cos_pitch) = self.rotation.x.sin_cos();
        Vec3::new(cos_pitch * sin_yaw, -sin_pitch, cos_pitch * cos_yaw)
    }

    pub fn right(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.rotation.y.sin_cos();
        Vec3::new(cos_yaw, 0.0, -sin_yaw)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    /// Perspective projection with the Y axis flipped for Vulkan clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        let mut proj =
            Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.z_near, self.z_far);
        proj.y_axis.y *= -1.0;
        proj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera::new(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 100.0)
    }

    #[test]
    fn projection_flips_y_for_vulkan() {
        let camera = test_camera();
        let proj = camera.projection_matrix();
        assert!(proj.y_axis.y < 0.0);
    }

    #[test]
    fn set_aspect_ignores_degenerate_values() {
        let mut camera = test_camera();
        let before = camera.aspect();
        camera.set_aspect(0.0);
        camera.set_aspect(f32::NAN);
        assert_eq!(camera.aspect(), before);
        camera.set_aspect(2.0);
        assert_eq!(camera.aspect(), 2.0);
    }

    #[test]
    fn forward_at_rest_is_positive_z() {
        let camera = test_camera();
        assert!((camera.forward() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn view_matrix_translates_world_opposite_to_position() {
        let mut camera = test_camera();
        camera.position = Vec3::new(0.0, 0.0, -3.0);
        let view = camera.view_matrix();
        let origin_in_view = view.transform_point3(Vec3::ZERO);
        // Camera looks towards +Z, so the origin sits 3 units ahead.
        assert!((origin_in_view.z.abs() - 3.0).abs() < 1e-4);
    }
}
