//! Keyboard-driven camera movement.

use glam::Vec3;
use glimmer_scene::Camera;

use crate::input::{InputState, KeyCode};

/// Moves a [`Camera`] with WASD/QE and looks with the arrow keys.
///
/// All motion is scaled by the frame delta, so speed is independent of
/// frame rate.
pub struct CameraController {
    pub move_speed: f32,
    pub look_speed: f32,
}

impl Default for CameraController {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            look_speed: 1.5,
        }
    }
}

impl CameraController {
    const PITCH_LIMIT: f32 = 1.5;

    pub fn update(&self, input: &InputState, camera: &mut Camera, dt: f32) {
        let mut look = Vec3::ZERO;
        if input.is_pressed(KeyCode::ArrowLeft) {
            look.y -= 1.0;
        }
        if input.is_pressed(KeyCode::ArrowRight) {
            look.y += 1.0;
        }
        if input.is_pressed(KeyCode::ArrowUp) {
            look.x -= 1.0;
        }
        if input.is_pressed(KeyCode::ArrowDown) {
            look.x += 1.0;
        }
        if look.length_squared() > f32::EPSILON {
            camera.rotation += self.look_speed * dt * look.normalize();
            camera.rotation.x = camera.rotation.x.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
            camera.rotation.y %= std::f32::consts::TAU;
        }

        let forward = camera.forward();
        let right = camera.right();

        let mut movement = Vec3::ZERO;
        if input.is_pressed(KeyCode::KeyW) {
            movement += forward;
        }
        if input.is_pressed(KeyCode::KeyS) {
            movement -= forward;
        }
        if input.is_pressed(KeyCode::KeyD) {
            movement += right;
        }
        if input.is_pressed(KeyCode::KeyA) {
            movement -= right;
        }
        if input.is_pressed(KeyCode::KeyE) {
            movement += Vec3::Y;
        }
        if input.is_pressed(KeyCode::KeyQ) {
            movement -= Vec3::Y;
        }
        if movement.length_squared() > f32::EPSILON {
            camera.position += self.move_speed * dt * movement.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 100.0)
    }

    #[test]
    fn forward_key_moves_along_view_direction() {
        let controller = CameraController::default();
        let mut camera = camera();
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);

        controller.update(&input, &mut camera, 0.5);

        let expected = camera.forward() * controller.move_speed * 0.5;
        assert!((camera.position - expected).length() < 1e-5);
    }

    #[test]
    fn movement_scales_with_delta_time() {
        let controller = CameraController::default();
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyD);

        let mut short = camera();
        controller.update(&input, &mut short, 0.1);
        let mut long = camera();
        controller.update(&input, &mut long, 0.2);

        assert!((long.position.length() - 2.0 * short.position.length()).abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let controller = CameraController::default();
        let mut camera = camera();
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::ArrowDown);

        for _ in 0..100 {
            controller.update(&input, &mut camera, 0.1);
        }

        assert!(camera.rotation.x <= CameraController::PITCH_LIMIT + 1e-5);
    }

    #[test]
    fn opposing_keys_cancel_out() {
        let controller = CameraController::default();
        let mut camera = camera();
        let mut input = InputState::new();
        input.on_key_pressed(KeyCode::KeyW);
        input.on_key_pressed(KeyCode::KeyS);

        controller.update(&input, &mut camera, 1.0);

        assert_eq!(camera.position, Vec3::ZERO);
    }
}
