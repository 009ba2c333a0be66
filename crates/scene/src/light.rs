//! Point lights and their GPU representation.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Maximum number of point lights the global uniform buffer carries.
pub const MAX_POINT_LIGHTS: usize = 10;

/// Point light as laid out in the global uniform buffer (std140).
///
/// `position.w` carries the billboard radius; `color.w` carries
/// intensity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PointLight {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3, intensity: f32, radius: f32) -> Self {
        Self {
            position: position.extend(radius).to_array(),
            color: color.extend(intensity).to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec4::from_array(self.position).truncate()
    }

    pub fn intensity(&self) -> f32 {
        self.color[3]
    }

    pub fn radius(&self) -> f32 {
        self.position[3]
    }
}

/// CPU-side light emitter attached to a scene object.
#[derive(Clone, Copy, Debug)]
pub struct LightEmitter {
    pub intensity: f32,
    pub radius: f32,
}

impl Default for LightEmitter {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            radius: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_light_is_32_bytes() {
        assert_eq!(std::mem::size_of::<PointLight>(), 32);
    }

    #[test]
    fn intensity_rides_in_color_w() {
        let light = PointLight::new(Vec3::ZERO, Vec3::ONE, 2.5, 0.1);
        assert_eq!(light.intensity(), 2.5);
        assert_eq!(light.color[0], 1.0);
    }

    #[test]
    fn radius_rides_in_position_w() {
        let light = PointLight::new(Vec3::ZERO, Vec3::ONE, 1.0, 0.25);
        assert_eq!(light.radius(), 0.25);
    }

    #[test]
    fn position_round_trips() {
        let light = PointLight::new(Vec3::new(1.0, -2.0, 3.0), Vec3::ONE, 1.0, 0.1);
        assert_eq!(light.position(), Vec3::new(1.0, -2.0, 3.0));
    }
}
