//! Scene objects: renderable meshes and light emitters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;
use glimmer_resources::Mesh;

use crate::light::LightEmitter;
use crate::transform::Transform;

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Stable per-object identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// A single object in the scene.
///
/// An object with a mesh is drawn by the mesh system; an object with a
/// light emitter contributes to the global uniform buffer and is drawn
/// as a billboard by the point light system.
pub struct SceneObject {
    pub id: ObjectId,
    pub transform: Transform,
    pub color: Vec3,
    pub mesh: Option<Arc<Mesh>>,
    pub light: Option<LightEmitter>,
}

impl SceneObject {
    pub fn with_mesh(mesh: Arc<Mesh>) -> Self {
        Self {
            id: ObjectId::next(),
            transform: Transform::default(),
            color: Vec3::ONE,
            mesh: Some(mesh),
            light: None,
        }
    }

    pub fn point_light(intensity: f32, radius: f32, color: Vec3) -> Self {
        Self {
            id: ObjectId::next(),
            transform: Transform::default().with_scale(Vec3::splat(radius)),
            color,
            mesh: None,
            light: Some(LightEmitter { intensity, radius }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = SceneObject::point_light(1.0, 0.1, Vec3::ONE);
        let b = SceneObject::point_light(1.0, 0.1, Vec3::ONE);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn point_light_has_no_mesh() {
        let light = SceneObject::point_light(2.0, 0.2, Vec3::X);
        assert!(light.mesh.is_none());
        let emitter = light.light.unwrap();
        assert_eq!(emitter.intensity, 2.0);
        assert_eq!(light.transform.scale, Vec3::splat(0.2));
    }
}
