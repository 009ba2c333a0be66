//! Scene layer: cameras, transforms, lights, and the objects that tie
//! them together.

pub mod camera;
pub mod light;
pub mod object;
pub mod transform;

pub use camera::Camera;
pub use light::{LightEmitter, MAX_POINT_LIGHTS, PointLight};
pub use object::{ObjectId, SceneObject};
pub use transform::Transform;
