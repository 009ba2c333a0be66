//! Draw submission systems, invoked between render pass begin and end.

pub mod mesh;
pub mod point_light;

pub use mesh::MeshSystem;
pub use point_light::{PointLightSystem, collect_lights};
