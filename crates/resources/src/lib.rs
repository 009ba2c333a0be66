//! GPU resources: meshes and the procedural geometry that feeds them.

pub mod geometry;
pub mod mesh;

pub use mesh::Mesh;
