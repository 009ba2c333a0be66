//! Platform layer: windowing via winit, keyboard input, and the camera
//! controller that consumes it.

pub mod camera_controller;
pub mod input;
pub mod window;

pub use camera_controller::CameraController;
pub use input::{InputState, KeyCode};
pub use window::{Surface, Window};
