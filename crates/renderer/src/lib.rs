//! Frame orchestration and rendering for the engine.
//!
//! The heart of this crate is [`FrameScheduler`], which sequences image
//! acquisition, in-flight synchronization, render-pass bracketing,
//! submission, and presentation, and owns the swap resources it
//! recreates on resize. [`Renderer`] wraps it together with the draw
//! systems into the API the application drives.

pub mod depth_buffer;
pub mod error;
pub mod frame_scheduler;
pub mod global_ubo;
pub mod pacing;
pub mod renderer;
pub mod swap_resources;
pub mod systems;

pub use error::{RenderError, RenderResult};
pub use frame_scheduler::{FrameContext, FrameScheduler, PresentTarget};
pub use renderer::Renderer;
pub use swap_resources::SwapResources;
