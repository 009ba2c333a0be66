//! Vulkan hardware abstraction for glimmer.
//!
//! This crate wraps the raw `ash` API in RAII types: instance and device
//! setup, swapchain and render pass management, pipelines, buffers,
//! shaders, descriptors, command recording, and synchronization
//! primitives. Policy (frame pacing, recreation, draw ordering) lives in
//! the renderer crate; this layer only makes Vulkan usage safe and
//! ergonomic.

pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod instance;
pub mod physical_device;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod swapchain;
pub mod sync;
pub mod vertex;

pub use error::{RhiError, RhiResult};
pub use sync::MAX_FRAMES_IN_FLIGHT;
