//! Error types for the RHI layer.

use ash::vk;
use thiserror::Error;

/// Errors produced by the Vulkan abstraction layer.
///
/// Every variant is fatal to the resource being created or operated on;
/// there is no partial-failure recovery below this layer. Transient surface
/// staleness is reported through dedicated result types on the swapchain,
/// not through this enum.
#[derive(Error, Debug)]
pub enum RhiError {
    /// A Vulkan API call returned an error code.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader library could not be loaded.
    #[error("Failed to load Vulkan library: {0}")]
    Loading(#[from] ash::LoadingError),

    /// Device memory allocation failed.
    #[error("GPU allocation error: {0}")]
    Allocation(#[from] gpu_allocator::AllocationError),

    /// No GPU satisfied the engine's requirements.
    #[error("No suitable GPU found")]
    NoSuitableGpu,

    /// Shader module loading or reflection failed.
    #[error("Shader error: {0}")]
    Shader(String),

    /// Surface creation or query failed.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Presentation resources were requested for a degenerate extent.
    ///
    /// Callers must stall until the window reports a nonzero extent before
    /// building swapchain-sized resources.
    #[error("Cannot create presentation resources for zero extent {width}x{height}")]
    ZeroExtent { width: u32, height: u32 },

    /// A resource was created or used with invalid parameters.
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Pipeline construction failed.
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// Result type alias for RHI operations.
pub type RhiResult<T> = Result<T, RhiError>;
