//! Renderer error types.

use thiserror::Error;

use glimmer_rhi::RhiError;

/// Errors surfaced by the frame loop.
///
/// Transient surface staleness never appears here; it is absorbed by
/// swapchain recreation. `ContractViolation` marks misuse of the frame
/// lifecycle API and is always a programming error, reported as a hard
/// runtime error rather than a debug-only assertion.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    #[error(transparent)]
    Platform(#[from] glimmer_core::Error),

    #[error("frame lifecycle contract violation: {0}")]
    ContractViolation(&'static str),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;
