//! Base error type shared across the engine crates.

use thiserror::Error;

/// Top-level error type for engine initialization and platform glue.
#[derive(Error, Debug)]
pub enum Error {
    /// Window creation or management errors
    #[error("Window error: {0}")]
    Window(String),

    /// Graphics backend errors surfaced through the platform layer
    #[error("Graphics error: {0}")]
    Graphics(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using the engine's base `Error`.
pub type Result<T> = std::result::Result<T, Error>;
