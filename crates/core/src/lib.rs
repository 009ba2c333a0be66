//! Foundation utilities shared by the glimmer crates.
//!
//! This crate provides the pieces every other layer leans on:
//! - Error types and result aliases
//! - Logging initialization
//! - Frame timing

mod error;
mod logging;
mod timer;

pub use error::{Error, Result};
pub use logging::init_logging;
pub use timer::Timer;
