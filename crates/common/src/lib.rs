//! Subburn Common Utilities
//!
//! Shared infrastructure for all Subburn crates:
//! - Error types and result aliases
//! - Tick clocks for the preview loop and export capture
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
