//! # graphdump Utilities
//!
//! Shared utilities and logging for graphdump.
//!
//! This crate provides common functionality used across the graphdump
//! workspace, including logging infrastructure built on `tracing`.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with, LogFormat, LogLevel, LogSettings, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
