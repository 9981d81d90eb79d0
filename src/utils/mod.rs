//! Utility modules for configuration, error handling, and formatting.

pub mod config;
pub mod error;
pub mod format;

// Re-export commonly used error types for convenience
pub use error::{DecodeError, DotError, OutputError, ParseError, UsageError};
pub use format::{format_bytes, format_fraction};
