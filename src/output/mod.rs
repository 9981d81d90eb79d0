//! Output writers for rendered graphs and heap reports.
//!
//! This module handles writing data to disk in various formats:
//! - DOT call graphs
//! - JSON heap reports

pub mod dot;
pub mod json;

use crate::utils::error::OutputError;
use log::debug;
use std::path::Path;

// Re-export main functions
pub use dot::write_dot;
pub use json::{read_heap_report, write_heap_report};

/// Check that `path` can be written and create its parent directories
///
/// **Private** - shared by the writers in this module
pub(crate) fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}
