//! JSON heap report writer.
//!
//! Writes `HeapReport` structs to pretty-printed JSON files.

use super::prepare_output_path;
use crate::parser::schema::HeapReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Write a heap report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report built by the heap command
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_heap_report(report: &HeapReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing heap report to: {}", output_path.display());
    prepare_output_path(output_path)?;

    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)?;

    info!(
        "Heap report written successfully ({} bytes)",
        std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0)
    );
    Ok(())
}

/// Read a heap report back from a JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_heap_report(input_path: impl AsRef<Path>) -> Result<HeapReport, OutputError> {
    let input_path = input_path.as_ref();
    debug!("Reading heap report from: {}", input_path.display());

    let file = File::open(input_path)?;
    let report: HeapReport = serde_json::from_reader(BufReader::new(file))?;

    debug!("Heap report loaded: version {}, source {}", report.version, report.source);
    Ok(report)
}
