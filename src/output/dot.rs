//! DOT graph output writer.

use super::prepare_output_path;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write DOT source to a file
///
/// **Public** - main entry point for graph output
///
/// # Arguments
/// * `dot_content` - DOT text from `render_dot`
/// * `output_path` - Path to output file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent cannot be created
pub fn write_dot(dot_content: &str, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing call graph to: {}", output_path.display());
    prepare_output_path(output_path)?;

    if output_path.extension().map_or(true, |ext| ext != "dot") {
        debug!("File does not have .dot extension: {}", output_path.display());
    }

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(dot_content.as_bytes())?;
    writer.flush()?;

    info!("Call graph written successfully ({} bytes)", dot_content.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    const SMALL_DOT: &str = "digraph \"g\" {\nN1 [label=\"x\"];\n}\n";

    #[test]
    fn test_write_dot() {
        let temp_file = NamedTempFile::new().unwrap();
        write_dot(SMALL_DOT, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content, SMALL_DOT);
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested_path = temp_dir.path().join("nested/dirs/graph.dot");

        write_dot(SMALL_DOT, &nested_path).unwrap();
        assert!(nested_path.exists());
    }

    #[test]
    fn test_write_to_directory_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = write_dot(SMALL_DOT, temp_dir.path());
        assert!(matches!(result, Err(OutputError::InvalidPath(_))));
    }
}
