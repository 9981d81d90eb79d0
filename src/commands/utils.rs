use crate::output::read_heap_report;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use log::warn;
use std::path::Path;

/// Validate a JSON heap report written by the heap command
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating heap report: {}", file_path.display());

    let report = read_heap_report(file_path)
        .with_context(|| format!("Invalid heap report {}", file_path.display()))?;

    if report.version != SCHEMA_VERSION {
        warn!(
            "Report schema v{} differs from current v{}",
            report.version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid heap report JSON");
    println!("  Version: {}", report.version);
    println!("  Source: {}", report.source);
    println!("  Total Size: {}", report.total_size);
    println!("  Stack Traces: {}", report.stack_traces);
    println!("  Top Stacks: {}", report.top_stacks.len());

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("hprofviz v{}", env!("CARGO_PKG_VERSION"));
    println!("Heap Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Call graphs and heap summaries for JVM HPROF dumps.");
}
