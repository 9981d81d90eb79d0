//! Heap command implementation.
//!
//! Decodes a binary heap dump and prints where its memory went: object
//! counts, the largest allocating stack traces, header overheads and the
//! record tag histograms. Optionally writes the same data as JSON.

use crate::aggregator::{top_trace_sizes, SerialSize};
use crate::output::write_heap_report;
use crate::parser::schema::{HeapReport, OverheadSummary, StackSize};
use crate::parser::{decode_heap_dump_file, HeapProfile};
use crate::utils::config::{DEFAULT_TOP_STACKS, SCHEMA_VERSION};
use crate::utils::error::UsageError;
use crate::utils::format::format_bytes;
use anyhow::{Context, Result};
use log::info;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the heap command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct HeapArgs {
    /// Binary dump to read
    pub input: PathBuf,

    /// Number of largest stack traces to report
    pub top: usize,

    /// Output path for the JSON report (optional)
    pub json: Option<PathBuf>,
}

impl Default for HeapArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            top: DEFAULT_TOP_STACKS,
            json: None,
        }
    }
}

/// Execute the heap command
///
/// **Public** - main entry point called from main.rs
pub fn execute_heap(args: HeapArgs) -> Result<()> {
    let start_time = Instant::now();
    if args.input.as_os_str().is_empty() {
        return Err(UsageError::EmptyPath.into());
    }

    info!("Decoding heap dump: {}", args.input.display());
    let profile = decode_heap_dump_file(&args.input)
        .with_context(|| format!("Failed to decode {}", args.input.display()))?;

    let top = top_trace_sizes(&profile.trace_sizes, args.top);
    println!("{}", summarize(&profile, &top));

    if let Some(json_path) = &args.json {
        let report = build_report(&profile, &top, &args.input.display().to_string());
        write_heap_report(&report, json_path).context("Failed to write heap report")?;
        info!("✓ Heap report written to: {}", json_path.display());
    }

    info!("Heap summary completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

fn overhead_percent(profile: &HeapProfile) -> f64 {
    if profile.total_size == 0 {
        0.0
    } else {
        100.0 * profile.total_overhead() as f64 / profile.total_size as f64
    }
}

/// Render the plain-text heap summary
///
/// **Public** - also used by tests to check the printed layout
pub fn summarize(profile: &HeapProfile, top: &[SerialSize]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} strings\n", profile.strings.len()));
    out.push_str(&format!("{} classes\n", profile.classes_by_id.len()));
    out.push_str(&format!("{} stack traces\n\n", profile.traces.len()));

    out.push_str(&format!("total size: {}\n", profile.total_size));
    out.push_str(&format!("top {} stacks:\n", top.len()));
    for entry in top {
        out.push_str(&format!(
            "{}\t{}\t({})\n",
            entry.serial,
            entry.size,
            format_bytes(entry.size)
        ));
        if let Some(trace) = profile.traces.get(&entry.serial) {
            out.push_str(&trace.to_string());
        }
    }
    out.push('\n');

    let overheads = [
        ("instance", profile.instance_overhead),
        ("object array", profile.object_array_overhead),
        ("primitive array", profile.primitive_array_overhead),
    ];
    for (kind, bytes) in overheads {
        out.push_str(&format!("{} overhead: {} ({})\n", kind, bytes, format_bytes(bytes)));
    }
    out.push_str(&format!(
        "total overhead: {}/{} ({} / {}) {:.2}%\n\n",
        profile.total_overhead(),
        profile.total_size,
        format_bytes(profile.total_overhead()),
        format_bytes(profile.total_size),
        overhead_percent(profile)
    ));

    out.push_str("tags:\n");
    for (tag, count) in &profile.tag_counts {
        out.push_str(&format!("{:#04x}\t{}\n", tag, count));
    }
    out.push_str("\nsub-tags:\n");
    for (tag, count) in &profile.sub_tag_counts {
        out.push_str(&format!("{:#04x}\t{}\n", tag, count));
    }

    out
}

fn hex_histogram(counts: &BTreeMap<u8, u64>) -> BTreeMap<String, u64> {
    counts
        .iter()
        .map(|(tag, count)| (format!("{:#04x}", tag), *count))
        .collect()
}

/// Build the serializable heap report
pub fn build_report(profile: &HeapProfile, top: &[SerialSize], source: &str) -> HeapReport {
    let top_stacks = top
        .iter()
        .map(|entry| StackSize {
            serial: entry.serial,
            size: entry.size,
            frames: profile
                .traces
                .get(&entry.serial)
                .map(|trace| {
                    trace
                        .frames
                        .iter()
                        .map(|f| {
                            format!(
                                "{} [{}] | {}:{}",
                                f.qualified_name(),
                                f.method_signature,
                                f.filename,
                                f.line_number
                            )
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .collect();

    HeapReport {
        version: SCHEMA_VERSION.to_string(),
        source: source.to_string(),
        strings: profile.strings.len(),
        classes: profile.classes_by_id.len(),
        stack_traces: profile.traces.len(),
        total_size: profile.total_size,
        overhead: OverheadSummary {
            instance: profile.instance_overhead,
            object_array: profile.object_array_overhead,
            primitive_array: profile.primitive_array_overhead,
            total: profile.total_overhead(),
        },
        top_stacks,
        tags: hex_histogram(&profile.tag_counts),
        sub_tags: hex_histogram(&profile.sub_tag_counts),
        generated_at: chrono::Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_profile() -> HeapProfile {
        let mut profile = HeapProfile::default();
        profile.total_size = 1000;
        profile.instance_overhead = 160;
        profile.object_array_overhead = 24;
        profile.primitive_array_overhead = 66;
        profile.trace_sizes.insert(3, 600);
        profile.trace_sizes.insert(4, 400);
        profile.tag_counts.insert(0x01, 2);
        profile.tag_counts.insert(0x1c, 1);
        profile.sub_tag_counts.insert(0x21, 10);
        profile
    }

    #[test]
    fn test_summarize_layout() {
        let profile = sample_profile();
        let top = top_trace_sizes(&profile.trace_sizes, 10);
        let text = summarize(&profile, &top);

        assert!(text.starts_with("0 strings\n0 classes\n0 stack traces\n\ntotal size: 1000\n"));
        assert!(text.contains("top 2 stacks:\n3\t600\t(600 B)\n4\t400\t(400 B)\n"));
        assert!(text.contains("instance overhead: 160 (160 B)\n"));
        assert!(text.contains("total overhead: 250/1000 (250 B / 1.0 kB) 25.00%\n"));
        assert!(text.contains("tags:\n0x01\t2\n0x1c\t1\n"));
        assert!(text.ends_with("sub-tags:\n0x21\t10\n"));
    }

    #[test]
    fn test_build_report_histograms() {
        let profile = sample_profile();
        let top = top_trace_sizes(&profile.trace_sizes, 1);
        let report = build_report(&profile, &top, "heap.hprof");

        assert_eq!(report.overhead.total, 250);
        assert_eq!(report.top_stacks.len(), 1);
        assert_eq!(report.top_stacks[0].serial, 3);
        assert!(report.top_stacks[0].frames.is_empty());
        assert_eq!(report.tags.get("0x1c"), Some(&1));
        assert_eq!(report.sub_tags.get("0x21"), Some(&10));
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = execute_heap(HeapArgs::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<UsageError>(), Some(UsageError::EmptyPath)));
    }
}
