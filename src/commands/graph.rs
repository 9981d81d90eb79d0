//! Graph command implementation.
//!
//! The graph command:
//! 1. Loads traces from an ASCII or binary dump
//! 2. Applies the top-K or regex trace filter
//! 3. Builds (and optionally prunes) the call graph
//! 4. Renders DOT and writes it to disk

use crate::aggregator::{apply_trace_filters, build_call_graph, prune_nodes, FilterOptions};
use crate::dot::{render_dot, DotConfig};
use crate::output::write_dot;
use crate::parser::{decode_heap_dump_file, parse_text_dump, TraceSet};
use crate::utils::error::UsageError;
use anyhow::{Context, Result};
use log::{debug, info};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Kind of dump the graph command reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// ASCII CPU-sampling dump (`cpu=samples`)
    #[default]
    Text,

    /// Binary heap dump; traces are weighted by allocated bytes
    Binary,
}

/// Arguments for the graph command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct GraphArgs {
    /// Dump to read
    pub input: PathBuf,

    /// Output path for the DOT file
    pub output: PathBuf,

    pub format: InputFormat,

    pub filters: FilterOptions,
}

impl Default for GraphArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::from("hprof.dot"),
            format: InputFormat::Text,
            filters: FilterOptions::default(),
        }
    }
}

/// Execute the graph command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Usage errors (conflicting filters, bad regex) before any file is opened
/// * Parse or decode errors from the input dump
/// * Pruning more nodes than the graph has
/// * File write errors
pub fn execute_graph(args: GraphArgs) -> Result<()> {
    let start_time = Instant::now();
    validate_args(&args)?;

    info!("Step 1/4: Loading traces from {}...", args.input.display());
    let mut traces = load_traces(&args.input, args.format)?;
    debug!(
        "Loaded {} traces over {} call sites ({} samples)",
        traces.len(),
        traces.call_sites.len(),
        traces.total_count()
    );

    info!("Step 2/4: Filtering traces...");
    apply_trace_filters(&mut traces, &args.filters)?;

    info!("Step 3/4: Building call graph...");
    let mut graph = build_call_graph(&traces);
    if let Some(keep) = args.filters.keep {
        graph = prune_nodes(graph, keep)?;
    }
    info!("{} nodes for rendering", graph.len());

    info!("Step 4/4: Rendering DOT...");
    let config = DotConfig::new().with_source_name(source_name(&args.input));
    let dot = render_dot(&graph, &config).context("Failed to render call graph")?;
    write_dot(&dot, &args.output).context("Failed to write DOT file")?;

    info!("✓ Call graph written to: {}", args.output.display());
    info!("Graph completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Validate graph arguments
///
/// **Public** - can be called before execute_graph for early validation
pub fn validate_args(args: &GraphArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() || args.output.as_os_str().is_empty() {
        return Err(UsageError::EmptyPath.into());
    }
    args.filters.validate()?;
    Ok(())
}

/// Read a dump into a trace set
///
/// **Public** - shared by the graph command and integration tests
pub fn load_traces(path: &Path, format: InputFormat) -> Result<TraceSet> {
    match format {
        InputFormat::Text => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            parse_text_dump(BufReader::new(file))
                .with_context(|| format!("Failed to parse {}", path.display()))
        }
        InputFormat::Binary => {
            let profile = decode_heap_dump_file(path)
                .with_context(|| format!("Failed to decode {}", path.display()))?;
            Ok(profile.to_trace_set())
        }
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
