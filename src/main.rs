//! hprofviz CLI
//!
//! Renders JVM HPROF CPU-sampling dumps as Graphviz call graphs and
//! summarizes binary heap dumps by allocating stack trace.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use hprofviz::aggregator::FilterOptions;
use hprofviz::commands::{
    display_version, execute_graph, execute_heap, validate_report_file, GraphArgs, HeapArgs,
    InputFormat,
};
use hprofviz::utils::config::DEFAULT_TOP_STACKS;

/// hprofviz - call graphs and heap summaries for HPROF dumps
#[derive(Parser, Debug)]
#[command(name = "hprofviz")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a dump as a DOT call graph
    Graph {
        /// HPROF dump (ASCII `cpu=samples` output unless --binary)
        input: PathBuf,

        /// Output path for the DOT file
        output: PathBuf,

        /// Read a binary heap dump; edges are weighted by allocated bytes
        #[arg(long)]
        binary: bool,

        /// Keep only the K most frequently sampled traces
        #[arg(long)]
        topk: Option<usize>,

        /// Keep only traces whose leaf method name matches this regex
        #[arg(long)]
        regex: Option<String>,

        /// Keep only the N nodes with the highest self count
        #[arg(long)]
        keep: Option<usize>,
    },

    /// Summarize a binary heap dump
    Heap {
        /// Binary HPROF dump
        input: PathBuf,

        /// Number of largest stack traces to print
        #[arg(long, default_value_t = DEFAULT_TOP_STACKS)]
        top: usize,

        /// Also write the summary as a JSON report
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Validate a JSON heap report
    Validate {
        /// Path to heap report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Graph {
            input,
            output,
            binary,
            topk,
            regex,
            keep,
        } => {
            let args = GraphArgs {
                input,
                output,
                format: if binary {
                    InputFormat::Binary
                } else {
                    InputFormat::Text
                },
                filters: FilterOptions {
                    top_k: topk,
                    regex,
                    keep,
                },
            };
            execute_graph(args)?;
        }

        Commands::Heap { input, top, json } => {
            execute_heap(HeapArgs { input, top, json })?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
