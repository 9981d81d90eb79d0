//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod graph;
pub mod heap;
pub mod utils;

// Re-export main command functions
pub use graph::{execute_graph, load_traces, validate_args, GraphArgs, InputFormat};
pub use heap::{build_report, execute_heap, summarize, HeapArgs};
pub use utils::{display_version, validate_report_file};
