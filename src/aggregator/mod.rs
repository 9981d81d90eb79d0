//! Aggregation of parsed traces into a call graph and size rankings.
//!
//! This module transforms parsed dumps into:
//! - A deduplicated, weighted call graph (for DOT rendering)
//! - Filtered trace sets and pruned graphs
//! - The largest allocating stack traces of a heap dump

pub mod call_graph;
pub mod filter;
pub mod heap_sizes;

// Re-export main types and functions
pub use call_graph::{build_call_graph, CallGraph, Node, NodeId};
pub use filter::{apply_trace_filters, filter_matching, filter_top_k, prune_nodes, FilterOptions};
pub use heap_sizes::{top10, top_trace_sizes, SerialSize};
