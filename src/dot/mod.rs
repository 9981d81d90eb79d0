//! Graphviz DOT rendering of call graphs.
//!
//! Node and edge sizing follows pprof's classic heuristics so that hot
//! call sites stand out when the graph is laid out with `dot`.

pub mod generator;

// Re-export main types
pub use generator::{edge_weight, edge_width, font_size, render_dot, DotConfig};
