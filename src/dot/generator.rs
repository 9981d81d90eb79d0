//! DOT text generation for a `CallGraph`.

use crate::aggregator::CallGraph;
use crate::utils::error::DotError;
use log::info;
use std::fmt::Write;

/// Upper bound on the layout weight of a single edge
const MAX_EDGE_WEIGHT: f64 = 100_000.0;

/// DOT rendering configuration
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Name shown in the graph title and the legend, usually the input file
    pub source_name: String,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            source_name: "hprof".to_string(),
        }
    }
}

impl DotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }
}

/// Font size for a node with `count` self samples out of `total`
pub fn font_size(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 8.0;
    }
    50.0 * (count as f64 / total as f64).sqrt() + 8.0
}

/// Layout weight for an edge, `w^0.7` capped at 100000
pub fn edge_weight(weight: u64) -> u64 {
    (weight as f64).powf(0.7).min(MAX_EDGE_WEIGHT) as u64
}

/// Pen width for an edge, between 1 and 2
pub fn edge_width(weight: u64, total: u64) -> f64 {
    if total == 0 {
        return 1.0;
    }
    let fraction = (3.0 * weight as f64 / total as f64).min(1.0);
    (fraction * 2.0).max(1.0)
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render a call graph as a Graphviz digraph
///
/// **Public** - main entry point for DOT generation
///
/// # Arguments
/// * `graph` - Aggregated (and optionally pruned) call graph
/// * `config` - Rendering options
///
/// # Returns
/// DOT source text; nodes are numbered `N1..Nn` in graph order
///
/// # Errors
/// * `DotError::EmptyGraph` - the graph has no nodes
pub fn render_dot(graph: &CallGraph, config: &DotConfig) -> Result<String, DotError> {
    if graph.is_empty() {
        return Err(DotError::EmptyGraph);
    }

    let total = graph.total_count();
    let source = escape(&config.source_name);
    info!("Rendering {} nodes ({} samples) as DOT", graph.len(), total);

    let mut out = String::new();
    writeln!(out, "digraph \"HProf output for {}\" {{", source)?;
    writeln!(out, "node [width=0.375,height=0.25];")?;
    writeln!(
        out,
        "Legend [shape=box,fontsize=24,shape=plaintext,label=\"{}:\\lexamining {} samples\"];",
        source, total
    )?;

    for (id, node) in graph.iter() {
        let site = &node.call_site;
        let line = if site.line_number > 0 {
            site.line_number.to_string()
        } else {
            "???".to_string()
        };
        let label = format!(
            "{} ({:.1}%) {}[{}:{}]",
            node.count,
            percent(node.count, total),
            site.name,
            site.filename,
            line
        );
        writeln!(
            out,
            "N{} [label=\"{}\",shape=box,fontsize={:.2}];",
            id.index() + 1,
            escape(&label),
            font_size(node.count, total)
        )?;
    }
    writeln!(out)?;

    for (id, node) in graph.iter() {
        for (callee, weight) in node.edges() {
            writeln!(
                out,
                "N{} -> N{} [label=\"{} ({:.1}%)\", weight={}, style=\"setlinewidth({:.3})\"];",
                id.index() + 1,
                callee.index() + 1,
                weight,
                percent(weight, total),
                edge_weight(weight),
                edge_width(weight, total)
            )?;
        }
    }
    writeln!(out, "}}")?;

    Ok(out)
}
