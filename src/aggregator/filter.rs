//! Trace filters and node pruning.
//!
//! Trace filters run before aggregation and narrow the trace set:
//! keep the K most sampled traces, or keep traces whose leaf method
//! matches a regex (never both at once). Node pruning runs after
//! aggregation and keeps the N nodes with the highest self count.

use super::call_graph::{CallGraph, Node, NodeId};
use crate::parser::TraceSet;
use crate::utils::error::UsageError;
use crate::utils::format::format_fraction;
use log::info;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Filter selections, one field per CLI knob
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Keep only the K most frequently sampled traces; 0 disables the filter
    pub top_k: Option<usize>,

    /// Keep only traces whose leaf method name matches this pattern
    pub regex: Option<String>,

    /// Keep only the N nodes with the highest self count
    pub keep: Option<usize>,
}

impl FilterOptions {
    /// Check option combinations before any input is read
    ///
    /// # Errors
    /// * `UsageError::ConflictingFilters` - both top-K and regex given
    /// * `UsageError::InvalidRegex` - the pattern does not compile
    pub fn validate(&self) -> Result<(), UsageError> {
        if self.active_top_k().is_some() && self.regex.is_some() {
            return Err(UsageError::ConflictingFilters);
        }
        self.compiled_regex()?;
        Ok(())
    }

    /// The top-K limit, if one is in effect
    pub fn active_top_k(&self) -> Option<usize> {
        self.top_k.filter(|&k| k > 0)
    }

    pub fn compiled_regex(&self) -> Result<Option<Regex>, UsageError> {
        self.regex
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(UsageError::from)
    }
}

/// Keep the `k` traces with the largest count
///
/// Ties go to the lower trace id. Keeping at least as many traces as
/// there are leaves the set untouched.
pub fn filter_top_k(traces: &mut TraceSet, k: usize) {
    let mut ranked: Vec<(u64, u32)> = traces.traces.values().map(|t| (t.count, t.id)).collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    let kept: HashSet<u32> = ranked.into_iter().take(k).map(|(_, id)| id).collect();
    traces.traces.retain(|id, _| kept.contains(id));
}

/// Keep traces whose leaf method name matches `regex`
///
/// Traces with an empty stack have no leaf and are dropped.
pub fn filter_matching(traces: &mut TraceSet, regex: &Regex) {
    let sites = &traces.call_sites;
    traces.traces.retain(|_, trace| {
        trace
            .leaf()
            .map(|leaf| regex.is_match(&sites.get(leaf).name))
            .unwrap_or(false)
    });
}

/// Apply the trace-level filters selected in `options`
///
/// Logs how many samples survive each filter.
pub fn apply_trace_filters(traces: &mut TraceSet, options: &FilterOptions) -> Result<(), UsageError> {
    options.validate()?;

    if let Some(k) = options.active_top_k() {
        let before = traces.total_count();
        filter_top_k(traces, k);
        info!(
            "Keeping {} of samples after filtering top {} most frequently sampled",
            format_fraction(traces.total_count(), before),
            k
        );
    }

    if let Some(regex) = options.compiled_regex()? {
        let before = traces.total_count();
        filter_matching(traces, &regex);
        info!(
            "Keeping {} of samples after filtering matching samples",
            format_fraction(traces.total_count(), before)
        );
    }

    Ok(())
}

/// Keep the `keep` nodes with the highest self count
///
/// Retained nodes are ordered by self count (descending, ties by original
/// position). Edges and back-links to dropped nodes are removed; a node
/// left without edges has `None`, never an empty map.
///
/// # Errors
/// * `UsageError::PruneExceedsNodes` - `keep` is larger than the graph
pub fn prune_nodes(graph: CallGraph, keep: usize) -> Result<CallGraph, UsageError> {
    if keep > graph.len() {
        return Err(UsageError::PruneExceedsNodes {
            requested: keep,
            available: graph.len(),
        });
    }

    let mut order: Vec<NodeId> = graph.iter().map(|(id, _)| id).collect();
    order.sort_by(|a, b| {
        graph
            .node(*b)
            .count
            .cmp(&graph.node(*a).count)
            .then(a.cmp(b))
    });
    order.truncate(keep);

    let remap: HashMap<NodeId, NodeId> = order
        .iter()
        .enumerate()
        .map(|(position, old)| (*old, NodeId::from_index(position)))
        .collect();

    let mut slots: Vec<Option<Node>> = graph.into_nodes().into_iter().map(Some).collect();
    let nodes: Vec<Node> = order
        .iter()
        .filter_map(|old| slots[old.index()].take())
        .map(|mut node| {
            node.edge_weights = node.edge_weights.take().and_then(|edges| {
                let kept: BTreeMap<NodeId, u64> = edges
                    .into_iter()
                    .filter_map(|(callee, weight)| remap.get(&callee).map(|id| (*id, weight)))
                    .collect();
                (!kept.is_empty()).then_some(kept)
            });
            node.back_links = node.back_links.take().and_then(|links| {
                let kept: BTreeSet<NodeId> = links
                    .into_iter()
                    .filter_map(|caller| remap.get(&caller).copied())
                    .collect();
                (!kept.is_empty()).then_some(kept)
            });
            node
        })
        .collect();

    info!("Pruned call graph to {} of {} nodes", nodes.len(), slots.len());
    Ok(CallGraph::from_nodes(nodes))
}
