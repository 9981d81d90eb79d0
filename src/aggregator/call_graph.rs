//! Build a weighted call graph from a set of traces.
//!
//! Every distinct call site becomes exactly one node. Walking a stack
//! from the leaf (index 0) toward the root:
//! - the leaf's node gets the trace count as self count
//! - every node on the stack gets it once as cumulative count
//! - each caller (index i+1) gets an edge to its callee (index i)
//!   weighted by the trace count, and the callee a back-link
//!
//! Example: stack [foo, bar] with count 5 gives foo.count = 5,
//! bar.cumulative_count = 5 and an edge bar -> foo of weight 5.

use crate::parser::{CallSite, CallSiteId, TraceSet};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Index of a node inside its `CallGraph`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// A call graph vertex aggregating one call site across all traces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub call_site: CallSite,

    /// Samples in which this site was the executing leaf
    pub count: u64,

    /// Samples in which this site appeared anywhere on the stack
    pub cumulative_count: u64,

    /// Outbound caller -> callee edges; `None` when there are none
    pub edge_weights: Option<BTreeMap<NodeId, u64>>,

    /// Inbound edges (callers of this node); `None` when there are none
    pub back_links: Option<BTreeSet<NodeId>>,
}

impl Node {
    fn new(call_site: CallSite) -> Self {
        Self {
            call_site,
            count: 0,
            cumulative_count: 0,
            edge_weights: None,
            back_links: None,
        }
    }

    /// Outbound edges as (callee, weight), ordered by callee id
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.edge_weights
            .iter()
            .flat_map(|edges| edges.iter().map(|(id, weight)| (*id, *weight)))
    }

    /// Sum of all outbound edge weights
    pub fn outbound_weight(&self) -> u64 {
        self.edges().map(|(_, weight)| weight).sum()
    }

    pub fn edge_weight(&self, callee: NodeId) -> Option<u64> {
        self.edge_weights
            .as_ref()
            .and_then(|edges| edges.get(&callee).copied())
    }
}

/// Owner of all nodes; nodes refer to each other by `NodeId`
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: Vec<Node>,
}

impl CallGraph {
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node; ids are only valid for the graph that produced them
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// First node whose call site has the given method name
    pub fn find_by_name(&self, name: &str) -> Option<(NodeId, &Node)> {
        self.iter().find(|(_, node)| node.call_site.name == name)
    }

    /// Node for an exact call site
    pub fn find(&self, site: &CallSite) -> Option<(NodeId, &Node)> {
        self.iter().find(|(_, node)| &node.call_site == site)
    }

    /// Sum of self counts over all nodes
    pub fn total_count(&self) -> u64 {
        self.nodes.iter().map(|node| node.count).sum()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

/// Build the call graph for a trace set
///
/// **Public** - main entry point for aggregation
///
/// Traces are visited in ascending id order, so node order (first touch)
/// is deterministic for a given input.
pub fn build_call_graph(traces: &TraceSet) -> CallGraph {
    debug!("Building call graph from {} traces", traces.len());

    let mut nodes: Vec<Node> = Vec::new();
    let mut by_site: HashMap<CallSiteId, NodeId> = HashMap::new();

    for trace in traces.traces.values() {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut callee: Option<NodeId> = None;

        for (position, &site_id) in trace.stack.iter().enumerate() {
            let node_id = *by_site.entry(site_id).or_insert_with(|| {
                nodes.push(Node::new(traces.call_sites.get(site_id).clone()));
                NodeId(nodes.len() - 1)
            });

            let node = &mut nodes[node_id.0];
            if position == 0 {
                node.count += trace.count;
            }
            if seen.insert(node_id) {
                node.cumulative_count += trace.count;
            }
            if let Some(callee_id) = callee {
                *node
                    .edge_weights
                    .get_or_insert_with(BTreeMap::new)
                    .entry(callee_id)
                    .or_insert(0) += trace.count;
                nodes[callee_id.0]
                    .back_links
                    .get_or_insert_with(BTreeSet::new)
                    .insert(node_id);
            }

            callee = Some(node_id);
        }
    }

    debug!("Built {} nodes", nodes.len());
    CallGraph::from_nodes(nodes)
}
