use hprofviz::aggregator::{build_call_graph, prune_nodes, CallGraph};
use hprofviz::parser::{parse_text_dump, CallSite, TraceSet};
use pretty_assertions::assert_eq;

fn site(name: &str, line: i32) -> CallSite {
    CallSite::new(name, format!("{}.java", name), line)
}

/// Non-recursive traces sharing `main` and `dispatch`
fn branching_set() -> TraceSet {
    let mut set = TraceSet::new();
    set.insert_trace(1, vec![site("read", 4), site("dispatch", 9), site("main", 2)], 12);
    set.insert_trace(2, vec![site("write", 8), site("dispatch", 9), site("main", 2)], 7);
    set.insert_trace(3, vec![site("dispatch", 9), site("main", 2)], 3);
    set.insert_trace(4, vec![site("gc", 1)], 5);
    set.insert_trace(5, vec![], 2);
    set
}

fn assert_edges_consistent(graph: &CallGraph) {
    for (caller_id, caller) in graph.iter() {
        if let Some(edges) = &caller.edge_weights {
            assert!(!edges.is_empty());
        }
        for (callee_id, weight) in caller.edges() {
            assert!(callee_id.index() < graph.len());
            assert!(weight > 0);
            let links = graph.node(callee_id).back_links.as_ref().unwrap();
            assert!(links.contains(&caller_id));
        }
        if let Some(links) = &caller.back_links {
            assert!(!links.is_empty());
            for link in links {
                assert!(graph.node(*link).edge_weight(caller_id).is_some());
            }
        }
    }
}

#[test]
fn test_readme_example() {
    let input = "TRACE 1:\n\tfoo(Foo.java:10)\n\tbar(Bar.java:5)\nCPU SAMPLES BEGIN (total = 5)\n   1   50%   50%     5     1  foo\nCPU SAMPLES END\n";
    let set = parse_text_dump(input.as_bytes()).unwrap();
    assert_eq!(set.traces[&1].count, 5);

    let graph = build_call_graph(&set);
    assert_eq!(graph.len(), 2);

    let (foo_id, foo) = graph.find(&CallSite::new("foo", "Foo.java", 10)).unwrap();
    let (_, bar) = graph.find(&CallSite::new("bar", "Bar.java", 5)).unwrap();
    assert_eq!(foo.count, 5);
    assert_eq!(bar.edge_weight(foo_id), Some(5));
    assert_eq!(bar.cumulative_count, 5);
}

#[test]
fn test_one_node_per_call_site() {
    let graph = build_call_graph(&branching_set());
    assert_eq!(graph.len(), 5);

    let mut sites: Vec<&CallSite> = graph.nodes().iter().map(|n| &n.call_site).collect();
    sites.sort();
    sites.dedup();
    assert_eq!(sites.len(), graph.len());
}

#[test]
fn test_self_counts_sum_to_sampled_total() {
    let set = branching_set();
    let graph = build_call_graph(&set);

    // Trace 5 has no leaf, so its samples are not attributed to any node
    assert_eq!(graph.total_count(), set.total_count() - 2);
}

#[test]
fn test_cumulative_is_self_plus_outbound_without_recursion() {
    let graph = build_call_graph(&branching_set());
    for node in graph.nodes() {
        assert_eq!(node.cumulative_count, node.count + node.outbound_weight());
    }

    let (_, main) = graph.find_by_name("main").unwrap();
    let (_, dispatch) = graph.find_by_name("dispatch").unwrap();
    assert_eq!(main.cumulative_count, 22);
    assert_eq!(dispatch.count, 3);
    assert_eq!(dispatch.outbound_weight(), 19);
}

#[test]
fn test_edges_and_back_links_agree() {
    assert_edges_consistent(&build_call_graph(&branching_set()));
}

#[test]
fn test_prune_keeps_graph_closed() {
    let graph = build_call_graph(&branching_set());
    for keep in 0..=graph.len() {
        let pruned = prune_nodes(graph.clone(), keep).unwrap();
        assert_eq!(pruned.len(), keep);
        assert_edges_consistent(&pruned);
    }
}

#[test]
fn test_prune_orders_by_self_count() {
    let pruned = prune_nodes(build_call_graph(&branching_set()), 3).unwrap();
    let counts: Vec<u64> = pruned.nodes().iter().map(|n| n.count).collect();
    assert_eq!(counts, vec![12, 7, 5]);
}
