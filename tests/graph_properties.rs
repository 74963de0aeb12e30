mod common;

use common::{graph, registry};
use proptest::prelude::*;
use psgc::{compile_graph, CompilerConfig, Connection, GraphAnalyzer, NodeGraph, NodeInstance};
use std::collections::HashMap;

/// A random DAG: edges always run from a lower to a higher rank, while the
/// node list itself is shuffled so graph order says nothing about ranks.
fn dag() -> impl Strategy<Value = NodeGraph> {
    (1usize..12)
        .prop_flat_map(|n| {
            let ranks = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
            let edges = prop::collection::vec((0..n, 0..n), 0..(n * 2));
            (ranks, edges)
        })
        .prop_map(|(ranks, edges)| {
            let nodes = ranks
                .iter()
                .map(|rank| NodeInstance::new(format!("n{rank}"), "constant"))
                .collect();
            let connections = edges
                .into_iter()
                .filter(|(a, b)| a != b)
                .enumerate()
                .map(|(i, (a, b))| {
                    let (from, to) = (a.min(b), a.max(b));
                    Connection::to_parameter(
                        format!("c{i}"),
                        (format!("n{from}").as_str(), "out"),
                        (format!("n{to}").as_str(), "value"),
                    )
                })
                .collect();
            graph(nodes, connections)
        })
}

fn positions(order: &[String]) -> HashMap<&str, usize> {
    order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect()
}

proptest! {
    #[test]
    fn order_respects_every_connection(graph in dag()) {
        let config = CompilerConfig::default();
        let order = GraphAnalyzer::new(&graph, &config)
            .topological_sort()
            .expect("a DAG always sorts");
        prop_assert_eq!(order.len(), graph.nodes.len());

        let at = positions(&order);
        for conn in &graph.connections {
            prop_assert!(at[conn.source_node_id.as_str()] < at[conn.target_node_id.as_str()]);
        }
    }

    #[test]
    fn adding_an_isolated_node_keeps_connected_indices(graph in dag(), slot in any::<prop::sample::Index>()) {
        let config = CompilerConfig::default();
        let before = GraphAnalyzer::new(&graph, &config).topological_sort().expect("sorts");

        let mut grown = graph.clone();
        let at_index = slot.index(grown.nodes.len() + 1);
        grown.nodes.insert(at_index, NodeInstance::new("fresh", "constant"));
        let after = GraphAnalyzer::new(&grown, &config).topological_sort().expect("sorts");

        let connected = |id: &str| {
            graph.connections.iter().any(|c| c.source_node_id == id || c.target_node_id == id)
        };
        let old = positions(&before);
        let new = positions(&after);
        let mut connected_count = 0;
        for id in before.iter().filter(|id| connected(id.as_str())) {
            connected_count += 1;
            prop_assert_eq!(old[id.as_str()], new[id.as_str()]);
        }
        prop_assert!(new["fresh"] >= connected_count);
    }

    #[test]
    fn affected_nodes_are_closed_downstream(graph in dag()) {
        let config = CompilerConfig::default();
        let analyzer = GraphAnalyzer::new(&graph, &config);
        let changed = vec![graph.nodes[0].id.clone()];
        let affected = analyzer.find_affected_nodes(&changed);

        prop_assert_eq!(affected.first(), changed.first());
        for conn in &graph.connections {
            if affected.contains(&conn.source_node_id) {
                prop_assert!(affected.contains(&conn.target_node_id));
            }
        }
    }

    #[test]
    fn compilation_is_deterministic(graph in dag()) {
        let registry = registry();
        let first = compile_graph(&graph, &registry).expect("a DAG compiles");
        let second = compile_graph(&graph, &registry).expect("a DAG compiles");
        prop_assert_eq!(first, second);
    }
}
