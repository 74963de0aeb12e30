//! # Graph Analysis
//!
//! Dependency and dependents graphs plus the deterministic execution order the
//! code generator walks.

use crate::config::CompilerConfig;
use crate::error::{CompileError, Result};
use crate::graph::NodeGraph;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Dependency analysis over one graph snapshot.
pub struct GraphAnalyzer<'a> {
    graph: &'a NodeGraph,
    config: &'a CompilerConfig,
    /// Node ids in graph order, first occurrence only.
    node_ids: Vec<&'a str>,
}

impl<'a> GraphAnalyzer<'a> {
    pub fn new(graph: &'a NodeGraph, config: &'a CompilerConfig) -> Self {
        let mut seen = HashSet::new();
        let node_ids = graph
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| seen.insert(*id))
            .collect();
        Self { graph, config, node_ids }
    }

    /// Edges between two real nodes as `(source, target)`, in connection order.
    fn edges(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        let known: HashSet<&str> = self.node_ids.iter().copied().collect();
        self.graph.connections.iter().filter_map(move |conn| {
            let source = conn.source_node_id.as_str();
            let target = conn.target_node_id.as_str();
            let counted = !self.config.is_virtual_source(source)
                && known.contains(source)
                && known.contains(target);
            counted.then_some((source, target))
        })
    }

    /// Node -> ids of the nodes it reads from (ports and parameters alike).
    pub fn build_dependency_graph(&self) -> BTreeMap<String, Vec<String>> {
        let mut deps: BTreeMap<String, Vec<String>> = self
            .node_ids
            .iter()
            .map(|id| (id.to_string(), Vec::new()))
            .collect();
        for (source, target) in self.edges() {
            if let Some(list) = deps.get_mut(target) {
                if !list.iter().any(|s| s == source) {
                    list.push(source.to_string());
                }
            }
        }
        deps
    }

    /// Node -> ids of the nodes that read from it.
    pub fn build_dependents_graph(&self) -> BTreeMap<String, Vec<String>> {
        let mut dependents: BTreeMap<String, Vec<String>> = self
            .node_ids
            .iter()
            .map(|id| (id.to_string(), Vec::new()))
            .collect();
        for (source, target) in self.edges() {
            if let Some(list) = dependents.get_mut(source) {
                if !list.iter().any(|t| t == target) {
                    list.push(target.to_string());
                }
            }
        }
        dependents
    }

    /// `changed` plus everything transitively downstream of it, in BFS order.
    ///
    /// For editor-side invalidation; the compiler itself always does a full pass.
    pub fn find_affected_nodes(&self, changed: &[String]) -> Vec<String> {
        let dependents = self.build_dependents_graph();
        let mut visited: HashSet<String> = HashSet::new();
        let mut affected = Vec::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for id in changed {
            if visited.insert(id.clone()) {
                queue.push_back(id.clone());
            }
        }
        while let Some(id) = queue.pop_front() {
            if let Some(next) = dependents.get(&id) {
                for target in next {
                    if visited.insert(target.clone()) {
                        queue.push_back(target.clone());
                    }
                }
            }
            affected.push(id);
        }
        affected
    }

    /// Kahn's algorithm over the connected nodes, then every fully isolated node.
    ///
    /// Isolated nodes go last so adding one never shifts the index of a connected
    /// node. Fails with [`CompileError::CycleDetected`] when not every node fits.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let participating: HashSet<&str> = self
            .graph
            .connections
            .iter()
            .flat_map(|c| [c.source_node_id.as_str(), c.target_node_id.as_str()])
            .collect();
        let dependents = self.build_dependents_graph();
        let dependencies = self.build_dependency_graph();

        let mut in_degree: HashMap<&str, usize> = self
            .node_ids
            .iter()
            .map(|id| (*id, dependencies.get(*id).map_or(0, Vec::len)))
            .collect();

        let (connected, isolated): (Vec<&str>, Vec<&str>) = self
            .node_ids
            .iter()
            .partition(|id| participating.contains(**id));

        let mut queue: VecDeque<&str> = connected
            .iter()
            .copied()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();
        let mut order: Vec<String> = Vec::with_capacity(self.node_ids.len());

        while let Some(id) = queue.pop_front() {
            order.push(id.to_string());
            if let Some(next) = dependents.get(id) {
                for target in next {
                    if let Some(degree) = in_degree.get_mut(target.as_str()) {
                        *degree -= 1;
                        if *degree == 0 {
                            queue.push_back(target.as_str());
                        }
                    }
                }
            }
        }
        order.extend(isolated.iter().map(|id| id.to_string()));

        if order.len() != self.node_ids.len() {
            let placed: HashSet<&str> = order.iter().map(String::as_str).collect();
            let remaining: Vec<String> = self
                .node_ids
                .iter()
                .filter(|id| !placed.contains(**id))
                .map(|id| id.to_string())
                .collect();
            tracing::error!("[PSGC] Cycle detected among nodes: {:?}", remaining);
            return Err(CompileError::CycleDetected { remaining });
        }

        Ok(order)
    }
}
