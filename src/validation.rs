//! # Graph Validation
//!
//! Structural and type checks. Validators never fail: they return every problem
//! they find as a message so the editor can show the whole list at once.

use crate::config::{CompilerConfig, GRAPH_FORMAT_VERSION};
use crate::graph::{ConnectionTarget, NodeGraph};
use crate::metadata::{DataType, NodeMetadataProvider, NodeTypeSpec, ParamType};
use std::collections::{HashMap, HashSet};

/// Structural correctness of a graph.
pub struct GraphValidator<'a> {
    registry: &'a dyn NodeMetadataProvider,
    config: &'a CompilerConfig,
}

impl<'a> GraphValidator<'a> {
    pub fn new(registry: &'a dyn NodeMetadataProvider, config: &'a CompilerConfig) -> Self {
        Self { registry, config }
    }

    pub fn validate(&self, graph: &NodeGraph) -> Vec<String> {
        let mut errors = Vec::new();
        self.check_header(graph, &mut errors);
        let node_ids = self.check_nodes(graph, &mut errors);
        self.check_connections(graph, &node_ids, &mut errors);
        self.check_automation(graph, &mut errors);
        errors
    }

    fn check_header(&self, graph: &NodeGraph, errors: &mut Vec<String>) {
        if graph.id.trim().is_empty() {
            errors.push("Graph is missing required field 'id'".to_string());
        }
        if graph.name.trim().is_empty() {
            errors.push("Graph is missing required field 'name'".to_string());
        }
        if graph.version != GRAPH_FORMAT_VERSION {
            errors.push(format!(
                "Unsupported graph version '{}' (expected '{}')",
                graph.version, GRAPH_FORMAT_VERSION
            ));
        }
    }

    fn check_nodes<'g>(&self, graph: &'g NodeGraph, errors: &mut Vec<String>) -> HashSet<&'g str> {
        let mut seen = HashSet::new();
        for node in &graph.nodes {
            if node.id.trim().is_empty() {
                errors.push("Node is missing required field 'id'".to_string());
                continue;
            }
            if !seen.insert(node.id.as_str()) {
                errors.push(format!("Duplicate node id '{}'", node.id));
            }
            if self.config.is_virtual_source(&node.id) {
                errors.push(format!(
                    "Node id '{}' uses the reserved virtual source prefix '{}'",
                    node.id, self.config.virtual_source_prefix
                ));
            }
            if node.node_type.trim().is_empty() {
                errors.push(format!("Node '{}' is missing required field 'type'", node.id));
            } else if self.registry.get_node_metadata(&node.node_type).is_none() {
                errors.push(format!("Node '{}' has unknown type '{}'", node.id, node.node_type));
            }
        }
        seen
    }

    fn check_connections(
        &self,
        graph: &NodeGraph,
        node_ids: &HashSet<&str>,
        errors: &mut Vec<String>,
    ) {
        let mut connection_ids = HashSet::new();
        let mut targets: HashMap<String, &str> = HashMap::new();

        for conn in &graph.connections {
            if conn.id.trim().is_empty() {
                errors.push("Connection is missing required field 'id'".to_string());
            } else if !connection_ids.insert(conn.id.as_str()) {
                errors.push(format!("Duplicate connection id '{}'", conn.id));
            }
            if conn.source_port.trim().is_empty() {
                errors.push(format!("Connection '{}' is missing required field 'sourcePort'", conn.id));
            }

            let source_is_virtual = self.config.is_virtual_source(&conn.source_node_id);
            if !source_is_virtual && !node_ids.contains(conn.source_node_id.as_str()) {
                errors.push(format!(
                    "Connection '{}' references missing source node '{}'",
                    conn.id, conn.source_node_id
                ));
            }
            if self.config.is_virtual_source(&conn.target_node_id) {
                errors.push(format!(
                    "Connection '{}' targets virtual source '{}'; virtual sources may only be sources",
                    conn.id, conn.target_node_id
                ));
            } else if !node_ids.contains(conn.target_node_id.as_str()) {
                errors.push(format!(
                    "Connection '{}' references missing target node '{}'",
                    conn.id, conn.target_node_id
                ));
            }

            let key = match (&conn.target_port, &conn.target_parameter) {
                (Some(_), Some(_)) => {
                    errors.push(format!(
                        "Connection '{}' sets both targetPort and targetParameter",
                        conn.id
                    ));
                    continue;
                }
                (None, None) => {
                    errors.push(format!(
                        "Connection '{}' sets neither targetPort nor targetParameter",
                        conn.id
                    ));
                    continue;
                }
                (Some(port), None) => format!("{}:port:{}", conn.target_node_id, port),
                (None, Some(param)) => format!("{}:param:{}", conn.target_node_id, param),
            };
            if let Some(previous) = targets.insert(key, conn.id.as_str()) {
                errors.push(format!(
                    "Connections '{}' and '{}' target the same input on node '{}'",
                    previous, conn.id, conn.target_node_id
                ));
            }
        }
    }

    fn check_automation(&self, graph: &NodeGraph, errors: &mut Vec<String>) {
        let mut bound = HashSet::new();
        for lane in &graph.automation {
            let Some(node) = graph.node(&lane.node_id) else {
                errors.push(format!(
                    "Automation lane '{}' references missing node '{}'",
                    lane.id, lane.node_id
                ));
                continue;
            };
            if let Some(spec) = self.registry.get_node_metadata(&node.node_type) {
                let is_float = spec
                    .parameter(&lane.param_name)
                    .is_some_and(|p| p.param_type == ParamType::Float);
                if !is_float {
                    errors.push(format!(
                        "Automation lane '{}' targets '{}.{}', which is not a float parameter",
                        lane.id, lane.node_id, lane.param_name
                    ));
                }
            }
            if !bound.insert((lane.node_id.as_str(), lane.param_name.as_str())) {
                errors.push(format!(
                    "More than one automation lane is bound to '{}.{}'",
                    lane.node_id, lane.param_name
                ));
            }
            for (index, region) in lane.regions.iter().enumerate() {
                if region.duration.is_nan() || region.duration <= 0.0 {
                    errors.push(format!(
                        "Automation lane '{}' region {} has non-positive duration",
                        lane.id, index
                    ));
                }
                if region.curve.keyframes.iter().any(|k| !(0.0..=1.0).contains(&k.time)) {
                    errors.push(format!(
                        "Automation lane '{}' region {} has keyframes outside [0, 1]",
                        lane.id, index
                    ));
                }
            }
        }
    }
}

/// Port and parameter type compatibility.
pub struct TypeValidator<'a> {
    registry: &'a dyn NodeMetadataProvider,
    config: &'a CompilerConfig,
}

impl<'a> TypeValidator<'a> {
    pub fn new(registry: &'a dyn NodeMetadataProvider, config: &'a CompilerConfig) -> Self {
        Self { registry, config }
    }

    pub fn validate(&self, graph: &NodeGraph) -> Vec<String> {
        let mut errors = Vec::new();

        for conn in &graph.connections {
            let Some(target) = conn.target() else {
                continue;
            };
            let Some(target_spec) = self.spec_of(graph, &conn.target_node_id) else {
                continue;
            };

            let source_type = if self.config.is_virtual_source(&conn.source_node_id) {
                DataType::Float
            } else {
                let Some(source_spec) = self.spec_of(graph, &conn.source_node_id) else {
                    continue;
                };
                match source_spec.output(&conn.source_port) {
                    Some(port) => port.data_type,
                    None => {
                        errors.push(format!(
                            "Connection '{}': node '{}' has no output port '{}'",
                            conn.id, conn.source_node_id, conn.source_port
                        ));
                        continue;
                    }
                }
            };

            match target {
                ConnectionTarget::Port(port) => {
                    let Some(input) = target_spec.input(port) else {
                        errors.push(format!(
                            "Connection '{}': node '{}' has no input port '{}'",
                            conn.id, conn.target_node_id, port
                        ));
                        continue;
                    };
                    if !source_type.widens_to(input.data_type) {
                        errors.push(format!(
                            "Connection '{}': cannot connect {} output '{}.{}' to {} input '{}.{}'",
                            conn.id,
                            source_type.glsl_name(),
                            conn.source_node_id,
                            conn.source_port,
                            input.data_type.glsl_name(),
                            conn.target_node_id,
                            port
                        ));
                    }
                }
                ConnectionTarget::Parameter(param) => match target_spec.parameter(param) {
                    None => errors.push(format!(
                        "Connection '{}': node '{}' has no parameter '{}'",
                        conn.id, conn.target_node_id, param
                    )),
                    Some(spec) if spec.param_type != ParamType::Float => errors.push(format!(
                        "Connection '{}': parameter '{}.{}' is not a float parameter",
                        conn.id, conn.target_node_id, param
                    )),
                    // every DataType is numeric: int promotes, vectors demote to `.x`
                    Some(_) => {}
                },
            }
        }

        errors
    }

    fn spec_of(&self, graph: &NodeGraph, node_id: &str) -> Option<&'a NodeTypeSpec> {
        let node = graph.node(node_id)?;
        self.registry.get_node_metadata(&node.node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        AutomationLane, AutomationRegion, Connection, Curve, Interpolation, NodeInstance,
    };
    use crate::test_utils::{graph_with, test_registry};

    fn validate(graph: &NodeGraph) -> Vec<String> {
        let registry = test_registry();
        let config = CompilerConfig::default();
        GraphValidator::new(&registry, &config).validate(graph)
    }

    fn validate_types(graph: &NodeGraph) -> Vec<String> {
        let registry = test_registry();
        let config = CompilerConfig::default();
        TypeValidator::new(&registry, &config).validate(graph)
    }

    #[test]
    fn test_valid_graph_has_no_errors() {
        let graph = graph_with(
            vec![NodeInstance::new("a", "constant"), NodeInstance::new("out", "output")],
            vec![Connection::to_port("c1", ("a", "out"), ("out", "color"))],
        );
        assert!(validate(&graph).is_empty());
        assert!(validate_types(&graph).is_empty());
    }

    #[test]
    fn test_duplicate_node_id() {
        let graph = graph_with(
            vec![NodeInstance::new("a", "constant"), NodeInstance::new("a", "constant")],
            vec![],
        );
        let errors = validate(&graph);
        assert!(errors.iter().any(|e| e.contains("Duplicate node id 'a'")));
    }

    #[test]
    fn test_header_and_unknown_type() {
        let mut graph = graph_with(vec![NodeInstance::new("a", "nope")], vec![]);
        graph.version = "0.9".to_string();
        graph.name.clear();
        let errors = validate(&graph);
        assert!(errors.iter().any(|e| e.contains("version")));
        assert!(errors.iter().any(|e| e.contains("'name'")));
        assert!(errors.iter().any(|e| e.contains("unknown type 'nope'")));
    }

    #[test]
    fn test_target_port_and_parameter_exclusive() {
        let mut both = Connection::to_port("c1", ("a", "out"), ("b", "color"));
        both.target_parameter = Some("gain".to_string());
        let mut neither = Connection::to_port("c2", ("a", "out"), ("b", "color"));
        neither.target_port = None;
        let graph = graph_with(
            vec![NodeInstance::new("a", "constant"), NodeInstance::new("b", "output")],
            vec![both, neither],
        );
        let errors = validate(&graph);
        assert!(errors.iter().any(|e| e.contains("'c1' sets both")));
        assert!(errors.iter().any(|e| e.contains("'c2' sets neither")));
    }

    #[test]
    fn test_missing_endpoints_and_virtual_exemption() {
        let graph = graph_with(
            vec![NodeInstance::new("b", "scale")],
            vec![
                Connection::to_port("c1", ("ghost", "out"), ("b", "in")),
                Connection::to_parameter("c2", ("virtual:lfo", "value"), ("b", "gain")),
                Connection::to_port("c3", ("b", "out"), ("virtual:sink", "in")),
                Connection::to_port("c1", ("b", "out"), ("missing", "in")),
            ],
        );
        let errors = validate(&graph);
        assert!(errors.iter().any(|e| e.contains("missing source node 'ghost'")));
        assert!(!errors.iter().any(|e| e.contains("'virtual:lfo'")));
        assert!(errors.iter().any(|e| e.contains("targets virtual source 'virtual:sink'")));
        assert!(errors.iter().any(|e| e.contains("missing target node 'missing'")));
        assert!(errors.iter().any(|e| e.contains("Duplicate connection id 'c1'")));
    }

    #[test]
    fn test_duplicate_target_key() {
        let graph = graph_with(
            vec![
                NodeInstance::new("a", "constant"),
                NodeInstance::new("b", "constant"),
                NodeInstance::new("s", "scale"),
            ],
            vec![
                Connection::to_parameter("c1", ("a", "out"), ("s", "gain")),
                Connection::to_parameter("c2", ("b", "out"), ("s", "gain")),
            ],
        );
        let errors = validate(&graph);
        assert!(errors.iter().any(|e| e.contains("'c1' and 'c2' target the same input")));
    }

    #[test]
    fn test_automation_checks() {
        let mut graph = graph_with(vec![NodeInstance::new("s", "scale")], vec![]);
        let lane = AutomationLane {
            id: "l1".to_string(),
            node_id: "s".to_string(),
            param_name: "gain".to_string(),
            regions: vec![],
        };
        graph.automation.push(lane.clone());
        graph.automation.push(AutomationLane { id: "l2".to_string(), ..lane.clone() });
        graph.automation.push(AutomationLane {
            id: "l3".to_string(),
            node_id: "nobody".to_string(),
            ..lane
        });
        let errors = validate(&graph);
        assert!(errors.iter().any(|e| e.contains("More than one automation lane")));
        assert!(errors.iter().any(|e| e.contains("'l3' references missing node")));
    }

    #[test]
    fn test_region_duration_must_be_positive() {
        let mut graph = graph_with(vec![NodeInstance::new("s", "scale")], vec![]);
        let region = |duration: f64| AutomationRegion {
            start_time: 0.0,
            duration,
            looping: false,
            curve: Curve { interpolation: Interpolation::Linear, keyframes: vec![] },
        };
        graph.automation.push(AutomationLane {
            id: "l1".to_string(),
            node_id: "s".to_string(),
            param_name: "gain".to_string(),
            regions: vec![region(1.0), region(0.0), region(f64::NAN)],
        });
        let errors = validate(&graph);
        assert!(!errors.iter().any(|e| e.contains("region 0 ")));
        assert!(errors.iter().any(|e| e.contains("region 1 has non-positive duration")));
        assert!(errors.iter().any(|e| e.contains("region 2 has non-positive duration")));
    }

    #[test]
    fn test_float_to_vec4_port_accepted() {
        let graph = graph_with(
            vec![NodeInstance::new("a", "constant"), NodeInstance::new("t", "tint")],
            vec![Connection::to_port("c1", ("a", "out"), ("t", "color"))],
        );
        assert!(validate_types(&graph).is_empty());
    }

    #[test]
    fn test_vec4_to_float_port_rejected() {
        let graph = graph_with(
            vec![NodeInstance::new("t", "tint"), NodeInstance::new("s", "scale")],
            vec![Connection::to_port("c1", ("t", "out"), ("s", "in"))],
        );
        let errors = validate_types(&graph);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cannot connect vec4"));
    }

    #[test]
    fn test_vec4_to_float_parameter_accepted() {
        let graph = graph_with(
            vec![NodeInstance::new("t", "tint"), NodeInstance::new("s", "scale")],
            vec![Connection::to_parameter("c1", ("t", "out"), ("s", "gain"))],
        );
        assert!(validate_types(&graph).is_empty());
    }

    #[test]
    fn test_parameter_connection_needs_float_parameter() {
        let graph = graph_with(
            vec![NodeInstance::new("a", "constant"), NodeInstance::new("s", "scale")],
            vec![
                Connection::to_parameter("c1", ("a", "out"), ("s", "steps")),
                Connection::to_parameter("c2", ("a", "out"), ("s", "nothing")),
                Connection::to_port("c3", ("a", "bogus"), ("s", "in")),
            ],
        );
        let errors = validate_types(&graph);
        assert!(errors.iter().any(|e| e.contains("'s.steps' is not a float parameter")));
        assert!(errors.iter().any(|e| e.contains("no parameter 'nothing'")));
        assert!(errors.iter().any(|e| e.contains("no output port 'bogus'")));
    }
}
