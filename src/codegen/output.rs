//! Final color resolution.

use super::glsl::to_color;
use super::node_code::{connected_input, fallback_input};
use super::params::ParameterResolver;
use super::{push_warning, CompileContext, MAIN_COORDINATES};
use crate::graph::NodeInstance;
use crate::metadata::{DataType, NodeTypeSpec, PortSpec};
use crate::naming::output_variable_name;

/// Black.
pub const DEFAULT_COLOR: &str = "vec3(0.0)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalOutput {
    pub node_id: Option<String>,
    /// RGB expression written to the fragment color.
    pub color_expr: String,
}

fn is_color(data_type: DataType) -> bool {
    matches!(data_type, DataType::Vec3 | DataType::Vec4)
}

fn color_output(spec: &NodeTypeSpec) -> Option<&PortSpec> {
    spec.outputs.iter().find(|port| is_color(port.data_type))
}

/// Pick the node whose value becomes the pixel color and project it to RGB.
///
/// A unique terminal node wins. Among several terminals, those without outgoing
/// connections are preferred, then the latest in execution order. Without any
/// terminal, the last node exposing a vec3/vec4 output is used.
pub fn resolve_final_output(ctx: &CompileContext<'_>, warnings: &mut Vec<String>) -> FinalOutput {
    let terminals: Vec<(&NodeInstance, &NodeTypeSpec)> = ctx
        .ordered_nodes()
        .filter(|(_, spec)| spec.category == ctx.config.output_category)
        .collect();

    if terminals.len() > 1 {
        push_warning(
            warnings,
            format!(
                "{} terminal nodes found; picking one for the final color",
                terminals.len()
            ),
        );
    }
    let chosen = terminals
        .iter()
        .rev()
        .find(|(node, _)| !ctx.has_outgoing(&node.id))
        .or_else(|| terminals.last());

    if let Some((node, spec)) = chosen {
        let color_expr = terminal_value(ctx, node, spec, warnings);
        tracing::debug!("[PSGC] Final output from terminal node {}", node.id);
        return FinalOutput { node_id: Some(node.id.clone()), color_expr };
    }

    let fallback = ctx
        .ordered_nodes()
        .filter_map(|(node, spec)| color_output(spec).map(|port| (node, port)))
        .last();
    match fallback {
        Some((node, port)) => {
            tracing::debug!("[PSGC] No terminal node; using color output of {}", node.id);
            FinalOutput {
                node_id: Some(node.id.clone()),
                color_expr: to_color(&output_variable_name(&node.id, &port.name), port.data_type),
            }
        }
        None => {
            push_warning(warnings, "No color output found; rendering black".to_string());
            FinalOutput { node_id: None, color_expr: DEFAULT_COLOR.to_string() }
        }
    }
}

fn terminal_value(
    ctx: &CompileContext<'_>,
    node: &NodeInstance,
    spec: &NodeTypeSpec,
    warnings: &mut Vec<String>,
) -> String {
    if let Some(port) = color_output(spec) {
        return to_color(&output_variable_name(&node.id, &port.name), port.data_type);
    }
    let Some(port) = spec
        .inputs
        .iter()
        .find(|port| is_color(port.data_type))
        .or_else(|| spec.inputs.first())
    else {
        return DEFAULT_COLOR.to_string();
    };
    let value = match ctx.port_connection(&node.id, &port.name) {
        Some(conn) => connected_input(ctx, conn, port, warnings),
        None => None,
    };
    let value = value.unwrap_or_else(|| {
        let params = ParameterResolver::new(ctx).resolve_all(node, spec, warnings);
        fallback_input(node, port, &params, Some(MAIN_COORDINATES), warnings)
    });
    to_color(&value, port.data_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use crate::graph::{Connection, NodeGraph};
    use crate::test_utils::{graph_with, test_registry};
    use crate::uniforms::UniformGenerator;
    use std::collections::HashSet;

    fn resolve(graph: &NodeGraph, order: &[&str], declared: &[&str]) -> (FinalOutput, Vec<String>) {
        let registry = test_registry();
        let config = CompilerConfig::default();
        let order: Vec<String> = order.iter().map(|s| s.to_string()).collect();
        let uniforms = UniformGenerator::new(graph, &registry, &config);
        let mut ctx = CompileContext::new(graph, &registry, &config, &order, &uniforms);
        ctx.set_declared(declared.iter().map(|s| s.to_string()).collect::<HashSet<_>>());
        let mut warnings = Vec::new();
        let output = resolve_final_output(&ctx, &mut warnings);
        (output, warnings)
    }

    #[test]
    fn test_terminal_reads_connected_input() {
        let graph = graph_with(
            vec![NodeInstance::new("a", "seven"), NodeInstance::new("o", "output")],
            vec![Connection::to_port("c1", ("a", "out"), ("o", "color"))],
        );
        let (output, warnings) = resolve(&graph, &["a", "o"], &["node_a_out"]);
        assert_eq!(output.node_id.as_deref(), Some("o"));
        assert_eq!(output.color_expr, "vec3(node_a_out)");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unconnected_terminal_is_black() {
        let graph = graph_with(vec![NodeInstance::new("o", "output")], vec![]);
        let (output, _) = resolve(&graph, &["o"], &[]);
        assert_eq!(output.color_expr, "vec3(0.0)");
    }

    #[test]
    fn test_falls_back_to_last_color_output() {
        let graph = graph_with(
            vec![NodeInstance::new("t1", "tint"), NodeInstance::new("t2", "tint")],
            vec![],
        );
        let (output, _) = resolve(&graph, &["t1", "t2"], &[]);
        assert_eq!(output.node_id.as_deref(), Some("t2"));
        assert_eq!(output.color_expr, "node_t2_out.xyz");
    }

    #[test]
    fn test_prefers_terminal_without_outgoing() {
        let graph = graph_with(
            vec![
                NodeInstance::new("o1", "output"),
                NodeInstance::new("o2", "output"),
            ],
            vec![Connection::to_port("c1", ("o2", "color"), ("o1", "color"))],
        );
        let (output, warnings) = resolve(&graph, &["o2", "o1"], &[]);
        assert_eq!(output.node_id.as_deref(), Some("o1"));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_nothing_renders_black() {
        let graph = graph_with(vec![NodeInstance::new("a", "seven")], vec![]);
        let (output, warnings) = resolve(&graph, &["a"], &[]);
        assert_eq!(output, FinalOutput { node_id: None, color_expr: DEFAULT_COLOR.to_string() });
        assert_eq!(warnings.len(), 1);
    }
}
