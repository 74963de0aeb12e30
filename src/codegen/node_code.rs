//! # Per-Node Code
//!
//! Input resolution and the labeled body each node contributes to `main()`.

use super::glsl::{assemble, convert};
use super::params::{ParameterResolver, ResolvedParam};
use super::raymarch::RaymarchCalls;
use super::scanner::rename_identifiers;
use super::{
    indent, push_warning, substitute, Bindings, CompileContext, Coordinates, MAIN_COORDINATES,
};
use crate::graph::{Connection, NodeInstance};
use crate::metadata::{DataType, NodeTypeSpec, PortSpec};
use crate::naming::output_variable_name;
use crate::template::Template;
use std::collections::BTreeMap;

/// Far-away distance used when a raymarcher has nothing to march against.
pub const NO_SURFACE_DISTANCE: &str = "1000.0";

/// Value of a connected input, converted to the port's type. `None` when the
/// source cannot be referenced.
pub(crate) fn connected_input(
    ctx: &CompileContext<'_>,
    conn: &Connection,
    port: &PortSpec,
    warnings: &mut Vec<String>,
) -> Option<String> {
    if ctx.is_virtual(&conn.source_node_id) {
        let uniform = ctx.uniforms.virtual_uniform(&conn.source_node_id)?;
        return Some(convert(uniform, DataType::Float, port.data_type));
    }
    let symbol = output_variable_name(&conn.source_node_id, &conn.source_port);
    if !ctx.is_declared(&symbol) {
        push_warning(
            warnings,
            format!(
                "Connection '{}' references undeclared '{}'; falling back for input '{}.{}'",
                conn.id, symbol, conn.target_node_id, port.name
            ),
        );
        return None;
    }
    let source_type = ctx
        .output_type(&conn.source_node_id, &conn.source_port)
        .unwrap_or(DataType::Float);
    Some(convert(&symbol, source_type, port.data_type))
}

/// Value of an unconnected input: fallback expression, else fallback
/// parameters in the port's arity, else zero.
pub(crate) fn fallback_input(
    node: &NodeInstance,
    port: &PortSpec,
    params: &BTreeMap<String, ResolvedParam>,
    coords: Option<Coordinates<'_>>,
    warnings: &mut Vec<String>,
) -> String {
    if let Some(fallback) = &port.fallback {
        let empty = BTreeMap::new();
        let bindings = Bindings {
            node_id: &node.id,
            inputs: &empty,
            outputs: &empty,
            params,
            coords,
            sdf_call: None,
            displacement: None,
        };
        return substitute(&Template::parse(fallback), &bindings, warnings);
    }
    if !port.fallback_params.is_empty() {
        let components: Vec<String> = port
            .fallback_params
            .iter()
            .map(|name| match params.get(name) {
                Some(resolved) => resolved.expr.clone(),
                None => {
                    push_warning(
                        warnings,
                        format!(
                            "Input '{}.{}' falls back to unknown parameter '{}'",
                            node.id, port.name, name
                        ),
                    );
                    "0.0".to_string()
                }
            })
            .collect();
        return assemble(&components, port.data_type);
    }
    port.data_type.zero().to_string()
}

/// Resolve every input of `node` against the global output variables.
/// Fallback expressions see `coords`.
pub(crate) fn resolve_inputs(
    ctx: &CompileContext<'_>,
    node: &NodeInstance,
    spec: &NodeTypeSpec,
    params: &BTreeMap<String, ResolvedParam>,
    coords: Option<Coordinates<'_>>,
    warnings: &mut Vec<String>,
) -> BTreeMap<String, String> {
    spec.inputs
        .iter()
        .map(|port| {
            let value = ctx
                .port_connection(&node.id, &port.name)
                .and_then(|conn| connected_input(ctx, conn, port, warnings))
                .unwrap_or_else(|| fallback_input(node, port, params, coords, warnings));
            (port.name.clone(), value)
        })
        .collect()
}

pub(crate) fn output_variables(node: &NodeInstance, spec: &NodeTypeSpec) -> BTreeMap<String, String> {
    spec.outputs
        .iter()
        .map(|port| (port.name.clone(), output_variable_name(&node.id, &port.name)))
        .collect()
}

/// Body of one node as a labeled scope, or `None` when the node emits nothing.
pub fn generate_node_body(
    ctx: &CompileContext<'_>,
    node: &NodeInstance,
    spec: &NodeTypeSpec,
    renames: &[(String, String)],
    raymarch: Option<&RaymarchCalls>,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let template = Template::parse(&spec.main_code);
    if template.is_empty() {
        return None;
    }

    let params = ParameterResolver::new(ctx).resolve_all(node, spec, warnings);
    let inputs = resolve_inputs(ctx, node, spec, &params, Some(MAIN_COORDINATES), warnings);
    let outputs = output_variables(node, spec);

    let sdf_call = raymarch.map(|calls| calls.sdf.as_deref().unwrap_or(NO_SURFACE_DISTANCE));
    let displacement = raymarch.map(|calls| calls.displacement.as_deref().unwrap_or("0.0"));
    let bindings = Bindings {
        node_id: &node.id,
        inputs: &inputs,
        outputs: &outputs,
        params: &params,
        coords: Some(MAIN_COORDINATES),
        sdf_call,
        displacement,
    };
    let code = rename_identifiers(&substitute(&template, &bindings, warnings), renames);

    tracing::debug!("[PSGC] Emitted body for node {} ({})", node.id, node.node_type);
    Some(format!(
        "    // node: {} ({})\n    {{\n{}\n    }}",
        node.id,
        node.node_type,
        indent(&code, 8)
    ))
}
