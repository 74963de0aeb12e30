//! # Raymarcher Specialization
//!
//! A raymarcher samples its distance input many times per pixel at points it
//! chooses itself, so the upstream subgraph cannot be read from the global
//! output variables. Instead the subgraph is inlined into a standalone function
//! whose position symbol is rebound to the marcher's sample point:
//!
//! ```glsl
//! float sdf_rm(vec3 marchPos) {
//!     float rm_s_dist = 0.0;
//!     {
//!         rm_s_dist = sdSphere(marchPos, usRadius);
//!     }
//!     return rm_s_dist;
//! }
//! ```
//!
//! `$uv` inside the subgraph reads `marchPos.xy`.

use super::functions::FunctionLibrary;
use super::glsl::convert;
use super::node_code::fallback_input;
use super::params::ParameterResolver;
use super::scanner::rename_identifiers;
use super::{
    indent, push_warning, substitute, Bindings, CompileContext, Coordinates, NEUTRAL_VALUE,
};
use crate::graph::Connection;
use crate::metadata::{DataType, NodeTypeSpec};
use crate::naming::{displacement_function_name, inline_variable_name, sdf_function_name};
use crate::template::{Placeholder, Template};
use std::collections::{BTreeMap, HashSet};

/// Whether a node type marches a distance field.
pub fn is_raymarcher(spec: &NodeTypeSpec) -> bool {
    Template::parse(&spec.main_code).contains(&Placeholder::SdfCall)
}

/// Call expressions a raymarcher's body binds `$sdf_call` and
/// `$displacement_at_p` to. `None` when the input is not connected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaymarchCalls {
    pub sdf: Option<String>,
    pub displacement: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RaymarchLibrary {
    pub functions: Vec<String>,
    pub calls: BTreeMap<String, RaymarchCalls>,
}

/// Synthesise distance and displacement functions for every raymarcher.
pub fn generate_raymarch_functions(
    ctx: &CompileContext<'_>,
    library: &FunctionLibrary,
    warnings: &mut Vec<String>,
) -> RaymarchLibrary {
    let mut out = RaymarchLibrary::default();
    let march = ctx.config.march_point_symbol.as_str();

    for (node, spec) in ctx.ordered_nodes() {
        if !is_raymarcher(spec) {
            continue;
        }
        let mut calls = RaymarchCalls::default();

        if let Some(conn) = ctx.port_connection(&node.id, &ctx.config.sdf_input_port) {
            let name = sdf_function_name(&node.id);
            out.functions.push(synthesise(ctx, library, &name, conn, warnings));
            calls.sdf = Some(format!("{name}({march})"));
        } else {
            push_warning(
                warnings,
                format!("Raymarcher '{}' has no distance input; marching against nothing", node.id),
            );
        }

        if let Some(conn) = ctx.port_connection(&node.id, &ctx.config.displacement_input_port) {
            let name = displacement_function_name(&node.id);
            out.functions.push(synthesise(ctx, library, &name, conn, warnings));
            calls.displacement = Some(format!("{name}({march})"));
        }

        tracing::debug!("[PSGC] Raymarcher {} specialised: {:?}", node.id, calls);
        out.calls.insert(node.id.clone(), calls);
    }
    out
}

fn synthesise(
    ctx: &CompileContext<'_>,
    library: &FunctionLibrary,
    name: &str,
    conn: &Connection,
    warnings: &mut Vec<String>,
) -> String {
    let mut inliner = Inliner {
        ctx,
        library,
        emitted: HashSet::new(),
        locals: Vec::new(),
        blocks: Vec::new(),
    };
    let result = inliner.value_of(conn, DataType::Float, 0, warnings);

    let mut body: Vec<String> = inliner.locals.iter().map(|l| format!("    {l}")).collect();
    body.extend(inliner.blocks);
    body.push(format!("    return {result};"));
    format!(
        "float {}(vec3 {}) {{\n{}\n}}",
        name,
        ctx.config.march_point_symbol,
        body.join("\n")
    )
}

struct Inliner<'r, 'a> {
    ctx: &'r CompileContext<'a>,
    library: &'r FunctionLibrary,
    emitted: HashSet<String>,
    locals: Vec<String>,
    blocks: Vec<String>,
}

impl Inliner<'_, '_> {
    /// Expression for the value `conn` carries, as `target`, evaluated at the
    /// march point. Emits the upstream nodes it needs.
    fn value_of(
        &mut self,
        conn: &Connection,
        target: DataType,
        depth: usize,
        warnings: &mut Vec<String>,
    ) -> String {
        if self.ctx.is_virtual(&conn.source_node_id) {
            return match self.ctx.uniforms.virtual_uniform(&conn.source_node_id) {
                Some(uniform) => convert(uniform, DataType::Float, target),
                None => target.zero().to_string(),
            };
        }
        if depth >= self.ctx.config.max_inline_depth {
            push_warning(
                warnings,
                format!(
                    "Raymarch inlining exceeded depth {} at node '{}'; using {}",
                    self.ctx.config.max_inline_depth, conn.source_node_id, NEUTRAL_VALUE
                ),
            );
            return target.zero().to_string();
        }
        let Some(source_type) = self.ctx.output_type(&conn.source_node_id, &conn.source_port) else {
            push_warning(
                warnings,
                format!(
                    "Raymarch input reads unknown output '{}.{}'; using {}",
                    conn.source_node_id, conn.source_port, NEUTRAL_VALUE
                ),
            );
            return target.zero().to_string();
        };

        self.emit_node(&conn.source_node_id, depth, warnings);
        convert(
            &inline_variable_name(&conn.source_node_id, &conn.source_port),
            source_type,
            target,
        )
    }

    fn emit_node(&mut self, node_id: &str, depth: usize, warnings: &mut Vec<String>) {
        let ctx = self.ctx;
        let Some(node) = ctx.node(node_id) else {
            return;
        };
        let Some(spec) = ctx.spec(node) else {
            return;
        };
        if !self.emitted.insert(node.id.clone()) {
            return;
        }
        let march = ctx.config.march_point_symbol.as_str();
        let march_uv = format!("{march}.xy");
        let coords = Coordinates {
            position: march,
            uv: &march_uv,
        };

        let params = ParameterResolver::new(ctx).resolve_all(node, spec, warnings);
        let mut inputs = BTreeMap::new();
        for port in &spec.inputs {
            let value = match ctx.port_connection(&node.id, &port.name) {
                Some(conn) => self.value_of(conn, port.data_type, depth + 1, warnings),
                None => fallback_input(node, port, &params, Some(coords), warnings),
            };
            inputs.insert(port.name.clone(), value);
        }

        let mut outputs = BTreeMap::new();
        for port in &spec.outputs {
            let local = inline_variable_name(&node.id, &port.name);
            self.locals.push(format!(
                "{} {} = {};",
                port.data_type.glsl_name(),
                local,
                port.data_type.zero()
            ));
            outputs.insert(port.name.clone(), local);
        }

        let bindings = Bindings {
            node_id: &node.id,
            inputs: &inputs,
            outputs: &outputs,
            params: &params,
            coords: Some(coords),
            sdf_call: None,
            displacement: None,
        };
        let code = substitute(&Template::parse(&spec.main_code), &bindings, warnings);
        let code = rename_identifiers(&code, self.library.renames_for(&node.id));
        if !code.trim().is_empty() {
            self.blocks.push(format!("    {{\n{}\n    }}", indent(&code, 8)));
        }
    }
}
