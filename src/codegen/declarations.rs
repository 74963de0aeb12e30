//! Global declarations: one variable per node output, plus array parameters.

use super::glsl::format_float;
use super::{push_warning, CompileContext};
use crate::graph::ParamValue;
use crate::metadata::{DataType, ParamType};
use crate::naming::{array_variable_name, output_variable_name};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Declarations {
    pub lines: Vec<String>,
    /// Every global symbol declared by `lines`.
    pub symbols: HashSet<String>,
}

impl Declarations {
    fn declare(&mut self, symbol: String, line: String) -> bool {
        if !self.symbols.insert(symbol) {
            return false;
        }
        self.lines.push(line);
        true
    }
}

/// Declare every output of every node in execution order, then make sure each
/// connection source that is a real node has a variable to read from.
pub fn generate_declarations(ctx: &CompileContext<'_>, warnings: &mut Vec<String>) -> Declarations {
    let mut decls = Declarations::default();

    for (node, spec) in ctx.ordered_nodes() {
        for port in &spec.outputs {
            let symbol = output_variable_name(&node.id, &port.name);
            let line = format!(
                "{} {} = {};",
                port.data_type.glsl_name(),
                symbol,
                port.data_type.zero()
            );
            decls.declare(symbol, line);
        }

        for (name, param) in &spec.parameters {
            if param.param_type != ParamType::Array {
                continue;
            }
            let values = match node.params.get(name).unwrap_or(&param.default) {
                ParamValue::Array(values) if !values.is_empty() => values.clone(),
                _ => vec![0.0],
            };
            let symbol = array_variable_name(&node.id, name);
            let literals: Vec<String> = values.iter().map(|v| format_float(*v)).collect();
            let line = format!(
                "float {}[{}] = float[{}]({});",
                symbol,
                values.len(),
                values.len(),
                literals.join(", ")
            );
            decls.declare(symbol, line);
        }
    }

    for conn in &ctx.graph.connections {
        if ctx.is_virtual(&conn.source_node_id) || ctx.node(&conn.source_node_id).is_none() {
            continue;
        }
        let symbol = output_variable_name(&conn.source_node_id, &conn.source_port);
        if decls.symbols.contains(&symbol) {
            continue;
        }
        let line = format!("float {} = {};", symbol, DataType::Float.zero());
        decls.declare(symbol.clone(), line);
        push_warning(
            warnings,
            format!(
                "Connection '{}' reads undeclared output '{}'; declared as float",
                conn.id, symbol
            ),
        );
    }

    tracing::debug!("[PSGC] Declared {} globals", decls.lines.len());
    decls
}
