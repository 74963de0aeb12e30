//! # Parameter Expressions
//!
//! Every float parameter resolves through one precedence chain:
//! automation, then connection, then uniform, then literal.

use super::glsl::{format_float, format_int, to_float};
use super::{push_warning, CompileContext, NEUTRAL_VALUE, TIME_UNIFORM};
use crate::graph::{CombinationMode, Connection, NodeInstance, ParamValue};
use crate::metadata::{DataType, NodeTypeSpec, ParamSpec, ParamType};
use crate::naming::{array_variable_name, automation_function_name, output_variable_name};
use std::collections::BTreeMap;

/// Where a resolved parameter expression came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Automation,
    Connection,
    Uniform,
    Literal,
    Array,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParam {
    pub expr: String,
    pub source: ParamSource,
}

impl ResolvedParam {
    fn new(expr: impl Into<String>, source: ParamSource) -> Self {
        Self { expr: expr.into(), source }
    }
}

pub struct ParameterResolver<'c, 'a> {
    ctx: &'c CompileContext<'a>,
}

impl<'c, 'a> ParameterResolver<'c, 'a> {
    pub fn new(ctx: &'c CompileContext<'a>) -> Self {
        Self { ctx }
    }

    /// Resolve every parameter of `node`.
    pub fn resolve_all(
        &self,
        node: &NodeInstance,
        spec: &NodeTypeSpec,
        warnings: &mut Vec<String>,
    ) -> BTreeMap<String, ResolvedParam> {
        spec.parameters
            .iter()
            .map(|(name, param)| (name.clone(), self.resolve(node, name, param, warnings)))
            .collect()
    }

    pub fn resolve(
        &self,
        node: &NodeInstance,
        name: &str,
        param: &ParamSpec,
        warnings: &mut Vec<String>,
    ) -> ResolvedParam {
        match param.param_type {
            ParamType::Float => self.resolve_float(node, name, param, warnings),
            ParamType::Int => {
                ResolvedParam::new(format_int(literal_value(node, name, param)), ParamSource::Literal)
            }
            ParamType::String => {
                let text = match node.params.get(name).unwrap_or(&param.default) {
                    ParamValue::Text(text) => text.clone(),
                    ParamValue::Number(v) => format_float(*v),
                    ParamValue::Array(_) => String::new(),
                };
                ResolvedParam::new(text, ParamSource::Text)
            }
            ParamType::Array => {
                ResolvedParam::new(array_variable_name(&node.id, name), ParamSource::Array)
            }
        }
    }

    fn resolve_float(
        &self,
        node: &NodeInstance,
        name: &str,
        param: &ParamSpec,
        warnings: &mut Vec<String>,
    ) -> ResolvedParam {
        if let Some(expr) = self.automation_expr(node, name) {
            return ResolvedParam::new(expr, ParamSource::Automation);
        }

        if let Some(conn) = self.winning_connection(node, name) {
            let value = self.connection_value(node, conn, warnings);
            let mode = node
                .combination_modes
                .get(name)
                .copied()
                .unwrap_or(param.combination_mode);
            let expr = match mode {
                CombinationMode::Override => value,
                CombinationMode::Add => format!("({} + {})", self.config_value(node, name, param), value),
                CombinationMode::Subtract => {
                    format!("({} - {})", self.config_value(node, name, param), value)
                }
                CombinationMode::Multiply => {
                    format!("({} * {})", self.config_value(node, name, param), value)
                }
            };
            return ResolvedParam::new(expr, ParamSource::Connection);
        }

        if let Some(uniform) = self.ctx.uniforms.uniform_for(&node.id, name) {
            return ResolvedParam::new(uniform, ParamSource::Uniform);
        }

        ResolvedParam::new(format_float(literal_value(node, name, param)), ParamSource::Literal)
    }

    /// Automation, else uniform, else literal.
    fn config_value(&self, node: &NodeInstance, name: &str, param: &ParamSpec) -> String {
        if let Some(expr) = self.automation_expr(node, name) {
            return expr;
        }
        if let Some(uniform) = self.ctx.uniforms.uniform_for(&node.id, name) {
            return uniform.to_string();
        }
        format_float(literal_value(node, name, param))
    }

    fn automation_expr(&self, node: &NodeInstance, name: &str) -> Option<String> {
        let lane = self.ctx.lane(&node.id, name)?;
        Some(format!("{}({})", automation_function_name(&lane.id), TIME_UNIFORM))
    }

    /// Among connections into this parameter, the one whose source ran latest
    /// while still before the consumer. Virtual sources are always available but
    /// rank below any node source; sources not yet computed are ignored.
    fn winning_connection(&self, node: &NodeInstance, name: &str) -> Option<&'a Connection> {
        let consumer = self.ctx.order_index(&node.id)?;
        let mut best: Option<(isize, &'a Connection)> = None;
        for conn in self.ctx.parameter_connections(&node.id, name) {
            let rank = if self.ctx.is_virtual(&conn.source_node_id) {
                -1
            } else {
                match self.ctx.order_index(&conn.source_node_id) {
                    Some(index) if index < consumer => index as isize,
                    _ => {
                        tracing::debug!(
                            "[PSGC] Ignoring connection '{}' into '{}.{}': source not yet computed",
                            conn.id,
                            node.id,
                            name
                        );
                        continue;
                    }
                }
            };
            if best.map_or(true, |(best_rank, _)| rank > best_rank) {
                best = Some((rank, conn));
            }
        }
        best.map(|(_, conn)| conn)
    }

    fn connection_value(
        &self,
        node: &NodeInstance,
        conn: &Connection,
        warnings: &mut Vec<String>,
    ) -> String {
        if self.ctx.is_virtual(&conn.source_node_id) {
            return match self.ctx.uniforms.virtual_uniform(&conn.source_node_id) {
                Some(uniform) => uniform.to_string(),
                None => {
                    push_warning(
                        warnings,
                        format!("Virtual source '{}' has no uniform", conn.source_node_id),
                    );
                    NEUTRAL_VALUE.to_string()
                }
            };
        }

        let symbol = output_variable_name(&conn.source_node_id, &conn.source_port);
        if !self.ctx.is_declared(&symbol) {
            push_warning(
                warnings,
                format!(
                    "Parameter connection '{}' into node '{}' references undeclared '{}'; using {}",
                    conn.id, node.id, symbol, NEUTRAL_VALUE
                ),
            );
            return NEUTRAL_VALUE.to_string();
        }
        let source_type = self
            .ctx
            .output_type(&conn.source_node_id, &conn.source_port)
            .unwrap_or(DataType::Float);
        to_float(&symbol, source_type)
    }
}

/// Instance value, else spec default, else zero.
pub fn literal_value(node: &NodeInstance, name: &str, param: &ParamSpec) -> f64 {
    node.params
        .get(name)
        .and_then(ParamValue::as_number)
        .or_else(|| param.default.as_number())
        .unwrap_or(0.0)
}
