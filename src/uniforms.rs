//! # Uniform Generation
//!
//! Maps runtime-adjustable parameters (and virtual sources) to uniform names and
//! the metadata a renderer needs to bind them.

use crate::config::CompilerConfig;
use crate::graph::NodeGraph;
use crate::metadata::{DataType, NodeMetadataProvider, ParamType};
use crate::naming::sanitize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Binding metadata for one emitted uniform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniformInfo {
    pub name: String,
    pub node_id: String,
    pub param_name: String,
    pub glsl_type: String,
    pub default_value: f64,
}

/// `u<sanitized node id><Capitalized parameter>`.
pub fn uniform_name(node_id: &str, param: &str) -> String {
    format!("u{}{}", sanitize(node_id), capitalize(&sanitize(param)))
}

/// Uniform standing in for a virtual source.
pub fn virtual_uniform_name(source_id: &str, prefix: &str) -> String {
    let rest = source_id.strip_prefix(prefix).unwrap_or(source_id);
    format!("u_virtual_{}", sanitize(rest))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Per-compile uniform table. Owns its own maps, so concurrent compiles never
/// share naming state.
#[derive(Debug, Clone, Default)]
pub struct UniformGenerator {
    parameters: BTreeMap<(String, String), UniformInfo>,
    virtual_sources: BTreeMap<String, UniformInfo>,
}

impl UniformGenerator {
    pub fn new(
        graph: &NodeGraph,
        registry: &dyn NodeMetadataProvider,
        config: &CompilerConfig,
    ) -> Self {
        let mut generator = Self::default();

        if config.parameter_uniforms {
            for node in &graph.nodes {
                let Some(spec) = registry.get_node_metadata(&node.node_type) else {
                    continue;
                };
                for (param_name, param_spec) in &spec.parameters {
                    if param_spec.param_type != ParamType::Float {
                        continue;
                    }
                    let key = (node.id.clone(), param_name.clone());
                    if generator.parameters.contains_key(&key) {
                        continue;
                    }
                    let default_value = node
                        .params
                        .get(param_name)
                        .and_then(|v| v.as_number())
                        .or_else(|| param_spec.default.as_number())
                        .unwrap_or(0.0);
                    generator.parameters.insert(
                        key,
                        UniformInfo {
                            name: uniform_name(&node.id, param_name),
                            node_id: node.id.clone(),
                            param_name: param_name.clone(),
                            glsl_type: DataType::Float.glsl_name().to_string(),
                            default_value,
                        },
                    );
                }
            }
        }

        for conn in &graph.connections {
            if !config.is_virtual_source(&conn.source_node_id) {
                continue;
            }
            generator
                .virtual_sources
                .entry(conn.source_node_id.clone())
                .or_insert_with(|| UniformInfo {
                    name: virtual_uniform_name(&conn.source_node_id, &config.virtual_source_prefix),
                    node_id: conn.source_node_id.clone(),
                    param_name: conn.source_port.clone(),
                    glsl_type: DataType::Float.glsl_name().to_string(),
                    default_value: 0.0,
                });
        }

        tracing::debug!(
            "[PSGC] Generated {} parameter uniforms, {} virtual source uniforms",
            generator.parameters.len(),
            generator.virtual_sources.len()
        );
        generator
    }

    /// Uniform for `(node_id, param)`, if one exists.
    pub fn uniform_for(&self, node_id: &str, param: &str) -> Option<&str> {
        self.parameters
            .get(&(node_id.to_string(), param.to_string()))
            .map(|info| info.name.as_str())
    }

    /// Uniform for a virtual source id.
    pub fn virtual_uniform(&self, source_id: &str) -> Option<&str> {
        self.virtual_sources.get(source_id).map(|info| info.name.as_str())
    }

    /// All uniform names owned by one node.
    pub fn node_uniforms<'s>(&'s self, node_id: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.parameters
            .values()
            .filter(move |info| info.node_id == node_id)
            .map(|info| info.name.as_str())
    }

    /// Every candidate uniform name.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .values()
            .chain(self.virtual_sources.values())
            .map(|info| info.name.as_str())
    }

    /// Metadata for the uniforms in `used`, sorted by name.
    pub fn metadata(&self, used: &HashSet<String>) -> Vec<UniformInfo> {
        let mut infos: Vec<UniformInfo> = self
            .parameters
            .values()
            .chain(self.virtual_sources.values())
            .filter(|info| used.contains(&info.name))
            .cloned()
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos.dedup_by(|a, b| a.name == b.name);
        infos
    }
}
