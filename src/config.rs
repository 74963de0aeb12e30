//! # Compiler Configuration
//!
//! Knobs the host editor may tune. Every field has a default, so an empty JSON
//! object is a valid configuration.

use crate::error::{CompileError, Result};
use serde::{Deserialize, Serialize};

/// Version string every [`NodeGraph`](crate::graph::NodeGraph) must carry.
pub const GRAPH_FORMAT_VERSION: &str = "1.0";

/// Configuration for one compile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerConfig {
    /// Source ids starting with this prefix are virtual sources.
    pub virtual_source_prefix: String,
    /// Emitted as `#version <glsl_version>`.
    pub glsl_version: String,
    /// Give every float parameter a runtime-adjustable uniform.
    pub parameter_uniforms: bool,
    /// Node category that marks a terminal (final output) node.
    pub output_category: String,
    /// Input port of a raymarcher that receives the signed distance.
    pub sdf_input_port: String,
    /// Input port of a raymarcher that receives the displacement.
    pub displacement_input_port: String,
    /// Name of the sample-point variable inside a raymarcher's loop.
    pub march_point_symbol: String,
    /// Maximum upstream depth inlined into a raymarcher distance function.
    pub max_inline_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            virtual_source_prefix: "virtual:".to_string(),
            glsl_version: "300 es".to_string(),
            parameter_uniforms: true,
            output_category: "output".to_string(),
            sdf_input_port: "sdf".to_string(),
            displacement_input_port: "displacement".to_string(),
            march_point_symbol: "marchPos".to_string(),
            max_inline_depth: 32,
        }
    }
}

impl CompilerConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CompilerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a program.
    pub fn validate(&self) -> Result<()> {
        if self.virtual_source_prefix.is_empty() {
            return Err(CompileError::InvalidConfig(
                "virtualSourcePrefix must not be empty".to_string(),
            ));
        }
        if !is_identifier(&self.march_point_symbol) {
            return Err(CompileError::InvalidConfig(format!(
                "marchPointSymbol '{}' is not a valid identifier",
                self.march_point_symbol
            )));
        }
        if self.max_inline_depth == 0 {
            return Err(CompileError::InvalidConfig(
                "maxInlineDepth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether `id` names a virtual source rather than a graph node.
    pub fn is_virtual_source(&self, id: &str) -> bool {
        id.starts_with(&self.virtual_source_prefix)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
