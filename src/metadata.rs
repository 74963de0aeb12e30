//! # Node Type Metadata
//!
//! Read-only descriptors of the node types a graph may instantiate: ports,
//! parameters and the code templates the compiler specialises per instance.

use crate::error::Result;
use crate::graph::{CombinationMode, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Value type carried by a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
}

impl DataType {
    pub fn glsl_name(&self) -> &'static str {
        match self {
            DataType::Float => "float",
            DataType::Int => "int",
            DataType::Vec2 => "vec2",
            DataType::Vec3 => "vec3",
            DataType::Vec4 => "vec4",
        }
    }

    pub fn components(&self) -> usize {
        match self {
            DataType::Float | DataType::Int => 1,
            DataType::Vec2 => 2,
            DataType::Vec3 => 3,
            DataType::Vec4 => 4,
        }
    }

    /// Zero literal of this type.
    pub fn zero(&self) -> &'static str {
        match self {
            DataType::Float => "0.0",
            DataType::Int => "0",
            DataType::Vec2 => "vec2(0.0)",
            DataType::Vec3 => "vec3(0.0)",
            DataType::Vec4 => "vec4(0.0)",
        }
    }

    /// Whether an ordinary port connection from `self` into `target` is legal:
    /// exact match, or widening along `float -> vec2 -> vec3 -> vec4`.
    pub fn widens_to(&self, target: DataType) -> bool {
        if *self == target {
            return true;
        }
        match (self.float_rank(), target.float_rank()) {
            (Some(from), Some(to)) => from < to,
            _ => false,
        }
    }

    fn float_rank(&self) -> Option<usize> {
        match self {
            DataType::Int => None,
            other => Some(other.components()),
        }
    }
}

/// Kind of a node parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Float,
    Int,
    String,
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Expression used when the port is unconnected. May contain placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Parameters assembled into the port's arity when unconnected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_params: Vec<String>,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            fallback: None,
            fallback_params: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, expr: impl Into<String>) -> Self {
        self.fallback = Some(expr.into());
        self
    }

    pub fn with_fallback_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallback_params = params.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub default: ParamValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub combination_mode: CombinationMode,
}

impl ParamSpec {
    pub fn float(default: f64) -> Self {
        Self {
            param_type: ParamType::Float,
            default: ParamValue::Number(default),
            min: None,
            max: None,
            combination_mode: CombinationMode::Override,
        }
    }

    pub fn int(default: i64) -> Self {
        Self {
            param_type: ParamType::Int,
            default: ParamValue::Number(default as f64),
            ..Self::float(0.0)
        }
    }

    pub fn string(default: impl Into<String>) -> Self {
        Self {
            param_type: ParamType::String,
            default: ParamValue::Text(default.into()),
            ..Self::float(0.0)
        }
    }

    pub fn array(default: Vec<f64>) -> Self {
        Self {
            param_type: ParamType::Array,
            default: ParamValue::Array(default),
            ..Self::float(0.0)
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_combination_mode(mut self, mode: CombinationMode) -> Self {
        self.combination_mode = mode;
        self
    }
}

/// Descriptor of one node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeSpec {
    pub id: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub inputs: Vec<PortSpec>,
    #[serde(default)]
    pub outputs: Vec<PortSpec>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamSpec>,
    /// Reusable function-library template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_code: Option<String>,
    /// Per-instance main-code template.
    #[serde(default)]
    pub main_code: String,
}

impl NodeTypeSpec {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            parameters: BTreeMap::new(),
            function_code: None,
            main_code: String::new(),
        }
    }

    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.parameters.insert(name.into(), spec);
        self
    }

    pub fn with_function_code(mut self, code: impl Into<String>) -> Self {
        self.function_code = Some(code.into());
        self
    }

    pub fn with_main_code(mut self, code: impl Into<String>) -> Self {
        self.main_code = code.into();
        self
    }

    pub fn input(&self, name: &str) -> Option<&PortSpec> {
        self.inputs.iter().find(|p| p.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&PortSpec> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.get(name)
    }
}

/// Lookup of node type descriptors by id.
pub trait NodeMetadataProvider {
    fn get_node_metadata(&self, node_type: &str) -> Option<&NodeTypeSpec>;
}

/// In-memory registry of node types.
#[derive(Debug, Clone, Default)]
pub struct ShaderNodeRegistry {
    types: HashMap<String, NodeTypeSpec>,
}

impl ShaderNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_specs(specs: impl IntoIterator<Item = NodeTypeSpec>) -> Self {
        let mut registry = Self::new();
        for spec in specs {
            registry.register(spec);
        }
        registry
    }

    /// Parse a JSON array of node type descriptors.
    pub fn from_json(json: &str) -> Result<Self> {
        let specs: Vec<NodeTypeSpec> = serde_json::from_str(json)?;
        Ok(Self::from_specs(specs))
    }

    /// Register a descriptor, replacing any previous one with the same id.
    pub fn register(&mut self, spec: NodeTypeSpec) {
        if self.types.contains_key(&spec.id) {
            tracing::warn!("[PSGC] Replacing node type '{}' in registry", spec.id);
        }
        self.types.insert(spec.id.clone(), spec);
    }
}

impl NodeMetadataProvider for ShaderNodeRegistry {
    fn get_node_metadata(&self, node_type: &str) -> Option<&NodeTypeSpec> {
        self.types.get(node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening_chain() {
        assert!(DataType::Float.widens_to(DataType::Vec4));
        assert!(DataType::Vec2.widens_to(DataType::Vec3));
        assert!(DataType::Int.widens_to(DataType::Int));
        assert!(!DataType::Vec4.widens_to(DataType::Float));
        assert!(!DataType::Vec3.widens_to(DataType::Vec2));
        assert!(!DataType::Int.widens_to(DataType::Float));
        assert!(!DataType::Float.widens_to(DataType::Int));
    }

    #[test]
    fn test_registry_from_json() {
        let json = r#"[
            {
                "id": "circle",
                "category": "shape",
                "inputs": [ { "name": "center", "type": "vec2", "fallbackParams": ["cx", "cy"] } ],
                "outputs": [ { "name": "dist", "type": "float" } ],
                "parameters": {
                    "radius": { "type": "float", "default": 0.5, "min": 0.0, "max": 2.0 },
                    "cx": { "type": "float", "default": 0 },
                    "cy": { "type": "float", "default": 0, "combinationMode": "add" }
                },
                "mainCode": "$output.dist = length($uv - $input.center) - $param.radius;"
            }
        ]"#;
        let registry = ShaderNodeRegistry::from_json(json).unwrap();
        let spec = registry.get_node_metadata("circle").unwrap();
        assert_eq!(spec.input("center").unwrap().fallback_params, vec!["cx", "cy"]);
        assert_eq!(spec.output("dist").unwrap().data_type, DataType::Float);
        let radius = spec.parameter("radius").unwrap();
        assert_eq!(radius.param_type, ParamType::Float);
        assert_eq!(radius.max, Some(2.0));
        assert_eq!(
            spec.parameter("cy").unwrap().combination_mode,
            CombinationMode::Add
        );
        assert!(registry.get_node_metadata("square").is_none());
    }
}
