//! # Shader Code Generation
//!
//! GLSL generation for shader graphs, split into single-responsibility stages
//! that share one read-only [`CompileContext`]:
//!
//! - [`params`] resolves parameter expressions
//! - [`functions`] builds the deduplicated function library
//! - [`declarations`], [`automation`], [`raymarch`], [`node_code`], [`output`]
//!   emit the pieces of the program, driven by [`main_code`]
//! - [`assembly`] substitutes them into the program template

pub mod assembly;
pub mod automation;
pub mod declarations;
pub mod functions;
pub mod glsl;
pub mod main_code;
pub mod node_code;
pub mod output;
pub mod params;
pub mod raymarch;
pub mod scanner;

pub use assembly::{assemble_program, ProgramParts};
pub use declarations::{generate_declarations, Declarations};
pub use functions::{FunctionGenerator, FunctionLibrary};
pub use main_code::{MainCode, MainCodeGenerator};
pub use output::FinalOutput;
pub use params::{ParamSource, ParameterResolver, ResolvedParam};

use crate::config::CompilerConfig;
use crate::graph::{AutomationLane, Connection, NodeGraph, NodeInstance};
use crate::metadata::{DataType, NodeMetadataProvider, NodeTypeSpec};
use crate::template::{Placeholder, Template};
use crate::uniforms::UniformGenerator;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Elapsed time uniform, also the timeline time fed to automation evaluators.
pub const TIME_UNIFORM: &str = "uTime";
/// Viewport size uniform.
pub const RESOLUTION_UNIFORM: &str = "uResolution";
/// Centered, aspect-corrected 2D coordinate declared by the entry point.
pub const UV_SYMBOL: &str = "uv";
/// 3D position declared by the entry point.
pub const POSITION_SYMBOL: &str = "p";
/// Value used wherever a reference cannot be resolved.
pub const NEUTRAL_VALUE: &str = "0.0";

/// Everything a generation stage may read. Built once per compile.
pub struct CompileContext<'a> {
    pub graph: &'a NodeGraph,
    pub registry: &'a dyn NodeMetadataProvider,
    pub config: &'a CompilerConfig,
    pub execution_order: &'a [String],
    pub uniforms: &'a UniformGenerator,
    nodes: HashMap<&'a str, &'a NodeInstance>,
    order_index: HashMap<&'a str, usize>,
    declared: HashSet<String>,
}

impl<'a> CompileContext<'a> {
    pub fn new(
        graph: &'a NodeGraph,
        registry: &'a dyn NodeMetadataProvider,
        config: &'a CompilerConfig,
        execution_order: &'a [String],
        uniforms: &'a UniformGenerator,
    ) -> Self {
        let mut nodes = HashMap::new();
        for node in &graph.nodes {
            nodes.entry(node.id.as_str()).or_insert(node);
        }
        let order_index = execution_order
            .iter()
            .enumerate()
            .map(|(index, id)| (id.as_str(), index))
            .collect();
        Self {
            graph,
            registry,
            config,
            execution_order,
            uniforms,
            nodes,
            order_index,
            declared: HashSet::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&'a NodeInstance> {
        self.nodes.get(id).copied()
    }

    pub fn spec(&self, node: &NodeInstance) -> Option<&'a NodeTypeSpec> {
        self.registry.get_node_metadata(&node.node_type)
    }

    /// Nodes with a known type, in execution order.
    pub fn ordered_nodes(&self) -> impl Iterator<Item = (&'a NodeInstance, &'a NodeTypeSpec)> + '_ {
        self.execution_order.iter().filter_map(move |id| {
            let node = self.node(id)?;
            let spec = self.spec(node)?;
            Some((node, spec))
        })
    }

    pub fn order_index(&self, id: &str) -> Option<usize> {
        self.order_index.get(id).copied()
    }

    pub fn is_virtual(&self, id: &str) -> bool {
        self.config.is_virtual_source(id)
    }

    pub fn lane(&self, node_id: &str, param: &str) -> Option<&'a AutomationLane> {
        self.graph.lane_for(node_id, param)
    }

    /// The connection wired into `(node_id, port)`; the first one if the graph
    /// (invalidly) has several.
    pub fn port_connection(&self, node_id: &str, port: &str) -> Option<&'a Connection> {
        self.graph
            .connections
            .iter()
            .find(|c| c.targets_port(node_id, port))
    }

    pub fn parameter_connections<'s>(
        &'s self,
        node_id: &'s str,
        param: &'s str,
    ) -> impl Iterator<Item = &'a Connection> + 's {
        self.graph
            .connections
            .iter()
            .filter(move |c| c.targets_parameter(node_id, param))
    }

    pub fn has_outgoing(&self, node_id: &str) -> bool {
        self.graph.connections.iter().any(|c| c.source_node_id == node_id)
    }

    pub fn output_type(&self, node_id: &str, port: &str) -> Option<DataType> {
        let node = self.node(node_id)?;
        let spec = self.spec(node)?;
        spec.output(port).map(|p| p.data_type)
    }

    /// Whether a global symbol will be declared in the program.
    pub fn is_declared(&self, symbol: &str) -> bool {
        self.declared.contains(symbol)
    }

    pub fn set_declared(&mut self, symbols: HashSet<String>) {
        self.declared = symbols;
    }
}

/// Log a degraded-but-continuing situation and keep it for the diagnostics.
pub(crate) fn push_warning(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("[PSGC] {}", message);
    warnings.push(message);
}

/// Spatial symbols in scope where rendered code will live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Coordinates<'b> {
    pub position: &'b str,
    pub uv: &'b str,
}

/// The locals `main()` declares before the node bodies.
pub(crate) const MAIN_COORDINATES: Coordinates<'static> = Coordinates {
    position: POSITION_SYMBOL,
    uv: UV_SYMBOL,
};

/// Symbols a template's placeholders resolve to for one node.
pub(crate) struct Bindings<'b> {
    pub node_id: &'b str,
    pub inputs: &'b BTreeMap<String, String>,
    pub outputs: &'b BTreeMap<String, String>,
    pub params: &'b BTreeMap<String, ResolvedParam>,
    /// `None` for code emitted at global scope, where no coordinate exists.
    pub coords: Option<Coordinates<'b>>,
    pub sdf_call: Option<&'b str>,
    pub displacement: Option<&'b str>,
}

/// Render `template` with `bindings`. Anything unresolvable becomes the neutral
/// value and is reported.
pub(crate) fn substitute(
    template: &Template,
    bindings: &Bindings<'_>,
    warnings: &mut Vec<String>,
) -> String {
    template.render(|placeholder| {
        if let (Placeholder::Position | Placeholder::Uv, None) = (placeholder, bindings.coords) {
            let zero = match placeholder {
                Placeholder::Position => DataType::Vec3.zero(),
                _ => DataType::Vec2.zero(),
            };
            push_warning(
                warnings,
                format!(
                    "'{}' in global-scope code of node '{}' has no coordinate in scope; replaced with {}",
                    placeholder, bindings.node_id, zero
                ),
            );
            return zero.to_string();
        }
        let resolved = match placeholder {
            Placeholder::Input(port) => bindings.inputs.get(port).cloned(),
            Placeholder::Output(port) => bindings.outputs.get(port).cloned(),
            Placeholder::Param(name) => bindings.params.get(name).map(|p| p.expr.clone()),
            Placeholder::Time => Some(TIME_UNIFORM.to_string()),
            Placeholder::Resolution => Some(RESOLUTION_UNIFORM.to_string()),
            Placeholder::Position => bindings.coords.map(|c| c.position.to_string()),
            Placeholder::Uv => bindings.coords.map(|c| c.uv.to_string()),
            Placeholder::SdfCall => bindings.sdf_call.map(str::to_string),
            Placeholder::DisplacementAtP => bindings.displacement.map(str::to_string),
            Placeholder::Unknown(_) => None,
        };
        resolved.unwrap_or_else(|| {
            push_warning(
                warnings,
                format!(
                    "Unresolved placeholder '{}' in node '{}' replaced with {}",
                    placeholder, bindings.node_id, NEUTRAL_VALUE
                ),
            );
            NEUTRAL_VALUE.to_string()
        })
    })
}

/// Indent every non-empty line of `code` by `spaces`.
pub(crate) fn indent(code: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    code.trim()
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
