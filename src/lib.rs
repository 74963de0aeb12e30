//! # Pulsar Shader Graph Compiler (PSGC)
//!
//! Compiler for transforming Pulsar shader node graphs into GLSL fragment
//! programs for the live preview and for export.
//!
//! PSGC takes a graph of node instances, the connections between them and the
//! automation lanes bound to their parameters, and provides:
//! - Structural and type validation with non-fatal diagnostics
//! - Deterministic execution ordering that keeps existing nodes stable
//! - Uniform generation for runtime-adjustable parameters and virtual sources
//! - A deduplicated helper-function library with per-instance specialization
//! - Automation evaluators and raymarcher distance-function synthesis
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use psgc::{compile_graph, NodeGraph, ShaderNodeRegistry};
//!
//! let registry = ShaderNodeRegistry::from_json(&std::fs::read_to_string("nodes.json")?)?;
//! let graph = NodeGraph::from_json(&std::fs::read_to_string("graph.json")?)?;
//!
//! match compile_graph(&graph, &registry) {
//!     Ok(result) => {
//!         std::fs::write("shader.frag", &result.program_text)?;
//!     }
//!     Err(e) => eprintln!("Compilation failed: {}", e),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! PSGC follows a multi-phase compilation pipeline:
//!
//! 1. **Validation** - Structural and type checks, collected as diagnostics
//! 2. **Dependency Analysis** - Topological execution order (fatal on cycles)
//! 3. **Symbol Assignment** - Uniforms and global output variables
//! 4. **Function Library** - Specialised, deduplicated node functions
//! 5. **Code Generation** - Automation, raymarchers, per-node bodies, final color
//! 6. **Assembly** - Substitution into the fixed fragment program template

pub mod analysis;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod naming;
pub mod template;
pub mod uniforms;
pub mod validation;

#[cfg(test)]
mod test_utils;

// Re-export the main compilation API
pub use compiler::{compile_graph, compile_graph_with_config, CompileResult, Diagnostics};

pub use analysis::GraphAnalyzer;
pub use config::{CompilerConfig, GRAPH_FORMAT_VERSION};
pub use error::{CompileError, Result};
pub use graph::{
    AutomationLane, AutomationRegion, CombinationMode, Connection, ConnectionTarget, Curve,
    Interpolation, Keyframe, NodeGraph, NodeInstance, ParamValue,
};
pub use metadata::{
    DataType, NodeMetadataProvider, NodeTypeSpec, ParamSpec, ParamType, PortSpec,
    ShaderNodeRegistry,
};
pub use uniforms::{UniformGenerator, UniformInfo};
pub use validation::{GraphValidator, TypeValidator};
