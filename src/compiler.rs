//! # Shader Graph Compiler
//!
//! Main entry points for compiling shader node graphs to GLSL.

use crate::analysis::GraphAnalyzer;
use crate::codegen::scanner::identifiers;
use crate::codegen::{
    assemble_program, generate_declarations, CompileContext, FunctionGenerator, MainCodeGenerator,
    ProgramParts,
};
use crate::config::CompilerConfig;
use crate::error::Result;
use crate::graph::NodeGraph;
use crate::metadata::NodeMetadataProvider;
use crate::uniforms::{UniformGenerator, UniformInfo};
use crate::validation::{GraphValidator, TypeValidator};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Problems found while compiling, plus the facts an editor needs to display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub execution_order: Vec<String>,
    pub final_output_node_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileResult {
    pub program_text: String,
    /// Uniforms the program actually references, sorted by name.
    pub uniforms: Vec<UniformInfo>,
    pub diagnostics: Diagnostics,
}

impl CompileResult {
    /// Serialize to the editor's JSON contract.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.errors.is_empty()
    }
}

/// Compile a shader graph to a GLSL fragment program
///
/// This is the main entry point for the shader compiler. Validation problems do
/// not stop compilation: they are reported in [`Diagnostics::errors`] next to a
/// best-effort program, so an editor can keep rendering while the user fixes
/// the graph.
///
/// # Arguments
///
/// * `graph` - The shader graph to compile
/// * `registry` - Node type descriptors the graph's nodes refer to
///
/// # Returns
///
/// * `Ok(CompileResult)` - Program text, used uniforms and diagnostics
/// * `Err(CompileError::CycleDetected)` - The graph cannot be ordered
///
/// # Examples
///
/// ```rust,no_run
/// use psgc::{compile_graph, NodeGraph, ShaderNodeRegistry};
///
/// let registry = ShaderNodeRegistry::from_json(&std::fs::read_to_string("nodes.json")?)?;
/// let graph = NodeGraph::from_json(&std::fs::read_to_string("graph.json")?)?;
/// let result = compile_graph(&graph, &registry)?;
/// println!("{}", result.program_text);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn compile_graph(
    graph: &NodeGraph,
    registry: &dyn NodeMetadataProvider,
) -> Result<CompileResult> {
    compile_graph_with_config(graph, registry, &CompilerConfig::default())
}

/// Compile a shader graph with an explicit configuration
///
/// # Arguments
///
/// * `graph` - The shader graph to compile
/// * `registry` - Node type descriptors the graph's nodes refer to
/// * `config` - Naming, raymarching and output settings
///
/// # Returns
///
/// * `Ok(CompileResult)` - Program text, used uniforms and diagnostics
/// * `Err(CompileError)` - The configuration is invalid or the graph has a cycle
pub fn compile_graph_with_config(
    graph: &NodeGraph,
    registry: &dyn NodeMetadataProvider,
    config: &CompilerConfig,
) -> Result<CompileResult> {
    tracing::info!("[PSGC] Starting shader graph compilation");
    tracing::info!(
        "[PSGC] Graph: {} ({} nodes, {} connections, {} automation lanes)",
        graph.name,
        graph.nodes.len(),
        graph.connections.len(),
        graph.automation.len()
    );
    config.validate()?;

    // Phase 1: Validation
    tracing::info!("[PSGC] Phase 1: Validating graph...");
    let mut errors = GraphValidator::new(registry, config).validate(graph);
    errors.extend(TypeValidator::new(registry, config).validate(graph));
    for error in &errors {
        tracing::warn!("[PSGC] Validation: {}", error);
    }
    tracing::info!("[PSGC] Validation complete ({} problems)", errors.len());

    // Phase 2: Ordering
    tracing::info!("[PSGC] Phase 2: Analyzing dependencies...");
    let execution_order = GraphAnalyzer::new(graph, config).topological_sort()?;
    tracing::info!("[PSGC]   - {} nodes in execution order", execution_order.len());

    // Phase 3: Symbols
    tracing::info!("[PSGC] Phase 3: Assigning uniforms and globals...");
    let uniforms = UniformGenerator::new(graph, registry, config);
    let mut warnings = Vec::new();
    let mut ctx = CompileContext::new(graph, registry, config, &execution_order, &uniforms);
    let declarations = generate_declarations(&ctx, &mut warnings);
    ctx.set_declared(declarations.symbols.clone());

    // Phase 4: Function library
    tracing::info!("[PSGC] Phase 4: Building function library...");
    let library = FunctionGenerator::new(&ctx).generate(&mut warnings);
    tracing::info!("[PSGC]   - {} unique functions", library.functions.len());

    // Phase 5: Main code
    tracing::info!("[PSGC] Phase 5: Generating node code...");
    let main = MainCodeGenerator::new(&ctx, &library).generate(&mut warnings);
    let warnings = distinct(warnings);

    // Phase 6: Assembly
    tracing::info!("[PSGC] Phase 6: Assembling program...");
    let mut referenced: HashSet<String> = HashSet::new();
    let sections = declarations
        .lines
        .iter()
        .chain(&main.functions)
        .chain(&main.bodies)
        .chain(std::iter::once(&main.final_output.color_expr));
    for section in sections {
        referenced.extend(identifiers(section).into_iter().map(str::to_string));
    }
    let used_uniforms = uniforms.metadata(&referenced);
    let uniform_lines = used_uniforms
        .iter()
        .map(|info| format!("uniform {} {};", info.glsl_type, info.name))
        .collect();

    let program_text = assemble_program(&ProgramParts {
        glsl_version: config.glsl_version.clone(),
        uniforms: uniform_lines,
        globals: declarations.lines,
        functions: main.functions,
        bodies: main.bodies,
        color: main.final_output.color_expr,
    });

    tracing::info!(
        "[PSGC] Code generation complete ({} bytes, {} uniforms, {} warnings)",
        program_text.len(),
        used_uniforms.len(),
        warnings.len()
    );
    tracing::info!("[PSGC] Compilation successful!");

    Ok(CompileResult {
        program_text,
        uniforms: used_uniforms,
        diagnostics: Diagnostics {
            errors,
            warnings,
            execution_order,
            final_output_node_id: main.final_output.node_id,
        },
    })
}

/// Several stages resolve the same node; keep the first report of each problem.
fn distinct(warnings: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    warnings
        .into_iter()
        .filter(|warning| seen.insert(warning.clone()))
        .collect()
}
