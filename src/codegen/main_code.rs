//! # Main Code Generation
//!
//! Orders the generation stages and gathers their output into the pieces the
//! program template needs.

use super::automation::generate_automation;
use super::functions::FunctionLibrary;
use super::node_code::generate_node_body;
use super::output::{resolve_final_output, FinalOutput};
use super::raymarch::generate_raymarch_functions;
use super::CompileContext;

/// Generated code below the global declarations.
#[derive(Debug, Clone)]
pub struct MainCode {
    /// Preamble, automation evaluators, library functions, raymarch functions.
    pub functions: Vec<String>,
    pub bodies: Vec<String>,
    pub final_output: FinalOutput,
}

pub struct MainCodeGenerator<'c, 'a> {
    ctx: &'c CompileContext<'a>,
    library: &'c FunctionLibrary,
}

impl<'c, 'a> MainCodeGenerator<'c, 'a> {
    pub fn new(ctx: &'c CompileContext<'a>, library: &'c FunctionLibrary) -> Self {
        Self { ctx, library }
    }

    pub fn generate(&self, warnings: &mut Vec<String>) -> MainCode {
        let automation = generate_automation(self.ctx, warnings);
        let raymarch = generate_raymarch_functions(self.ctx, self.library, warnings);

        let mut bodies = Vec::new();
        for (node, spec) in self.ctx.ordered_nodes() {
            let body = generate_node_body(
                self.ctx,
                node,
                spec,
                self.library.renames_for(&node.id),
                raymarch.calls.get(&node.id),
                warnings,
            );
            bodies.extend(body);
        }

        let final_output = resolve_final_output(self.ctx, warnings);

        let mut functions = Vec::new();
        if !self.library.preamble.is_empty() {
            functions.push(self.library.render_preamble());
        }
        functions.extend(automation);
        functions.extend(self.library.functions.iter().cloned());
        functions.extend(raymarch.functions);

        tracing::debug!(
            "[PSGC] Main code: {} functions, {} node bodies",
            functions.len(),
            bodies.len()
        );
        MainCode { functions, bodies, final_output }
    }
}
