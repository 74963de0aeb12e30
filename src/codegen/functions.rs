//! # Function Library
//!
//! Collects the helper functions contributed by node types. Each node's
//! function code is specialised for that node first; identical functions are
//! then emitted once, while functions whose body depends on per-instance state
//! get an instance-qualified name.

use super::node_code::{output_variables, resolve_inputs};
use super::params::{ParamSource, ParameterResolver, ResolvedParam};
use super::scanner::{identifiers, rename_identifiers, scan_functions};
use super::{push_warning, substitute, Bindings, CompileContext};
use crate::graph::NodeInstance;
use crate::naming::instance_function_name;
use crate::template::{Placeholder, Template};
use std::collections::{BTreeMap, HashMap};

/// Deduplicated library functions plus the renames applied per node.
#[derive(Debug, Clone, Default)]
pub struct FunctionLibrary {
    /// Top-level non-function code, deduplicated by exact text.
    pub preamble: Vec<String>,
    pub functions: Vec<String>,
    /// Signatures of `functions`, in emission order.
    pub signatures: Vec<String>,
    renames: BTreeMap<String, Vec<(String, String)>>,
}

impl FunctionLibrary {
    /// `(original, renamed)` function names for a node's code.
    pub fn renames_for(&self, node_id: &str) -> &[(String, String)] {
        self.renames.get(node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn render_preamble(&self) -> String {
        self.preamble.join("\n\n")
    }
}

pub struct FunctionGenerator<'c, 'a> {
    ctx: &'c CompileContext<'a>,
}

impl<'c, 'a> FunctionGenerator<'c, 'a> {
    pub fn new(ctx: &'c CompileContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn generate(&self, warnings: &mut Vec<String>) -> FunctionLibrary {
        let mut library = FunctionLibrary::default();
        let mut seen: HashMap<String, String> = HashMap::new();

        for (node, spec) in self.ctx.ordered_nodes() {
            let Some(code) = spec.function_code.as_deref() else {
                continue;
            };
            if code.trim().is_empty() {
                continue;
            }

            let template = Template::parse(code);
            let params = ParameterResolver::new(self.ctx).resolve_all(node, spec, warnings);
            // function code lives at global scope: no `uv` or `p` to bind
            let inputs = resolve_inputs(self.ctx, node, spec, &params, None, warnings);
            let outputs = output_variables(node, spec);
            let bindings = Bindings {
                node_id: &node.id,
                inputs: &inputs,
                outputs: &outputs,
                params: &params,
                coords: None,
                sdf_call: None,
                displacement: None,
            };
            let mut specialised = substitute(&template, &bindings, warnings);
            let mut scanned = scan_functions(&specialised);

            let mut instance_specific = self.is_instance_specific(node, &template, &params, &specialised);
            if !instance_specific && references_params(&template) {
                // same signature, different literals: merging would pick one instance's values
                instance_specific = scanned.functions.iter().any(|def| {
                    seen.get(&def.signature())
                        .is_some_and(|text| text != &def.text)
                });
            }

            if instance_specific && !scanned.functions.is_empty() {
                let renames: Vec<(String, String)> = scanned
                    .functions
                    .iter()
                    .map(|def| (def.name.clone(), instance_function_name(&def.name, &node.id)))
                    .collect();
                tracing::debug!(
                    "[PSGC] Node {} gets instance-specific functions: {:?}",
                    node.id,
                    renames
                );
                specialised = rename_identifiers(&specialised, &renames);
                scanned = scan_functions(&specialised);
                library.renames.insert(node.id.clone(), renames);
            }

            if !scanned.preamble.is_empty() && !library.preamble.contains(&scanned.preamble) {
                library.preamble.push(scanned.preamble.clone());
            }

            for def in scanned.functions {
                let signature = def.signature();
                match seen.get(&signature) {
                    Some(existing) if existing != &def.text => {
                        push_warning(
                            warnings,
                            format!(
                                "Function '{}' from node '{}' conflicts with an earlier definition; keeping the first",
                                def.name, node.id
                            ),
                        );
                    }
                    Some(_) => {
                        tracing::debug!("[PSGC] Reusing function {} for node {}", signature, node.id);
                    }
                    None => {
                        seen.insert(signature.clone(), def.text.clone());
                        library.signatures.push(signature);
                        library.functions.push(def.text);
                    }
                }
            }
        }

        tracing::debug!(
            "[PSGC] Function library: {} functions, {} preamble blocks",
            library.functions.len(),
            library.preamble.len()
        );
        library
    }

    /// A node's functions must be private to it when their body reads
    /// per-instance state: a wired or automated parameter, an input or output
    /// variable, or one of the node's own uniforms.
    fn is_instance_specific(
        &self,
        node: &NodeInstance,
        template: &Template,
        params: &BTreeMap<String, ResolvedParam>,
        specialised: &str,
    ) -> bool {
        let per_instance_param = template.placeholders().any(|placeholder| match placeholder {
            Placeholder::Param(name) => params.get(name).is_some_and(|p| {
                matches!(p.source, ParamSource::Connection | ParamSource::Automation)
            }),
            Placeholder::Input(_) | Placeholder::Output(_) => true,
            _ => false,
        });
        if per_instance_param {
            return true;
        }
        let used = identifiers(specialised);
        let mut own_uniforms = self.ctx.uniforms.node_uniforms(&node.id);
        own_uniforms.any(|uniform| used.contains(uniform))
    }
}

fn references_params(template: &Template) -> bool {
    template
        .placeholders()
        .any(|placeholder| matches!(placeholder, Placeholder::Param(_)))
}
