//! Java source generation for block programs. Each workspace becomes one
//! class; functions become static methods.

pub mod generator;
mod java;

use blocks::diagnostic::Diagnostic;
use blocks::registry::{FunctionRegistry, Store, VariableRegistry, WorkspaceRegistry};
use serde::Deserialize;

pub use generator::Generator;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    /// Spaces per nesting level.
    pub indent_width: usize,
    /// Prefix for `repeat` loop counters; the nesting depth is appended.
    pub loop_variable: String,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            indent_width: 2,
            loop_variable: "__i".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct GeneratedSource {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Generate one class per workspace, in registry order. Each workspace is
/// made active while its blocks are walked.
pub fn generate(
    workspaces: &mut dyn WorkspaceRegistry,
    variables: &dyn VariableRegistry,
    functions: &dyn FunctionRegistry,
    options: &CodegenOptions,
) -> GeneratedSource {
    let classes: Vec<_> = workspaces
        .workspaces()
        .iter()
        .map(|w| (w.id.clone(), w.name.clone()))
        .collect();

    let mut generator = Generator::new(variables, functions, options);
    for (id, name) in classes {
        if workspaces.set_active(&id) {
            generator.class(&name, workspaces.active_blocks());
        }
    }
    generator.finish()
}

pub fn generate_program(store: &mut Store, options: &CodegenOptions) -> GeneratedSource {
    generate(
        &mut store.workspaces,
        &store.variables,
        &store.functions,
        options,
    )
}
