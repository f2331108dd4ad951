pub mod block;
pub mod diagnostic;
pub mod ids;
pub mod loader;
pub mod registry;
pub mod value;

use serde::Deserialize;

use crate::registry::{ClassInstance, Function, Variable, Workspace};

/// A loaded visual program: every workspace plus the registries it refers to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Program {
    /// Workspaces in editor order. Each one becomes one emitted class.
    #[serde(default)]
    pub workspaces: Vec<Workspace>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub functions: Vec<Function>,
    #[serde(default)]
    pub instances: Vec<ClassInstance>,
    /// The source file ID (for error reporting with codespan-reporting).
    #[serde(skip)]
    pub source_id: usize,
}
