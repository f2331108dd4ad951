//! Symbol registries the evaluators read and write.
//!
//! The editor owns these stores; the interpreter and code generator only see
//! them through the capability traits below, handed in at call time.

pub mod memory;

use serde::Deserialize;

use crate::block::{Block, Slot};
use crate::ids::{FunctionId, InstanceId, VariableId, WorkspaceId};
use crate::value::Value;

pub use memory::{FunctionStore, InstanceStore, Store, VariableStore, WorkspaceStore};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// A user-defined function. Parameters are bound positionally at call sites.
#[derive(Debug, Clone, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub body: Vec<Block>,
    #[serde(default)]
    pub returns: Option<Slot>,
}

/// A named top-level container of blocks, emitted as one class.
#[derive(Debug, Clone, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInstance {
    pub id: InstanceId,
    pub name: String,
    pub class_name: String,
}

pub trait VariableRegistry {
    fn get(&self, id: &VariableId) -> Option<&Variable>;
    fn get_by_name(&self, name: &str) -> Option<&Variable>;
    /// Register a new variable and return its freshly minted id.
    fn add(&mut self, name: String, value: Value) -> VariableId;
    /// Replace the entry with the same id. Returns false if there is none.
    fn update(&mut self, variable: Variable) -> bool;
    fn all(&self) -> Vec<&Variable>;
}

pub trait FunctionRegistry {
    fn get(&self, id: &FunctionId) -> Option<&Function>;
    fn get_by_name(&self, name: &str) -> Option<&Function>;
    fn all(&self) -> Vec<&Function>;
}

pub trait WorkspaceRegistry {
    /// All workspaces in editor order.
    fn workspaces(&self) -> &[Workspace];
    fn get_by_name(&self, name: &str) -> Option<&Workspace>;
    /// Select the workspace later calls to `active_blocks` refer to.
    fn set_active(&mut self, id: &WorkspaceId) -> bool;
    fn active(&self) -> Option<&Workspace>;

    fn active_blocks(&self) -> &[Block] {
        self.active().map(|w| w.blocks.as_slice()).unwrap_or(&[])
    }
}

pub trait InstanceRegistry {
    fn get_by_name(&self, name: &str) -> Option<&ClassInstance>;
    fn add(&mut self, name: String, class_name: String) -> InstanceId;
}

/// The capability set handed to the interpreter for one run.
pub struct Registries<'a> {
    pub variables: &'a mut dyn VariableRegistry,
    pub functions: &'a dyn FunctionRegistry,
    pub workspaces: &'a dyn WorkspaceRegistry,
    pub instances: &'a mut dyn InstanceRegistry,
}
