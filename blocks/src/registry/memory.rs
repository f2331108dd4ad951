use crate::Program;
use crate::ids::{FunctionId, InstanceId, VariableId, WorkspaceId};
use crate::registry::{
    ClassInstance, Function, FunctionRegistry, InstanceRegistry, Registries, Variable,
    VariableRegistry, Workspace, WorkspaceRegistry,
};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    variables: Vec<Variable>,
}

impl VariableStore {
    pub fn new(variables: Vec<Variable>) -> Self {
        VariableStore { variables }
    }
}

impl VariableRegistry for VariableStore {
    fn get(&self, id: &VariableId) -> Option<&Variable> {
        self.variables.iter().find(|v| &v.id == id)
    }

    fn get_by_name(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    fn add(&mut self, name: String, value: Value) -> VariableId {
        let id = VariableId::generate();
        self.variables.push(Variable {
            id: id.clone(),
            name,
            value,
        });
        id
    }

    fn update(&mut self, variable: Variable) -> bool {
        match self.variables.iter_mut().find(|v| v.id == variable.id) {
            Some(slot) => {
                *slot = variable;
                true
            }
            None => false,
        }
    }

    fn all(&self) -> Vec<&Variable> {
        self.variables.iter().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FunctionStore {
    functions: Vec<Function>,
}

impl FunctionStore {
    pub fn new(functions: Vec<Function>) -> Self {
        FunctionStore { functions }
    }
}

impl FunctionRegistry for FunctionStore {
    fn get(&self, id: &FunctionId) -> Option<&Function> {
        self.functions.iter().find(|f| &f.id == id)
    }

    fn get_by_name(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    fn all(&self) -> Vec<&Function> {
        self.functions.iter().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkspaceStore {
    workspaces: Vec<Workspace>,
    active: Option<WorkspaceId>,
}

impl WorkspaceStore {
    /// The first workspace starts out active.
    pub fn new(workspaces: Vec<Workspace>) -> Self {
        let active = workspaces.first().map(|w| w.id.clone());
        WorkspaceStore { workspaces, active }
    }
}

impl WorkspaceRegistry for WorkspaceStore {
    fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    fn get_by_name(&self, name: &str) -> Option<&Workspace> {
        self.workspaces.iter().find(|w| w.name == name)
    }

    fn set_active(&mut self, id: &WorkspaceId) -> bool {
        if self.workspaces.iter().any(|w| &w.id == id) {
            self.active = Some(id.clone());
            true
        } else {
            false
        }
    }

    fn active(&self) -> Option<&Workspace> {
        let active = self.active.as_ref()?;
        self.workspaces.iter().find(|w| &w.id == active)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstanceStore {
    instances: Vec<ClassInstance>,
}

impl InstanceStore {
    pub fn new(instances: Vec<ClassInstance>) -> Self {
        InstanceStore { instances }
    }

    pub fn all(&self) -> &[ClassInstance] {
        &self.instances
    }
}

impl InstanceRegistry for InstanceStore {
    fn get_by_name(&self, name: &str) -> Option<&ClassInstance> {
        self.instances.iter().find(|i| i.name == name)
    }

    fn add(&mut self, name: String, class_name: String) -> InstanceId {
        let id = InstanceId::generate();
        self.instances.push(ClassInstance {
            id: id.clone(),
            name,
            class_name,
        });
        id
    }
}

/// In-memory registries for a whole program.
#[derive(Debug, Clone, Default)]
pub struct Store {
    pub variables: VariableStore,
    pub functions: FunctionStore,
    pub workspaces: WorkspaceStore,
    pub instances: InstanceStore,
}

impl Store {
    /// Split the store into the capability set one interpreter run needs.
    pub fn registries(&mut self) -> Registries<'_> {
        Registries {
            variables: &mut self.variables,
            functions: &self.functions,
            workspaces: &self.workspaces,
            instances: &mut self.instances,
        }
    }
}

impl From<Program> for Store {
    fn from(program: Program) -> Self {
        Store {
            variables: VariableStore::new(program.variables),
            functions: FunctionStore::new(program.functions),
            workspaces: WorkspaceStore::new(program.workspaces),
            instances: InstanceStore::new(program.instances),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_add_then_update() {
        let mut store = VariableStore::default();
        let id = store.add("x".to_string(), Value::Number(1.0));
        assert_eq!(store.get(&id).map(|v| v.name.as_str()), Some("x"));

        let mut updated = store.get_by_name("x").cloned().unwrap();
        updated.value = Value::Number(2.0);
        assert!(store.update(updated));
        assert_eq!(store.get(&id).unwrap().value, Value::Number(2.0));

        let stranger = Variable {
            id: VariableId::from("missing"),
            name: "y".to_string(),
            value: Value::Unit,
        };
        assert!(!store.update(stranger));
        assert_eq!(store.all().len(), 1);
    }

    #[test]
    fn first_workspace_is_active_and_selectable() {
        let mut store = WorkspaceStore::new(vec![
            Workspace {
                id: WorkspaceId::from("w1"),
                name: "Main".to_string(),
                blocks: Vec::new(),
            },
            Workspace {
                id: WorkspaceId::from("w2"),
                name: "Helper".to_string(),
                blocks: Vec::new(),
            },
        ]);
        assert_eq!(store.active().map(|w| w.name.as_str()), Some("Main"));
        assert!(store.set_active(&WorkspaceId::from("w2")));
        assert_eq!(store.active().map(|w| w.name.as_str()), Some("Helper"));
        assert!(!store.set_active(&WorkspaceId::from("nope")));
        assert_eq!(store.active().map(|w| w.name.as_str()), Some("Helper"));
        assert!(store.get_by_name("Main").is_some());
    }

    #[test]
    fn empty_workspace_store_has_no_blocks() {
        let store = WorkspaceStore::default();
        assert!(store.active().is_none());
        assert!(store.active_blocks().is_empty());
    }
}
