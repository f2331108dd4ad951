use blocks::block::{Block, BlockKind, ENTRY_POINT, Slot};
use blocks::diagnostic::{Diagnostic, Problem};
use blocks::ids::{BlockId, VariableId};
use blocks::registry::{Registries, Store, WorkspaceRegistry};
use blocks::value::Value;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::environment::{Environment, Frame};
use crate::error::RunError;

pub const DEFAULT_MAX_DEPTH: usize = 256;
pub const DEFAULT_MAX_NESTING: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterpreterOptions {
    /// Deepest chain of active function and method calls.
    pub max_depth: usize,
    /// Deepest nesting of blocks, counted across calls.
    pub max_nesting: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        InterpreterOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

/// Observable result of a run: printed lines plus everything reported.
#[derive(Debug, Default)]
pub struct Execution {
    pub output: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// How a statement sequence finished.
pub(crate) enum Flow {
    Next,
    /// A `return` block was reached, with its value if it had one.
    Return(Option<Value>),
}

/// Outcome of invoking a function or method.
pub(crate) enum Call {
    Returned(Value),
    /// The function ran but produced no value.
    Empty(String),
    /// The call could not be made; already reported.
    Failed,
}

/// Walks block trees against a set of registries, collecting printed output.
pub struct Interpreter<'a> {
    pub(crate) registries: Registries<'a>,
    pub(crate) env: Environment,
    pub(crate) output: Vec<String>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) options: InterpreterOptions,
}

impl<'a> Interpreter<'a> {
    pub fn new(registries: Registries<'a>) -> Self {
        Interpreter::with_options(registries, InterpreterOptions::default())
    }

    pub fn with_options(registries: Registries<'a>, options: InterpreterOptions) -> Self {
        Interpreter {
            registries,
            env: Environment::new(),
            output: Vec::new(),
            diagnostics: Vec::new(),
            options,
        }
    }

    /// Execute a statement sequence from a clean output buffer and return
    /// the printed lines. Registry changes persist across calls.
    pub fn execute(&mut self, statements: &[Block]) -> Vec<String> {
        self.reset();
        self.execute_sequence(statements);
        self.output.clone()
    }

    /// Execute every workspace's top-level blocks in registry order.
    pub fn execute_all(&mut self) -> Vec<String> {
        self.reset();
        let workspaces: &'a dyn WorkspaceRegistry = self.registries.workspaces;
        for workspace in workspaces.workspaces() {
            debug!(workspace = %workspace.name, "executing workspace");
            self.execute_sequence(&workspace.blocks);
        }
        self.output.clone()
    }

    /// Execute the top-level blocks of the workspace called `name`.
    pub fn execute_workspace(&mut self, name: &str) -> Result<Vec<String>, RunError> {
        let workspaces: &'a dyn WorkspaceRegistry = self.registries.workspaces;
        let workspace = workspaces
            .get_by_name(name)
            .ok_or_else(|| RunError::UndefinedWorkspace {
                name: name.to_string(),
                available: workspaces
                    .workspaces()
                    .iter()
                    .map(|w| w.name.clone())
                    .collect(),
            })?;
        Ok(self.execute(&workspace.blocks))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    fn reset(&mut self) {
        self.output.clear();
        self.diagnostics.clear();
        self.env.reset();
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        warn!(%diagnostic, "block skipped or degraded");
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn warn_at(&mut self, problem: Problem, block: &BlockId) {
        self.report(Diagnostic::warning(problem, block));
    }

    /// Enter one nesting level or report that the limit was hit.
    pub(crate) fn descend(&mut self, block: &BlockId) -> bool {
        if self.env.enter(self.options.max_nesting) {
            true
        } else {
            self.report(Diagnostic::error(
                Problem::NestingTooDeep(self.options.max_nesting),
                block,
            ));
            false
        }
    }

    pub(crate) fn execute_sequence(&mut self, statements: &[Block]) -> Flow {
        for statement in statements {
            if let Flow::Return(value) = self.execute_statement(statement) {
                return Flow::Return(value);
            }
        }
        Flow::Next
    }

    fn execute_nested(&mut self, owner: &BlockId, statements: &[Block]) -> Flow {
        if !self.descend(owner) {
            return Flow::Next;
        }
        let flow = self.execute_sequence(statements);
        self.env.leave();
        flow
    }

    fn execute_statement(&mut self, block: &Block) -> Flow {
        match &block.kind {
            BlockKind::Print { value } => {
                match value {
                    Some(slot) => {
                        let value = self.evaluate(slot);
                        self.output.push(value.to_string());
                    }
                    None => self.warn_at(
                        Problem::MalformedSlot {
                            expected: "a value to print".to_string(),
                            got: "nothing".to_string(),
                        },
                        &block.id,
                    ),
                }
                Flow::Next
            }
            BlockKind::IfThen {
                condition,
                then_blocks,
                else_blocks,
            } => {
                let holds = match condition {
                    Some(condition) => self.evaluate_condition(condition),
                    None => {
                        self.warn_at(Problem::MissingCondition, &block.id);
                        false
                    }
                };
                if holds {
                    self.execute_nested(&block.id, then_blocks)
                } else {
                    self.execute_nested(&block.id, else_blocks)
                }
            }
            BlockKind::Repeat { count, body } => {
                for _ in 0..*count {
                    if let Flow::Return(value) = self.execute_nested(&block.id, body) {
                        return Flow::Return(value);
                    }
                }
                Flow::Next
            }
            BlockKind::CreateVariable { name, value } => {
                self.create_variable(&block.id, name, value);
                Flow::Next
            }
            BlockKind::VariableChange { variable_id, value } => {
                self.change_variable(&block.id, variable_id, value);
                Flow::Next
            }
            BlockKind::Function {
                name,
                parameters,
                body,
                returns,
            } => {
                // Other functions are declarations, reached through calls.
                if name == ENTRY_POINT {
                    self.invoke(&block.id, name, parameters, Vec::new(), body, returns.as_ref());
                }
                Flow::Next
            }
            BlockKind::FunctionCall {
                function_id,
                arguments,
            } => {
                self.call_function(block, function_id, arguments);
                Flow::Next
            }
            BlockKind::InvokeMethod { instance, method } => {
                self.invoke_method(block, instance, method);
                Flow::Next
            }
            BlockKind::ClassInstantiation {
                class_name,
                instance_name,
            } => {
                self.instantiate(&block.id, class_name, instance_name);
                Flow::Next
            }
            BlockKind::Return { value } => {
                if !self.env.in_function() {
                    self.warn_at(
                        Problem::MisplacedBlock("return outside a function".to_string()),
                        &block.id,
                    );
                    return Flow::Next;
                }
                let value = value.as_ref().map(|slot| self.evaluate(slot));
                Flow::Return(value)
            }
            BlockKind::Unknown => {
                self.warn_at(Problem::UnknownBlockKind, &block.id);
                Flow::Next
            }
            kind => {
                self.warn_at(
                    Problem::MisplacedBlock(format!("{} block used as a statement", kind.name())),
                    &block.id,
                );
                Flow::Next
            }
        }
    }

    /// Bind `arguments` to `parameters` (missing ones as 0), run the body
    /// and produce the returned value, if any.
    pub(crate) fn invoke(
        &mut self,
        site: &BlockId,
        name: &str,
        parameters: &[String],
        arguments: Vec<Value>,
        body: &[Block],
        returns: Option<&Slot>,
    ) -> Call {
        if self.env.call_depth() >= self.options.max_depth {
            self.report(Diagnostic::error(
                Problem::RecursionTooDeep(self.options.max_depth),
                site,
            ));
            return Call::Failed;
        }
        if !self.descend(site) {
            return Call::Failed;
        }
        debug!(
            function = name,
            calls = self.env.call_depth(),
            nesting = self.env.depth(),
            "invoking function"
        );

        let bindings = parameters
            .iter()
            .cloned()
            .zip(arguments.into_iter().chain(std::iter::repeat(Value::Number(0.0))));
        self.env.push_frame(Frame::new(name, bindings));

        let result = match self.execute_sequence(body) {
            Flow::Return(value) => value,
            Flow::Next => returns.map(|slot| self.evaluate(slot)),
        };

        self.env.pop_frame();
        self.env.leave();
        match result {
            Some(value) => Call::Returned(value),
            None => Call::Empty(name.to_string()),
        }
    }

    fn create_variable(&mut self, block: &BlockId, name: &Slot, value: &Slot) {
        let name = match self.evaluate(name) {
            Value::Text(text) if !text.trim().is_empty() => text,
            other => {
                self.warn_at(
                    Problem::MalformedSlot {
                        expected: "a variable name".to_string(),
                        got: describe(&other),
                    },
                    block,
                );
                return;
            }
        };
        let Some(value) = self.evaluate_storable(block, value) else {
            return;
        };

        let variables = &mut *self.registries.variables;
        match variables.get_by_name(&name).cloned() {
            Some(mut existing) => {
                existing.value = value;
                variables.update(existing);
            }
            None => {
                variables.add(name, value);
            }
        }
    }

    fn change_variable(&mut self, block: &BlockId, variable_id: &VariableId, value: &Slot) {
        if self.registries.variables.get(variable_id).is_none() {
            self.warn_at(Problem::UndefinedVariable(variable_id.clone()), block);
            return;
        }
        // The new value may read the variable's current value.
        let Some(value) = self.evaluate_storable(block, value) else {
            return;
        };
        if let Some(mut variable) = self.registries.variables.get(variable_id).cloned() {
            variable.value = value;
            self.registries.variables.update(variable);
        }
    }

    fn evaluate_storable(&mut self, block: &BlockId, slot: &Slot) -> Option<Value> {
        match self.evaluate(slot) {
            Value::Unit => {
                self.warn_at(
                    Problem::MalformedSlot {
                        expected: "a value".to_string(),
                        got: "nothing".to_string(),
                    },
                    block,
                );
                None
            }
            value => Some(value),
        }
    }

    fn instantiate(&mut self, block: &BlockId, class_name: &Slot, instance_name: &Slot) {
        let class_name = self.evaluate(class_name);
        let instance_name = self.evaluate(instance_name);
        match (class_name, instance_name) {
            (Value::Text(class_name), Value::Text(instance_name))
                if !class_name.is_empty() && !instance_name.is_empty() =>
            {
                self.registries.instances.add(instance_name, class_name);
            }
            (class_name, instance_name) => self.warn_at(
                Problem::MalformedSlot {
                    expected: "a class name and an instance name".to_string(),
                    got: format!("{} and {}", describe(&class_name), describe(&instance_name)),
                },
                block,
            ),
        }
    }
}

pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Unit => "nothing".to_string(),
        Value::Text(text) if text.trim().is_empty() => "empty text".to_string(),
        other => format!("{} '{}'", other.type_name(), other),
    }
}

/// Run every workspace of `store` in order.
pub fn execute_program(store: &mut Store, options: &InterpreterOptions) -> Execution {
    let mut interpreter = Interpreter::with_options(store.registries(), options.clone());
    let output = interpreter.execute_all();
    Execution {
        output,
        diagnostics: interpreter.into_diagnostics(),
    }
}

/// Run the workspace called `name`.
pub fn execute_workspace(
    store: &mut Store,
    name: &str,
    options: &InterpreterOptions,
) -> Result<Execution, RunError> {
    let mut interpreter = Interpreter::with_options(store.registries(), options.clone());
    let output = interpreter.execute_workspace(name)?;
    Ok(Execution {
        output,
        diagnostics: interpreter.into_diagnostics(),
    })
}
