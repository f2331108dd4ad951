use std::collections::HashSet;

use blocks::block::{
    Block, BlockKind, Condition, ConditionKind, ENTRY_POINT, Literal, Logic, Slot,
};
use blocks::diagnostic::{Diagnostic, Problem};
use blocks::ids::{BlockId, FunctionId};
use blocks::registry::{FunctionRegistry, VariableRegistry};
use blocks::value::Value;
use tracing::{debug, warn};

use crate::{CodegenOptions, GeneratedSource, java};

/// Accumulates emitted lines for a sequence of classes.
pub struct Generator<'a> {
    variables: &'a dyn VariableRegistry,
    functions: &'a dyn FunctionRegistry,
    options: &'a CodegenOptions,
    lines: Vec<String>,
    indent: usize,
    loop_depth: usize,
    /// Parameters of the method being emitted, if any.
    parameters: Option<Vec<String>>,
    /// Whether the method being emitted is declared `int`.
    returns_int: bool,
    /// Registry functions called from the current class, in first-call order.
    called: Vec<FunctionId>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Generator<'a> {
    pub fn new(
        variables: &'a dyn VariableRegistry,
        functions: &'a dyn FunctionRegistry,
        options: &'a CodegenOptions,
    ) -> Self {
        Generator {
            variables,
            functions,
            options,
            lines: Vec::new(),
            indent: 0,
            loop_depth: 0,
            parameters: None,
            returns_int: false,
            called: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Emit `class <name> { ... }` followed by a blank line.
    pub fn class(&mut self, name: &str, blocks: &[Block]) {
        debug!(class = name, blocks = blocks.len(), "generating class");
        self.indent = 0;
        self.loop_depth = 0;
        self.called.clear();

        self.line(format!("class {} {{", java::identifier(name)));
        self.indent += 1;
        for block in blocks {
            self.statement(block);
        }
        self.called_functions(blocks);
        self.indent -= 1;
        self.line("}");
        self.lines.push(String::new());
    }

    pub fn finish(self) -> GeneratedSource {
        GeneratedSource {
            source: self.lines.join("\n"),
            diagnostics: self.diagnostics,
        }
    }

    fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        let pad = " ".repeat(self.indent * self.options.indent_width);
        self.lines.push(format!("{}{}", pad, text));
    }

    fn warn_at(&mut self, problem: Problem, block: &BlockId) {
        let diagnostic = Diagnostic::warning(problem, block);
        warn!(%diagnostic, "block not emitted as written");
        self.diagnostics.push(diagnostic);
    }

    fn nested(&mut self, blocks: &[Block]) {
        self.indent += 1;
        for block in blocks {
            self.statement(block);
        }
        self.indent -= 1;
    }

    fn statement(&mut self, block: &Block) {
        match &block.kind {
            BlockKind::Print { value } => match value {
                Some(Slot::Literal(literal)) => {
                    let text = Value::from(literal).to_string();
                    self.line(format!("System.out.println({});", java::string_literal(&text)));
                }
                Some(Slot::Block(inner)) => {
                    let expr = self.expression_block(inner);
                    self.line(format!("System.out.println({});", expr));
                }
                None => self.warn_at(
                    Problem::MalformedSlot {
                        expected: "a value to print".to_string(),
                        got: "nothing".to_string(),
                    },
                    &block.id,
                ),
            },
            BlockKind::IfThen {
                condition,
                then_blocks,
                else_blocks,
            } => {
                let condition = match condition {
                    Some(condition) => self.condition(condition),
                    None => {
                        self.warn_at(Problem::MissingCondition, &block.id);
                        "(false)".to_string()
                    }
                };
                self.line(format!("if {} {{", condition));
                self.nested(then_blocks);
                if !else_blocks.is_empty() {
                    self.line("} else {");
                    self.nested(else_blocks);
                }
                self.line("}");
            }
            BlockKind::Repeat { count, body } => {
                let counter = format!("{}{}", self.options.loop_variable, self.loop_depth);
                self.line(format!(
                    "for (int {0} = 0; {0} < {1}; {0}++) {{",
                    counter, count
                ));
                self.loop_depth += 1;
                self.nested(body);
                self.loop_depth -= 1;
                self.line("}");
            }
            BlockKind::CreateVariable { name, value } => {
                let name = match name {
                    Slot::Literal(Literal::Text(text)) if !text.trim().is_empty() => {
                        java::identifier(text)
                    }
                    _ => {
                        self.warn_at(
                            Problem::MalformedSlot {
                                expected: "a literal variable name".to_string(),
                                got: slot_description(name),
                            },
                            &block.id,
                        );
                        return;
                    }
                };
                let value = self.expression(value);
                self.line(format!("int {} = {};", name, value));
            }
            BlockKind::VariableChange { variable_id, value } => {
                let Some(variable) = self.variables.get(variable_id) else {
                    self.warn_at(Problem::UndefinedVariable(variable_id.clone()), &block.id);
                    return;
                };
                let name = java::identifier(&variable.name);
                let value = self.expression(value);
                self.line(format!("{} = {};", name, value));
            }
            BlockKind::Function {
                name,
                parameters,
                body,
                returns,
            } => {
                if self.parameters.is_some() || self.indent != 1 {
                    self.warn_at(
                        Problem::MisplacedBlock("function declared inside another block".to_string()),
                        &block.id,
                    );
                    return;
                }
                self.function(name, parameters, body, returns.as_ref());
            }
            BlockKind::Return { value } => {
                if self.parameters.is_none() {
                    self.warn_at(
                        Problem::MisplacedBlock("return outside a function".to_string()),
                        &block.id,
                    );
                    return;
                }
                match value {
                    Some(slot) => {
                        let value = self.expression(slot);
                        self.line(format!("return {};", value));
                    }
                    // `int` methods need a value.
                    None if self.returns_int => self.line("return 0;"),
                    None => self.line("return;"),
                }
            }
            BlockKind::FunctionCall {
                function_id,
                arguments,
            } => {
                if let Some(call) = self.call(&block.id, function_id, arguments) {
                    self.line(format!("{};", call));
                }
            }
            BlockKind::InvokeMethod { instance, method } => {
                if let Some(call) = self.method_call(&block.id, instance, method) {
                    self.line(format!("{};", call));
                }
            }
            BlockKind::ClassInstantiation {
                class_name,
                instance_name,
            } => match (static_name(class_name), static_name(instance_name)) {
                (Some(class), Some(instance)) => {
                    let class = java::identifier(class);
                    self.line(format!(
                        "{0} {1} = new {0}();",
                        class,
                        java::identifier(instance)
                    ));
                }
                _ => self.warn_at(
                    Problem::MalformedSlot {
                        expected: "a class name and an instance name".to_string(),
                        got: format!(
                            "{} and {}",
                            slot_description(class_name),
                            slot_description(instance_name)
                        ),
                    },
                    &block.id,
                ),
            },
            BlockKind::Unknown => self.warn_at(Problem::UnknownBlockKind, &block.id),
            kind => self.warn_at(
                Problem::MisplacedBlock(format!("{} block used as a statement", kind.name())),
                &block.id,
            ),
        }
    }

    fn function(&mut self, name: &str, parameters: &[String], body: &[Block], returns: Option<&Slot>) {
        let is_entry = name == ENTRY_POINT;
        let returns_int = !is_entry && (returns.is_some() || returns_value(body));
        if is_entry {
            self.line("public static void main(String[] args) {");
        } else {
            let return_type = if returns_int { "int" } else { "void" };
            let parameter_list = parameters
                .iter()
                .map(|p| format!("int {}", java::identifier(p)))
                .collect::<Vec<_>>()
                .join(", ");
            self.line(format!(
                "public static {} {}({}) {{",
                return_type,
                java::identifier(name),
                parameter_list
            ));
        }

        let outer = self.parameters.replace(parameters.to_vec());
        let outer_returns_int = std::mem::replace(&mut self.returns_int, returns_int);
        self.indent += 1;
        for block in body {
            self.statement(block);
        }
        let ends_in_return = matches!(body.last().map(|b| &b.kind), Some(BlockKind::Return { .. }));
        if let Some(slot) = returns.filter(|_| !is_entry && !ends_in_return) {
            let value = self.expression(slot);
            self.line(format!("return {};", value));
        }
        self.indent -= 1;
        self.parameters = outer;
        self.returns_int = outer_returns_int;
        self.line("}");
    }

    /// Emit registry functions the class calls but does not declare itself,
    /// including ones only reached from other emitted functions.
    fn called_functions(&mut self, blocks: &[Block]) {
        let declared: HashSet<&str> = blocks
            .iter()
            .filter_map(|block| match &block.kind {
                BlockKind::Function { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();

        let functions: &'a dyn FunctionRegistry = self.functions;
        let mut emitted = HashSet::new();
        let mut next = 0;
        while next < self.called.len() {
            let id = self.called[next].clone();
            next += 1;
            let Some(function) = functions.get(&id) else {
                continue;
            };
            if declared.contains(function.name.as_str()) || !emitted.insert(function.name.as_str()) {
                continue;
            }
            self.function(
                &function.name,
                &function.parameters,
                &function.body,
                function.returns.as_ref(),
            );
        }
    }

    fn expression(&mut self, slot: &Slot) -> String {
        match slot {
            Slot::Literal(literal) => java::literal(literal),
            Slot::Block(block) => self.expression_block(block),
        }
    }

    /// Render a value-producing block. Unresolvable references render as
    /// an empty fragment.
    fn expression_block(&mut self, block: &Block) -> String {
        match &block.kind {
            BlockKind::VariableRead { variable_id } => match self.variables.get(variable_id) {
                Some(variable) => java::identifier(&variable.name),
                None => {
                    self.warn_at(Problem::UndefinedVariable(variable_id.clone()), &block.id);
                    String::new()
                }
            },
            BlockKind::Parameter { name } => {
                let bound = self
                    .parameters
                    .as_ref()
                    .is_some_and(|parameters| parameters.contains(name));
                if bound {
                    java::identifier(name)
                } else {
                    self.warn_at(Problem::UndefinedParameter(name.clone()), &block.id);
                    String::new()
                }
            }
            BlockKind::Math(arithmetic) => {
                let left = self.expression(&arithmetic.left);
                let right = self.expression(&arithmetic.right);
                format!("({} {} {})", left, arithmetic.operator.symbol(), right)
            }
            BlockKind::Compare(comparison) => {
                let left = self.expression(&comparison.left);
                let right = self.expression(&comparison.right);
                format!("({} {} {})", left, comparison.operator.symbol(), right)
            }
            BlockKind::Logic(logic) => self.logic(&block.id, logic),
            BlockKind::FunctionCall {
                function_id,
                arguments,
            } => self
                .call(&block.id, function_id, arguments)
                .unwrap_or_default(),
            BlockKind::InvokeMethod { instance, method } => self
                .method_call(&block.id, instance, method)
                .unwrap_or_default(),
            BlockKind::Unknown => {
                self.warn_at(Problem::UnknownBlockKind, &block.id);
                String::new()
            }
            kind => {
                self.warn_at(
                    Problem::MalformedSlot {
                        expected: "a value".to_string(),
                        got: format!("{} block", kind.name()),
                    },
                    &block.id,
                );
                String::new()
            }
        }
    }

    fn condition(&mut self, condition: &Condition) -> String {
        match &condition.kind {
            ConditionKind::Compare(comparison) => {
                let left = self.expression(&comparison.left);
                let right = self.expression(&comparison.right);
                format!("({} {} {})", left, comparison.operator.symbol(), right)
            }
            ConditionKind::Logic(logic) => self.logic(&condition.id, logic),
        }
    }

    fn logic(&mut self, site: &BlockId, logic: &Logic) -> String {
        let left = self.operand(site, logic.left.as_deref(), "left");
        let right = self.operand(site, logic.right.as_deref(), "right");
        format!("({} {} {})", left, logic.operator.symbol(), right)
    }

    fn operand(&mut self, site: &BlockId, side: Option<&Condition>, name: &'static str) -> String {
        match side {
            Some(condition) => self.condition(condition),
            None => {
                self.warn_at(Problem::MissingOperand(name), site);
                "true".to_string()
            }
        }
    }

    /// `name(args)`, padding missing arguments with `0` and dropping extras.
    fn call(&mut self, site: &BlockId, function_id: &FunctionId, arguments: &[Slot]) -> Option<String> {
        let functions: &'a dyn FunctionRegistry = self.functions;
        let Some(function) = functions.get(function_id) else {
            self.warn_at(Problem::UndefinedFunction(function_id.clone()), site);
            return None;
        };

        let arity = function.parameters.len();
        if arguments.len() != arity {
            self.warn_at(
                Problem::ArgumentCount {
                    function: function.name.clone(),
                    expected: arity,
                    got: arguments.len(),
                },
                site,
            );
        }
        let mut rendered: Vec<String> = arguments
            .iter()
            .take(arity)
            .map(|argument| {
                let text = self.expression(argument);
                if text.is_empty() { "0".to_string() } else { text }
            })
            .collect();
        rendered.resize(arity, "0".to_string());

        if !self.called.contains(function_id) {
            self.called.push(function_id.clone());
        }
        Some(format!(
            "{}({})",
            java::identifier(&function.name),
            rendered.join(", ")
        ))
    }

    fn method_call(&mut self, site: &BlockId, instance: &Slot, method: &Slot) -> Option<String> {
        match (static_name(instance), static_name(method)) {
            (Some(instance), Some(method)) => Some(format!(
                "{}.{}()",
                java::identifier(instance),
                java::identifier(method)
            )),
            _ => {
                self.warn_at(
                    Problem::MalformedSlot {
                        expected: "an instance name and a method name".to_string(),
                        got: format!(
                            "{} and {}",
                            slot_description(instance),
                            slot_description(method)
                        ),
                    },
                    site,
                );
                None
            }
        }
    }
}

/// Names in generated code must be known without running the program.
fn static_name(slot: &Slot) -> Option<&str> {
    match slot {
        Slot::Literal(Literal::Text(text)) if !text.trim().is_empty() => Some(text),
        _ => None,
    }
}

fn slot_description(slot: &Slot) -> String {
    match slot {
        Slot::Literal(literal) => {
            let value = Value::from(literal);
            format!("{} '{}'", value.type_name(), value)
        }
        Slot::Block(block) => format!("{} block", block.kind_name()),
    }
}

/// True if any `return` in the body, outside nested functions, carries a value.
fn returns_value(body: &[Block]) -> bool {
    body.iter().any(|block| match &block.kind {
        BlockKind::Return { value } => value.is_some(),
        BlockKind::Function { .. } => false,
        _ => block
            .child_sequences()
            .into_iter()
            .any(|(_, children)| returns_value(children)),
    })
}
