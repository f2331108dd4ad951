use blocks::block::{
    Arithmetic, Block, BlockKind, Comparison, Condition, ConditionKind, Logic, MathOperator, Slot,
};
use blocks::diagnostic::Problem;
use blocks::ids::{BlockId, FunctionId};
use blocks::registry::{FunctionRegistry, WorkspaceRegistry};
use blocks::value::Value;

use crate::executor::{Call, Interpreter, describe};

impl<'a> Interpreter<'a> {
    /// Evaluate an expression slot to a scalar.
    pub(crate) fn evaluate(&mut self, slot: &Slot) -> Value {
        match slot {
            Slot::Literal(literal) => Value::from(literal),
            Slot::Block(block) => self.evaluate_block(block),
        }
    }

    fn evaluate_block(&mut self, block: &Block) -> Value {
        if !self.descend(&block.id) {
            return Value::Number(0.0);
        }
        let value = self.evaluate_kind(block);
        self.env.leave();
        value
    }

    fn evaluate_kind(&mut self, block: &Block) -> Value {
        match &block.kind {
            BlockKind::VariableRead { variable_id } => {
                match self.registries.variables.get(variable_id) {
                    Some(variable) => variable.value.clone(),
                    None => {
                        self.warn_at(Problem::UndefinedVariable(variable_id.clone()), &block.id);
                        Value::Number(0.0)
                    }
                }
            }
            BlockKind::Parameter { name } => match self.env.get_parameter(name) {
                Some(value) => value.clone(),
                None => {
                    self.warn_at(Problem::UndefinedParameter(name.clone()), &block.id);
                    Value::Number(0.0)
                }
            },
            BlockKind::Math(arithmetic) => self.arithmetic(&block.id, arithmetic),
            BlockKind::Compare(comparison) => Value::Boolean(self.comparison(comparison)),
            BlockKind::Logic(logic) => Value::Boolean(self.logic(&block.id, logic)),
            BlockKind::FunctionCall {
                function_id,
                arguments,
            } => {
                let call = self.call_function(block, function_id, arguments);
                self.call_value(&block.id, call)
            }
            BlockKind::InvokeMethod { instance, method } => {
                let call = self.invoke_method(block, instance, method);
                self.call_value(&block.id, call)
            }
            BlockKind::Unknown => {
                self.warn_at(Problem::UnknownBlockKind, &block.id);
                Value::Number(0.0)
            }
            kind => {
                self.warn_at(
                    Problem::MalformedSlot {
                        expected: "a value".to_string(),
                        got: format!("{} block", kind.name()),
                    },
                    &block.id,
                );
                Value::Number(0.0)
            }
        }
    }

    fn call_value(&mut self, site: &BlockId, call: Call) -> Value {
        match call {
            Call::Returned(value) => value,
            Call::Empty(function) => {
                self.warn_at(Problem::MissingReturnValue(function), site);
                Value::Unit
            }
            Call::Failed => Value::Number(0.0),
        }
    }

    fn arithmetic(&mut self, site: &BlockId, arithmetic: &Arithmetic) -> Value {
        let left = self.evaluate(&arithmetic.left);
        let right = self.evaluate(&arithmetic.right);
        let a = self.number(site, left);
        let b = self.number(site, right);

        let result = match arithmetic.operator {
            MathOperator::Add => a + b,
            MathOperator::Subtract => a - b,
            MathOperator::Multiply => a * b,
            MathOperator::Divide => {
                if b == 0.0 {
                    self.warn_at(Problem::DivisionByZero, site);
                    f64::NAN
                } else {
                    a / b
                }
            }
        };
        Value::Number(result)
    }

    /// Numeric coercion for operands. Values that have no numeric reading
    /// become NaN.
    fn number(&mut self, site: &BlockId, value: Value) -> f64 {
        match value.to_number() {
            Some(n) => n,
            None => {
                self.warn_at(
                    Problem::MalformedSlot {
                        expected: "a number".to_string(),
                        got: describe(&value),
                    },
                    site,
                );
                f64::NAN
            }
        }
    }

    fn comparison(&mut self, comparison: &Comparison) -> bool {
        let left = self.evaluate(&comparison.left);
        let right = self.evaluate(&comparison.right);
        left.compare(comparison.operator, &right)
    }

    pub(crate) fn evaluate_condition(&mut self, condition: &Condition) -> bool {
        if !self.descend(&condition.id) {
            return false;
        }
        let holds = match &condition.kind {
            ConditionKind::Compare(comparison) => self.comparison(comparison),
            ConditionKind::Logic(logic) => self.logic(&condition.id, logic),
        };
        self.env.leave();
        holds
    }

    // Both sides are always evaluated. An empty side holds.
    fn logic(&mut self, site: &BlockId, logic: &Logic) -> bool {
        let left = self.operand(site, logic.left.as_deref(), "left");
        let right = self.operand(site, logic.right.as_deref(), "right");
        logic.operator.apply(left, right)
    }

    fn operand(&mut self, site: &BlockId, side: Option<&Condition>, name: &'static str) -> bool {
        match side {
            Some(condition) => self.evaluate_condition(condition),
            None => {
                self.warn_at(Problem::MissingOperand(name), site);
                true
            }
        }
    }

    pub(crate) fn call_function(
        &mut self,
        block: &Block,
        function_id: &FunctionId,
        arguments: &[Slot],
    ) -> Call {
        let functions: &'a dyn FunctionRegistry = self.registries.functions;
        let Some(function) = functions.get(function_id) else {
            self.warn_at(Problem::UndefinedFunction(function_id.clone()), &block.id);
            return Call::Failed;
        };

        let mut values: Vec<Value> = arguments.iter().map(|slot| self.evaluate(slot)).collect();
        if values.len() != function.parameters.len() {
            self.warn_at(
                Problem::ArgumentCount {
                    function: function.name.clone(),
                    expected: function.parameters.len(),
                    got: values.len(),
                },
                &block.id,
            );
            values.truncate(function.parameters.len());
        }

        self.invoke(
            &block.id,
            &function.name,
            &function.parameters,
            values,
            &function.body,
            function.returns.as_ref(),
        )
    }

    /// Resolve `instance.method()`: the instance names a class, the class is
    /// the workspace of the same name, and the method is a function block
    /// declared at that workspace's top level.
    pub(crate) fn invoke_method(&mut self, block: &Block, instance: &Slot, method: &Slot) -> Call {
        let Some(instance) = self.name_slot(&block.id, instance, "an instance name") else {
            return Call::Failed;
        };
        let Some(method) = self.name_slot(&block.id, method, "a method name") else {
            return Call::Failed;
        };

        let Some(class) = self
            .registries
            .instances
            .get_by_name(&instance)
            .map(|found| found.class_name.clone())
        else {
            self.warn_at(Problem::UndefinedInstance(instance), &block.id);
            return Call::Failed;
        };

        let workspaces: &'a dyn WorkspaceRegistry = self.registries.workspaces;
        let declaration = workspaces.get_by_name(&class).and_then(|workspace| {
            workspace.blocks.iter().find_map(|candidate| match &candidate.kind {
                BlockKind::Function {
                    name,
                    parameters,
                    body,
                    returns,
                } if *name == method => Some((name, parameters, body, returns)),
                _ => None,
            })
        });
        let Some((name, parameters, body, returns)) = declaration else {
            self.warn_at(Problem::UndefinedMethod { class, method }, &block.id);
            return Call::Failed;
        };

        if !parameters.is_empty() {
            self.warn_at(
                Problem::ArgumentCount {
                    function: name.clone(),
                    expected: parameters.len(),
                    got: 0,
                },
                &block.id,
            );
        }
        self.invoke(&block.id, name, parameters, Vec::new(), body, returns.as_ref())
    }

    fn name_slot(&mut self, site: &BlockId, slot: &Slot, expected: &str) -> Option<String> {
        match self.evaluate(slot) {
            Value::Text(text) if !text.trim().is_empty() => Some(text),
            other => {
                self.warn_at(
                    Problem::MalformedSlot {
                        expected: expected.to_string(),
                        got: describe(&other),
                    },
                    site,
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use blocks::block::{ComparisonOperator, LogicOperator};
    use blocks::registry::Store;

    use super::*;

    fn compare(id: &str, left: f64, operator: ComparisonOperator, right: f64) -> Condition {
        Condition {
            id: BlockId::from(id),
            kind: ConditionKind::Compare(Comparison {
                operator,
                left: Slot::number(left),
                right: Slot::number(right),
            }),
        }
    }

    #[test]
    fn arithmetic_coerces_numeric_text() {
        let mut store = Store::default();
        let mut interpreter = Interpreter::new(store.registries());
        let sum = Arithmetic {
            operator: MathOperator::Add,
            left: Slot::text("3"),
            right: Slot::number(4.0),
        };
        assert_eq!(interpreter.arithmetic(&BlockId::from("m"), &sum), Value::Number(7.0));
        assert!(interpreter.diagnostics().is_empty());
    }

    #[test]
    fn unparsable_operand_is_nan_with_warning() {
        let mut store = Store::default();
        let mut interpreter = Interpreter::new(store.registries());
        let sum = Arithmetic {
            operator: MathOperator::Multiply,
            left: Slot::text("three"),
            right: Slot::number(4.0),
        };
        let Value::Number(n) = interpreter.arithmetic(&BlockId::from("m"), &sum) else {
            panic!("expected a number");
        };
        assert!(n.is_nan());
        assert!(matches!(
            interpreter.diagnostics()[0].problem,
            Problem::MalformedSlot { .. }
        ));
    }

    fn divides_by_zero(id: &str) -> Condition {
        let quotient = Block::new(
            "div",
            BlockKind::Math(Arithmetic {
                operator: MathOperator::Divide,
                left: Slot::number(1.0),
                right: Slot::number(0.0),
            }),
        );
        Condition {
            id: BlockId::from(id),
            kind: ConditionKind::Compare(Comparison {
                operator: ComparisonOperator::Equal,
                left: Slot::block(quotient),
                right: Slot::number(1.0),
            }),
        }
    }

    #[test]
    fn logic_treats_empty_side_as_true_with_warning() {
        let mut store = Store::default();
        let mut interpreter = Interpreter::new(store.registries());
        let and = Logic {
            operator: LogicOperator::And,
            left: Some(Box::new(compare("c", 5.0, ComparisonOperator::Greater, 3.0))),
            right: None,
        };
        assert!(interpreter.logic(&BlockId::from("l"), &and));
        assert_eq!(interpreter.diagnostics().len(), 1);
        assert_eq!(interpreter.diagnostics()[0].problem, Problem::MissingOperand("right"));
        assert_eq!(interpreter.diagnostics()[0].block, Some(BlockId::from("l")));

        let or = Logic {
            operator: LogicOperator::Or,
            left: None,
            right: Some(Box::new(compare("d", 1.0, ComparisonOperator::Greater, 3.0))),
        };
        assert!(interpreter.logic(&BlockId::from("o"), &or));
        assert_eq!(interpreter.diagnostics()[1].problem, Problem::MissingOperand("left"));
    }

    #[test]
    fn and_evaluates_right_side_after_false_left() {
        let mut store = Store::default();
        let mut interpreter = Interpreter::new(store.registries());
        let and = Logic {
            operator: LogicOperator::And,
            left: Some(Box::new(compare("c", 1.0, ComparisonOperator::Greater, 2.0))),
            right: Some(Box::new(divides_by_zero("z"))),
        };
        assert!(!interpreter.logic(&BlockId::from("l"), &and));
        assert_eq!(interpreter.diagnostics().len(), 1);
        assert_eq!(interpreter.diagnostics()[0].problem, Problem::DivisionByZero);
        assert_eq!(interpreter.diagnostics()[0].block, Some(BlockId::from("div")));
    }

    #[test]
    fn or_evaluates_right_side_after_true_left() {
        let mut store = Store::default();
        let mut interpreter = Interpreter::new(store.registries());
        let or = Logic {
            operator: LogicOperator::Or,
            left: Some(Box::new(compare("c", 2.0, ComparisonOperator::Greater, 1.0))),
            right: Some(Box::new(divides_by_zero("z"))),
        };
        assert!(interpreter.logic(&BlockId::from("l"), &or));
        assert_eq!(interpreter.diagnostics().len(), 1);
        assert_eq!(interpreter.diagnostics()[0].problem, Problem::DivisionByZero);
    }

    #[test]
    fn condition_depth_is_bounded() {
        let mut store = Store::default();
        let options = crate::InterpreterOptions {
            max_nesting: 0,
            ..Default::default()
        };
        let mut interpreter = Interpreter::with_options(store.registries(), options);
        let condition = compare("c", 1.0, ComparisonOperator::Less, 2.0);
        assert!(!interpreter.evaluate_condition(&condition));
        assert!(matches!(
            interpreter.diagnostics()[0].problem,
            Problem::NestingTooDeep(0)
        ));
    }
}
