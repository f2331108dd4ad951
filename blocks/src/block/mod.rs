pub mod operator;
pub mod slot;

use serde::Deserialize;

use crate::ids::{BlockId, FunctionId, VariableId};

pub use operator::{ComparisonOperator, LogicOperator, MathOperator};
pub use slot::{Literal, Slot};

/// Function name reserved for the program entry point.
pub const ENTRY_POINT: &str = "main";

/// One node of a visual program.
/// Container blocks own their children; the tree never shares nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(flatten)]
    pub kind: BlockKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BlockKind {
    Print {
        #[serde(default)]
        value: Option<Slot>,
    },
    IfThen {
        #[serde(default)]
        condition: Option<Condition>,
        #[serde(default)]
        then_blocks: Vec<Block>,
        #[serde(default)]
        else_blocks: Vec<Block>,
    },
    Repeat {
        count: u32,
        #[serde(default)]
        body: Vec<Block>,
    },
    CreateVariable {
        name: Slot,
        value: Slot,
    },
    #[serde(rename = "variable")]
    VariableRead {
        variable_id: VariableId,
    },
    VariableChange {
        variable_id: VariableId,
        value: Slot,
    },
    #[serde(rename = "mathOperator")]
    Math(Arithmetic),
    #[serde(rename = "compareOperator")]
    Compare(Comparison),
    #[serde(rename = "compareLogic")]
    Logic(Logic),
    Function {
        name: String,
        #[serde(default)]
        parameters: Vec<String>,
        #[serde(default)]
        body: Vec<Block>,
        #[serde(default)]
        returns: Option<Slot>,
    },
    FunctionCall {
        function_id: FunctionId,
        #[serde(default)]
        arguments: Vec<Slot>,
    },
    Parameter {
        name: String,
    },
    Return {
        #[serde(default)]
        value: Option<Slot>,
    },
    ClassInstantiation {
        class_name: Slot,
        instance_name: Slot,
    },
    InvokeMethod {
        instance: Slot,
        method: Slot,
    },
    /// A block type this build does not know. Both backends skip it.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Arithmetic {
    pub operator: MathOperator,
    pub left: Slot,
    pub right: Slot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comparison {
    pub operator: ComparisonOperator,
    pub left: Slot,
    pub right: Slot,
}

/// `&&` / `||` over two condition sub-trees. An empty side holds.
#[derive(Debug, Clone, Deserialize)]
pub struct Logic {
    pub operator: LogicOperator,
    #[serde(default)]
    pub left: Option<Box<Condition>>,
    #[serde(default)]
    pub right: Option<Box<Condition>>,
}

/// A condition slot only accepts comparison or logic blocks.
#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub id: BlockId,
    #[serde(flatten)]
    pub kind: ConditionKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ConditionKind {
    #[serde(rename = "compareOperator")]
    Compare(Comparison),
    #[serde(rename = "compareLogic")]
    Logic(Logic),
}

impl Block {
    pub fn new(id: impl Into<BlockId>, kind: BlockKind) -> Self {
        Block {
            id: id.into(),
            kind,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Named statement sequences owned by this block, in evaluation order.
    pub fn child_sequences(&self) -> Vec<(&'static str, &[Block])> {
        match &self.kind {
            BlockKind::IfThen {
                then_blocks,
                else_blocks,
                ..
            } => vec![("then", then_blocks.as_slice()), ("else", else_blocks.as_slice())],
            BlockKind::Repeat { body, .. } | BlockKind::Function { body, .. } => {
                vec![("body", body.as_slice())]
            }
            _ => Vec::new(),
        }
    }

    /// Visit the id of this block and of every node nested beneath it,
    /// including condition nodes and blocks dropped into slots.
    pub fn visit_ids(&self, f: &mut dyn FnMut(&BlockId)) {
        f(&self.id);
        match &self.kind {
            BlockKind::Print { value } | BlockKind::Return { value } => {
                if let Some(slot) = value {
                    visit_slot(slot, f);
                }
            }
            BlockKind::IfThen {
                condition,
                then_blocks,
                else_blocks,
            } => {
                if let Some(condition) = condition {
                    condition.visit_ids(f);
                }
                for block in then_blocks.iter().chain(else_blocks) {
                    block.visit_ids(f);
                }
            }
            BlockKind::Repeat { body, .. } => {
                for block in body {
                    block.visit_ids(f);
                }
            }
            BlockKind::CreateVariable { name, value } => {
                visit_slot(name, f);
                visit_slot(value, f);
            }
            BlockKind::VariableChange { value, .. } => visit_slot(value, f),
            BlockKind::Math(Arithmetic { left, right, .. })
            | BlockKind::Compare(Comparison { left, right, .. }) => {
                visit_slot(left, f);
                visit_slot(right, f);
            }
            BlockKind::Logic(logic) => logic.visit_ids(f),
            BlockKind::Function { body, returns, .. } => {
                for block in body {
                    block.visit_ids(f);
                }
                if let Some(slot) = returns {
                    visit_slot(slot, f);
                }
            }
            BlockKind::FunctionCall { arguments, .. } => {
                for slot in arguments {
                    visit_slot(slot, f);
                }
            }
            BlockKind::ClassInstantiation {
                class_name,
                instance_name,
            } => {
                visit_slot(class_name, f);
                visit_slot(instance_name, f);
            }
            BlockKind::InvokeMethod { instance, method } => {
                visit_slot(instance, f);
                visit_slot(method, f);
            }
            BlockKind::VariableRead { .. } | BlockKind::Parameter { .. } | BlockKind::Unknown => {}
        }
    }
}

impl BlockKind {
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Print { .. } => "print",
            BlockKind::IfThen { .. } => "ifThen",
            BlockKind::Repeat { .. } => "repeat",
            BlockKind::CreateVariable { .. } => "createVariable",
            BlockKind::VariableRead { .. } => "variable",
            BlockKind::VariableChange { .. } => "variableChange",
            BlockKind::Math(_) => "mathOperator",
            BlockKind::Compare(_) => "compareOperator",
            BlockKind::Logic(_) => "compareLogic",
            BlockKind::Function { .. } => "function",
            BlockKind::FunctionCall { .. } => "functionCall",
            BlockKind::Parameter { .. } => "parameter",
            BlockKind::Return { .. } => "return",
            BlockKind::ClassInstantiation { .. } => "classInstantiation",
            BlockKind::InvokeMethod { .. } => "invokeMethod",
            BlockKind::Unknown => "unknown",
        }
    }
}

impl Condition {
    pub fn visit_ids(&self, f: &mut dyn FnMut(&BlockId)) {
        f(&self.id);
        match &self.kind {
            ConditionKind::Compare(comparison) => {
                visit_slot(&comparison.left, f);
                visit_slot(&comparison.right, f);
            }
            ConditionKind::Logic(logic) => logic.visit_ids(f),
        }
    }
}

impl Logic {
    fn visit_ids(&self, f: &mut dyn FnMut(&BlockId)) {
        for side in [&self.left, &self.right].into_iter().flatten() {
            side.visit_ids(f);
        }
    }
}

fn visit_slot(slot: &Slot, f: &mut dyn FnMut(&BlockId)) {
    if let Slot::Block(block) = slot {
        block.visit_ids(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Block {
        serde_json::from_str(json).expect("block should deserialize")
    }

    #[test]
    fn print_with_literal_and_nested_slot() {
        let block = parse(r#"{"id": "p1", "type": "print", "value": "hello"}"#);
        match block.kind {
            BlockKind::Print {
                value: Some(Slot::Literal(Literal::Text(text))),
            } => assert_eq!(text, "hello"),
            other => panic!("unexpected kind: {:?}", other),
        }

        let block = parse(
            r#"{"id": "p2", "type": "print", "value": {
                "id": "m1", "type": "mathOperator", "operator": "+", "left": 3, "right": 4
            }}"#,
        );
        let BlockKind::Print { value: Some(slot) } = &block.kind else {
            panic!("expected print");
        };
        let nested = slot.as_block().expect("nested block");
        assert_eq!(nested.kind_name(), "mathOperator");
    }

    #[test]
    fn unknown_type_becomes_unknown_kind() {
        let block = parse(r#"{"id": "x", "type": "teleport", "target": 3}"#);
        assert!(matches!(block.kind, BlockKind::Unknown));
        assert_eq!(block.id.as_str(), "x");
    }

    #[test]
    fn condition_slot_rejects_non_condition_blocks() {
        let result: Result<Block, _> = serde_json::from_str(
            r#"{"id": "i", "type": "ifThen", "condition": {"id": "p", "type": "print"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn if_then_fields_use_camel_case() {
        let block = parse(
            r#"{"id": "i", "type": "ifThen",
                "condition": {"id": "c", "type": "compareOperator", "operator": ">", "left": 5, "right": 3},
                "thenBlocks": [{"id": "a", "type": "print", "value": "yes"}],
                "elseBlocks": [{"id": "b", "type": "print", "value": "no"}]}"#,
        );
        let sequences = block.child_sequences();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0].1[0].id.as_str(), "a");
        assert_eq!(sequences[1].1[0].id.as_str(), "b");
    }

    #[test]
    fn visit_ids_reaches_conditions_and_slots() {
        let block = parse(
            r#"{"id": "i", "type": "ifThen",
                "condition": {"id": "l", "type": "compareLogic", "operator": "&&",
                    "left": {"id": "c1", "type": "compareOperator", "operator": "<", "left": 1, "right": 2},
                    "right": {"id": "c2", "type": "compareOperator", "operator": "==",
                        "left": {"id": "v", "type": "variable", "variableId": "x"}, "right": 0}},
                "thenBlocks": [{"id": "r", "type": "repeat", "count": 2,
                    "body": [{"id": "p", "type": "print", "value": 1}]}]}"#,
        );
        let mut seen = Vec::new();
        block.visit_ids(&mut |id| seen.push(id.to_string()));
        assert_eq!(seen, vec!["i", "l", "c1", "c2", "v", "r", "p"]);
    }
}
