use serde::Deserialize;

use crate::block::Block;

/// A raw value typed straight into a block input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Boolean(bool),
    Text(String),
}

/// An expression position: either a literal typed into the input or a
/// nested value-producing block dropped onto it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Slot {
    Literal(Literal),
    Block(Box<Block>),
}

impl Slot {
    pub fn number(n: f64) -> Self {
        Slot::Literal(Literal::Number(n))
    }

    pub fn text(s: impl Into<String>) -> Self {
        Slot::Literal(Literal::Text(s.into()))
    }

    pub fn block(block: Block) -> Self {
        Slot::Block(Box::new(block))
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Slot::Block(block) => Some(block),
            Slot::Literal(_) => None,
        }
    }
}
