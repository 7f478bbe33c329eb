//! Metadata values.
//!
//! Metadata nodes are immutable value objects compared by content. They are
//! attached to functions under a key (e.g. a required work-group size) or to
//! the module as named records (e.g. version stamps).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::IConst;

/// A single metadata operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Metadata {
    Int(IConst),
    String(String),
    Node(MetadataNode),
}

/// An ordered tuple of metadata operands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetadataNode {
    operands: Vec<Metadata>,
}

impl MetadataNode {
    pub fn new(operands: impl IntoIterator<Item = Metadata>) -> Self {
        Self {
            operands: operands.into_iter().collect(),
        }
    }

    /// Node made of 32-bit integer constants.
    pub fn from_i32s(values: impl IntoIterator<Item = u32>) -> Self {
        Self::new(values.into_iter().map(|v| Metadata::Int(IConst::i32(v))))
    }

    #[inline]
    pub fn operands(&self) -> &[Metadata] {
        &self.operands
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Integer values of the node if every operand is an integer constant.
    pub fn int_values(&self) -> Option<Vec<u64>> {
        self.operands
            .iter()
            .map(|op| match op {
                Metadata::Int(constant) => Some(constant.value),
                _ => None,
            })
            .collect()
    }
}

impl std::fmt::Display for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metadata::Int(constant) => write!(f, "{}", constant),
            Metadata::String(s) => write!(f, "!\"{}\"", s),
            Metadata::Node(node) => write!(f, "{}", node),
        }
    }
}

impl std::fmt::Display for MetadataNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!{{")?;
        for (i, op) in self.operands.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", op)?;
        }
        write!(f, "}}")
    }
}
