//! Block terminators.
//!
//! Every basic block ends with exactly one terminator selecting the next
//! block to execute (or leaving the function).
use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::modules::operand::{Label, Name, Operand};

/// Two-way branch on an `i1` condition.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CBranch {
    pub cond: Operand,
    pub target_true: Label,
    pub target_false: Label,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Jump {
    pub target: Label,
}

/// `None` returns from a `void` function.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ret {
    pub value: Option<Operand>,
}

/// Marks a point control never reaches.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Unreachable;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Terminator {
    CBranch(CBranch),
    Jump(Jump),
    Ret(Ret),
    Unreachable(Unreachable),
}

impl Terminator {
    #[auto_enum(Iterator)]
    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        match self {
            Terminator::CBranch(cbranch) => std::iter::once(&cbranch.cond),
            Terminator::Jump(_) => std::iter::empty(),
            Terminator::Ret(ret) => ret.value.iter(),
            Terminator::Unreachable(_) => std::iter::empty(),
        }
    }

    #[auto_enum(Iterator)]
    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        match self {
            Terminator::CBranch(cbranch) => std::iter::once(&mut cbranch.cond),
            Terminator::Jump(_) => std::iter::empty(),
            Terminator::Ret(ret) => ret.value.iter_mut(),
            Terminator::Unreachable(_) => std::iter::empty(),
        }
    }

    pub fn dependencies(&self) -> impl Iterator<Item = Name> {
        self.operands().filter_map(Operand::as_reg)
    }

    /// Successor labels, in order.
    #[auto_enum(Iterator)]
    pub fn targets(&self) -> impl Iterator<Item = Label> + '_ {
        match self {
            Terminator::CBranch(cbranch) => [cbranch.target_true, cbranch.target_false].into_iter(),
            Terminator::Jump(jump) => std::iter::once(jump.target),
            Terminator::Ret(_) => std::iter::empty(),
            Terminator::Unreachable(_) => std::iter::empty(),
        }
    }

    #[auto_enum(Iterator)]
    pub fn targets_mut(&mut self) -> impl Iterator<Item = &mut Label> {
        match self {
            Terminator::CBranch(cbranch) => {
                [&mut cbranch.target_true, &mut cbranch.target_false].into_iter()
            }
            Terminator::Jump(jump) => std::iter::once(&mut jump.target),
            Terminator::Ret(_) => std::iter::empty(),
            Terminator::Unreachable(_) => std::iter::empty(),
        }
    }
}

macro_rules! define_terminator_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for Terminator {
            fn from(inst: $typ) -> Self {
                Terminator::$variant(inst)
            }
        }
    };
}

define_terminator_from!(CBranch, CBranch);
define_terminator_from!(Jump, Jump);
define_terminator_from!(Ret, Ret);
define_terminator_from!(Unreachable, Unreachable);
