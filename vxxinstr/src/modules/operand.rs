//! Instruction operands.
//!
//! An instruction operand can be a reference to another SSA value (`Reg`),
//! a function argument (`Arg`), an immediate constant (`Imm`) or the address
//! of a module-level symbol (`Func`, `Global`).
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{
    consts::IConst,
    modules::{FunctionId, GlobalId},
};

/// SSA value identifier used to name the destination or reference another
/// instruction's result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Name(pub u32);

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Represents a code label used as a target for control‑flow instructions.
///
/// Labels and control-flow may not cross function boundaries. Thus, labels
/// are only valid within the function they are defined in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Label(pub u32);

impl Label {
    pub const NIL: Label = Label(0);

    /// Returns true if this is the "nil" label (i.e., label 0).
    ///
    /// This label is reserved as the 'function entry' label. It should always be present.
    pub fn is_nil(&self) -> bool {
        self == &Label::NIL
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "label %block_{}", self.0)
        } else {
            write!(f, "block_{}", self.0)
        }
    }
}

/// Instruction operand.
#[derive(Clone, Debug, PartialEq, Eq, Hash, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    /// Reference to a previously defined SSA value.
    Reg(Name),
    /// Reference to the n-th argument of the enclosing function.
    Arg(u32),
    /// Immediate integer literal.
    Imm(IConst),
    /// Address of a function of the module.
    Func(FunctionId),
    /// Address of a global of the module.
    Global(GlobalId),
    /// Unspecified value.
    Undef,
}

impl Operand {
    /// SSA name referenced by the operand, if any.
    #[inline]
    pub fn as_reg(&self) -> Option<Name> {
        match self {
            Operand::Reg(name) => Some(*name),
            _ => None,
        }
    }
}

impl From<IConst> for Operand {
    fn from(value: IConst) -> Self {
        Operand::Imm(value)
    }
}

impl From<Name> for Operand {
    fn from(value: Name) -> Self {
        Operand::Reg(value)
    }
}
