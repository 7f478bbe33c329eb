//! Integer arithmetic and comparisons.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use crate::{
    modules::{
        instructions::Instruction,
        operand::{Name, Operand},
    },
    types::Type,
};

macro_rules! define_binary_instr {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Hash, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub struct $name {
            pub dest: Name,
            pub ty: Type,
            pub lhs: Operand,
            pub rhs: Operand,
        }

        impl Instruction for $name {
            fn operands(&self) -> impl Iterator<Item = &Operand> {
                [&self.lhs, &self.rhs].into_iter()
            }

            fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
                [&mut self.lhs, &mut self.rhs].into_iter()
            }

            fn destination(&self) -> Option<Name> {
                Some(self.dest)
            }

            fn set_destination(&mut self, name: Name) {
                self.dest = name;
            }

            fn destination_type(&self) -> Option<&Type> {
                Some(&self.ty)
            }
        }
    };
}

define_binary_instr! {
    /// Wrapping integer addition.
    IAdd
}

define_binary_instr! {
    /// Wrapping integer subtraction.
    ISub
}

/// Integer (and pointer) comparison predicates.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ICmpVariant {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

impl ICmpVariant {
    pub fn to_str(&self) -> &'static str {
        match self {
            ICmpVariant::Eq => "eq",
            ICmpVariant::Ne => "ne",
            ICmpVariant::Ugt => "ugt",
            ICmpVariant::Uge => "uge",
            ICmpVariant::Ult => "ult",
            ICmpVariant::Ule => "ule",
            ICmpVariant::Sgt => "sgt",
            ICmpVariant::Sge => "sge",
            ICmpVariant::Slt => "slt",
            ICmpVariant::Sle => "sle",
        }
    }
}

static BOOL_TYPE: Type = Type::I1;

/// Integer comparison producing an `i1`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ICmp {
    pub dest: Name,
    pub variant: ICmpVariant,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Instruction for ICmp {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.lhs, &self.rhs].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.lhs, &mut self.rhs].into_iter()
    }

    fn destination(&self) -> Option<Name> {
        Some(self.dest)
    }

    fn set_destination(&mut self, name: Name) {
        self.dest = name;
    }

    fn destination_type(&self) -> Option<&Type> {
        Some(&BOOL_TYPE)
    }
}
