#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{
    modules::{
        CallingConvention, FunctionId,
        instructions::Instruction,
        operand::{Label, Name, Operand},
    },
    types::Type,
};

/// Target of a call.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Callee {
    /// Direct call to a function of the module.
    Direct(FunctionId),

    /// Call through a pointer cast of a function of the module, the call
    /// prototype differs from the function's own prototype.
    Cast(FunctionId),

    /// Indirect call through an arbitrary value.
    Indirect(Operand),
}

impl Callee {
    /// Function the callee resolves to once pointer casts are looked through.
    #[inline]
    pub fn resolve(&self) -> Option<FunctionId> {
        match self {
            Callee::Direct(id) | Callee::Cast(id) => Some(*id),
            Callee::Indirect(Operand::Func(id)) => Some(*id),
            Callee::Indirect(_) => None,
        }
    }

    fn operand(&self) -> Option<&Operand> {
        match self {
            Callee::Indirect(op) => Some(op),
            _ => None,
        }
    }

    fn operand_mut(&mut self) -> Option<&mut Operand> {
        match self {
            Callee::Indirect(op) => Some(op),
            _ => None,
        }
    }
}

/// Function call instruction
///
/// `ty` is the return type of the call; `dest` is `None` for calls whose
/// result is discarded (and always for `void` calls).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Call {
    pub dest: Option<Name>,
    pub ty: Type,
    pub callee: Callee,
    pub args: Vec<Operand>,
    pub cconv: CallingConvention,
}

impl Call {
    /// Function the call resolves to, see [`Callee::resolve`].
    #[inline]
    pub fn resolved_callee(&self) -> Option<FunctionId> {
        self.callee.resolve()
    }
}

impl Instruction for Call {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.callee.operand().into_iter().chain(self.args.iter())
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        self.callee.operand_mut().into_iter().chain(self.args.iter_mut())
    }

    fn destination(&self) -> Option<Name> {
        self.dest
    }

    fn set_destination(&mut self, name: Name) {
        // Cannot change a void return to a non-void return
        if self.dest.is_some() {
            self.dest = Some(name);
        }
    }

    fn destination_type(&self) -> Option<&Type> {
        self.dest.map(|_| &self.ty)
    }
}

/// Phi instruction
///
/// Selects a value based on the predecessor control came from. It should
/// always be placed at the beginning of a basic block.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phi {
    pub dest: Name,
    pub ty: Type,
    pub values: Vec<(Label, Operand)>,
}

impl Instruction for Phi {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.values.iter().map(|(_, op)| op)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        self.values.iter_mut().map(|(_, op)| op)
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

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CastVariant {
    /// Reinterpret a value, pointer to pointer within the same address space.
    BitCast,
    /// Move a pointer between address spaces.
    AddrSpaceCast,
    /// Zero-extend an integer.
    ZExt,
    /// Truncate an integer.
    Trunc,
}

impl CastVariant {
    pub fn to_str(&self) -> &'static str {
        match self {
            CastVariant::BitCast => "bitcast",
            CastVariant::AddrSpaceCast => "addrspacecast",
            CastVariant::ZExt => "zext",
            CastVariant::Trunc => "trunc",
        }
    }
}

/// Cast instruction, `ty` is the destination type.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cast {
    pub dest: Name,
    pub variant: CastVariant,
    pub value: Operand,
    pub ty: Type,
}

impl Cast {
    /// Returns true for an address-space cast into the generic address space.
    #[inline]
    pub fn is_generic_addrspace_cast(&self) -> bool {
        self.variant == CastVariant::AddrSpaceCast
            && self.ty.address_space().is_some_and(|space| space.is_generic())
    }
}

impl Instruction for Cast {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.value)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.value)
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
