//! Memory operations
//!
//! Loads, stores and address computation. Memory intrinsics (`memcpy` and
//! friends) are not instructions of their own; they are calls to `llvm.mem*`
//! declarations and get lowered into these primitives by the pipeline.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    modules::{
        instructions::Instruction,
        operand::{Name, Operand},
    },
    types::Type,
};

/// Load from memory into a destination SSA name.
///
/// When `volatile` is true, the operation is prevented from being removed or
/// merged by typical optimizations.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MLoad {
    pub dest: Name,
    pub ty: Type,
    pub addr: Operand,
    pub volatile: bool,
}

impl Instruction for MLoad {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.addr)
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.addr)
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

/// Store a value to memory.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MStore {
    pub addr: Operand,
    pub value: Operand,
    pub volatile: bool,
}

impl Instruction for MStore {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        [&self.addr, &self.value].into_iter()
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        [&mut self.addr, &mut self.value].into_iter()
    }
}

/// Address computation from a base pointer.
///
/// `elem_ty` is the type the base pointer is indexed with; `ty` is the
/// resulting pointer type (the address space of the base pointer).
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MGetElementPtr {
    pub dest: Name,
    pub ty: Type,
    pub elem_ty: Type,
    pub base: Operand,
    pub indices: Vec<Operand>,
}

impl Instruction for MGetElementPtr {
    fn operands(&self) -> impl Iterator<Item = &Operand> {
        std::iter::once(&self.base).chain(self.indices.iter())
    }

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        std::iter::once(&mut self.base).chain(self.indices.iter_mut())
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
