use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumDiscriminants, EnumIs, EnumTryAs};

use crate::{
    modules::operand::{Name, Operand},
    types::Type,
};

pub mod int;
pub mod mem;
pub mod misc;

/// Operand and result access shared by every instruction. The rewriting
/// passes only see instructions through this trait when they substitute
/// values.
pub trait Instruction {
    /// Inputs, in the order they are printed.
    fn operands(&self) -> impl Iterator<Item = &Operand>;

    fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand>;

    /// SSA name defined by the instruction, if any.
    fn destination(&self) -> Option<Name> {
        None
    }

    /// Ignored by instructions without a result.
    fn set_destination(&mut self, _name: Name) {}

    fn destination_type(&self) -> Option<&Type> {
        None
    }

    /// Registers read by the instruction.
    fn dependencies(&self) -> impl Iterator<Item = Name> {
        self.operands().filter_map(|op| match op {
            Operand::Reg(reg) => Some(*reg),
            _ => None,
        })
    }

    fn remap_operands(&mut self, mapping: impl Fn(Name) -> Option<Name>) {
        for operand in self.operands_mut() {
            if let Operand::Reg(name) = operand {
                if let Some(new_name) = mapping(*name) {
                    *name = new_name;
                }
            }
        }
    }
}

/// Discriminated union covering all public instruction kinds.
///
/// The generated `VxInstrOp` discriminant (via `strum`) is used for fast
/// classification and printing.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EnumIs, EnumTryAs, EnumDiscriminants)]
#[strum_discriminants(name(VxInstrOp))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VxInstr {
    // Integer instructions
    IAdd(int::IAdd),
    ISub(int::ISub),
    ICmp(int::ICmp),

    // Memory instructions
    MLoad(mem::MLoad),
    MStore(mem::MStore),
    MGetElementPtr(mem::MGetElementPtr),

    // Misc instructions
    Call(misc::Call),
    Phi(misc::Phi),
    Cast(misc::Cast),
}

impl VxInstrOp {
    /// Return the canonical mnemonic used when printing this instruction.
    pub fn opname(&self) -> &'static str {
        match self {
            VxInstrOp::IAdd => "add",
            VxInstrOp::ISub => "sub",
            VxInstrOp::ICmp => "icmp",

            VxInstrOp::MLoad => "load",
            VxInstrOp::MStore => "store",
            VxInstrOp::MGetElementPtr => "getelementptr",

            VxInstrOp::Call => "call",
            VxInstrOp::Phi => "phi",
            VxInstrOp::Cast => "cast",
        }
    }
}

impl VxInstr {
    /// Return the discriminant for this instruction value.
    pub fn op(&self) -> VxInstrOp {
        self.into()
    }
}

macro_rules! define_instr_any_instr {
    (
        $($variant:ident),* $(,)?
    ) => {
        impl Instruction for VxInstr {
            #[auto_enum(Iterator)]
            fn operands(&self) -> impl Iterator<Item = &Operand> {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.operands(),
                    )*
                }
            }

            #[auto_enum(Iterator)]
            fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.operands_mut(),
                    )*
                }
            }

            fn destination(&self) -> Option<Name> {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.destination(),
                    )*
                }
            }

            fn set_destination(&mut self, name: Name) {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.set_destination(name),
                    )*
                }
            }

            fn destination_type(&self) -> Option<&Type> {
                match self {
                    $(
                        VxInstr::$variant(instr) => instr.destination_type(),
                    )*
                }
            }
        }
    };
}

define_instr_any_instr! {
    IAdd,
    ISub,
    ICmp,
    MLoad,
    MStore,
    MGetElementPtr,
    Call,
    Phi,
    Cast,
}

macro_rules! define_vxinstr_from {
    ($typ:ty, $variant:ident) => {
        impl From<$typ> for VxInstr {
            fn from(inst: $typ) -> Self {
                VxInstr::$variant(inst)
            }
        }
    };
}

define_vxinstr_from!(int::IAdd, IAdd);
define_vxinstr_from!(int::ISub, ISub);
define_vxinstr_from!(int::ICmp, ICmp);

define_vxinstr_from!(mem::MLoad, MLoad);
define_vxinstr_from!(mem::MStore, MStore);
define_vxinstr_from!(mem::MGetElementPtr, MGetElementPtr);

define_vxinstr_from!(misc::Call, Call);
define_vxinstr_from!(misc::Phi, Phi);
define_vxinstr_from!(misc::Cast, Cast);
