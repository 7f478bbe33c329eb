//! Types module
//!
//! Value types carried by arguments, instructions and globals. Pointers are
//! opaque and only remember the address space (memory region qualifier) they
//! point into; this is the only part of a pointer type the rewriting passes
//! ever inspect.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Address space (pointer qualifier) of a pointer type.
///
/// Numbering follows the SPIR convention used by the device frontend. The
/// [`AddressSpace::GENERIC`] space is the unqualified union of every concrete
/// space and must be resolved by inference before reaching the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AddressSpace(pub u32);

impl AddressSpace {
    pub const PRIVATE: AddressSpace = AddressSpace(0);
    pub const GLOBAL: AddressSpace = AddressSpace(1);
    pub const CONSTANT: AddressSpace = AddressSpace(2);
    pub const LOCAL: AddressSpace = AddressSpace(3);
    pub const GENERIC: AddressSpace = AddressSpace(4);

    /// Returns true for the generic (unqualified) address space.
    #[inline]
    pub const fn is_generic(self) -> bool {
        self.0 == Self::GENERIC.0
    }
}

impl std::fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "addrspace({})", self.0)
    }
}

/// Floating-point formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FpType {
    Fp16,
    Fp32,
    Fp64,
}

impl FpType {
    pub fn to_str(&self) -> &'static str {
        match self {
            FpType::Fp16 => "half",
            FpType::Fp32 => "float",
            FpType::Fp64 => "double",
        }
    }
}

/// A value type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Type {
    /// Absence of value, only valid as a return type.
    Void,

    /// Integer of the given bit width.
    Int(u32),

    /// Floating-point value.
    Fp(FpType),

    /// Opaque pointer into the given address space.
    Ptr(AddressSpace),

    /// Fixed-size array.
    Array { elem: Box<Type>, len: u64 },

    /// Ordered structure of element types.
    Struct(Vec<Type>),
}

impl Type {
    pub const I1: Type = Type::Int(1);
    pub const I8: Type = Type::Int(8);
    pub const I32: Type = Type::Int(32);
    pub const I64: Type = Type::Int(64);

    /// Pointer in the private (default) address space.
    pub const PTR: Type = Type::Ptr(AddressSpace::PRIVATE);

    #[inline]
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Ptr(_))
    }

    /// Address space of a pointer type, `None` for every other type.
    #[inline]
    pub fn address_space(&self) -> Option<AddressSpace> {
        match self {
            Type::Ptr(space) => Some(*space),
            _ => None,
        }
    }

    /// Bit width of an integer type.
    #[inline]
    pub fn int_width(&self) -> Option<u32> {
        match self {
            Type::Int(bits) => Some(*bits),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{}", bits),
            Type::Fp(fp) => write!(f, "{}", fp.to_str()),
            Type::Ptr(space) if *space == AddressSpace::PRIVATE => write!(f, "ptr"),
            Type::Ptr(space) => write!(f, "ptr {}", space),
            Type::Array { elem, len } => write!(f, "[{} x {}]", len, elem),
            Type::Struct(elems) => {
                write!(f, "{{ ")?;
                for (i, elem) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, " }}")
            }
        }
    }
}
