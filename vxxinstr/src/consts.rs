#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::Type;

/// Represents an integer constant with a specific bit width and value.
///
/// Integer constants cannot exceed 64 bits in value. The value is stored
/// zero-extended; signed interpretations are left to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IConst {
    pub bits: u32,
    pub value: u64,
}

impl IConst {
    /// Largest value representable with `bits` bits, `None` past 64 bits.
    #[inline]
    pub const fn max_value(bits: u32) -> Option<u64> {
        if bits == 0 || bits > 64 {
            None
        } else if bits == 64 {
            Some(u64::MAX)
        } else {
            Some((1u64 << bits) - 1)
        }
    }

    #[inline]
    pub const fn verify(&self) -> bool {
        match Self::max_value(self.bits) {
            Some(max) => self.value <= max,
            None => false,
        }
    }

    #[inline]
    pub const fn new(bits: u32, value: u64) -> Option<Self> {
        let constant = Self { bits, value };
        if constant.verify() {
            Some(constant)
        } else {
            None
        }
    }

    /// 32-bit constant, the width used for every metadata integer.
    #[inline]
    pub const fn i32(value: u32) -> Self {
        Self {
            bits: 32,
            value: value as u64,
        }
    }

    #[inline]
    pub const fn i64(value: u64) -> Self {
        Self { bits: 64, value }
    }

    #[inline]
    pub const fn bool(value: bool) -> Self {
        Self {
            bits: 1,
            value: value as u64,
        }
    }

    /// Type of the constant.
    #[inline]
    pub fn ty(&self) -> Type {
        Type::Int(self.bits)
    }
}

impl std::fmt::Display for IConst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{} {}", self.bits, self.value)
    }
}
