//! Function attributes.
//!
//! Attributes come in two flavours: a handful of well-known enum attributes
//! stored as [`FnAttrFlags`], and free-form string attributes (`key=value`,
//! the value possibly empty) used by the backend to carry annotations.
use std::collections::BTreeMap;

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// Enum attributes understood by the inliner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct FnAttrFlags: u32 {
        /// The function must never be inlined into its callers.
        const NO_INLINE = 1 << 0;

        /// The function must always be inlined into its callers.
        const ALWAYS_INLINE = 1 << 1;

        /// The function never unwinds.
        const NO_UNWIND = 1 << 2;
    }
}

/// Attribute set attached to a function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttributeSet {
    pub flags: FnAttrFlags,
    strings: BTreeMap<String, String>,
}

impl AttributeSet {
    #[inline]
    pub fn has_flag(&self, flag: FnAttrFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    pub fn insert_flag(&mut self, flag: FnAttrFlags) {
        self.flags.insert(flag);
    }

    #[inline]
    pub fn remove_flag(&mut self, flag: FnAttrFlags) {
        self.flags.remove(flag);
    }

    /// Returns true if a string attribute with this key is present.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.strings.contains_key(key)
    }

    /// Value of a string attribute.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    /// Insert (or overwrite) a string attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.strings.remove(key)
    }

    /// Iterate over all string attributes in key order.
    pub fn strings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.strings.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over string attributes whose key starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.strings().filter(move |(key, _)| key.starts_with(prefix))
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty() && self.strings.is_empty()
    }
}

impl std::fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        let mut sep = |f: &mut std::fmt::Formatter<'_>| -> std::fmt::Result {
            if !std::mem::take(&mut first) {
                write!(f, " ")?;
            }
            Ok(())
        };

        for (flag, name) in [
            (FnAttrFlags::NO_INLINE, "noinline"),
            (FnAttrFlags::ALWAYS_INLINE, "alwaysinline"),
            (FnAttrFlags::NO_UNWIND, "nounwind"),
        ] {
            if self.flags.contains(flag) {
                sep(f)?;
                write!(f, "{}", name)?;
            }
        }

        for (key, value) in self.strings() {
            sep(f)?;
            if value.is_empty() {
                write!(f, "\"{}\"", key)?;
            } else {
                write!(f, "\"{}\"=\"{}\"", key, value)?;
            }
        }

        Ok(())
    }
}
