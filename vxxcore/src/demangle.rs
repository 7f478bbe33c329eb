//! Symbol demangling service.
//!
//! The pipeline never demangles by itself: it asks a [`Demangler`] for a
//! human-readable form of a symbol and falls back to the raw symbol when the
//! service does not know it.
use std::collections::HashMap;

pub trait Demangler {
    /// Readable form of `symbol`, `None` when it cannot be demangled.
    fn demangle(&self, symbol: &str) -> Option<String>;

    /// Readable form of `symbol`, or the symbol itself.
    fn demangle_or_raw(&self, symbol: &str) -> String {
        self.demangle(symbol).unwrap_or_else(|| symbol.to_string())
    }
}

/// Demangler that knows nothing; every symbol stays raw.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDemangler;

impl Demangler for NoDemangler {
    fn demangle(&self, _symbol: &str) -> Option<String> {
        None
    }
}

/// Demangler backed by a precomputed table, typically filled from the output
/// of an external demangling tool.
#[derive(Debug, Default, Clone)]
pub struct DemangleTable {
    entries: HashMap<String, String>,
}

impl DemangleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, demangled: impl Into<String>) {
        self.entries.insert(symbol.into(), demangled.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, D: Into<String>> FromIterator<(S, D)> for DemangleTable {
    fn from_iter<T: IntoIterator<Item = (S, D)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(symbol, demangled)| (symbol.into(), demangled.into()))
                .collect(),
        }
    }
}

impl Demangler for DemangleTable {
    fn demangle(&self, symbol: &str) -> Option<String> {
        self.entries.get(symbol).cloned()
    }
}

impl<T: Demangler + ?Sized> Demangler for &T {
    fn demangle(&self, symbol: &str) -> Option<String> {
        (**self).demangle(symbol)
    }
}

impl<T: Demangler + ?Sized> Demangler for Box<T> {
    fn demangle(&self, symbol: &str) -> Option<String> {
        (**self).demangle(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_falls_back_to_raw_symbol() {
        let table: DemangleTable = [("_Z3fooi", "foo(int)")].into_iter().collect();
        assert_eq!(table.demangle("_Z3fooi").as_deref(), Some("foo(int)"));
        assert_eq!(table.demangle("_Z3bari"), None);
        assert_eq!(table.demangle_or_raw("_Z3bari"), "_Z3bari");
        assert_eq!(NoDemangler.demangle_or_raw("_Z3fooi"), "_Z3fooi");
    }
}
