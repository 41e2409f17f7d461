//! Interned symbols.

use lasso::{Rodeo, Spur};

/// An interned symbol handle.
///
/// Two handles from the same [`SymbolTable`] are equal exactly when their
/// names are equal, so symbols are compared by identity everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(Spur);

/// Table of interned symbol names.
///
/// Names are folded to upper case when interned: `quote`, `Quote` and
/// `QUOTE` all denote one symbol.
#[derive(Debug, Default)]
pub struct SymbolTable {
    rodeo: Rodeo,
}

impl SymbolTable {
    /// Create an empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the existing handle if it was seen before.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if name.chars().any(char::is_lowercase) {
            Symbol(self.rodeo.get_or_intern(name.to_uppercase()))
        } else {
            Symbol(self.rodeo.get_or_intern(name))
        }
    }

    /// Look up a symbol without interning it.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.rodeo.get(name.to_uppercase()).map(Symbol)
    }

    /// Get the (folded) name of a symbol.
    pub fn name(&self, symbol: Symbol) -> &str {
        self.rodeo.resolve(&symbol.0)
    }

    /// Number of interned symbols.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Whether no symbol has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}
