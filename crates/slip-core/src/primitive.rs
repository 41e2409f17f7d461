//! The primitive registry.
//!
//! Primitives are called through the `PRIM` instruction rather than through
//! closures. The compiler asks the registry whether a head symbol names a
//! primitive and whether calling it has side effects; the machine looks up
//! the implementation.

use std::collections::HashMap;
use std::fmt;

use crate::error::RuntimeError;
use crate::heap::Heap;
use crate::symbol::Symbol;
use crate::value::Value;

/// Signature of a primitive implementation.
pub type PrimitiveFn = fn(&mut Heap, &[Value]) -> Result<Value, RuntimeError>;

/// A registered primitive operation.
#[derive(Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    /// Whether a call must be kept even when its value is unused.
    pub side_effect: bool,
    pub func: PrimitiveFn,
}

impl Primitive {
    /// A primitive without side effects.
    pub const fn pure(name: &'static str, func: PrimitiveFn) -> Self {
        Self {
            name,
            side_effect: false,
            func,
        }
    }

    /// A primitive with side effects.
    pub const fn effect(name: &'static str, func: PrimitiveFn) -> Self {
        Self {
            name,
            side_effect: true,
            func,
        }
    }

    pub fn call(&self, heap: &mut Heap, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.func)(heap, args)
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive({})", self.name)
    }
}

/// Primitives keyed by their interned name.
#[derive(Debug, Default)]
pub struct PrimitiveRegistry {
    table: HashMap<Symbol, Primitive>,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `primitive` under its name, replacing any previous entry.
    pub fn register(&mut self, heap: &mut Heap, primitive: Primitive) -> Symbol {
        let symbol = heap.intern(primitive.name);
        self.table.insert(symbol, primitive);
        symbol
    }

    pub fn get(&self, symbol: Symbol) -> Option<&Primitive> {
        self.table.get(&symbol)
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        self.table.contains_key(&symbol)
    }

    /// Whether calling `symbol` has side effects. Unknown symbols are assumed
    /// to have them.
    pub fn has_side_effect(&self, symbol: Symbol) -> bool {
        self.table.get(&symbol).is_none_or(|p| p.side_effect)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(_: &mut Heap, args: &[Value]) -> Result<Value, RuntimeError> {
        Ok(args.first().cloned().unwrap_or(Value::Nil))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut heap = Heap::new();
        let mut registry = PrimitiveRegistry::new();
        let sym = registry.register(&mut heap, Primitive::pure("first", first));
        assert!(registry.contains(sym));
        assert!(!registry.has_side_effect(sym));
        let prim = registry.get(sym).expect("registered");
        assert_eq!(prim.call(&mut heap, &[Value::True]), Ok(Value::True));
    }

    #[test]
    fn test_side_effects() {
        let mut heap = Heap::new();
        let mut registry = PrimitiveRegistry::new();
        let sym = registry.register(&mut heap, Primitive::effect("poke", first));
        assert!(registry.has_side_effect(sym));
        let unknown = heap.intern("unknown");
        assert!(registry.has_side_effect(unknown));
        assert!(!registry.contains(unknown));
    }
}
