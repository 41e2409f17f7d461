//! Compile-time environments for lexical address resolution.
//!
//! An environment is a chain of frames, innermost first. Each frame holds the
//! parameters bound by one closure, in order. Frames live on the compiler's
//! call stack, so entering a closure body links a new frame in front of the
//! enclosing environment without copying it.

use slip_core::Symbol;

/// Lexical address of a local variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    /// Number of frames to walk out from the innermost one.
    pub frame: usize,
    /// Position within that frame.
    pub slot: usize,
}

/// Symbols bound by one closure.
#[derive(Debug)]
pub struct Frame<'a> {
    symbols: Vec<Symbol>,
    parent: Env<'a>,
}

impl<'a> Frame<'a> {
    pub fn new(symbols: Vec<Symbol>, parent: Env<'a>) -> Self {
        Self { symbols, parent }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// The environment with this frame innermost.
    pub fn env(&self) -> Env<'_> {
        Env { head: Some(self) }
    }
}

/// A compile-time environment. The empty environment means every symbol is
/// global.
#[derive(Debug, Clone, Copy, Default)]
pub struct Env<'a> {
    head: Option<&'a Frame<'a>>,
}

impl<'a> Env<'a> {
    pub fn empty() -> Self {
        Self { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of frames.
    pub fn depth(&self) -> usize {
        let mut env = *self;
        let mut depth = 0;
        while let Some(frame) = env.head {
            depth += 1;
            env = frame.parent;
        }
        depth
    }

    /// Resolve `symbol` to the innermost binding, or `None` for a global.
    pub fn find(&self, symbol: Symbol) -> Option<Address> {
        let mut env = *self;
        let mut depth = 0;
        while let Some(frame) = env.head {
            if let Some(slot) = frame.symbols.iter().position(|&s| s == symbol) {
                return Some(Address { frame: depth, slot });
            }
            env = frame.parent;
            depth += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slip_core::SymbolTable;

    #[test]
    fn test_empty_env_is_global() {
        let mut symbols = SymbolTable::new();
        let x = symbols.intern("x");
        let env = Env::empty();
        assert!(env.is_empty());
        assert_eq!(env.depth(), 0);
        assert_eq!(env.find(x), None);
    }

    #[test]
    fn test_find_slot() {
        let mut symbols = SymbolTable::new();
        let a = symbols.intern("a");
        let b = symbols.intern("b");
        let c = symbols.intern("c");
        let frame = Frame::new(vec![a, b], Env::empty());
        let env = frame.env();
        assert_eq!(env.find(a), Some(Address { frame: 0, slot: 0 }));
        assert_eq!(env.find(b), Some(Address { frame: 0, slot: 1 }));
        assert_eq!(env.find(c), None);
    }

    #[test]
    fn test_outer_frames() {
        let mut symbols = SymbolTable::new();
        let x = symbols.intern("x");
        let y = symbols.intern("y");
        let z = symbols.intern("z");
        let outer = Frame::new(vec![x, y], Env::empty());
        let inner = Frame::new(vec![z], outer.env());
        let env = inner.env();
        assert_eq!(env.depth(), 2);
        assert_eq!(env.find(z), Some(Address { frame: 0, slot: 0 }));
        assert_eq!(env.find(y), Some(Address { frame: 1, slot: 1 }));
    }

    #[test]
    fn test_innermost_binding_wins() {
        let mut symbols = SymbolTable::new();
        let x = symbols.intern("x");
        let outer = Frame::new(vec![x], Env::empty());
        let middle = Frame::new(vec![], outer.env());
        let inner = Frame::new(vec![x], middle.env());
        assert_eq!(inner.env().find(x), Some(Address { frame: 0, slot: 0 }));
        assert_eq!(middle.env().find(x), Some(Address { frame: 1, slot: 0 }));
    }

    #[test]
    fn test_first_position_in_frame() {
        let mut symbols = SymbolTable::new();
        let x = symbols.intern("x");
        let frame = Frame::new(vec![x, x], Env::empty());
        assert_eq!(frame.env().find(x), Some(Address { frame: 0, slot: 0 }));
        assert_eq!(frame.symbols().len(), 2);
    }
}
