//! Symbolic and runtime values.

use std::rc::Rc;

use crate::object::{Closure, Continuation};
use crate::symbol::Symbol;

/// Index of a pair in the [`Heap`](crate::Heap) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(pub(crate) u32);

/// Index of an array in the [`Heap`](crate::Heap) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayId(pub(crate) u32);

/// A value: either symbolic data produced by the reader or a runtime object.
#[derive(Debug, Clone)]
pub enum Value {
    /// The empty list.
    Nil,
    /// The boolean-true sentinel.
    True,
    Number(f64),
    Char(char),
    Str(Rc<str>),
    Symbol(Symbol),
    Pair(PairId),
    Array(ArrayId),
    Closure(Rc<Closure>),
    Continuation(Rc<Continuation>),
}

impl Value {
    /// Create a string value.
    pub fn string(s: &str) -> Self {
        Value::Str(s.into())
    }

    /// Get the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::True => "true",
            Value::Number(_) => "number",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Pair(_) => "pair",
            Value::Array(_) => "array",
            Value::Closure(_) => "closure",
            Value::Continuation(_) => "continuation",
        }
    }

    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Value::Symbol(sym) => Some(*sym),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<PairId> {
        match self {
            Value::Pair(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this value is the symbol `sym`.
    pub fn is_symbol(&self, sym: Symbol) -> bool {
        matches!(self, Value::Symbol(s) if *s == sym)
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Value::Pair(_))
    }

    /// Whether this value evaluates to itself.
    ///
    /// Symbols and pairs are not literals; `NIL` and `T` are handled by name
    /// in the compiler.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Value::True | Value::Number(_) | Value::Str(_) | Value::Char(_) | Value::Array(_)
        )
    }

    /// Identity comparison, as used by the `eq` primitive.
    ///
    /// Unlike `==`, strings compare by allocation rather than content.
    pub fn is_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::True, Value::True) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Pair(a), Value::Pair(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Continuation(a), Value::Continuation(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}
