//! The data heap: interned symbols, an arena of pairs and arrays, globals
//! and the macro side table.

use std::collections::HashMap;
use std::rc::Rc;

use crate::code::Program;
use crate::error::RuntimeError;
use crate::print::Printed;
use crate::symbol::{Symbol, SymbolTable};
use crate::value::{ArrayId, PairId, Value};

/// A single cons cell.
#[derive(Debug, Clone)]
struct Pair {
    car: Value,
    cdr: Value,
}

/// Owner of all symbolic data.
///
/// Pairs and arrays are addressed by index, so shared and cyclic structure
/// keeps its identity. Nothing is ever freed.
#[derive(Debug)]
pub struct Heap {
    symbols: SymbolTable,
    pairs: Vec<Pair>,
    arrays: Vec<Vec<Value>>,
    globals: HashMap<Symbol, Value>,
    macros: HashMap<Symbol, Rc<Program>>,
    nil: Symbol,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let nil = symbols.intern("NIL");
        Self {
            symbols,
            pairs: Vec::new(),
            arrays: Vec::new(),
            globals: HashMap::new(),
            macros: HashMap::new(),
            nil,
        }
    }

    // =========================================================================
    // Symbols
    // =========================================================================

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    /// Intern `name` and wrap it as a value.
    pub fn symbol(&mut self, name: &str) -> Value {
        Value::Symbol(self.symbols.intern(name))
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.symbols.name(symbol)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// The symbol `NIL`.
    pub fn nil_symbol(&self) -> Symbol {
        self.nil
    }

    /// Whether `value` counts as empty/false: the empty list or the symbol `NIL`.
    pub fn is_nullish(&self, value: &Value) -> bool {
        match value {
            Value::Nil => true,
            Value::Symbol(sym) => *sym == self.nil,
            _ => false,
        }
    }

    // =========================================================================
    // Pairs
    // =========================================================================

    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        let id = PairId(self.pairs.len() as u32);
        self.pairs.push(Pair { car, cdr });
        Value::Pair(id)
    }

    pub fn pair_car(&self, id: PairId) -> &Value {
        &self.pairs[id.0 as usize].car
    }

    pub fn pair_cdr(&self, id: PairId) -> &Value {
        &self.pairs[id.0 as usize].cdr
    }

    pub fn set_car(&mut self, id: PairId, value: Value) {
        self.pairs[id.0 as usize].car = value;
    }

    pub fn set_cdr(&mut self, id: PairId, value: Value) {
        self.pairs[id.0 as usize].cdr = value;
    }

    /// Car of a pair, or nil for a nullish value.
    pub fn car(&self, value: &Value) -> Result<Value, RuntimeError> {
        match value {
            Value::Pair(id) => Ok(self.pair_car(*id).clone()),
            v if self.is_nullish(v) => Ok(Value::Nil),
            v => Err(RuntimeError::type_error("car", "list", v.type_name())),
        }
    }

    /// Cdr of a pair, or nil for a nullish value.
    pub fn cdr(&self, value: &Value) -> Result<Value, RuntimeError> {
        match value {
            Value::Pair(id) => Ok(self.pair_cdr(*id).clone()),
            v if self.is_nullish(v) => Ok(Value::Nil),
            v => Err(RuntimeError::type_error("cdr", "list", v.type_name())),
        }
    }

    /// Build a proper list.
    pub fn list(&mut self, items: Vec<Value>) -> Value {
        self.list_with_tail(items, Value::Nil)
    }

    /// Build a list whose final cdr is `tail`.
    pub fn list_with_tail(&mut self, items: Vec<Value>, tail: Value) -> Value {
        let mut result = tail;
        for item in items.into_iter().rev() {
            result = self.cons(item, result);
        }
        result
    }

    /// Split a list into its elements and final tail.
    ///
    /// The tail is [`Value::Nil`] for a proper list. Cycles are cut off once
    /// every pair has been visited.
    pub fn split_list(&self, value: &Value) -> (Vec<Value>, Value) {
        let mut items = Vec::new();
        let mut current = value.clone();
        while let Value::Pair(id) = current {
            if items.len() > self.pairs.len() {
                break;
            }
            items.push(self.pair_car(id).clone());
            current = self.pair_cdr(id).clone();
        }
        let tail = if self.is_nullish(&current) {
            Value::Nil
        } else {
            current
        };
        (items, tail)
    }

    /// Collect a proper list into a vector. Returns `None` for dotted lists
    /// and non-list atoms.
    pub fn list_to_vec(&self, value: &Value) -> Option<Vec<Value>> {
        match self.split_list(value) {
            (items, Value::Nil) => Some(items),
            _ => None,
        }
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    pub fn array(&mut self, items: Vec<Value>) -> Value {
        let id = ArrayId(self.arrays.len() as u32);
        self.arrays.push(items);
        Value::Array(id)
    }

    pub fn array_items(&self, id: ArrayId) -> &[Value] {
        &self.arrays[id.0 as usize]
    }

    pub fn array_set(&mut self, id: ArrayId, index: usize, value: Value) -> Result<(), RuntimeError> {
        let items = &mut self.arrays[id.0 as usize];
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(RuntimeError::OutOfBounds { index, len })?;
        *slot = value;
        Ok(())
    }

    // =========================================================================
    // Globals and macros
    // =========================================================================

    pub fn global(&self, symbol: Symbol) -> Option<&Value> {
        self.globals.get(&symbol)
    }

    pub fn set_global(&mut self, symbol: Symbol, value: Value) {
        self.globals.insert(symbol, value);
    }

    /// Assembled expander stored on `symbol` by `DEFMACRO`, if any.
    pub fn macro_for(&self, symbol: Symbol) -> Option<Rc<Program>> {
        self.macros.get(&symbol).cloned()
    }

    pub fn set_macro(&mut self, symbol: Symbol, program: Rc<Program>) {
        self.macros.insert(symbol, program);
    }

    // =========================================================================
    // Printing
    // =========================================================================

    /// Wrap a value for display.
    pub fn display<'a>(&'a self, value: &'a Value) -> Printed<'a> {
        Printed::new(self, value)
    }

    /// Render a value as reader syntax.
    pub fn serialize(&self, value: &Value) -> String {
        self.display(value).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_round_trip() {
        let mut heap = Heap::new();
        let items = vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)];
        let list = heap.list(items.clone());
        assert_eq!(heap.list_to_vec(&list), Some(items));
    }

    #[test]
    fn test_dotted_list() {
        let mut heap = Heap::new();
        let a = heap.symbol("a");
        let b = heap.symbol("b");
        let list = heap.list_with_tail(vec![a.clone()], b.clone());
        assert_eq!(heap.list_to_vec(&list), None);
        assert_eq!(heap.split_list(&list), (vec![a], b));
    }

    #[test]
    fn test_nullish() {
        let mut heap = Heap::new();
        let nil = heap.symbol("nil");
        let t = heap.symbol("t");
        assert!(heap.is_nullish(&Value::Nil));
        assert!(heap.is_nullish(&nil));
        assert!(!heap.is_nullish(&t));
        assert!(!heap.is_nullish(&Value::Number(0.0)));
    }

    #[test]
    fn test_car_cdr() {
        let mut heap = Heap::new();
        let pair = heap.cons(Value::Number(1.0), Value::Number(2.0));
        assert_eq!(heap.car(&pair), Ok(Value::Number(1.0)));
        assert_eq!(heap.cdr(&pair), Ok(Value::Number(2.0)));
        assert_eq!(heap.car(&Value::Nil), Ok(Value::Nil));
        assert!(heap.car(&Value::Number(1.0)).is_err());
    }

    #[test]
    fn test_mutation_keeps_identity() {
        let mut heap = Heap::new();
        let pair = heap.cons(Value::Number(1.0), Value::Nil);
        let id = pair.as_pair().expect("pair");
        heap.set_cdr(id, pair.clone());
        assert_eq!(heap.pair_cdr(id), &pair);
        let (items, _) = heap.split_list(&pair);
        assert!(items.len() <= 2);
    }

    #[test]
    fn test_arrays() {
        let mut heap = Heap::new();
        let array = heap.array(vec![Value::Number(1.0)]);
        let Value::Array(id) = array else {
            panic!("expected array");
        };
        heap.array_set(id, 0, Value::True).expect("in bounds");
        assert_eq!(heap.array_items(id), &[Value::True]);
        assert!(heap.array_set(id, 3, Value::Nil).is_err());
    }
}
