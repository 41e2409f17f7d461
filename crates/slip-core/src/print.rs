//! Constant serialization: values back to reader syntax.

use std::fmt;

use crate::heap::Heap;
use crate::value::Value;

/// Nesting depth past which printing gives up.
const MAX_DEPTH: usize = 1000;
/// Elements printed per list before giving up (cyclic cdr chains).
const MAX_ELEMENTS: usize = 10_000;

/// A value paired with the heap it lives in, for `Display`.
pub struct Printed<'a> {
    heap: &'a Heap,
    value: &'a Value,
}

impl<'a> Printed<'a> {
    pub fn new(heap: &'a Heap, value: &'a Value) -> Self {
        Self { heap, value }
    }
}

impl fmt::Display for Printed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.heap, self.value, 0)
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, heap: &Heap, value: &Value, depth: usize) -> fmt::Result {
    if depth > MAX_DEPTH {
        return write!(f, "...");
    }
    match value {
        Value::Nil => write!(f, "NIL"),
        Value::True => write!(f, "T"),
        Value::Number(n) => write!(f, "{}", n),
        Value::Char(c) => write!(f, "#\\{}", c),
        Value::Str(s) => write_string(f, s),
        Value::Symbol(sym) => write!(f, "{}", heap.symbol_name(*sym)),
        Value::Pair(_) => write_list(f, heap, value, depth),
        Value::Array(id) => {
            write!(f, "#(")?;
            for (i, item) in heap.array_items(*id).iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write_value(f, heap, item, depth + 1)?;
            }
            write!(f, ")")
        }
        Value::Closure(_) => write!(f, "#<closure>"),
        Value::Continuation(_) => write!(f, "#<continuation>"),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, heap: &Heap, value: &Value, depth: usize) -> fmt::Result {
    write!(f, "(")?;
    let mut current = value;
    let mut count = 0;
    while let Value::Pair(id) = current {
        if count > 0 {
            write!(f, " ")?;
        }
        if count == MAX_ELEMENTS {
            write!(f, "...")?;
            return write!(f, ")");
        }
        write_value(f, heap, heap.pair_car(*id), depth + 1)?;
        current = heap.pair_cdr(*id);
        count += 1;
    }
    if !heap.is_nullish(current) {
        write!(f, " . ")?;
        write_value(f, heap, current, depth + 1)?;
    }
    write!(f, ")")
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        if ch == '"' || ch == '\\' {
            write!(f, "\\")?;
        }
        write!(f, "{}", ch)?;
    }
    write!(f, "\"")
}

#[cfg(test)]
mod tests {
    use crate::heap::Heap;
    use crate::value::Value;

    #[test]
    fn test_atoms() {
        let mut heap = Heap::new();
        let sym = heap.symbol("foo");
        assert_eq!(heap.serialize(&Value::Nil), "NIL");
        assert_eq!(heap.serialize(&Value::True), "T");
        assert_eq!(heap.serialize(&Value::Number(42.0)), "42");
        assert_eq!(heap.serialize(&Value::Number(12.5)), "12.5");
        assert_eq!(heap.serialize(&Value::Char('a')), "#\\a");
        assert_eq!(heap.serialize(&sym), "FOO");
    }

    #[test]
    fn test_strings_are_escaped() {
        let heap = Heap::new();
        assert_eq!(heap.serialize(&Value::string("a\"b\\c")), r#""a\"b\\c""#);
    }

    #[test]
    fn test_lists() {
        let mut heap = Heap::new();
        let a = heap.symbol("a");
        let inner = heap.list(vec![Value::Number(1.0)]);
        let list = heap.list(vec![a.clone(), inner]);
        assert_eq!(heap.serialize(&list), "(A (1))");
        let dotted = heap.list_with_tail(vec![a], Value::Number(2.0));
        assert_eq!(heap.serialize(&dotted), "(A . 2)");
    }

    #[test]
    fn test_arrays() {
        let mut heap = Heap::new();
        let array = heap.array(vec![Value::Number(1.0), Value::string("x")]);
        assert_eq!(heap.serialize(&array), "#(1 \"x\")");
    }

    #[test]
    fn test_cycles_terminate() {
        let mut heap = Heap::new();
        let pair = heap.cons(Value::Number(1.0), Value::Nil);
        let id = pair.as_pair().expect("pair");
        heap.set_cdr(id, pair.clone());
        assert!(heap.serialize(&pair).ends_with("...)"));
    }
}
