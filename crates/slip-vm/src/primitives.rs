//! Primitive operations for Slip.

use slip_core::{Heap, Primitive, PrimitiveRegistry, RuntimeError, Value};

/// Create the standard primitive registry.
pub fn create_primitives(heap: &mut Heap) -> PrimitiveRegistry {
    let mut registry = PrimitiveRegistry::new();
    for primitive in PRIMITIVES {
        registry.register(heap, *primitive);
    }
    registry
}

const PRIMITIVES: &[Primitive] = &[
    // Arithmetic
    Primitive::pure("+", |_, args| fold("+", args, 0.0, |a, b| a + b)),
    Primitive::pure("*", |_, args| fold("*", args, 1.0, |a, b| a * b)),
    Primitive::pure("-", |_, args| inverse("-", args, 0.0, |a, b| a - b)),
    Primitive::pure("/", |_, args| inverse("/", args, 1.0, |a, b| a / b)),
    // Comparison
    Primitive::pure("=", |_, args| compare("=", args, |a, b| a == b)),
    Primitive::pure("<", |_, args| compare("<", args, |a, b| a < b)),
    Primitive::pure(">", |_, args| compare(">", args, |a, b| a > b)),
    Primitive::pure("<=", |_, args| compare("<=", args, |a, b| a <= b)),
    Primitive::pure(">=", |_, args| compare(">=", args, |a, b| a >= b)),
    // Pairs and lists
    Primitive::pure("cons", |heap, args| {
        exact(args, 2)?;
        Ok(heap.cons(args[0].clone(), args[1].clone()))
    }),
    Primitive::pure("car", |heap, args| {
        exact(args, 1)?;
        heap.car(&args[0])
    }),
    Primitive::pure("cdr", |heap, args| {
        exact(args, 1)?;
        heap.cdr(&args[0])
    }),
    Primitive::pure("list", |heap, args| Ok(heap.list(args.to_vec()))),
    Primitive::pure("append", append),
    Primitive::pure("length", |heap, args| {
        exact(args, 1)?;
        let len = match &args[0] {
            Value::Str(s) => s.chars().count(),
            Value::Array(id) => heap.array_items(*id).len(),
            v if heap.is_nullish(v) => 0,
            v @ Value::Pair(_) => heap
                .list_to_vec(v)
                .ok_or(RuntimeError::type_error("length", "proper list", "pair"))?
                .len(),
            v => return Err(RuntimeError::type_error("length", "sequence", v.type_name())),
        };
        Ok(Value::Number(len as f64))
    }),
    Primitive::effect("set-car!", |heap, args| {
        exact(args, 2)?;
        let id = pair("set-car!", &args[0])?;
        heap.set_car(id, args[1].clone());
        Ok(args[1].clone())
    }),
    Primitive::effect("set-cdr!", |heap, args| {
        exact(args, 2)?;
        let id = pair("set-cdr!", &args[0])?;
        heap.set_cdr(id, args[1].clone());
        Ok(args[1].clone())
    }),
    // Predicates
    Primitive::pure("eq", |_, args| {
        exact(args, 2)?;
        Ok(truth(args[0].is_eq(&args[1])))
    }),
    Primitive::pure("not", |heap, args| {
        exact(args, 1)?;
        Ok(truth(heap.is_nullish(&args[0])))
    }),
    Primitive::pure("null", |heap, args| {
        exact(args, 1)?;
        Ok(truth(heap.is_nullish(&args[0])))
    }),
    Primitive::pure("consp", |_, args| {
        exact(args, 1)?;
        Ok(truth(args[0].is_pair()))
    }),
    Primitive::pure("symbolp", |_, args| {
        exact(args, 1)?;
        Ok(truth(matches!(args[0], Value::Symbol(_))))
    }),
    Primitive::pure("numberp", |_, args| {
        exact(args, 1)?;
        Ok(truth(matches!(args[0], Value::Number(_))))
    }),
    Primitive::pure("stringp", |_, args| {
        exact(args, 1)?;
        Ok(truth(matches!(args[0], Value::Str(_))))
    }),
    // Arrays
    Primitive::pure("list->array", |heap, args| {
        exact(args, 1)?;
        let items = heap
            .list_to_vec(&args[0])
            .ok_or(RuntimeError::type_error("list->array", "list", args[0].type_name()))?;
        Ok(heap.array(items))
    }),
    Primitive::pure("array->list", |heap, args| {
        exact(args, 1)?;
        let Value::Array(id) = &args[0] else {
            return Err(RuntimeError::type_error("array->list", "array", args[0].type_name()));
        };
        let items = heap.array_items(*id).to_vec();
        Ok(heap.list(items))
    }),
    Primitive::pure("aref", |heap, args| {
        exact(args, 2)?;
        let Value::Array(id) = &args[0] else {
            return Err(RuntimeError::type_error("aref", "array", args[0].type_name()));
        };
        let index = index("aref", &args[1])?;
        let items = heap.array_items(*id);
        items.get(index).cloned().ok_or(RuntimeError::OutOfBounds {
            index,
            len: items.len(),
        })
    }),
    Primitive::effect("aset", |heap, args| {
        exact(args, 3)?;
        let Value::Array(id) = &args[0] else {
            return Err(RuntimeError::type_error("aset", "array", args[0].type_name()));
        };
        let index = index("aset", &args[1])?;
        heap.array_set(*id, index, args[2].clone())?;
        Ok(args[2].clone())
    }),
    // Errors
    Primitive::effect("error", |heap, args| {
        let parts: Vec<String> = args
            .iter()
            .map(|arg| match arg {
                Value::Str(s) => s.to_string(),
                other => heap.serialize(other),
            })
            .collect();
        Err(RuntimeError::Signal(parts.join(" ")))
    }),
];

// =============================================================================
// Helpers
// =============================================================================

fn truth(b: bool) -> Value {
    if b { Value::True } else { Value::Nil }
}

fn exact(args: &[Value], n: usize) -> Result<(), RuntimeError> {
    if args.len() != n {
        return Err(RuntimeError::Arity {
            expected: n.to_string(),
            found: args.len(),
        });
    }
    Ok(())
}

fn number(operation: &'static str, value: &Value) -> Result<f64, RuntimeError> {
    value
        .as_number()
        .ok_or(RuntimeError::type_error(operation, "number", value.type_name()))
}

fn index(operation: &'static str, value: &Value) -> Result<usize, RuntimeError> {
    let n = number(operation, value)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(RuntimeError::type_error(operation, "index", "number"));
    }
    Ok(n as usize)
}

fn pair(operation: &'static str, value: &Value) -> Result<slip_core::PairId, RuntimeError> {
    value
        .as_pair()
        .ok_or(RuntimeError::type_error(operation, "pair", value.type_name()))
}

fn fold(
    operation: &'static str,
    args: &[Value],
    init: f64,
    op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    let mut acc = init;
    for arg in args {
        acc = op(acc, number(operation, arg)?);
    }
    Ok(Value::Number(acc))
}

/// `(- x)` negates and `(/ x)` inverts; otherwise reduce left to right.
fn inverse(
    operation: &'static str,
    args: &[Value],
    identity: f64,
    op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    let Some((first, rest)) = args.split_first() else {
        return Err(RuntimeError::Arity {
            expected: "at least 1".to_string(),
            found: 0,
        });
    };
    let first = number(operation, first)?;
    if rest.is_empty() {
        return Ok(Value::Number(op(identity, first)));
    }
    let mut acc = first;
    for arg in rest {
        acc = op(acc, number(operation, arg)?);
    }
    Ok(Value::Number(acc))
}

/// Check that `test` holds for each adjacent pair of arguments.
fn compare(
    operation: &'static str,
    args: &[Value],
    test: fn(f64, f64) -> bool,
) -> Result<Value, RuntimeError> {
    let numbers = args
        .iter()
        .map(|arg| number(operation, arg))
        .collect::<Result<Vec<_>, _>>()?;
    if numbers.is_empty() {
        return Err(RuntimeError::Arity {
            expected: "at least 1".to_string(),
            found: 0,
        });
    }
    Ok(truth(numbers.windows(2).all(|w| test(w[0], w[1]))))
}

/// Concatenate lists. The last argument is shared as the tail.
fn append(heap: &mut Heap, args: &[Value]) -> Result<Value, RuntimeError> {
    let Some((last, init)) = args.split_last() else {
        return Ok(Value::Nil);
    };
    let mut items = Vec::new();
    for arg in init {
        let list = heap
            .list_to_vec(arg)
            .ok_or(RuntimeError::type_error("append", "list", arg.type_name()))?;
        items.extend(list);
    }
    Ok(heap.list_with_tail(items, last.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(heap: &mut Heap, registry: &PrimitiveRegistry, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let sym = heap.intern(name);
        let primitive = *registry.get(sym).expect("primitive exists");
        primitive.call(heap, args)
    }

    fn setup() -> (Heap, PrimitiveRegistry) {
        let mut heap = Heap::new();
        let registry = create_primitives(&mut heap);
        (heap, registry)
    }

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    #[test]
    fn test_primitives_exist() {
        let (mut heap, registry) = setup();
        for name in ["+", "car", "cons", "list", "append", "eq", "aref", "error"] {
            let sym = heap.intern(name);
            assert!(registry.contains(sym), "missing {}", name);
        }
        let set_car = heap.intern("set-car!");
        assert!(registry.has_side_effect(set_car));
        let car = heap.intern("car");
        assert!(!registry.has_side_effect(car));
    }

    #[test]
    fn test_arithmetic() {
        let (mut heap, reg) = setup();
        assert_eq!(call(&mut heap, &reg, "+", &[]), Ok(n(0.0)));
        assert_eq!(call(&mut heap, &reg, "+", &[n(1.0), n(2.0), n(3.0)]), Ok(n(6.0)));
        assert_eq!(call(&mut heap, &reg, "*", &[n(2.0), n(4.0)]), Ok(n(8.0)));
        assert_eq!(call(&mut heap, &reg, "-", &[n(5.0)]), Ok(n(-5.0)));
        assert_eq!(call(&mut heap, &reg, "-", &[n(10.0), n(3.0), n(2.0)]), Ok(n(5.0)));
        assert_eq!(call(&mut heap, &reg, "/", &[n(4.0)]), Ok(n(0.25)));
        assert_eq!(call(&mut heap, &reg, "/", &[n(9.0), n(3.0)]), Ok(n(3.0)));
        assert!(matches!(
            call(&mut heap, &reg, "+", &[n(1.0), Value::True]),
            Err(RuntimeError::Type { operation: "+", .. })
        ));
        assert!(matches!(call(&mut heap, &reg, "-", &[]), Err(RuntimeError::Arity { .. })));
    }

    #[test]
    fn test_comparison() {
        let (mut heap, reg) = setup();
        assert_eq!(call(&mut heap, &reg, "<", &[n(1.0), n(2.0), n(3.0)]), Ok(Value::True));
        assert_eq!(call(&mut heap, &reg, "<", &[n(1.0), n(3.0), n(2.0)]), Ok(Value::Nil));
        assert_eq!(call(&mut heap, &reg, "=", &[n(2.0), n(2.0)]), Ok(Value::True));
        assert_eq!(call(&mut heap, &reg, ">=", &[n(2.0), n(2.0)]), Ok(Value::True));
    }

    #[test]
    fn test_lists() {
        let (mut heap, reg) = setup();
        let list = call(&mut heap, &reg, "list", &[n(1.0), n(2.0)]).expect("list");
        assert_eq!(heap.serialize(&list), "(1 2)");
        assert_eq!(call(&mut heap, &reg, "car", &[list.clone()]), Ok(n(1.0)));
        let tail = call(&mut heap, &reg, "cdr", &[list.clone()]).expect("cdr");
        assert_eq!(heap.serialize(&tail), "(2)");
        let pair = call(&mut heap, &reg, "cons", &[n(0.0), list.clone()]).expect("cons");
        assert_eq!(heap.serialize(&pair), "(0 1 2)");
        assert_eq!(call(&mut heap, &reg, "length", &[pair]), Ok(n(3.0)));
        assert_eq!(call(&mut heap, &reg, "car", &[Value::Nil]), Ok(Value::Nil));
    }

    #[test]
    fn test_append() {
        let (mut heap, reg) = setup();
        let a = heap.list(vec![n(1.0), n(2.0)]);
        let b = heap.list(vec![n(3.0)]);
        let joined = call(&mut heap, &reg, "append", &[a, Value::Nil, b]).expect("append");
        assert_eq!(heap.serialize(&joined), "(1 2 3)");
        assert_eq!(call(&mut heap, &reg, "append", &[]), Ok(Value::Nil));
    }

    #[test]
    fn test_mutation() {
        let (mut heap, reg) = setup();
        let list = heap.list(vec![n(1.0), n(2.0)]);
        call(&mut heap, &reg, "set-car!", &[list.clone(), n(9.0)]).expect("set-car!");
        assert_eq!(heap.serialize(&list), "(9 2)");
        call(&mut heap, &reg, "set-cdr!", &[list.clone(), n(3.0)]).expect("set-cdr!");
        assert_eq!(heap.serialize(&list), "(9 . 3)");
    }

    #[test]
    fn test_predicates() {
        let (mut heap, reg) = setup();
        let nil = heap.symbol("nil");
        assert_eq!(call(&mut heap, &reg, "not", &[nil.clone()]), Ok(Value::True));
        assert_eq!(call(&mut heap, &reg, "null", &[n(0.0)]), Ok(Value::Nil));
        let a = heap.symbol("a");
        assert_eq!(call(&mut heap, &reg, "eq", &[a.clone(), a.clone()]), Ok(Value::True));
        assert_eq!(call(&mut heap, &reg, "symbolp", &[a]), Ok(Value::True));
        assert_eq!(call(&mut heap, &reg, "numberp", &[n(1.0)]), Ok(Value::True));
        assert_eq!(call(&mut heap, &reg, "stringp", &[Value::string("s")]), Ok(Value::True));
        assert_eq!(call(&mut heap, &reg, "consp", &[Value::Nil]), Ok(Value::Nil));
    }

    #[test]
    fn test_arrays() {
        let (mut heap, reg) = setup();
        let list = heap.list(vec![n(1.0), n(2.0)]);
        let array = call(&mut heap, &reg, "list->array", &[list]).expect("array");
        assert_eq!(call(&mut heap, &reg, "aref", &[array.clone(), n(1.0)]), Ok(n(2.0)));
        call(&mut heap, &reg, "aset", &[array.clone(), n(0.0), n(7.0)]).expect("aset");
        let back = call(&mut heap, &reg, "array->list", &[array.clone()]).expect("list");
        assert_eq!(heap.serialize(&back), "(7 2)");
        assert_eq!(
            call(&mut heap, &reg, "aref", &[array.clone(), n(5.0)]),
            Err(RuntimeError::OutOfBounds { index: 5, len: 2 })
        );
        assert_eq!(call(&mut heap, &reg, "length", &[array]), Ok(n(2.0)));
    }

    #[test]
    fn test_error() {
        let (mut heap, reg) = setup();
        assert_eq!(
            call(&mut heap, &reg, "error", &[Value::string("bad value:"), n(3.0)]),
            Err(RuntimeError::Signal("bad value: 3".to_string()))
        );
    }
}
