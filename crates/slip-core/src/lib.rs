//! Slip core - symbolic data, bytecode and the machine contract.
//!
//! This crate provides the data layer shared by the reader, the compiler and
//! the virtual machine: interned symbols, the pair/array heap, runtime values,
//! symbolic and assembled bytecode, and the primitive registry.
//!
//! # Example
//!
//! ```
//! use slip_core::{Heap, Value};
//!
//! let mut heap = Heap::new();
//! let plus = heap.symbol("+");
//! let form = heap.list(vec![plus, Value::Number(1.0), Value::Number(2.0)]);
//! assert_eq!(heap.serialize(&form), "(+ 1 2)");
//! ```

pub mod code;
pub mod error;
pub mod heap;
pub mod machine;
pub mod object;
pub mod opcode;
pub mod primitive;
pub mod print;
pub mod symbol;
pub mod value;

pub use code::{
    assemble, AssembleError, Instr, Instruction, Item, Label, LabelAllocator, Linear, Program,
    Sequence,
};
pub use error::RuntimeError;
pub use heap::Heap;
pub use machine::Machine;
pub use object::{Closure, Continuation, Env, ReturnPoint, Slot};
pub use opcode::Op;
pub use primitive::{Primitive, PrimitiveFn, PrimitiveRegistry};
pub use print::Printed;
pub use symbol::{Symbol, SymbolTable};
pub use value::{ArrayId, PairId, Value};
