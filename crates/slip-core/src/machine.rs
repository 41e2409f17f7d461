//! The contract between the compiler and a bytecode executor.

use std::rc::Rc;

use crate::code::Program;
use crate::error::RuntimeError;
use crate::heap::Heap;
use crate::value::Value;

/// Something that can run assembled programs.
///
/// The compiler calls [`Machine::run`] in the middle of a compilation to
/// expand macros, so implementations must be usable while a compile is in
/// progress. Every call starts from an empty stack and no current
/// environment, exactly like a newly created machine; only the heap
/// (globals included) is shared between runs.
pub trait Machine {
    /// Run `program` to completion and return the value of its final return.
    fn run(&mut self, heap: &mut Heap, program: Rc<Program>) -> Result<Value, RuntimeError>;
}
