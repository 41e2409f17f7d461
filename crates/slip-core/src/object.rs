//! Runtime objects created by the machine: closures, environments and
//! captured continuations.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::code::Program;
use crate::value::Value;

/// A runtime environment frame, linked to its enclosing frame.
pub struct Env {
    pub slots: RefCell<Vec<Value>>,
    pub parent: Option<Rc<Env>>,
}

impl Env {
    pub fn new(slots: Vec<Value>, parent: Option<Rc<Env>>) -> Rc<Self> {
        Rc::new(Self {
            slots: RefCell::new(slots),
            parent,
        })
    }

    /// Walk `depth` frames outward.
    pub fn ancestor(self: &Rc<Self>, depth: usize) -> Option<Rc<Env>> {
        let mut env = self.clone();
        for _ in 0..depth {
            env = env.parent.clone()?;
        }
        Some(env)
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Env({} slots)", self.slots.borrow().len())
    }
}

/// A function value: code plus the environment it closed over.
pub struct Closure {
    pub code: Rc<Program>,
    pub env: Option<Rc<Env>>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure({} instructions)", self.code.len())
    }
}

/// Where a call returns to, pushed by `SAVE`.
#[derive(Debug, Clone)]
pub struct ReturnPoint {
    pub code: Rc<Program>,
    pub pc: usize,
    pub env: Option<Rc<Env>>,
}

/// One entry of the machine stack.
#[derive(Debug, Clone)]
pub enum Slot {
    Value(Value),
    Return(ReturnPoint),
}

/// A captured continuation: a snapshot of the whole machine stack.
///
/// Return points live on the stack, so the snapshot is the complete
/// pending computation.
#[derive(Clone)]
pub struct Continuation {
    pub stack: Vec<Slot>,
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Continuation({} slots)", self.stack.len())
    }
}
