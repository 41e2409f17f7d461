//! Slip Virtual Machine - bytecode execution engine.
//!
//! A stack machine with four registers: the current program, the program
//! counter, the current environment and the argument count of the last call.
//! Return points are pushed onto the value stack by `SAVE`, so a snapshot of
//! the stack is a complete continuation.

use std::rc::Rc;

use log::trace;
use slip_core::{
    Closure, Continuation, Env, Heap, Instr, Machine, PrimitiveRegistry, Program, ReturnPoint,
    RuntimeError, Slot, Value,
};

/// Default limit on stack slots.
const DEFAULT_MAX_STACK: usize = 100_000;

/// VM configuration options.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Maximum number of stack slots before a run fails with
    /// [`RuntimeError::StackOverflow`].
    pub max_stack: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_stack: DEFAULT_MAX_STACK,
        }
    }
}

/// Slip Virtual Machine.
pub struct Vm {
    primitives: Rc<PrimitiveRegistry>,
    config: VmConfig,
}

impl Vm {
    /// Create a new VM calling primitives from `primitives`.
    pub fn new(primitives: Rc<PrimitiveRegistry>, config: VmConfig) -> Self {
        Self { primitives, config }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn primitives(&self) -> &PrimitiveRegistry {
        &self.primitives
    }

    /// Execute an assembled program from a fresh stack.
    pub fn execute(&self, heap: &mut Heap, program: Rc<Program>) -> Result<Value, RuntimeError> {
        Run::new(heap, &self.primitives, self.config.max_stack, program).execute()
    }
}

impl Machine for Vm {
    fn run(&mut self, heap: &mut Heap, program: Rc<Program>) -> Result<Value, RuntimeError> {
        self.execute(heap, program)
    }
}

/// Machine state for a single run.
struct Run<'a> {
    heap: &'a mut Heap,
    primitives: &'a PrimitiveRegistry,
    max_stack: usize,
    stack: Vec<Slot>,
    code: Rc<Program>,
    pc: usize,
    env: Option<Rc<Env>>,
    nargs: usize,
}

impl<'a> Run<'a> {
    fn new(
        heap: &'a mut Heap,
        primitives: &'a PrimitiveRegistry,
        max_stack: usize,
        code: Rc<Program>,
    ) -> Self {
        Self {
            heap,
            primitives,
            max_stack,
            stack: Vec::new(),
            code,
            pc: 0,
            env: None,
            nargs: 0,
        }
    }

    /// Main execution loop.
    fn execute(mut self) -> Result<Value, RuntimeError> {
        loop {
            let code = self.code.clone();
            let Some(instr) = code.get(self.pc) else {
                // Ran off the end of the program.
                return Ok(match self.stack.pop() {
                    Some(Slot::Value(value)) => value,
                    _ => Value::Nil,
                });
            };
            trace!("{:04} {} (stack {})", self.pc, instr.op(), self.stack.len());
            self.pc += 1;

            match instr {
                Instr::Const(value) => self.push(value.clone())?,

                Instr::LVar { frame, slot } => {
                    let value = self.local(*frame, *slot)?;
                    self.push(value)?;
                }

                Instr::LSet { frame, slot } => {
                    let value = self.peek()?;
                    let env = self.frame(*frame, *slot)?;
                    let mut slots = env.slots.borrow_mut();
                    match slots.get_mut(*slot) {
                        Some(target) => *target = value,
                        None => {
                            return Err(RuntimeError::BadAddress {
                                frame: *frame,
                                slot: *slot,
                            });
                        }
                    };
                }

                Instr::GVar(sym) => {
                    let value = self.heap.global(*sym).cloned().ok_or_else(|| {
                        RuntimeError::Unbound(self.heap.symbol_name(*sym).to_string())
                    })?;
                    self.push(value)?;
                }

                Instr::GSet(sym) => {
                    let value = self.peek()?;
                    self.heap.set_global(*sym, value);
                }

                Instr::Pop => {
                    self.pop()?;
                }

                // Jumps
                Instr::Jump(target) => self.pc = *target,

                Instr::TJump(target) => {
                    let value = self.pop()?;
                    if !self.heap.is_nullish(&value) {
                        self.pc = *target;
                    }
                }

                Instr::FJump(target) => {
                    let value = self.pop()?;
                    if self.heap.is_nullish(&value) {
                        self.pc = *target;
                    }
                }

                // Calls
                Instr::Save(target) => {
                    let point = ReturnPoint {
                        code: self.code.clone(),
                        pc: *target,
                        env: self.env.clone(),
                    };
                    self.push_slot(Slot::Return(point))?;
                }

                Instr::Call(nargs) => {
                    let callee = self.pop()?;
                    if let Some(value) = self.call(callee, *nargs)? {
                        return Ok(value);
                    }
                }

                Instr::Ret => {
                    let value = self.pop()?;
                    if let Some(value) = self.return_value(value)? {
                        return Ok(value);
                    }
                }

                Instr::Prim(sym, nargs) => {
                    let primitive = *self.primitives.get(*sym).ok_or_else(|| {
                        RuntimeError::UnknownPrimitive(self.heap.symbol_name(*sym).to_string())
                    })?;
                    let args = self.pop_values(*nargs)?;
                    let result = primitive.call(self.heap, &args)?;
                    self.push(result)?;
                }

                // Closures
                Instr::Fn(body) => {
                    let closure = Closure {
                        code: body.clone(),
                        env: self.env.clone(),
                    };
                    self.push(Value::Closure(Rc::new(closure)))?;
                }

                Instr::Args(n) => {
                    if self.nargs != *n {
                        return Err(RuntimeError::Arity {
                            expected: n.to_string(),
                            found: self.nargs,
                        });
                    }
                    let slots = self.pop_values(*n)?;
                    self.env = Some(Env::new(slots, self.env.take()));
                }

                Instr::ArgsRest(n) => {
                    if self.nargs < *n {
                        return Err(RuntimeError::Arity {
                            expected: format!("at least {}", n),
                            found: self.nargs,
                        });
                    }
                    let mut slots = self.pop_values(self.nargs)?;
                    let rest = slots.split_off(*n);
                    slots.push(self.heap.list(rest));
                    self.env = Some(Env::new(slots, self.env.take()));
                }

                Instr::Cc => {
                    let continuation = Continuation {
                        stack: self.stack.clone(),
                    };
                    self.push(Value::Continuation(Rc::new(continuation)))?;
                }
            }
        }
    }

    /// Transfer control to `callee`. Returns a value if the run halts.
    fn call(&mut self, callee: Value, nargs: usize) -> Result<Option<Value>, RuntimeError> {
        match callee {
            Value::Closure(closure) => {
                self.code = closure.code.clone();
                self.pc = 0;
                self.env = closure.env.clone();
                self.nargs = nargs;
                Ok(None)
            }
            Value::Continuation(k) => {
                if nargs != 1 {
                    return Err(RuntimeError::Arity {
                        expected: "1".to_string(),
                        found: nargs,
                    });
                }
                let value = self.pop()?;
                self.stack = k.stack.clone();
                self.return_value(value)
            }
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    /// Return `value` to the saved return point, or halt with it when the
    /// stack is empty.
    fn return_value(&mut self, value: Value) -> Result<Option<Value>, RuntimeError> {
        match self.stack.pop() {
            None => Ok(Some(value)),
            Some(Slot::Return(point)) => {
                self.code = point.code;
                self.pc = point.pc;
                self.env = point.env;
                self.push(value)?;
                Ok(None)
            }
            Some(Slot::Value(_)) => Err(RuntimeError::NoReturnPoint),
        }
    }

    // =========================================================================
    // Stack operations
    // =========================================================================

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        self.push_slot(Slot::Value(value))
    }

    fn push_slot(&mut self, slot: Slot) -> Result<(), RuntimeError> {
        if self.stack.len() >= self.max_stack {
            return Err(RuntimeError::StackOverflow(self.max_stack));
        }
        self.stack.push(slot);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        match self.stack.pop() {
            Some(Slot::Value(value)) => Ok(value),
            _ => Err(RuntimeError::StackUnderflow),
        }
    }

    fn peek(&self) -> Result<Value, RuntimeError> {
        match self.stack.last() {
            Some(Slot::Value(value)) => Ok(value.clone()),
            _ => Err(RuntimeError::StackUnderflow),
        }
    }

    /// Pop `n` values, returned in push order.
    fn pop_values(&mut self, n: usize) -> Result<Vec<Value>, RuntimeError> {
        let mut values = (0..n).map(|_| self.pop()).collect::<Result<Vec<_>, _>>()?;
        values.reverse();
        Ok(values)
    }

    // =========================================================================
    // Environments
    // =========================================================================

    fn frame(&self, frame: usize, slot: usize) -> Result<Rc<Env>, RuntimeError> {
        self.env
            .as_ref()
            .and_then(|env| env.ancestor(frame))
            .ok_or(RuntimeError::BadAddress { frame, slot })
    }

    fn local(&self, frame: usize, slot: usize) -> Result<Value, RuntimeError> {
        let env = self.frame(frame, slot)?;
        let value = env.slots.borrow().get(slot).cloned();
        value.ok_or(RuntimeError::BadAddress { frame, slot })
    }
}
