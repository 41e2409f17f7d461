//! Bytecode containers: labels, symbolic sequences and assembled programs.
//!
//! The compiler produces a [`Sequence`]: instructions interleaved with
//! [`Label`] markers, closure bodies nested inside `FN`. The assembler turns
//! it into a linear [`Program`] whose jump operands are instruction offsets.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::opcode::Op;
use crate::symbol::Symbol;
use crate::value::Value;

/// Assembly errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("jump to undefined label {0}")]
    UndefinedLabel(Label),

    #[error("label {0} defined twice")]
    DuplicateLabel(Label),
}

/// A jump target marker. Compared by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(u32);

impl Label {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Hands out labels that are never reused for the allocator's lifetime.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    next: u32,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_label(&mut self) -> Label {
        self.next += 1;
        Label(self.next)
    }
}

/// An instruction, generic over its jump-target and closure-body operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr<T, B> {
    Const(Value),
    LVar { frame: usize, slot: usize },
    LSet { frame: usize, slot: usize },
    GVar(Symbol),
    GSet(Symbol),
    Pop,
    Jump(T),
    TJump(T),
    FJump(T),
    Save(T),
    Call(usize),
    Ret,
    Prim(Symbol, usize),
    Fn(B),
    Args(usize),
    ArgsRest(usize),
    Cc,
}

/// Instruction as emitted by the compiler.
pub type Instruction = Instr<Label, Sequence>;

/// Instruction after assembly.
pub type Linear = Instr<usize, Rc<Program>>;

impl<T: Copy, B> Instr<T, B> {
    /// Get the opcode of this instruction.
    pub fn op(&self) -> Op {
        match self {
            Instr::Const(_) => Op::Const,
            Instr::LVar { .. } => Op::LVar,
            Instr::LSet { .. } => Op::LSet,
            Instr::GVar(_) => Op::GVar,
            Instr::GSet(_) => Op::GSet,
            Instr::Pop => Op::Pop,
            Instr::Jump(_) => Op::Jump,
            Instr::TJump(_) => Op::TJump,
            Instr::FJump(_) => Op::FJump,
            Instr::Save(_) => Op::Save,
            Instr::Call(_) => Op::Call,
            Instr::Ret => Op::Ret,
            Instr::Prim(..) => Op::Prim,
            Instr::Fn(_) => Op::Fn,
            Instr::Args(_) => Op::Args,
            Instr::ArgsRest(_) => Op::ArgsRest,
            Instr::Cc => Op::Cc,
        }
    }

    /// Rebuild this instruction with translated jump targets and bodies.
    pub fn try_map<U, C, E>(
        &self,
        mut target: impl FnMut(T) -> Result<U, E>,
        mut body: impl FnMut(&B) -> Result<C, E>,
    ) -> Result<Instr<U, C>, E> {
        Ok(match self {
            Instr::Const(value) => Instr::Const(value.clone()),
            Instr::LVar { frame, slot } => Instr::LVar {
                frame: *frame,
                slot: *slot,
            },
            Instr::LSet { frame, slot } => Instr::LSet {
                frame: *frame,
                slot: *slot,
            },
            Instr::GVar(sym) => Instr::GVar(*sym),
            Instr::GSet(sym) => Instr::GSet(*sym),
            Instr::Pop => Instr::Pop,
            Instr::Jump(t) => Instr::Jump(target(*t)?),
            Instr::TJump(t) => Instr::TJump(target(*t)?),
            Instr::FJump(t) => Instr::FJump(target(*t)?),
            Instr::Save(t) => Instr::Save(target(*t)?),
            Instr::Call(n) => Instr::Call(*n),
            Instr::Ret => Instr::Ret,
            Instr::Prim(sym, n) => Instr::Prim(*sym, *n),
            Instr::Fn(b) => Instr::Fn(body(b)?),
            Instr::Args(n) => Instr::Args(*n),
            Instr::ArgsRest(n) => Instr::ArgsRest(*n),
            Instr::Cc => Instr::Cc,
        })
    }
}

/// An element of a symbolic sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Label(Label),
    Instr(Instruction),
}

/// Ordered instructions and label markers produced by the compiler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    items: Vec<Item>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one instruction.
    pub fn push(&mut self, instr: Instruction) {
        self.items.push(Item::Instr(instr));
    }

    /// Place a label at the current end.
    pub fn label(&mut self, label: Label) {
        self.items.push(Item::Label(label));
    }

    /// Append another sequence.
    pub fn append(&mut self, mut other: Sequence) {
        self.items.append(&mut other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Iterate over instructions, skipping labels.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.items.iter().filter_map(|item| match item {
            Item::Instr(instr) => Some(instr),
            Item::Label(_) => None,
        })
    }

    /// Opcodes of the top-level instructions, in order.
    pub fn ops(&self) -> Vec<Op> {
        self.instructions().map(Instr::op).collect()
    }
}

impl From<Instruction> for Sequence {
    fn from(instr: Instruction) -> Self {
        Self {
            items: vec![Item::Instr(instr)],
        }
    }
}

/// Assembled, linear bytecode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub code: Vec<Linear>,
}

impl Program {
    pub fn new(code: Vec<Linear>) -> Self {
        Self { code }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Get the instruction at `pc`.
    pub fn get(&self, pc: usize) -> Option<&Linear> {
        self.code.get(pc)
    }

    /// Append `other`, relocating its jump targets to follow this program.
    pub fn append(&mut self, other: &Program) {
        let base = self.code.len();
        for instr in &other.code {
            let Ok(moved) = instr.try_map::<_, _, std::convert::Infallible>(
                |target| Ok(target + base),
                |body| Ok(body.clone()),
            );
            self.code.push(moved);
        }
    }
}

/// Resolve labels to offsets, recursively assembling closure bodies.
pub fn assemble(sequence: &Sequence) -> Result<Program, AssembleError> {
    let mut offsets = HashMap::new();
    let mut pc = 0;
    for item in sequence.items() {
        match item {
            Item::Label(label) => {
                if offsets.insert(*label, pc).is_some() {
                    return Err(AssembleError::DuplicateLabel(*label));
                }
            }
            Item::Instr(_) => pc += 1,
        }
    }

    let mut code = Vec::with_capacity(pc);
    for instr in sequence.instructions() {
        code.push(instr.try_map(
            |label| {
                offsets
                    .get(&label)
                    .copied()
                    .ok_or(AssembleError::UndefinedLabel(label))
            },
            |body| assemble(body).map(Rc::new),
        )?);
    }
    Ok(Program::new(code))
}
