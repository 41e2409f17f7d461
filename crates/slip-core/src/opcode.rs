//! Slip opcode definitions.
//!
//! Every instruction is an opcode followed by 0-2 operands. Names follow
//! the listing format produced by the debug printer.

use std::fmt;

/// Bytecode opcodes for the Slip machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // =========================================================================
    // Loads and stores
    // =========================================================================
    /// Push a constant.
    Const,
    /// Push a local variable by lexical address.
    LVar,
    /// Store top of stack into a local (value stays on the stack).
    LSet,
    /// Push a global variable.
    GVar,
    /// Store top of stack into a global (value stays on the stack).
    GSet,
    /// Discard top of stack.
    Pop,

    // =========================================================================
    // Control
    // =========================================================================
    /// Unconditional jump.
    Jump,
    /// Pop and jump if true.
    TJump,
    /// Pop and jump if false.
    FJump,
    /// Push a return point.
    Save,
    /// Call the function on top of stack with N arguments.
    Call,
    /// Return the top of stack to the most recent return point.
    Ret,
    /// Call a primitive with N arguments.
    Prim,

    // =========================================================================
    // Closures
    // =========================================================================
    /// Push a closure over the current environment.
    Fn,
    /// Bind exactly N arguments in a new frame.
    Args,
    /// Bind N required arguments plus a rest list in a new frame.
    ArgsRest,
    /// Push the current continuation.
    Cc,
}

impl Op {
    /// Listing name of this opcode.
    pub fn name(self) -> &'static str {
        match self {
            Op::Const => "CONST",
            Op::LVar => "LVAR",
            Op::LSet => "LSET",
            Op::GVar => "GVAR",
            Op::GSet => "GSET",
            Op::Pop => "POP",
            Op::Jump => "JUMP",
            Op::TJump => "TJUMP",
            Op::FJump => "FJUMP",
            Op::Save => "SAVE",
            Op::Call => "CALL",
            Op::Ret => "RET",
            Op::Prim => "PRIM",
            Op::Fn => "FN",
            Op::Args => "ARGS",
            Op::ArgsRest => "ARG_",
            Op::Cc => "CC",
        }
    }

    /// Get number of operands for this opcode.
    pub fn operand_count(self) -> usize {
        match self {
            Op::Pop | Op::Ret | Op::Cc => 0,

            Op::Const
            | Op::GVar
            | Op::GSet
            | Op::Jump
            | Op::TJump
            | Op::FJump
            | Op::Save
            | Op::Call
            | Op::Fn
            | Op::Args
            | Op::ArgsRest => 1,

            Op::LVar | Op::LSet | Op::Prim => 2,
        }
    }

    /// Whether the single operand of this opcode is a jump target.
    pub fn is_jump(self) -> bool {
        matches!(self, Op::Jump | Op::TJump | Op::FJump | Op::Save)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_count() {
        assert_eq!(Op::Ret.operand_count(), 0);
        assert_eq!(Op::Const.operand_count(), 1);
        assert_eq!(Op::Call.operand_count(), 1);
        assert_eq!(Op::LVar.operand_count(), 2);
        assert_eq!(Op::Prim.operand_count(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Op::Const), "CONST");
        assert_eq!(format!("{}", Op::ArgsRest), "ARG_");
        assert_eq!(format!("{}", Op::Cc), "CC");
    }

    #[test]
    fn test_jumps() {
        assert!(Op::Save.is_jump());
        assert!(Op::FJump.is_jump());
        assert!(!Op::Call.is_jump());
    }
}
