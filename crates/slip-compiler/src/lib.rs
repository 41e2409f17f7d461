//! Slip compiler - symbolic forms to bytecode.
//!
//! This crate provides the continuation-passing code generator, the
//! compile-time environment resolver, macro expansion (which runs macro code
//! on a [`slip_core::Machine`]) and the listing printer.

pub mod compiler;
pub mod env;
pub mod printer;

pub use compiler::{compile, CompileError, Compiler};
pub use env::{Address, Env, Frame};
pub use printer::show;
