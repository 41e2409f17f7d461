//! Slip VM - bytecode execution for the Slip Lisp dialect.
//!
//! This crate provides the virtual machine, which runs assembled programs,
//! and the standard primitive operations it calls through `PRIM`.

pub mod primitives;
pub mod vm;

pub use primitives::create_primitives;
pub use vm::{Vm, VmConfig};
