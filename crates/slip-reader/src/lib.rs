//! Slip reader - source text to symbolic data.
//!
//! This crate turns Lisp source into pairs, symbols, numbers, strings,
//! characters and arrays allocated on a [`slip_core::Heap`]. The whole text
//! is read as one list of top-level forms.
//!
//! # Example
//!
//! ```
//! use slip_core::Heap;
//! use slip_reader::parse;
//!
//! let mut heap = Heap::new();
//! let forms = parse(&mut heap, "(+ 1 2) 'x").unwrap();
//! assert_eq!(heap.serialize(&forms), "((+ 1 2) (QUOTE X))");
//! ```

pub mod reader;
pub mod stream;

pub use reader::{parse, ParseError, Reader};
pub use stream::{Position, Stream};
