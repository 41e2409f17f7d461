//! Slip - a small Lisp with a continuation-passing bytecode compiler.
//!
//! Source is read into symbolic data, compiled form by form into bytecode,
//! and run on a stack machine with first-class continuations. Macros are
//! ordinary closures run at compile time.
//!
//! # Example
//!
//! ```
//! use slip::eval;
//!
//! let result = eval("((lambda (x) (* x 2)) 21)").unwrap();
//! assert_eq!(result, "42");
//! ```

use std::rc::Rc;

use log::debug;
use thiserror::Error;

pub use slip_compiler as compiler;
pub use slip_core as data;
pub use slip_reader as reader;
pub use slip_vm as vm;

// Re-export commonly used types
pub use slip_compiler::{show, CompileError, Compiler};
pub use slip_core::{AssembleError, Heap, PrimitiveRegistry, RuntimeError, Sequence, Value};
pub use slip_reader::{parse, ParseError, Position};
pub use slip_vm::{create_primitives, Vm, VmConfig};

/// Definitions loaded into every session unless disabled.
pub const PRELUDE: &str = r#"
(set! call/cc (lambda (f) (f (c/c))))

(set! qq-expand
  (lambda (x)
    (if (consp x)
        (if (eq (car x) 'qq-unquote)
            (car (cdr x))
            (if (if (consp (car x)) (eq (car (car x)) 'qq-splice) nil)
                (list 'append (car (cdr (car x))) (qq-expand (cdr x)))
                (list 'cons (qq-expand (car x)) (qq-expand (cdr x)))))
        (list 'quote x))))

(defmacro quasiquote (x) (qq-expand x))
"#;

/// Error type for eval operations.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("assemble error: {0}")]
    Assemble(#[from] AssembleError),
}

/// Session configuration options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Load [`PRELUDE`] on creation.
    pub prelude: bool,
    pub vm: VmConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prelude: true,
            vm: VmConfig::default(),
        }
    }
}

/// A heap, primitive registry and machine shared across evaluations.
///
/// Globals and macros defined by one call to [`Session::eval`] are visible
/// to later calls.
pub struct Session {
    heap: Heap,
    primitives: Rc<PrimitiveRegistry>,
    vm: Vm,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self, EvalError> {
        let mut heap = Heap::new();
        let primitives = Rc::new(create_primitives(&mut heap));
        let vm = Vm::new(primitives.clone(), config.vm);
        let mut session = Self {
            heap,
            primitives,
            vm,
        };
        if config.prelude {
            session.eval(PRELUDE)?;
        }
        Ok(session)
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Read `text` into the list of its top-level forms.
    pub fn parse(&mut self, text: &str) -> Result<Value, ParseError> {
        parse(&mut self.heap, text)
    }

    /// Compile a list of top-level forms into one sequence.
    pub fn compile(&mut self, forms: &Value) -> Result<Sequence, CompileError> {
        Compiler::new(&mut self.heap, &self.primitives, &mut self.vm).compile_forms(forms)
    }

    /// Compile one top-level form.
    pub fn compile_form(&mut self, form: &Value) -> Result<Sequence, CompileError> {
        Compiler::new(&mut self.heap, &self.primitives, &mut self.vm).compile_form(form)
    }

    /// Render compiled code as a listing.
    pub fn show(&self, code: &Sequence) -> String {
        show(&self.heap, code)
    }

    /// Assemble and execute compiled code.
    pub fn run(&mut self, code: &Sequence) -> Result<Value, EvalError> {
        let program = slip_core::assemble(code)?;
        Ok(self.vm.execute(&mut self.heap, Rc::new(program))?)
    }

    /// Evaluate every form of `text` in order and return the last value.
    ///
    /// Each form is compiled and run before the next is compiled, so macros
    /// and globals defined by a form are available to the forms after it.
    pub fn eval(&mut self, text: &str) -> Result<Value, EvalError> {
        let forms = self.parse(text)?;
        let (forms, _) = self.heap.split_list(&forms);
        let mut result = Value::Nil;
        for form in &forms {
            let code = self.compile_form(form)?;
            debug!(
                "compiled {} ({} items)",
                self.heap.serialize(form),
                code.len()
            );
            result = self.run(&code)?;
        }
        Ok(result)
    }

    /// Compile every form of `text` without running it and return the
    /// listings, one per form.
    pub fn listings(&mut self, text: &str) -> Result<Vec<String>, EvalError> {
        let forms = self.parse(text)?;
        let (forms, _) = self.heap.split_list(&forms);
        let mut listings = Vec::with_capacity(forms.len());
        for form in &forms {
            let code = self.compile_form(form)?;
            listings.push(self.show(&code));
        }
        Ok(listings)
    }

    /// Render a value as reader syntax.
    pub fn serialize(&self, value: &Value) -> String {
        self.heap.serialize(value)
    }
}

/// Evaluate Slip source code in a fresh session and return the printed
/// result.
///
/// # Example
///
/// ```
/// use slip::eval;
///
/// let result = eval("(set! x 10) (list x (+ x 1))").unwrap();
/// assert_eq!(result, "(10 11)");
/// ```
pub fn eval(source: &str) -> Result<String, EvalError> {
    let mut session = Session::new(SessionConfig::default())?;
    let value = session.eval(source)?;
    Ok(session.serialize(&value))
}
