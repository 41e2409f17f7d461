//! Continuation-passing code generator.
//!
//! Every form is compiled under two flags: `val` (the value is wanted on the
//! stack) and `more` (execution continues after the form; when false the
//! code must end by returning). Tail calls fall out of this directly: a call
//! with `more == false` jumps into the callee without saving a return point.

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use slip_core::{
    assemble, AssembleError, Heap, Instr, Instruction, Machine, PrimitiveRegistry, Program,
    RuntimeError, Sequence, Symbol, Value, LabelAllocator,
};
use thiserror::Error;

use crate::env::{Env, Frame};

/// Compilation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{form} expects {expected} arguments, got {found}")]
    Arity {
        form: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{form} requires a symbol, got {found}")]
    NotASymbol { form: &'static str, found: String },

    #[error("too many arguments: {0} passed to a lambda without parameters")]
    TooManyArguments(usize),

    #[error("improper argument list: {0}")]
    ImproperList(String),

    #[error("malformed parameter list: {0}")]
    MalformedParams(String),

    #[error("expansion of macro {name} failed: {source}")]
    Macro { name: String, source: RuntimeError },

    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Forms with dedicated compiler logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialForm {
    Quote,
    Progn,
    Set,
    If,
    CaptureContinuation,
    DefMacro,
    Lambda,
}

/// How the head of a list form is compiled.
enum Head {
    Special(SpecialForm),
    Macro(Symbol, Rc<Program>),
    Call,
}

/// Bytecode compiler for Slip forms.
///
/// The compiler holds the machine so that macro calls can be expanded in the
/// middle of a compilation.
pub struct Compiler<'a> {
    heap: &'a mut Heap,
    primitives: &'a PrimitiveRegistry,
    machine: &'a mut dyn Machine,
    labels: LabelAllocator,
    specials: HashMap<Symbol, SpecialForm>,
    t: Symbol,
    not: Symbol,
    lambda: Symbol,
}

impl<'a> Compiler<'a> {
    pub fn new(
        heap: &'a mut Heap,
        primitives: &'a PrimitiveRegistry,
        machine: &'a mut dyn Machine,
    ) -> Self {
        let specials: HashMap<Symbol, SpecialForm> = [
            ("QUOTE", SpecialForm::Quote),
            ("PROGN", SpecialForm::Progn),
            ("SET!", SpecialForm::Set),
            ("IF", SpecialForm::If),
            ("C/C", SpecialForm::CaptureContinuation),
            ("DEFMACRO", SpecialForm::DefMacro),
            ("LAMBDA", SpecialForm::Lambda),
        ]
        .into_iter()
        .map(|(name, form)| (heap.intern(name), form))
        .collect();
        let t = heap.intern("T");
        let not = heap.intern("NOT");
        let lambda = heap.intern("LAMBDA");
        Self {
            heap,
            primitives,
            machine,
            labels: LabelAllocator::new(),
            specials,
            t,
            not,
            lambda,
        }
    }

    /// Compile a list of top-level forms as one `PROGN` whose value is
    /// returned.
    pub fn compile_forms(&mut self, forms: &Value) -> Result<Sequence, CompileError> {
        let forms = self.proper_list(forms)?;
        self.compile_seq(&forms, Env::empty(), true, false)
    }

    /// Compile a single top-level form whose value is returned.
    pub fn compile_form(&mut self, form: &Value) -> Result<Sequence, CompileError> {
        self.compile(form, Env::empty(), true, false)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Compile `x` in `env`.
    pub fn compile(
        &mut self,
        x: &Value,
        env: Env<'_>,
        val: bool,
        more: bool,
    ) -> Result<Sequence, CompileError> {
        if self.heap.is_nullish(x) {
            return Ok(self.compile_const(Value::Nil, val, more));
        }
        match x {
            Value::Symbol(sym) if *sym == self.t => Ok(self.compile_const(Value::True, val, more)),
            Value::Symbol(sym) => Ok(self.compile_var(*sym, env, val, more)),
            Value::Pair(_) => self.compile_list_form(x, env, val, more),
            _ => Ok(self.compile_const(x.clone(), val, more)),
        }
    }

    fn compile_list_form(
        &mut self,
        x: &Value,
        env: Env<'_>,
        val: bool,
        more: bool,
    ) -> Result<Sequence, CompileError> {
        let items = self.proper_list(x)?;
        let Some((head, args)) = items.split_first() else {
            return Ok(self.compile_const(Value::Nil, val, more));
        };

        match self.classify(head) {
            Head::Special(SpecialForm::Quote) => {
                check_arity("QUOTE", args, 1, Some(1), "1")?;
                Ok(self.compile_const(args[0].clone(), val, more))
            }
            Head::Special(SpecialForm::Progn) => self.compile_seq(args, env, val, more),
            Head::Special(SpecialForm::Set) => {
                check_arity("SET!", args, 2, Some(2), "2")?;
                let target = self.symbol_operand("SET!", &args[0])?;
                let mut code = self.compile(&args[1], env, true, true)?;
                code.push(match env.find(target) {
                    Some(addr) => Instr::LSet {
                        frame: addr.frame,
                        slot: addr.slot,
                    },
                    None => Instr::GSet(target),
                });
                Ok(finish(code, val, more))
            }
            Head::Special(SpecialForm::If) => {
                check_arity("IF", args, 2, Some(3), "2 or 3")?;
                let alternative = args.get(2).cloned().unwrap_or(Value::Nil);
                self.compile_if(&args[0], &args[1], &alternative, env, val, more)
            }
            Head::Special(SpecialForm::CaptureContinuation) => {
                check_arity("C/C", args, 0, Some(0), "0")?;
                if !val {
                    return Ok(Sequence::new());
                }
                Ok(ret_unless(Sequence::from(Instr::Cc), more))
            }
            Head::Special(SpecialForm::DefMacro) => self.compile_defmacro(args, val, more),
            Head::Special(SpecialForm::Lambda) => {
                if !val {
                    return Ok(Sequence::new());
                }
                let params = args.first().cloned().unwrap_or(Value::Nil);
                let body = args.get(1..).unwrap_or(&[]);
                let closure = self.compile_lambda(&params, body, env)?;
                Ok(ret_unless(Sequence::from(closure), more))
            }
            Head::Macro(name, program) => self.expand_macro(name, &program, args, env, val, more),
            Head::Call => self.compile_call(head, args, env, val, more),
        }
    }

    /// Resolve a list head by symbol identity. Built-in forms take
    /// precedence over macros.
    fn classify(&self, head: &Value) -> Head {
        let Value::Symbol(sym) = head else {
            return Head::Call;
        };
        if let Some(form) = self.specials.get(sym) {
            return Head::Special(*form);
        }
        match self.heap.macro_for(*sym) {
            Some(program) => Head::Macro(*sym, program),
            None => Head::Call,
        }
    }

    // =========================================================================
    // Constants, variables and sequences
    // =========================================================================

    fn compile_const(&self, x: Value, val: bool, more: bool) -> Sequence {
        if !val {
            return Sequence::new();
        }
        ret_unless(Sequence::from(Instr::Const(x)), more)
    }

    fn compile_var(&self, sym: Symbol, env: Env<'_>, val: bool, more: bool) -> Sequence {
        if !val {
            return Sequence::new();
        }
        let instr = match env.find(sym) {
            Some(addr) => Instr::LVar {
                frame: addr.frame,
                slot: addr.slot,
            },
            None => Instr::GVar(sym),
        };
        ret_unless(Sequence::from(instr), more)
    }

    /// Compile a body: all but the last form for effect, the last with the
    /// caller's flags.
    fn compile_seq(
        &mut self,
        exps: &[Value],
        env: Env<'_>,
        val: bool,
        more: bool,
    ) -> Result<Sequence, CompileError> {
        let Some((last, init)) = exps.split_last() else {
            return Ok(self.compile_const(Value::Nil, val, more));
        };
        let mut code = Sequence::new();
        for x in init {
            code.append(self.compile(x, env, false, true)?);
        }
        code.append(self.compile(last, env, val, more)?);
        Ok(code)
    }

    /// Push the value of each expression, left to right.
    fn compile_args(&mut self, exps: &[Value], env: Env<'_>) -> Result<Sequence, CompileError> {
        let mut code = Sequence::new();
        for x in exps {
            code.append(self.compile(x, env, true, true)?);
        }
        Ok(code)
    }

    // =========================================================================
    // Conditionals
    // =========================================================================

    fn compile_if(
        &mut self,
        pred: &Value,
        then: &Value,
        alternative: &Value,
        env: Env<'_>,
        val: bool,
        more: bool,
    ) -> Result<Sequence, CompileError> {
        if self.heap.is_nullish(pred) {
            return self.compile(alternative, env, val, more);
        }
        if pred.is_literal() || pred.is_symbol(self.t) {
            return self.compile(then, env, val, more);
        }
        if let Some(negated) = self.negation(pred) {
            return self.compile_if(&negated, alternative, then, env, val, more);
        }

        let mut code = self.compile(pred, env, true, true)?;
        let then_code = self.compile(then, env, val, more)?;
        let else_code = self.compile(alternative, env, val, more)?;

        if then_code.is_empty() {
            let join = self.labels.next_label();
            code.push(Instr::TJump(join));
            code.append(else_code);
            code.label(join);
            return Ok(ret_unless(code, more));
        }
        if else_code.is_empty() {
            let join = self.labels.next_label();
            code.push(Instr::FJump(join));
            code.append(then_code);
            code.label(join);
            return Ok(ret_unless(code, more));
        }

        let otherwise = self.labels.next_label();
        code.push(Instr::FJump(otherwise));
        code.append(then_code);
        if more {
            let join = self.labels.next_label();
            code.push(Instr::Jump(join));
            code.label(otherwise);
            code.append(else_code);
            code.label(join);
        } else {
            code.label(otherwise);
            code.append(else_code);
        }
        Ok(code)
    }

    /// The operand of a `(NOT x)` form.
    fn negation(&self, pred: &Value) -> Option<Value> {
        if !pred.is_pair() {
            return None;
        }
        match self.heap.list_to_vec(pred)?.as_slice() {
            [head, operand] if head.is_symbol(self.not) => Some(operand.clone()),
            _ => None,
        }
    }

    // =========================================================================
    // Calls and closures
    // =========================================================================

    fn compile_call(
        &mut self,
        f: &Value,
        args: &[Value],
        env: Env<'_>,
        val: bool,
        more: bool,
    ) -> Result<Sequence, CompileError> {
        if let Value::Symbol(sym) = f {
            if self.primitives.contains(*sym) && env.find(*sym).is_none() {
                if !val && !self.primitives.has_side_effect(*sym) {
                    return self.compile_seq(args, env, false, more);
                }
                let mut code = self.compile_args(args, env)?;
                code.push(Instr::Prim(*sym, args.len()));
                return Ok(finish(code, val, more));
            }
        }

        if let Some(body) = self.nullary_lambda(f) {
            if !args.is_empty() {
                return Err(CompileError::TooManyArguments(args.len()));
            }
            return self.compile_seq(&body, env, val, more);
        }

        if more {
            let k = self.labels.next_label();
            let mut code = Sequence::from(Instr::Save(k));
            code.append(self.compile_args(args, env)?);
            code.append(self.compile(f, env, true, true)?);
            code.push(Instr::Call(args.len()));
            code.label(k);
            if !val {
                code.push(Instr::Pop);
            }
            return Ok(code);
        }

        let mut code = self.compile_args(args, env)?;
        code.append(self.compile(f, env, true, true)?);
        code.push(Instr::Call(args.len()));
        Ok(code)
    }

    /// Body of a literal `(LAMBDA () ...)` head.
    fn nullary_lambda(&self, f: &Value) -> Option<Vec<Value>> {
        if !f.is_pair() {
            return None;
        }
        let items = self.heap.list_to_vec(f)?;
        let (head, rest) = items.split_first()?;
        if !head.is_symbol(self.lambda) {
            return None;
        }
        match rest.split_first() {
            None => Some(Vec::new()),
            Some((params, body)) if self.heap.is_nullish(params) => Some(body.to_vec()),
            Some(_) => None,
        }
    }

    /// Compile a closure literal.
    ///
    /// A symbol parameter list binds every argument as a list; a dotted list
    /// binds the required parameters followed by the rest list.
    fn compile_lambda(
        &mut self,
        params: &Value,
        body: &[Value],
        env: Env<'_>,
    ) -> Result<Instruction, CompileError> {
        let (symbols, entry) = match params {
            Value::Symbol(sym) if !self.heap.is_nullish(params) => (vec![*sym], Instr::ArgsRest(0)),
            _ => {
                let (items, tail) = self.heap.split_list(params);
                let mut symbols = Vec::with_capacity(items.len() + 1);
                for item in &items {
                    match item.as_symbol() {
                        Some(sym) if !self.heap.is_nullish(item) => symbols.push(sym),
                        _ => return Err(self.malformed(params)),
                    }
                }
                let required = symbols.len();
                match tail {
                    Value::Nil => (symbols, Instr::Args(required)),
                    Value::Symbol(rest) => {
                        symbols.push(rest);
                        (symbols, Instr::ArgsRest(required))
                    }
                    _ => return Err(self.malformed(params)),
                }
            }
        };

        let frame = Frame::new(symbols, env);
        let mut code = Sequence::from(entry);
        code.append(self.compile_seq(body, frame.env(), true, false)?);
        Ok(Instr::Fn(code))
    }

    // =========================================================================
    // Macros
    // =========================================================================

    fn compile_defmacro(
        &mut self,
        args: &[Value],
        val: bool,
        more: bool,
    ) -> Result<Sequence, CompileError> {
        check_arity("DEFMACRO", args, 1, None, "at least 1")?;
        let name = self.symbol_operand("DEFMACRO", &args[0])?;
        let params = args.get(1).cloned().unwrap_or(Value::Nil);
        let body = args.get(2..).unwrap_or(&[]);

        // Macros run on a fresh machine run with no enclosing frames.
        let closure = self.compile_lambda(&params, body, Env::empty())?;
        let program = assemble(&Sequence::from(closure))?;
        self.heap.set_macro(name, Rc::new(program));
        debug!("defined macro {}", self.heap.symbol_name(name));

        let mut code = Sequence::new();
        if val {
            code.push(Instr::Const(Value::Symbol(name)));
        }
        Ok(ret_unless(code, more))
    }

    /// Run the macro on the unevaluated arguments and compile the resulting
    /// form in place of the call.
    fn expand_macro(
        &mut self,
        name: Symbol,
        macro_code: &Program,
        args: &[Value],
        env: Env<'_>,
        val: bool,
        more: bool,
    ) -> Result<Sequence, CompileError> {
        let mut quoted = Sequence::new();
        for arg in args {
            quoted.push(Instr::Const(arg.clone()));
        }
        let mut program = assemble(&quoted)?;
        program.append(macro_code);
        program.append(&assemble(&Sequence::from(Instr::Call(args.len())))?);

        let expansion = self
            .machine
            .run(&mut *self.heap, Rc::new(program))
            .map_err(|source| CompileError::Macro {
                name: self.heap.symbol_name(name).to_string(),
                source,
            })?;
        debug!(
            "expanded macro {} into {}",
            self.heap.symbol_name(name),
            self.heap.serialize(&expansion)
        );
        self.compile(&expansion, env, val, more)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn proper_list(&self, x: &Value) -> Result<Vec<Value>, CompileError> {
        self.heap
            .list_to_vec(x)
            .ok_or_else(|| CompileError::ImproperList(self.heap.serialize(x)))
    }

    fn symbol_operand(&self, form: &'static str, x: &Value) -> Result<Symbol, CompileError> {
        match x.as_symbol() {
            Some(sym) if !self.heap.is_nullish(x) => Ok(sym),
            _ => Err(CompileError::NotASymbol {
                form,
                found: self.heap.serialize(x),
            }),
        }
    }

    fn malformed(&self, params: &Value) -> CompileError {
        CompileError::MalformedParams(self.heap.serialize(params))
    }
}

fn check_arity(
    form: &'static str,
    args: &[Value],
    min: usize,
    max: Option<usize>,
    expected: &'static str,
) -> Result<(), CompileError> {
    let found = args.len();
    if found < min || max.is_some_and(|max| found > max) {
        return Err(CompileError::Arity {
            form,
            expected,
            found,
        });
    }
    Ok(())
}

/// Append `RET` when nothing follows.
fn ret_unless(mut code: Sequence, more: bool) -> Sequence {
    if !more {
        code.push(Instr::Ret);
    }
    code
}

/// Drop an unwanted value, then return if nothing follows.
fn finish(mut code: Sequence, val: bool, more: bool) -> Sequence {
    if !val {
        code.push(Instr::Pop);
    }
    ret_unless(code, more)
}

/// Compile a list of top-level forms.
pub fn compile(
    heap: &mut Heap,
    primitives: &PrimitiveRegistry,
    machine: &mut dyn Machine,
    forms: &Value,
) -> Result<Sequence, CompileError> {
    Compiler::new(heap, primitives, machine).compile_forms(forms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::show;
    use slip_core::Op;
    use slip_reader::parse;
    use slip_vm::{create_primitives, Vm, VmConfig};

    struct Fixture {
        heap: Heap,
        primitives: Rc<PrimitiveRegistry>,
        vm: Vm,
    }

    impl Fixture {
        fn new() -> Self {
            let mut heap = Heap::new();
            let primitives = Rc::new(create_primitives(&mut heap));
            let vm = Vm::new(primitives.clone(), VmConfig::default());
            Self {
                heap,
                primitives,
                vm,
            }
        }

        fn forms(&mut self, source: &str) -> Vec<Value> {
            let forms = parse(&mut self.heap, source).expect("parse failed");
            self.heap.list_to_vec(&forms).expect("proper list")
        }

        /// Compile every form of `source` in order and return the code of
        /// the last one, compiled with the given flags.
        fn compile_last(&mut self, source: &str, val: bool, more: bool) -> Result<Sequence, CompileError> {
            let forms = self.forms(source);
            let (last, init) = forms.split_last().expect("at least one form");
            let mut compiler = Compiler::new(&mut self.heap, &self.primitives, &mut self.vm);
            for form in init {
                compiler.compile_form(form)?;
            }
            compiler.compile(last, Env::empty(), val, more)
        }

        fn compile_all(&mut self, source: &str) -> Result<Sequence, CompileError> {
            let forms = parse(&mut self.heap, source).expect("parse failed");
            compile(&mut self.heap, &self.primitives, &mut self.vm, &forms)
        }
    }

    fn listing(source: &str) -> String {
        let mut fx = Fixture::new();
        let code = fx.compile_all(source).expect("compile failed");
        show(&fx.heap, &code)
    }

    fn ops(source: &str, val: bool, more: bool) -> Vec<Op> {
        let mut fx = Fixture::new();
        fx.compile_last(source, val, more).expect("compile failed").ops()
    }

    fn compile_err(source: &str) -> CompileError {
        let mut fx = Fixture::new();
        fx.compile_all(source).expect_err("compile should fail")
    }

    #[test]
    fn test_constants() {
        assert_eq!(ops("42", true, false), vec![Op::Const, Op::Ret]);
        assert_eq!(ops("42", true, true), vec![Op::Const]);
        assert_eq!(ops("42", false, true), vec![]);
        assert_eq!(ops("\"s\"", true, true), vec![Op::Const]);
    }

    #[test]
    fn test_t_and_nil() {
        let mut fx = Fixture::new();
        let code = fx.compile_last("t", true, true).expect("compile");
        assert_eq!(code, Sequence::from(Instr::Const(Value::True)));
        let code = fx.compile_last("nil", true, true).expect("compile");
        assert_eq!(code, Sequence::from(Instr::Const(Value::Nil)));
        let code = fx.compile_last("()", true, true).expect("compile");
        assert_eq!(code, Sequence::from(Instr::Const(Value::Nil)));
    }

    #[test]
    fn test_global_variable() {
        assert_eq!(listing("x"), "        GVAR    X\n        RET");
    }

    #[test]
    fn test_primitive_call() {
        assert_eq!(
            listing("(+ 1 2)"),
            "        CONST   1\n        CONST   2\n        PRIM    +       2\n        RET"
        );
    }

    #[test]
    fn test_pure_primitive_for_effect_is_empty() {
        assert!(ops("(+ 1 2)", false, true).is_empty());
        assert_eq!(ops("(+ 1 (f))", false, true), vec![Op::Save, Op::GVar, Op::Call, Op::Pop]);
    }

    #[test]
    fn test_side_effecting_primitive_for_effect() {
        assert_eq!(
            ops("(set-car! x 1)", false, true),
            vec![Op::GVar, Op::Const, Op::Prim, Op::Pop]
        );
    }

    #[test]
    fn test_shadowed_primitive_is_called() {
        assert_eq!(
            listing("(lambda (car) (car 1))"),
            "        FN\n                ARGS    1\n                CONST   1\n                LVAR    0       0\n                CALL    1\n        RET"
        );
    }

    #[test]
    fn test_tail_call_has_no_save() {
        assert_eq!(ops("(f 1)", true, false), vec![Op::Const, Op::GVar, Op::Call]);
    }

    #[test]
    fn test_continuing_call_saves_once() {
        let mut fx = Fixture::new();
        let code = fx.compile_last("(f 1)", true, true).expect("compile");
        assert_eq!(code.ops(), vec![Op::Save, Op::Const, Op::GVar, Op::Call]);
        let labels: Vec<_> = code
            .items()
            .iter()
            .filter(|item| matches!(item, slip_core::Item::Label(_)))
            .collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(ops("(f 1)", false, true).last(), Some(&Op::Pop));
    }

    #[test]
    fn test_tail_self_call_in_closure() {
        let out = listing("(set! loop (lambda (n) (loop n)))");
        assert!(!out.contains("SAVE"), "{}", out);
        let out = listing("(set! loop (lambda (n) (loop n) n))");
        assert_eq!(out.matches("SAVE").count(), 1, "{}", out);
    }

    #[test]
    fn test_set() {
        assert_eq!(ops("(set! x 1)", true, false), vec![Op::Const, Op::GSet, Op::Ret]);
        assert_eq!(ops("(set! x 1)", false, true), vec![Op::Const, Op::GSet, Op::Pop]);
        assert_eq!(
            listing("(lambda (x) (set! x 2))"),
            "        FN\n                ARGS    1\n                CONST   2\n                LSET    0       0\n                RET\n        RET"
        );
    }

    #[test]
    fn test_progn() {
        assert_eq!(ops("(progn)", true, false), vec![Op::Const, Op::Ret]);
        assert_eq!(ops("(progn 1 x 2)", true, false), vec![Op::Const, Op::Ret]);
        assert_eq!(ops("(progn (f) 2)", true, false), vec![
            Op::Save,
            Op::GVar,
            Op::Call,
            Op::Pop,
            Op::Const,
            Op::Ret
        ]);
    }

    #[test]
    fn test_if_both_branches() {
        assert_eq!(
            listing("(if x 1 2)"),
            "        GVAR    X\n        FJUMP   L1\n        CONST   1\n        RET\nL1:     CONST   2\n        RET"
        );
        assert_eq!(ops("(if x 1 2)", true, true), vec![
            Op::GVar,
            Op::FJump,
            Op::Const,
            Op::Jump,
            Op::Const
        ]);
    }

    #[test]
    fn test_if_constant_predicates() {
        assert_eq!(ops("(if nil 1 (f))", true, false), vec![Op::GVar, Op::Call]);
        assert_eq!(ops("(if () 1 2)", true, true), vec![Op::Const]);
        assert_eq!(ops("(if t (f) 2)", true, false), vec![Op::GVar, Op::Call]);
        assert_eq!(ops("(if 0 (f) 2)", true, false), vec![Op::GVar, Op::Call]);
        assert_eq!(ops("(if \"s\" (f) 2)", true, false), vec![Op::GVar, Op::Call]);
    }

    #[test]
    fn test_if_not_swaps_branches() {
        let mut a = Fixture::new();
        let swapped = a.compile_last("(if (not x) a b)", true, false).expect("compile");
        let mut b = Fixture::new();
        let plain = b.compile_last("(if x b a)", true, false).expect("compile");
        assert_eq!(swapped, plain);
    }

    #[test]
    fn test_if_empty_else_for_effect() {
        assert_eq!(
            listing("(progn (if x (set! y 1)) 2)"),
            "        GVAR    X\n        FJUMP   L1\n        CONST   1\n        GSET    Y\n        POP\nL1:     CONST   2\n        RET"
        );
    }

    #[test]
    fn test_if_empty_then_for_effect() {
        assert_eq!(ops("(if x 1 (set! y 2))", false, true), vec![
            Op::GVar,
            Op::TJump,
            Op::Const,
            Op::GSet,
            Op::Pop
        ]);
    }

    #[test]
    fn test_capture_continuation() {
        assert_eq!(ops("(c/c)", true, false), vec![Op::Cc, Op::Ret]);
        assert_eq!(ops("(c/c)", true, true), vec![Op::Cc]);
        assert!(ops("(c/c)", false, true).is_empty());
    }

    #[test]
    fn test_lambda_params() {
        assert_eq!(
            listing("(lambda args args)"),
            "        FN\n                ARG_    0\n                LVAR    0       0\n                RET\n        RET"
        );
        assert_eq!(
            listing("(lambda (a . rest) rest)"),
            "        FN\n                ARG_    1\n                LVAR    0       1\n                RET\n        RET"
        );
        assert!(ops("(lambda (x) x)", false, true).is_empty());
    }

    #[test]
    fn test_nested_closures_shadow() {
        assert_eq!(
            listing("(lambda (x y) (lambda (x) (f x y)))"),
            concat!(
                "        FN\n",
                "                ARGS    2\n",
                "                FN\n",
                "                        ARGS    1\n",
                "                        LVAR    0       0\n",
                "                        LVAR    1       1\n",
                "                        GVAR    F\n",
                "                        CALL    2\n",
                "                RET\n",
                "        RET"
            )
        );
    }

    #[test]
    fn test_nullary_lambda_head_is_inlined() {
        assert_eq!(ops("((lambda () (f) 2))", true, false), vec![
            Op::Save,
            Op::GVar,
            Op::Call,
            Op::Pop,
            Op::Const,
            Op::Ret
        ]);
        assert_eq!(
            compile_err("((lambda () 1) 2)"),
            CompileError::TooManyArguments(1)
        );
    }

    #[test]
    fn test_defmacro_value() {
        let mut fx = Fixture::new();
        let code = fx.compile_last("(defmacro m (x) x)", true, false).expect("compile");
        let m = fx.heap.intern("m");
        assert!(fx.heap.macro_for(m).is_some());
        let mut expected = Sequence::from(Instr::Const(Value::Symbol(m)));
        expected.push(Instr::Ret);
        assert_eq!(code, expected);
        assert!(fx.compile_last("(defmacro n () 1)", false, true).expect("compile").is_empty());
    }

    #[test]
    fn test_macro_expands_like_literal() {
        let mut fx = Fixture::new();
        let expanded = fx
            .compile_last("(defmacro m () '(quote 42)) (m)", true, false)
            .expect("compile");
        let literal = fx.compile_last("42", true, false).expect("compile");
        assert_eq!(expanded, literal);
    }

    #[test]
    fn test_macro_receives_unevaluated_args() {
        let mut fx = Fixture::new();
        let code = fx
            .compile_last("(defmacro swap (a b) (list b a)) (swap 1 f)", true, false)
            .expect("compile");
        assert_eq!(code.ops(), vec![Op::Const, Op::GVar, Op::Call]);
    }

    #[test]
    fn test_macro_expansion_keeps_env() {
        let out = listing("(defmacro id (x) x) (lambda (y) (id y))");
        assert!(out.contains("LVAR    0       0"), "{}", out);
    }

    #[test]
    fn test_macro_failure() {
        let err = compile_err("(defmacro bad () (car 5)) (bad)");
        assert!(matches!(err, CompileError::Macro { ref name, .. } if name == "BAD"));
    }

    #[test]
    fn test_special_forms_win_over_macros() {
        let mut fx = Fixture::new();
        let code = fx
            .compile_last("(defmacro if (a b c) 0) (if x 1 2)", true, true)
            .expect("compile");
        assert_eq!(code.ops(), vec![Op::GVar, Op::FJump, Op::Const, Op::Jump, Op::Const]);
    }

    #[test]
    fn test_arity_errors() {
        assert!(matches!(compile_err("(quote)"), CompileError::Arity { form: "QUOTE", .. }));
        assert!(matches!(compile_err("(quote a b)"), CompileError::Arity { form: "QUOTE", found: 2, .. }));
        assert!(matches!(compile_err("(if x)"), CompileError::Arity { form: "IF", .. }));
        assert!(matches!(compile_err("(set! x)"), CompileError::Arity { form: "SET!", .. }));
        assert!(matches!(compile_err("(c/c 1)"), CompileError::Arity { form: "C/C", .. }));
        assert!(matches!(compile_err("(defmacro)"), CompileError::Arity { form: "DEFMACRO", .. }));
    }

    #[test]
    fn test_symbol_errors() {
        assert_eq!(compile_err("(set! 1 2)"), CompileError::NotASymbol {
            form: "SET!",
            found: "1".to_string()
        });
        assert!(matches!(compile_err("(defmacro (m) x)"), CompileError::NotASymbol { form: "DEFMACRO", .. }));
    }

    #[test]
    fn test_malformed_forms() {
        assert!(matches!(compile_err("(f . x)"), CompileError::ImproperList(_)));
        assert!(matches!(compile_err("(lambda (1) 1)"), CompileError::MalformedParams(_)));
        assert!(matches!(compile_err("(lambda (a . 2) 1)"), CompileError::MalformedParams(_)));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            compile_err("(if x)").to_string(),
            "IF expects 2 or 3 arguments, got 1"
        );
    }

    #[test]
    fn test_top_level_is_progn() {
        let mut fx = Fixture::new();
        let all = fx.compile_all("1 2").expect("compile");
        assert_eq!(all.ops(), vec![Op::Const, Op::Ret]);
        let empty = fx.compile_all("").expect("compile");
        assert_eq!(empty.ops(), vec![Op::Const, Op::Ret]);
    }
}
