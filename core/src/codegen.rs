/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * Function Body Compiler for the Tern Language.
 *
 * Syntax-directed, single-pass translation of one expression tree into a
 * WASM instruction stream. Every value on the operand stack is an f64
 * carrying a NaN-boxed Tern value (value.rs); first-class functions are
 * tagged table indices dispatched through call_indirect.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use crate::ast::Expr;
use crate::encoder::{EncodeError, WasmWriter};
use crate::module::{FunctionDef, ModuleAssembler};
use crate::scope::ScopeStack;
use crate::value;
use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("duplicate local `{0}` in the same scope")]
    DuplicateLocal(String),
    #[error("undeclared local `{0}`")]
    UndeclaredLocal(String),
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    #[error("`{op}` expects {expected} argument(s), got {got}")]
    WrongArity {
        op: String,
        expected: usize,
        got: usize,
    },
    #[error("malformed `{form}` form: {message}")]
    MalformedForm {
        form: &'static str,
        message: String,
    },
    #[error("duplicate export `{0}`")]
    DuplicateExport(String),
    #[error(transparent)]
    Encoding(#[from] EncodeError),
}

// =============================================================================
// Instruction Opcodes
// =============================================================================

/// The slice of the WASM instruction set and type grammar this backend
/// emits.
pub(crate) mod op {
    // control
    pub const IF: u8 = 0x04;
    pub const ELSE: u8 = 0x05;
    pub const END: u8 = 0x0B;
    pub const CALL_INDIRECT: u8 = 0x11;
    // parametric
    pub const DROP: u8 = 0x1A;
    // variables
    pub const LOCAL_GET: u8 = 0x20;
    pub const LOCAL_SET: u8 = 0x21;
    pub const LOCAL_TEE: u8 = 0x22;
    // constants
    pub const I32_CONST: u8 = 0x41;
    pub const I64_CONST: u8 = 0x42;
    pub const F64_CONST: u8 = 0x44;
    // integer tests and logic
    pub const I32_EQZ: u8 = 0x45;
    pub const I32_OR: u8 = 0x72;
    pub const I64_EQ: u8 = 0x51;
    pub const I64_ADD: u8 = 0x7C;
    pub const I64_AND: u8 = 0x83;
    pub const I64_OR: u8 = 0x84;
    pub const I64_SHL: u8 = 0x86;
    pub const I64_SHR_U: u8 = 0x88;
    // f64 comparisons
    pub const F64_EQ: u8 = 0x61;
    pub const F64_NE: u8 = 0x62;
    pub const F64_LT: u8 = 0x63;
    pub const F64_GT: u8 = 0x64;
    pub const F64_LE: u8 = 0x65;
    pub const F64_GE: u8 = 0x66;
    // f64 arithmetic
    pub const F64_ABS: u8 = 0x99;
    pub const F64_NEG: u8 = 0x9A;
    pub const F64_CEIL: u8 = 0x9B;
    pub const F64_FLOOR: u8 = 0x9C;
    pub const F64_TRUNC: u8 = 0x9D;
    pub const F64_NEAREST: u8 = 0x9E;
    pub const F64_SQRT: u8 = 0x9F;
    pub const F64_ADD: u8 = 0xA0;
    pub const F64_SUB: u8 = 0xA1;
    pub const F64_MUL: u8 = 0xA2;
    pub const F64_DIV: u8 = 0xA3;
    pub const F64_MIN: u8 = 0xA4;
    pub const F64_MAX: u8 = 0xA5;
    pub const F64_COPYSIGN: u8 = 0xA6;
    // conversions
    pub const I32_WRAP_I64: u8 = 0xA7;
    pub const I64_EXTEND_I32_U: u8 = 0xAD;
    pub const I64_REINTERPRET_F64: u8 = 0xBD;
    pub const F64_REINTERPRET_I64: u8 = 0xBF;
    // type grammar bytes (shared with module emission)
    pub const TYPE_FUNC: u8 = 0x60;
    pub const TYPE_FUNCREF: u8 = 0x70;
    pub const TYPE_F64: u8 = 0x7C;
    pub const TYPE_I64: u8 = 0x7E;
}

// =============================================================================
// Builtin Operator Table
// =============================================================================

/// Codegen strategy for a builtin once its arguments are on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    /// One typed f64 instruction, result already a valid tagged value.
    Arith(u8),
    /// One f64 comparison producing an i32, wrapped into a tagged Boolean.
    Compare(u8),
    /// IEEE equality against 0.0.
    ZeroPred,
    /// Quiet-NaN bit test.
    NanPred,
    /// Raw bit-pattern equality. Unlike `eq?`, this distinguishes 0 from
    /// -0 and makes NaN identical to itself.
    IdPred,
    /// Truthiness test, inverted.
    Not,
}

#[derive(Debug, Clone, Copy)]
struct Builtin {
    arity: usize,
    kind: OpKind,
}

impl Builtin {
    const fn new(arity: usize, kind: OpKind) -> Self {
        Builtin { arity, kind }
    }
}

lazy_static! {
    /// The enumerated operator set: name → fixed arity + strategy.
    static ref BUILTINS: HashMap<&'static str, Builtin> = {
        let mut m = HashMap::new();
        m.insert("add", Builtin::new(2, OpKind::Arith(op::F64_ADD)));
        m.insert("sub", Builtin::new(2, OpKind::Arith(op::F64_SUB)));
        m.insert("mul", Builtin::new(2, OpKind::Arith(op::F64_MUL)));
        m.insert("div", Builtin::new(2, OpKind::Arith(op::F64_DIV)));
        m.insert("min", Builtin::new(2, OpKind::Arith(op::F64_MIN)));
        m.insert("max", Builtin::new(2, OpKind::Arith(op::F64_MAX)));
        m.insert("copysign", Builtin::new(2, OpKind::Arith(op::F64_COPYSIGN)));
        m.insert("abs", Builtin::new(1, OpKind::Arith(op::F64_ABS)));
        m.insert("neg", Builtin::new(1, OpKind::Arith(op::F64_NEG)));
        m.insert("sqrt", Builtin::new(1, OpKind::Arith(op::F64_SQRT)));
        m.insert("floor", Builtin::new(1, OpKind::Arith(op::F64_FLOOR)));
        m.insert("ceil", Builtin::new(1, OpKind::Arith(op::F64_CEIL)));
        m.insert("trunc", Builtin::new(1, OpKind::Arith(op::F64_TRUNC)));
        m.insert("nearest", Builtin::new(1, OpKind::Arith(op::F64_NEAREST)));
        m.insert("eq?", Builtin::new(2, OpKind::Compare(op::F64_EQ)));
        m.insert("ne?", Builtin::new(2, OpKind::Compare(op::F64_NE)));
        m.insert("lt?", Builtin::new(2, OpKind::Compare(op::F64_LT)));
        m.insert("gt?", Builtin::new(2, OpKind::Compare(op::F64_GT)));
        m.insert("le?", Builtin::new(2, OpKind::Compare(op::F64_LE)));
        m.insert("ge?", Builtin::new(2, OpKind::Compare(op::F64_GE)));
        m.insert("zero?", Builtin::new(1, OpKind::ZeroPred));
        m.insert("nan?", Builtin::new(1, OpKind::NanPred));
        m.insert("id?", Builtin::new(2, OpKind::IdPred));
        m.insert("not", Builtin::new(1, OpKind::Not));
        m
    };
}

// =============================================================================
// Function Body Compiler
// =============================================================================

/// Output of compiling one function body: the raw instruction bytes
/// (without the trailing `end`) and the peak slot usage.
#[derive(Debug, Clone)]
pub(crate) struct CompiledBody {
    pub code: Vec<u8>,
    pub max_slots: u32,
}

/// Compiles a single function body. Holds its own byte writer and scope
/// chain, seeded with one slot per formal parameter; nested function
/// literals are handed to the assembler's work queue rather than compiled
/// recursively.
pub(crate) struct FuncCompiler<'a> {
    asm: &'a mut ModuleAssembler,
    code: WasmWriter,
    scope: ScopeStack,
    arity: u32,
}

impl<'a> FuncCompiler<'a> {
    pub fn new(asm: &'a mut ModuleAssembler, params: &[String]) -> Result<Self, CompileError> {
        let mut scope = ScopeStack::new();
        for param in params {
            scope.declare(param)?;
        }
        Ok(FuncCompiler {
            asm,
            code: WasmWriter::new(),
            scope,
            arity: params.len() as u32,
        })
    }

    pub fn compile(mut self, body: &Expr) -> Result<CompiledBody, CompileError> {
        self.compile_expr(body)?;
        Ok(CompiledBody {
            code: self.code.finish(),
            max_slots: self.scope.max_slots(),
        })
    }

    /// Locals are laid out parameters, i64 scratch, f64 slots; variable
    /// slots past the parameters sit one local index above their slot id.
    fn local_index(&self, slot: u32) -> u32 {
        if slot < self.arity {
            slot
        } else {
            slot + 1
        }
    }

    fn scratch_index(&self) -> u32 {
        self.arity
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Number(n) => {
                self.emit_f64_const(*n);
                Ok(())
            }
            Expr::Boolean(true) => {
                self.emit_bits_const(value::TAG_TRUE);
                Ok(())
            }
            Expr::Boolean(false) => {
                self.emit_bits_const(value::TAG_FALSE);
                Ok(())
            }
            Expr::Nil => {
                self.emit_bits_const(value::TAG_NIL);
                Ok(())
            }
            Expr::Symbol(name) => {
                let slot = self.scope.resolve(name)?;
                let index = self.local_index(slot);
                self.code.push_byte(op::LOCAL_GET);
                self.code.push_u32(index);
                Ok(())
            }
            Expr::List(items) => self.compile_list(items),
        }
    }

    fn compile_list(&mut self, items: &[Expr]) -> Result<(), CompileError> {
        let (head, args) = match items.split_first() {
            Some(split) => split,
            None => {
                return Err(CompileError::MalformedForm {
                    form: "()",
                    message: "empty application".to_string(),
                })
            }
        };
        if let Expr::Symbol(name) = head {
            match name.as_str() {
                "if" => return self.compile_if(args),
                "local" => return self.compile_local(args),
                "set!" => return self.compile_set(args),
                "do" => return self.compile_do(args),
                "function" => return self.compile_function(args),
                _ => {}
            }
            if let Some(builtin) = BUILTINS.get(name.as_str()).copied() {
                return self.compile_builtin(name, builtin, args);
            }
            // Not a form or builtin: the head must be a declared variable
            // holding a function reference.
            if self.scope.resolve(name).is_err() {
                return Err(CompileError::UnknownOperator(name.clone()));
            }
        }
        self.compile_apply(head, args)
    }

    // =========================================================================
    // Special Forms
    // =========================================================================

    /// `(if cond then [else])` — the missing else arm yields Nil. Both
    /// arms produce one f64, the block type the structured-control typing
    /// rule requires.
    fn compile_if(&mut self, args: &[Expr]) -> Result<(), CompileError> {
        if args.len() < 2 || args.len() > 3 {
            return Err(CompileError::MalformedForm {
                form: "if",
                message: format!("expected 2 or 3 expressions, got {}", args.len()),
            });
        }
        self.compile_expr(&args[0])?;
        self.emit_truthiness();
        self.code.push_byte(op::IF);
        self.code.push_byte(op::TYPE_F64);
        self.compile_expr(&args[1])?;
        self.code.push_byte(op::ELSE);
        match args.get(2) {
            Some(alt) => self.compile_expr(alt)?,
            None => self.emit_bits_const(value::TAG_NIL),
        }
        self.code.push_byte(op::END);
        Ok(())
    }

    /// `(local name expr)` or `(local (name…) expr…)`. Pairs are processed
    /// left to right; each initializer is compiled before its name is
    /// declared, so it sees earlier bindings and anything it shadows. A
    /// `nil` name discards its initializer; a missing initializer binds
    /// Nil. The form itself evaluates to Nil.
    fn compile_local(&mut self, args: &[Expr]) -> Result<(), CompileError> {
        let (names_expr, inits) = match args.split_first() {
            Some(split) => split,
            None => {
                return Err(CompileError::MalformedForm {
                    form: "local",
                    message: "missing binding names".to_string(),
                })
            }
        };
        let names: Vec<Option<&str>> = match names_expr {
            Expr::Symbol(name) => vec![Some(name.as_str())],
            Expr::List(entries) => {
                let mut names = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        Expr::Symbol(name) => names.push(Some(name.as_str())),
                        Expr::Nil => names.push(None),
                        other => {
                            return Err(CompileError::MalformedForm {
                                form: "local",
                                message: format!(
                                    "binding names must be symbols or nil, got {:?}",
                                    other
                                ),
                            })
                        }
                    }
                }
                names
            }
            other => {
                return Err(CompileError::MalformedForm {
                    form: "local",
                    message: format!("binding names must be a symbol or a list, got {:?}", other),
                })
            }
        };
        for i in 0..names.len().max(inits.len()) {
            match inits.get(i) {
                Some(init) => self.compile_expr(init)?,
                None => self.emit_bits_const(value::TAG_NIL),
            }
            match names.get(i).copied().flatten() {
                Some(name) => {
                    let slot = self.scope.declare(name)?;
                    let index = self.local_index(slot);
                    self.code.push_byte(op::LOCAL_SET);
                    self.code.push_u32(index);
                }
                None => self.code.push_byte(op::DROP),
            }
        }
        self.emit_bits_const(value::TAG_NIL);
        Ok(())
    }

    /// `(set! name expr)` — the name must already be declared; the form's
    /// value is the assigned value (write then re-read, i.e. a tee).
    fn compile_set(&mut self, args: &[Expr]) -> Result<(), CompileError> {
        let name = match args {
            [Expr::Symbol(name), _] => name,
            _ => {
                return Err(CompileError::MalformedForm {
                    form: "set!",
                    message: "expected a symbol and one expression".to_string(),
                })
            }
        };
        let slot = self.scope.resolve(name)?;
        let index = self.local_index(slot);
        self.compile_expr(&args[1])?;
        self.code.push_byte(op::LOCAL_TEE);
        self.code.push_u32(index);
        Ok(())
    }

    /// `(do expr…)` — a sub-scope; every value but the last is dropped.
    /// Zero expressions yield Nil.
    fn compile_do(&mut self, args: &[Expr]) -> Result<(), CompileError> {
        if args.is_empty() {
            self.emit_bits_const(value::TAG_NIL);
            return Ok(());
        }
        self.scope.enter();
        let result = self.compile_sequence(args);
        self.scope.exit();
        result
    }

    fn compile_sequence(&mut self, exprs: &[Expr]) -> Result<(), CompileError> {
        for (i, expr) in exprs.iter().enumerate() {
            self.compile_expr(expr)?;
            if i + 1 < exprs.len() {
                self.code.push_byte(op::DROP);
            }
        }
        Ok(())
    }

    /// `(function (param…) body…)` — registers a fresh, independently
    /// scoped definition with the assembler (compiled later off the work
    /// queue) and evaluates to its tagged table index. Not a closure: the
    /// body sees only its own parameters and locals.
    fn compile_function(&mut self, args: &[Expr]) -> Result<(), CompileError> {
        let (params_expr, body) = match args.split_first() {
            Some(split) => split,
            None => {
                return Err(CompileError::MalformedForm {
                    form: "function",
                    message: "missing parameter list".to_string(),
                })
            }
        };
        let entries = match params_expr {
            Expr::List(entries) => entries,
            other => {
                return Err(CompileError::MalformedForm {
                    form: "function",
                    message: format!("parameter list must be a list, got {:?}", other),
                })
            }
        };
        let mut params = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Expr::Symbol(name) => params.push(name.clone()),
                other => {
                    return Err(CompileError::MalformedForm {
                        form: "function",
                        message: format!("parameters must be symbols, got {:?}", other),
                    })
                }
            }
        }
        if body.is_empty() {
            return Err(CompileError::MalformedForm {
                form: "function",
                message: "missing body".to_string(),
            });
        }
        let body_expr = if body.len() == 1 {
            body[0].clone()
        } else {
            let mut seq = Vec::with_capacity(body.len() + 1);
            seq.push(Expr::symbol("do"));
            seq.extend(body.iter().cloned());
            Expr::List(seq)
        };
        let name = format!("__lambda_{}", self.asm.function_count());
        let index = self.asm.add_function(FunctionDef {
            name,
            exported: false,
            params,
            body: body_expr,
        })?;
        self.emit_bits_const(value::TAG_FUNCREF | index as u64);
        Ok(())
    }

    // =========================================================================
    // Builtins and Application
    // =========================================================================

    fn compile_builtin(
        &mut self,
        name: &str,
        builtin: Builtin,
        args: &[Expr],
    ) -> Result<(), CompileError> {
        if args.len() != builtin.arity {
            return Err(CompileError::WrongArity {
                op: name.to_string(),
                expected: builtin.arity,
                got: args.len(),
            });
        }
        match builtin.kind {
            OpKind::Arith(opcode) => {
                for arg in args {
                    self.compile_expr(arg)?;
                }
                self.code.push_byte(opcode);
            }
            OpKind::Compare(opcode) => {
                self.compile_expr(&args[0])?;
                self.compile_expr(&args[1])?;
                self.code.push_byte(opcode);
                self.emit_bool_from_i32();
            }
            OpKind::ZeroPred => {
                self.compile_expr(&args[0])?;
                self.emit_f64_const(0.0);
                self.code.push_byte(op::F64_EQ);
                self.emit_bool_from_i32();
            }
            OpKind::NanPred => {
                self.compile_expr(&args[0])?;
                self.code.push_byte(op::I64_REINTERPRET_F64);
                self.emit_quiet_nan_test();
                self.emit_bool_from_i32();
            }
            OpKind::IdPred => {
                self.compile_expr(&args[0])?;
                self.code.push_byte(op::I64_REINTERPRET_F64);
                self.compile_expr(&args[1])?;
                self.code.push_byte(op::I64_REINTERPRET_F64);
                self.code.push_byte(op::I64_EQ);
                self.emit_bool_from_i32();
            }
            OpKind::Not => {
                self.compile_expr(&args[0])?;
                self.emit_truthiness();
                self.code.push_byte(op::I32_EQZ);
                self.emit_bool_from_i32();
            }
        }
        Ok(())
    }

    /// Application: arguments left to right, then the callee; the callee's
    /// tag payload is unboxed to a table index for call_indirect. An
    /// arity mismatch between call site and callee is deliberately left to
    /// the VM's signature check, which traps at run time.
    fn compile_apply(&mut self, callee: &Expr, args: &[Expr]) -> Result<(), CompileError> {
        for arg in args {
            self.compile_expr(arg)?;
        }
        self.compile_expr(callee)?;
        self.code.push_byte(op::I64_REINTERPRET_F64);
        self.code.push_byte(op::I32_WRAP_I64);
        let type_index = self.asm.type_index_for_arity(args.len() as u32);
        self.code.push_byte(op::CALL_INDIRECT);
        self.code.push_u32(type_index);
        self.code.push_byte(0x00); // table 0
        Ok(())
    }

    // =========================================================================
    // Instruction Helpers
    // =========================================================================

    fn emit_f64_const(&mut self, v: f64) {
        self.code.push_byte(op::F64_CONST);
        self.code.push_f64(v);
    }

    /// An f64.const with an exact bit pattern (tag constants).
    fn emit_bits_const(&mut self, bits: u64) {
        self.code.push_byte(op::F64_CONST);
        self.code.push_bytes(&bits.to_le_bytes());
    }

    /// Collapse the f64 on top of the stack to an i32: 1 unless the value
    /// is Nil, False, or a quiet NaN. Needs the operand's bits twice, so
    /// it parks them in the i64 scratch local.
    fn emit_truthiness(&mut self) {
        let scratch = self.scratch_index();
        self.code.push_byte(op::I64_REINTERPRET_F64);
        self.code.push_byte(op::LOCAL_TEE);
        self.code.push_u32(scratch);
        // Nil and False are adjacent tags differing only in bit 48.
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64(48);
        self.code.push_byte(op::I64_SHR_U);
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64(0xFFFE);
        self.code.push_byte(op::I64_AND);
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64((value::TAG_NIL >> 48) as i64);
        self.code.push_byte(op::I64_EQ);
        self.code.push_byte(op::LOCAL_GET);
        self.code.push_u32(scratch);
        self.emit_quiet_nan_test();
        self.code.push_byte(op::I32_OR);
        self.code.push_byte(op::I32_EQZ);
    }

    /// i64 bits on the stack → 1 iff the pattern is a quiet NaN of either
    /// sign. Quiet NaNs carry mantissa bit 51, which no tag does.
    fn emit_quiet_nan_test(&mut self) {
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64(51);
        self.code.push_byte(op::I64_SHR_U);
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64(0x1000);
        self.code.push_byte(op::I64_OR);
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64(0x1FFF);
        self.code.push_byte(op::I64_EQ);
    }

    /// i32 predicate on the stack → tagged Boolean, branchlessly: True is
    /// exactly False plus 2^48.
    fn emit_bool_from_i32(&mut self) {
        self.code.push_byte(op::I64_EXTEND_I32_U);
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64(48);
        self.code.push_byte(op::I64_SHL);
        self.code.push_byte(op::I64_CONST);
        self.code.push_i64(value::TAG_FALSE as i64);
        self.code.push_byte(op::I64_ADD);
        self.code.push_byte(op::F64_REINTERPRET_I64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile_body(body: Expr) -> Result<Vec<u8>, CompileError> {
        ModuleAssembler::compile(vec![FunctionDef {
            name: "main".to_string(),
            exported: true,
            params: Vec::new(),
            body,
        }])
    }

    fn body_of(json: &str) -> Expr {
        crate::loader::load_expr(json).unwrap()
    }

    #[test]
    fn test_number_literal_emits_f64_const() {
        let bytes = compile_body(Expr::Number(5.0)).unwrap();
        let mut expected = vec![op::F64_CONST];
        expected.extend_from_slice(&5.0f64.to_le_bytes());
        assert!(
            bytes.windows(expected.len()).any(|w| w == expected),
            "module must contain an f64.const 5 instruction"
        );
    }

    #[test]
    fn test_undeclared_symbol_fails() {
        let err = compile_body(Expr::symbol("ghost")).unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredLocal(name) if name == "ghost"));
    }

    #[test]
    fn test_unknown_operator_fails() {
        let err = compile_body(body_of(r#"["frobnicate", 1]"#)).unwrap_err();
        assert!(matches!(err, CompileError::UnknownOperator(name) if name == "frobnicate"));
    }

    #[test]
    fn test_duplicate_local_fails() {
        let err =
            compile_body(body_of(r#"["do", ["local", "a", 3], ["local", "a", 5], "a"]"#))
                .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateLocal(name) if name == "a"));
    }

    #[test]
    fn test_set_without_declaration_fails() {
        let err = compile_body(body_of(r#"["set!", "a", 3]"#)).unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredLocal(name) if name == "a"));
    }

    #[test]
    fn test_builtin_arity_mismatch_fails() {
        let err = compile_body(body_of(r#"["add", 1]"#)).unwrap_err();
        assert!(matches!(
            err,
            CompileError::WrongArity { expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn test_empty_application_fails() {
        let err = compile_body(Expr::List(vec![])).unwrap_err();
        assert!(matches!(err, CompileError::MalformedForm { form: "()", .. }));
    }

    #[test]
    fn test_if_requires_condition_and_consequent() {
        let err = compile_body(body_of(r#"["if", 1]"#)).unwrap_err();
        assert!(matches!(err, CompileError::MalformedForm { form: "if", .. }));
    }

    #[test]
    fn test_function_params_must_be_symbols() {
        let err = compile_body(body_of(r#"["function", [1], 0]"#)).unwrap_err();
        assert!(matches!(
            err,
            CompileError::MalformedForm { form: "function", .. }
        ));
    }

    #[test]
    fn test_duplicate_parameter_fails() {
        let err = compile_body(body_of(r#"[["function", ["x", "x"], "x"], 1, 2]"#)).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateLocal(name) if name == "x"));
    }

    #[test]
    fn test_local_binding_shadows_builtin_as_variable_only() {
        // `add` may be bound as a plain variable, but in head position the
        // builtin still wins, so this stays compilable.
        let bytes = compile_body(body_of(
            r#"["do", ["local", "add", 1], ["add", "add", 2]]"#,
        ));
        assert!(bytes.is_ok());
    }

    #[test]
    fn test_nested_function_literals_register_in_discovery_order() {
        let body = body_of(
            r#"["do",
                ["function", ["a"], ["function", ["b", "c"], 1]],
                ["function", ["x", "y"], 2],
                7]"#,
        );
        let bytes = compile_body(body).unwrap();
        // main + three literals
        let mut type_count = None;
        let mut func_count = None;
        for payload in wasmparser::Parser::new(0).parse_all(&bytes) {
            match payload.unwrap() {
                wasmparser::Payload::TypeSection(reader) => type_count = Some(reader.count()),
                wasmparser::Payload::FunctionSection(reader) => func_count = Some(reader.count()),
                _ => {}
            }
        }
        assert_eq!(func_count, Some(4));
        // arities {0, 1, 2} with 2 deduplicated across two literals
        assert_eq!(type_count, Some(3));
    }
}
