/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * WASM Module Assembler for the Tern Language.
 *
 * Owns the growing function list (including definitions discovered
 * mid-compilation through nested function literals), deduplicates call
 * signatures by parameter count, and emits the complete binary container:
 * magic + version, then the Type, Function, Table, Export, Element and
 * Code sections in numeric-id order. The funcref table is
 * identity-initialized so a function's own index is its table slot.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

use crate::ast::Expr;
use crate::codegen::{op, CompileError, CompiledBody, FuncCompiler};
use crate::encoder::{EncodeError, WasmWriter};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6D];
pub const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

const SECTION_TYPE: u8 = 1;
const SECTION_FUNCTION: u8 = 3;
const SECTION_TABLE: u8 = 4;
const SECTION_EXPORT: u8 = 7;
const SECTION_ELEMENT: u8 = 9;
const SECTION_CODE: u8 = 10;

const EXPORT_KIND_FUNC: u8 = 0x00;
const LIMITS_MIN_MAX: u8 = 0x01;
const ELEMENT_ACTIVE_TABLE0: u8 = 0x00;

/// A function definition: the entry handed to the assembler up front, or a
/// literal discovered while compiling an enclosing body. `name` only
/// matters when `exported`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub exported: bool,
    pub params: Vec<String>,
    pub body: Expr,
}

/// Assembles one module. Fresh per compilation; nothing is shared across
/// invocations, and recompiling the same AST is byte-identical.
pub struct ModuleAssembler {
    funcs: Vec<FunctionDef>,
    compiled: Vec<Option<CompiledBody>>,
    /// Indices awaiting compilation. A queue rather than recursion keeps
    /// deeply nested function literals from growing the host stack.
    pending: VecDeque<u32>,
    /// Distinct parameter counts in first-seen order, one type entry each.
    /// Valid because every parameter and result is an f64, so equal arity
    /// means equal signature.
    arities: Vec<u32>,
    type_by_arity: HashMap<u32, u32>,
}

impl ModuleAssembler {
    pub fn new() -> Self {
        ModuleAssembler {
            funcs: Vec::new(),
            compiled: Vec::new(),
            pending: VecDeque::new(),
            arities: Vec::new(),
            type_by_arity: HashMap::new(),
        }
    }

    /// Compile a set of definitions (entry points first) into module bytes.
    pub fn compile(defs: Vec<FunctionDef>) -> Result<Vec<u8>, CompileError> {
        let mut asm = ModuleAssembler::new();
        for def in defs {
            asm.add_function(def)?;
        }
        asm.drain_pending()?;
        asm.emit()
    }

    /// Register a definition, assigning its index and type signature at
    /// discovery time; compilation happens when the queue drains.
    pub(crate) fn add_function(&mut self, def: FunctionDef) -> Result<u32, CompileError> {
        let index = u32::try_from(self.funcs.len()).map_err(|_| {
            CompileError::Encoding(EncodeError::Range {
                target: "function index",
                value: self.funcs.len() as u64,
            })
        })?;
        self.type_index_for_arity(def.params.len() as u32);
        self.funcs.push(def);
        self.compiled.push(None);
        self.pending.push_back(index);
        Ok(index)
    }

    pub(crate) fn function_count(&self) -> usize {
        self.funcs.len()
    }

    /// First-sight registration shared by definitions and application
    /// sites (a call site may need an arity no definition has).
    pub(crate) fn type_index_for_arity(&mut self, arity: u32) -> u32 {
        if let Some(&index) = self.type_by_arity.get(&arity) {
            return index;
        }
        let index = self.arities.len() as u32;
        self.arities.push(arity);
        self.type_by_arity.insert(arity, index);
        index
    }

    fn drain_pending(&mut self) -> Result<(), CompileError> {
        while let Some(index) = self.pending.pop_front() {
            let def = self.funcs[index as usize].clone();
            let compiler = FuncCompiler::new(self, &def.params)?;
            let body = compiler.compile(&def.body)?;
            self.compiled[index as usize] = Some(body);
        }
        Ok(())
    }

    // =========================================================================
    // Module Emission
    // =========================================================================

    fn emit(&self) -> Result<Vec<u8>, CompileError> {
        let func_count = self.funcs.len() as u32;

        let mut exports: Vec<(&str, u32)> = Vec::new();
        let mut seen = HashSet::new();
        for (index, def) in self.funcs.iter().enumerate() {
            if def.exported {
                if !seen.insert(def.name.as_str()) {
                    return Err(CompileError::DuplicateExport(def.name.clone()));
                }
                exports.push((def.name.as_str(), index as u32));
            }
        }

        let mut w = WasmWriter::new();
        w.push_bytes(&WASM_MAGIC);
        w.push_bytes(&WASM_VERSION);

        // --- Type Section: one f64^n -> f64 entry per distinct arity ---
        w.push_byte(SECTION_TYPE);
        w.measured(|w| {
            w.push_len(self.arities.len())?;
            for &arity in &self.arities {
                w.push_byte(op::TYPE_FUNC);
                w.push_u32(arity);
                for _ in 0..arity {
                    w.push_byte(op::TYPE_F64);
                }
                w.push_u32(1);
                w.push_byte(op::TYPE_F64);
            }
            Ok(())
        })?;

        // --- Function Section: per-function type index ---
        w.push_byte(SECTION_FUNCTION);
        w.measured(|w| {
            w.push_len(self.funcs.len())?;
            for def in &self.funcs {
                w.push_u32(self.type_by_arity[&(def.params.len() as u32)]);
            }
            Ok(())
        })?;

        // --- Table Section: one funcref table sized to the function count ---
        w.push_byte(SECTION_TABLE);
        w.measured(|w| {
            w.push_u32(1);
            w.push_byte(op::TYPE_FUNCREF);
            w.push_byte(LIMITS_MIN_MAX);
            w.push_u32(func_count);
            w.push_u32(func_count);
            Ok(())
        })?;

        // --- Export Section ---
        w.push_byte(SECTION_EXPORT);
        w.measured(|w| {
            w.push_len(exports.len())?;
            for (name, index) in &exports {
                w.push_string(name)?;
                w.push_byte(EXPORT_KIND_FUNC);
                w.push_u32(*index);
            }
            Ok(())
        })?;

        // --- Element Section: table slot i holds function i ---
        w.push_byte(SECTION_ELEMENT);
        w.measured(|w| {
            w.push_u32(1);
            w.push_byte(ELEMENT_ACTIVE_TABLE0);
            w.push_byte(op::I32_CONST);
            w.push_i32(0);
            w.push_byte(op::END);
            w.push_u32(func_count);
            for index in 0..func_count {
                w.push_u32(index);
            }
            Ok(())
        })?;

        // --- Code Section ---
        w.push_byte(SECTION_CODE);
        w.measured(|w| {
            w.push_len(self.funcs.len())?;
            for (def, compiled) in self.funcs.iter().zip(&self.compiled) {
                let body = compiled.as_ref().expect("function left uncompiled");
                let arity = def.params.len() as u32;
                let extra = body.max_slots - arity;
                w.measured(|w| {
                    // Local index `arity` is the i64 truthiness scratch,
                    // declared ahead of the f64 variable slots.
                    if extra > 0 {
                        w.push_u32(2);
                    } else {
                        w.push_u32(1);
                    }
                    w.push_u32(1);
                    w.push_byte(op::TYPE_I64);
                    if extra > 0 {
                        w.push_u32(extra);
                        w.push_byte(op::TYPE_F64);
                    }
                    w.push_bytes(&body.code);
                    w.push_byte(op::END);
                    Ok(())
                })?;
            }
            Ok(())
        })?;

        Ok(w.finish())
    }
}

impl Default for ModuleAssembler {
    fn default() -> Self {
        Self::new()
    }
}
