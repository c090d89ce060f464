/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of the Tern Compiler.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

pub mod ast;
pub mod codegen;
pub mod encoder;
pub mod loader;
pub mod module;
pub mod parser;
#[cfg(not(target_arch = "wasm32"))]
pub mod runner;
pub mod scope;
pub mod value;
pub mod wasm;
pub use wasm::*;

use ast::Expr;
use module::{FunctionDef, ModuleAssembler};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TernError {
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Load(#[from] loader::LoadError),
    #[error(transparent)]
    Compile(#[from] codegen::CompileError),
}

/// Compile source text to a module whose program is the body of an
/// exported nullary `main`. Multiple top-level expressions run in
/// sequence, as an implicit `do`.
pub fn compile_source(source: &str) -> Result<Vec<u8>, TernError> {
    let mut exprs = parser::parse_program(source)?;
    let body = match exprs.len() {
        0 => return Err(parser::ParseError::UnexpectedEof.into()),
        1 => exprs.remove(0),
        _ => {
            let mut seq = Vec::with_capacity(exprs.len() + 1);
            seq.push(Expr::symbol("do"));
            seq.append(&mut exprs);
            Expr::List(seq)
        }
    };
    Ok(compile_main(body)?)
}

/// Compile a program given in the JSON notation, same entry convention as
/// `compile_source`.
pub fn compile_json(json: &str) -> Result<Vec<u8>, TernError> {
    let body = loader::load_expr(json)?;
    Ok(compile_main(body)?)
}

fn compile_main(body: Expr) -> Result<Vec<u8>, codegen::CompileError> {
    ModuleAssembler::compile(vec![FunctionDef {
        name: "main".to_string(),
        exported: true,
        params: Vec::new(),
        body,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_source_single_expression() {
        let bytes = compile_source("(add 1 2)").unwrap();
        assert_eq!(&bytes[0..4], b"\0asm");
    }

    #[test]
    fn test_compile_source_implicit_do() {
        let bytes = compile_source("(local a 1) (add a 1)").unwrap();
        assert_eq!(&bytes[0..4], b"\0asm");
    }

    #[test]
    fn test_compile_source_empty_input_fails() {
        assert!(matches!(
            compile_source("  ; only a comment\n"),
            Err(TernError::Parse(parser::ParseError::UnexpectedEof))
        ));
    }

    #[test]
    fn test_source_and_json_agree() {
        let from_source = compile_source("(add 5 (mul 2 3))").unwrap();
        let from_json = compile_json(r#"["add", 5, ["mul", 2, 3]]"#).unwrap();
        assert_eq!(from_source, from_json);
    }
}
