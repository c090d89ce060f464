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

use crate::ast::{AstError, Expr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Ast(#[from] AstError),
}

/// Load a program from its JSON notation (arrays = lists, strings =
/// symbols, numbers/booleans/null = literals).
pub fn load_expr(json: &str) -> Result<Expr, LoadError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(Expr::from_json(&value)?)
}
