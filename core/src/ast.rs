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

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AstError {
    #[error("unsupported JSON value for an expression: {0}")]
    UnsupportedJson(String),
}

/// A Tern expression.
///
/// By convention a non-empty `List` whose head is a `Symbol` denotes a
/// special form, a builtin operation, or an application of whatever the
/// head resolves to. The compiler treats nodes as immutable, finite, and
/// non-cyclic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Boolean(bool),
    Nil,
    Symbol(String),
    List(Vec<Expr>),
}

impl Expr {
    pub fn symbol(name: &str) -> Expr {
        Expr::Symbol(name.to_string())
    }

    /// Build an expression from the JSON program notation: arrays are
    /// lists, strings are symbols, numbers/booleans/null are literals.
    pub fn from_json(value: &Value) -> Result<Expr, AstError> {
        match value {
            Value::Null => Ok(Expr::Nil),
            Value::Bool(b) => Ok(Expr::Boolean(*b)),
            Value::Number(n) => n
                .as_f64()
                .map(Expr::Number)
                .ok_or_else(|| AstError::UnsupportedJson(n.to_string())),
            Value::String(s) => Ok(Expr::Symbol(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Expr::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Expr::List),
            Value::Object(_) => Err(AstError::UnsupportedJson("object".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scenario_notation() {
        let expr = Expr::from_json(&json!(["add", 5, ["mul", 2, 3]])).unwrap();
        assert_eq!(
            expr,
            Expr::List(vec![
                Expr::symbol("add"),
                Expr::Number(5.0),
                Expr::List(vec![
                    Expr::symbol("mul"),
                    Expr::Number(2.0),
                    Expr::Number(3.0),
                ]),
            ])
        );
    }

    #[test]
    fn test_from_json_literals() {
        assert_eq!(Expr::from_json(&json!(null)).unwrap(), Expr::Nil);
        assert_eq!(
            Expr::from_json(&json!(false)).unwrap(),
            Expr::Boolean(false)
        );
        assert_eq!(Expr::from_json(&json!(-0.0)).unwrap(), Expr::Number(-0.0));
        assert_eq!(Expr::from_json(&json!("a")).unwrap(), Expr::symbol("a"));
    }

    #[test]
    fn test_from_json_rejects_objects() {
        assert!(Expr::from_json(&json!({"not": "an expr"})).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let expr = Expr::List(vec![
            Expr::symbol("if"),
            Expr::Boolean(true),
            Expr::Number(1.0),
            Expr::Nil,
        ]);
        let encoded = serde_json::to_string(&expr).unwrap();
        let decoded: Expr = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, expr);
    }
}
