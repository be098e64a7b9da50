//! A small value type shared by both template engines' expression
//! evaluators, so neither has to invent its own JSON-conversion and
//! truthiness rules.

use serde_json::Value as JsonValue;

use crate::error::{MockError, Result};

/// An intermediate value produced while evaluating a template expression.
#[derive(Debug, Clone)]
pub enum Value {
    /// A string.
    Str(String),
    /// A 64-bit integer.
    Int(i64),
    /// A homogeneous integer array, as produced by `seq(a, b)`.
    Array(Vec<i64>),
    /// A boolean, produced by comparisons in the block engine.
    Bool(bool),
}

impl Value {
    /// Converts to a display string (used for `{{ }}`/`${}` substitution
    /// output and as a string-typed function argument).
    pub fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) => self.to_json().to_string(),
        }
    }

    /// Converts to an integer, parsing numeric strings.
    pub fn into_int(self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(i),
            Value::Str(s) => s
                .parse::<i64>()
                .map_err(|_| MockError::Render(format!("expected integer, got '{s}'"))),
            other => Err(MockError::Render(format!(
                "expected integer, got {other:?}"
            ))),
        }
    }

    /// Truthiness used by `{% if %}`: empty string and `false` are falsy,
    /// everything else is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Str(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Bool(b) => *b,
            Value::Array(a) => !a.is_empty(),
        }
    }

    /// JSON representation, used by `toJSON(v)`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Int(i) => JsonValue::Number((*i).into()),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Array(a) => {
                JsonValue::Array(a.iter().map(|i| JsonValue::Number((*i).into())).collect())
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Str(a), Value::Int(b)) | (Value::Int(b), Value::Str(a)) => {
                a.parse::<i64>().map(|n| n == *b).unwrap_or(false)
            }
            _ => false,
        }
    }
}
