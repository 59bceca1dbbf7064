//! Runtime value types carried through query compilation.

use serde::{Deserialize, Serialize};

/// A runtime value that can appear in a filter, a function argument, or the
/// positional parameter array of a compiled statement.
///
/// Values are always bound as statement parameters; nothing in this enum is
/// ever interpolated into SQL text. `Dynamic` is the one exception to the
/// "ready to bind" rule: it is a `$CURRENT_*` placeholder that only exists
/// inside permission rules and must be substituted before compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Exact decimal carried as text to preserve precision.
    Decimal(String),
    /// UTF-8 string.
    String(String),
    /// Timestamp as microseconds since Unix epoch.
    Timestamp(i64),
    /// UUID as 16 bytes.
    Uuid([u8; 16]),
    /// Arbitrary JSON document.
    Json(serde_json::Value),
    /// Geometry as WKT text; only ever bound inside a geometry constructor.
    Geometry(String),
    /// Unresolved dynamic variable reference (e.g. `$CURRENT_USER.id`).
    Dynamic(String),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is an unresolved dynamic variable.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Value::Dynamic(_))
    }

    /// Try to get as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as string reference.
    ///
    /// Covers `String`, `Decimal`, and `Geometry`, which all carry text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Decimal(s) | Value::Geometry(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a JSON document reference.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(j) => Some(j),
            _ => None,
        }
    }

    /// Interpret this value as a number for range validation.
    ///
    /// Integers widen, decimals parse from their textual form. Non-numeric
    /// values return `None`.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
