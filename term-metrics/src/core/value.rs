//! Runtime values produced by cells and expression evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An evaluation failure carried as a value.
///
/// Expressions never abort a pass over the dataset; they return an `EvalError`
/// instead, which the engine excludes from quality accounting and the row
/// filter can select explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalError {
    /// Human-readable description of what went wrong
    pub message: String,
}

impl EvalError {
    /// Creates a new evaluation error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

/// A cell value or an expression result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Point in time, normalized to UTC.
    ///
    /// Listed before `String` so RFC 3339 text deserializes as a date-time.
    DateTime(DateTime<Utc>),
    /// UTF-8 string.
    String(String),
    /// Natively multi-valued result.
    Array(Vec<Value>),
    /// Evaluation error.
    Error(EvalError),
    /// Raw JSON produced by an expression (e.g. a parsed JSON document).
    Json(serde_json::Value),
}

impl Value {
    /// Creates an error value with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(EvalError::new(message))
    }

    /// Returns true if this value is an evaluation error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns true for null and the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::String(s) => s.is_empty(),
            Self::Json(json) => json.is_null(),
            _ => false,
        }
    }

    /// Returns true if this value carries data: neither blank nor an error.
    pub fn is_non_blank_data(&self) -> bool {
        !self.is_error() && !self.is_blank()
    }

    /// Returns true for integer and floating point values.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Try to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Json(serde_json::Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64. Floats are not truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Json(serde_json::Value::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    /// Try to get as f64, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Json(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a UTC date-time.
    pub fn as_date_time(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Compares this value with a match literal.
    ///
    /// Two numeric values are equal when their `f64` representations are equal,
    /// whatever their original numeric kind; everything else uses literal
    /// equality. Scalar JSON results are decoded first.
    pub fn matches_literal(&self, literal: &Value) -> bool {
        if let Self::Json(json) = self {
            if let Ok(scalar) = Self::from_json_scalar(json) {
                return scalar.matches_literal(literal);
            }
        }
        match (self.as_f64(), literal.as_f64()) {
            (Some(value), Some(expected)) => value == expected,
            _ => self == literal,
        }
    }

    /// Decodes one JSON array element into a scalar value.
    ///
    /// Nested arrays and objects cannot be compared against match literals and
    /// are reported as decode errors.
    pub fn from_json_scalar(json: &serde_json::Value) -> Result<Value, EvalError> {
        match json {
            serde_json::Value::Null => Ok(Self::Null),
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| EvalError::new(format!("Unsupported JSON number {n}"))),
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(EvalError::new(
                format!("Cannot decode JSON element {json} as a scalar value"),
            )),
        }
    }

    /// Get the type name for log and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::Array(_) => "Array",
            Self::Error(_) => "Error",
            Self::Json(_) => "Json",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Array(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Error(err) => write!(f, "#ERROR: {err}"),
            Self::Json(json) => write!(f, "{json}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }
}

impl From<EvalError> for Value {
    fn from(err: EvalError) -> Self {
        Self::Error(err)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}
