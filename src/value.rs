//! Scalar values stored in a configuration document.
//!
//! One enum covers both raw and coerced forms: a freshly loaded document
//! usually holds `Str` values, while a successful validated write stores the
//! typed form back. Validators accept either and return the normalized value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A configuration scalar or list of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Short label for the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// Returns the contained string, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the contained list, if this is a `List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Splits a raw comma-separated string into a list of trimmed string
    /// elements. Non-string values pass through unchanged.
    ///
    /// This is the shared preprocessing rule for every list-kind type: the
    /// presentation layer hands over one flat string, the element checks see
    /// individual items.
    pub fn split_list(raw: &str) -> Value {
        Value::List(
            raw.split(',')
                .map(|item| Value::Str(item.trim().to_string()))
                .collect(),
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_trims_elements() {
        let value = Value::split_list("x, y , z");
        assert_eq!(
            value,
            Value::List(vec!["x".into(), "y".into(), "z".into()])
        );
    }

    #[test]
    fn test_split_list_single_element() {
        assert_eq!(
            Value::split_list("alone"),
            Value::List(vec!["alone".into()])
        );
    }

    #[test]
    fn test_display_joins_lists() {
        let value = Value::List(vec![Value::Int(1), Value::Int(2), "c".into()]);
        assert_eq!(value.to_string(), "1, 2, c");
    }

    #[test]
    fn test_serde_round_trip() {
        let value = Value::List(vec![Value::Int(4), Value::Bool(true), "x".into()]);
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
