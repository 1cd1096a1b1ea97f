//! The catalog of scalar types and their validating coercion functions.
//!
//! Each type name maps to a check function `(&Value, &CheckArgs) -> Result`
//! plus a flag saying whether raw input should be comma-split before the
//! check runs. The catalog is an explicit instance handed to the merge
//! engine and to every bound field, so sessions with different custom-type
//! registrations can coexist.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::Value;

/// A recoverable, per-field validation failure.
///
/// Returned from checks and from `Field::set`/`validate`; it never aborts a
/// session and never crosses the merge boundary as a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("expected {wanted}, got {got}")]
    TypeMismatch {
        wanted: &'static str,
        got: &'static str,
    },

    #[error("'{value}' is not a valid {wanted}")]
    NotANumber {
        wanted: &'static str,
        value: String,
    },

    #[error("value {value} is out of range ({limit})")]
    OutOfRange { value: String, limit: String },

    #[error("length {length} is out of range ({limit})")]
    LengthOutOfRange { length: usize, limit: String },

    #[error("'{value}' is not a recognised boolean")]
    BadBoolean { value: String },

    #[error("'{value}' is not an IPv4 address")]
    BadIpAddress { value: String },

    #[error("'{value}' is not one of: {choices}")]
    BadChoice { value: String, choices: String },

    #[error("expected a list, got {got}")]
    NotAList { got: &'static str },

    #[error("list has {count} elements, expected {limit}")]
    CardinalityViolation { count: usize, limit: String },

    #[error("bad check parameter {name}='{value}'")]
    BadParameter { name: String, value: String },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

/// Positional and keyword arguments of a check, as declared in the schema.
///
/// Arguments stay strings until a check interprets them; `min`/`max` style
/// parameters may be given positionally or by keyword.
#[derive(Debug, Clone, Copy)]
pub struct CheckArgs<'a> {
    pub args: &'a [String],
    pub kwargs: &'a IndexMap<String, String>,
}

impl<'a> CheckArgs<'a> {
    pub fn new(args: &'a [String], kwargs: &'a IndexMap<String, String>) -> Self {
        Self { args, kwargs }
    }

    fn lookup(&self, index: usize, key: &str) -> Option<&'a str> {
        if let Some(v) = self.kwargs.get(key) {
            return Some(v.as_str());
        }
        self.args.get(index).map(|s| s.as_str())
    }

    /// Integer parameter, positional `index` or keyword `key`.
    pub fn int_param(&self, index: usize, key: &str) -> Result<Option<i64>, ValidationError> {
        match self.lookup(index, key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                ValidationError::BadParameter {
                    name: key.to_string(),
                    value: raw.to_string(),
                }
            }),
        }
    }

    /// Float parameter, positional `index` or keyword `key`.
    pub fn float_param(&self, index: usize, key: &str) -> Result<Option<f64>, ValidationError> {
        match self.lookup(index, key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
                ValidationError::BadParameter {
                    name: key.to_string(),
                    value: raw.to_string(),
                }
            }),
        }
    }
}

/// A validating coercion function.
pub type CheckFn = Rc<dyn Fn(&Value, &CheckArgs<'_>) -> Result<Value, ValidationError>>;

/// One registered type: its check plus the list-splitting flag.
#[derive(Clone)]
pub struct CatalogEntry {
    pub check: CheckFn,
    pub splits_input: bool,
}

impl fmt::Debug for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("splits_input", &self.splits_input)
            .finish_non_exhaustive()
    }
}

/// Registry of type name -> check function.
#[derive(Clone)]
pub struct SchemaCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl SchemaCatalog {
    /// An empty catalog. Useful only with custom registrations.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The standard catalog: integer, float, boolean, string, ip_addr,
    /// option, the list variants, and the opaque `pass` type.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        catalog.register("integer", false, check_integer);
        catalog.register("float", false, check_float);
        catalog.register("boolean", false, check_boolean);
        catalog.register("string", false, check_string);
        catalog.register("ip_addr", false, check_ip_addr);
        catalog.register("option", false, check_option);
        catalog.register("list", true, check_list);
        catalog.register("force_list", true, check_force_list);
        catalog.register("tuple", true, check_list);
        catalog.register("int_list", true, check_int_list);
        catalog.register("float_list", true, check_float_list);
        catalog.register("bool_list", true, check_bool_list);
        catalog.register("string_list", true, check_string_list);
        catalog.register("ip_addr_list", true, check_ip_addr_list);
        catalog.register("mixed_list", true, check_mixed_list);
        catalog.register("pass", false, check_pass);
        catalog
    }

    /// Adds or replaces a type. `splits_input` requests the comma-splitting
    /// preprocessing that the built-in list kinds get.
    pub fn register<F>(&mut self, name: impl Into<String>, splits_input: bool, check: F)
    where
        F: for<'a> Fn(&Value, &CheckArgs<'a>) -> Result<Value, ValidationError> + 'static,
    {
        self.entries.insert(
            name.into(),
            CatalogEntry {
                check: Rc::new(check),
                splits_input,
            },
        );
    }

    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for SchemaCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("SchemaCatalog").field("types", &names).finish()
    }
}

// Range-label helper for error messages.
fn limit_label<T: fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("min {min}, max {max}"),
        (Some(min), None) => format!("min {min}"),
        (None, Some(max)) => format!("max {max}"),
        (None, None) => String::from("unbounded"),
    }
}

// Element coercion primitives, shared by the scalar checks and the
// element-wise list checks.

fn coerce_int(value: &Value) -> Result<i64, ValidationError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Str(s) => s.trim().parse().map_err(|_| ValidationError::NotANumber {
            wanted: "integer",
            value: s.clone(),
        }),
        other => Err(ValidationError::TypeMismatch {
            wanted: "integer",
            got: other.kind(),
        }),
    }
}

fn coerce_float(value: &Value) -> Result<f64, ValidationError> {
    match value {
        Value::Float(x) => Ok(*x),
        Value::Int(i) => Ok(*i as f64),
        Value::Str(s) => s.trim().parse().map_err(|_| ValidationError::NotANumber {
            wanted: "float",
            value: s.clone(),
        }),
        other => Err(ValidationError::TypeMismatch {
            wanted: "float",
            got: other.kind(),
        }),
    }
}

fn coerce_bool(value: &Value) -> Result<bool, ValidationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(0) => Ok(false),
        Value::Int(1) => Ok(true),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(ValidationError::BadBoolean { value: s.clone() }),
        },
        other => Err(ValidationError::TypeMismatch {
            wanted: "boolean",
            got: other.kind(),
        }),
    }
}

fn coerce_str(value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => Err(ValidationError::TypeMismatch {
            wanted: "string",
            got: other.kind(),
        }),
    }
}

fn coerce_ip_addr(value: &Value) -> Result<String, ValidationError> {
    let s = coerce_str(value)?;
    let trimmed = s.trim();
    let octets: Vec<&str> = trimmed.split('.').collect();
    let well_formed = octets.len() == 4
        && octets
            .iter()
            .all(|part| !part.is_empty() && part.parse::<u8>().is_ok());
    if !well_formed {
        return Err(ValidationError::BadIpAddress { value: s });
    }
    Ok(trimmed.to_string())
}

// Scalar checks.

fn check_integer(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let n = coerce_int(value)?;
    let min = args.int_param(0, "min")?;
    let max = args.int_param(1, "max")?;
    if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
        return Err(ValidationError::OutOfRange {
            value: n.to_string(),
            limit: limit_label(min, max),
        });
    }
    Ok(Value::Int(n))
}

fn check_float(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let x = coerce_float(value)?;
    let min = args.float_param(0, "min")?;
    let max = args.float_param(1, "max")?;
    if min.is_some_and(|min| x < min) || max.is_some_and(|max| x > max) {
        return Err(ValidationError::OutOfRange {
            value: x.to_string(),
            limit: limit_label(min, max),
        });
    }
    Ok(Value::Float(x))
}

fn check_boolean(value: &Value, _args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    coerce_bool(value).map(Value::Bool)
}

fn check_string(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let s = coerce_str(value)?;
    let min = args.int_param(0, "min")?;
    let max = args.int_param(1, "max")?;
    let length = s.chars().count();
    let too_short = min.is_some_and(|min| (length as i64) < min);
    let too_long = max.is_some_and(|max| (length as i64) > max);
    if too_short || too_long {
        return Err(ValidationError::LengthOutOfRange {
            length,
            limit: limit_label(min, max),
        });
    }
    Ok(Value::Str(s))
}

fn check_ip_addr(value: &Value, _args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    coerce_ip_addr(value).map(Value::Str)
}

fn check_option(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let s = coerce_str(value)?;
    if !args.args.iter().any(|choice| choice == &s) {
        return Err(ValidationError::BadChoice {
            value: s,
            choices: args.args.join(", "),
        });
    }
    Ok(Value::Str(s))
}

fn check_pass(value: &Value, _args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    // Opaque passthrough. Structured defaults still round-trip as plain
    // strings; known fidelity gap, kept as documented behavior.
    Ok(value.clone())
}

// List checks. Count bounds apply to the list itself, never to elements.

fn require_list(value: &Value) -> Result<&[Value], ValidationError> {
    value.as_list().ok_or(ValidationError::NotAList {
        got: value.kind(),
    })
}

fn check_count(count: usize, args: &CheckArgs<'_>) -> Result<(), ValidationError> {
    let min = args.int_param(0, "min")?;
    let max = args.int_param(1, "max")?;
    if min.is_some_and(|min| (count as i64) < min) || max.is_some_and(|max| (count as i64) > max) {
        return Err(ValidationError::CardinalityViolation {
            count,
            limit: limit_label(min, max),
        });
    }
    Ok(())
}

fn check_elements<T, F>(items: &[Value], coerce: F, wrap: fn(T) -> Value) -> Result<Value, ValidationError>
where
    F: Fn(&Value) -> Result<T, ValidationError>,
{
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let coerced = coerce(item).map_err(|source| ValidationError::Element {
            index,
            source: Box::new(source),
        })?;
        out.push(wrap(coerced));
    }
    Ok(Value::List(out))
}

fn check_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let items = require_list(value)?;
    check_count(items.len(), args)?;
    Ok(Value::List(items.to_vec()))
}

fn check_force_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let wrapped;
    let items = match value.as_list() {
        Some(items) => items,
        None => {
            wrapped = [value.clone()];
            &wrapped[..]
        }
    };
    check_count(items.len(), args)?;
    Ok(Value::List(items.to_vec()))
}

fn check_int_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let items = require_list(value)?;
    check_count(items.len(), args)?;
    check_elements(items, coerce_int, Value::Int)
}

fn check_float_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let items = require_list(value)?;
    check_count(items.len(), args)?;
    check_elements(items, coerce_float, Value::Float)
}

fn check_bool_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let items = require_list(value)?;
    check_count(items.len(), args)?;
    check_elements(items, coerce_bool, Value::Bool)
}

fn check_string_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let items = require_list(value)?;
    check_count(items.len(), args)?;
    check_elements(items, coerce_str, Value::Str)
}

fn check_ip_addr_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let items = require_list(value)?;
    check_count(items.len(), args)?;
    check_elements(items, coerce_ip_addr, Value::Str)
}

/// Fixed-length heterogeneous list; positional args name the member types.
fn check_mixed_list(value: &Value, args: &CheckArgs<'_>) -> Result<Value, ValidationError> {
    let items = require_list(value)?;
    if items.len() != args.args.len() {
        return Err(ValidationError::CardinalityViolation {
            count: items.len(),
            limit: format!("exactly {}", args.args.len()),
        });
    }
    let mut out = Vec::with_capacity(items.len());
    for (index, (item, member_type)) in items.iter().zip(args.args.iter()).enumerate() {
        let coerced = match member_type.as_str() {
            "integer" => coerce_int(item).map(Value::Int),
            "float" => coerce_float(item).map(Value::Float),
            "boolean" => coerce_bool(item).map(Value::Bool),
            "string" => coerce_str(item).map(Value::Str),
            "ip_addr" => coerce_ip_addr(item).map(Value::Str),
            other => Err(ValidationError::BadParameter {
                name: "member type".to_string(),
                value: other.to_string(),
            }),
        };
        let coerced = coerced.map_err(|source| match source {
            err @ ValidationError::BadParameter { .. } => err,
            source => ValidationError::Element {
                index,
                source: Box::new(source),
            },
        })?;
        out.push(coerced);
    }
    Ok(Value::List(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(type_name: &str, value: Value, args: &[&str]) -> Result<Value, ValidationError> {
        run_kw(type_name, value, args, &[])
    }

    fn run_kw(
        type_name: &str,
        value: Value,
        args: &[&str],
        kwargs: &[(&str, &str)],
    ) -> Result<Value, ValidationError> {
        let catalog = SchemaCatalog::standard();
        let entry = catalog.entry(type_name).expect("standard type");
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let kwargs: IndexMap<String, String> = kwargs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        (entry.check)(&value, &CheckArgs::new(&args, &kwargs))
    }

    #[test]
    fn test_integer_coerces_strings() {
        assert_eq!(run("integer", " 42 ".into(), &[]).unwrap(), Value::Int(42));
        assert_eq!(run("integer", Value::Int(-3), &[]).unwrap(), Value::Int(-3));
    }

    #[test]
    fn test_integer_bounds_inclusive() {
        assert_eq!(run("integer", "10".into(), &["-2", "10"]).unwrap(), Value::Int(10));
        assert!(matches!(
            run("integer", "15".into(), &["-2", "10"]),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            run_kw("integer", "-3".into(), &[], &[("min", "-2")]),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_integer_rejects_garbage() {
        assert!(matches!(
            run("integer", "seven".into(), &[]),
            Err(ValidationError::NotANumber { .. })
        ));
    }

    #[test]
    fn test_float_accepts_int_input() {
        assert_eq!(run("float", Value::Int(3), &[]).unwrap(), Value::Float(3.0));
        assert_eq!(run("float", "2.5".into(), &[]).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_boolean_dictionary() {
        for raw in ["true", "Yes", "ON", "1"] {
            assert_eq!(run("boolean", raw.into(), &[]).unwrap(), Value::Bool(true));
        }
        for raw in ["false", "No", "off", "0"] {
            assert_eq!(run("boolean", raw.into(), &[]).unwrap(), Value::Bool(false));
        }
        assert!(matches!(
            run("boolean", "maybe".into(), &[]),
            Err(ValidationError::BadBoolean { .. })
        ));
    }

    #[test]
    fn test_string_length_bounds() {
        assert!(run("string", "abc".into(), &["2", "5"]).is_ok());
        assert!(matches!(
            run("string", "a".into(), &["2", "5"]),
            Err(ValidationError::LengthOutOfRange { .. })
        ));
    }

    #[test]
    fn test_string_rejects_numbers() {
        assert!(matches!(
            run("string", Value::Int(7), &[]),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_ip_addr() {
        assert_eq!(
            run("ip_addr", " 192.168.0.1 ".into(), &[]).unwrap(),
            Value::Str("192.168.0.1".to_string())
        );
        for bad in ["256.0.0.1", "1.2.3", "a.b.c.d", "1.2.3.4.5"] {
            assert!(matches!(
                run("ip_addr", bad.into(), &[]),
                Err(ValidationError::BadIpAddress { .. })
            ));
        }
    }

    #[test]
    fn test_option_choices() {
        assert!(run("option", "kde".into(), &["gnome", "kde"]).is_ok());
        assert!(matches!(
            run("option", "xfce".into(), &["gnome", "kde"]),
            Err(ValidationError::BadChoice { .. })
        ));
    }

    #[test]
    fn test_list_bounds() {
        let three = Value::List(vec!["a".into(), "b".into(), "c".into()]);
        assert!(run("list", three.clone(), &["2", "4"]).is_ok());
        assert!(matches!(
            run("list", three, &["4"]),
            Err(ValidationError::CardinalityViolation { .. })
        ));
    }

    #[test]
    fn test_force_list_wraps_scalars() {
        assert_eq!(
            run("force_list", "solo".into(), &[]).unwrap(),
            Value::List(vec!["solo".into()])
        );
    }

    #[test]
    fn test_int_list_elements() {
        let raw = Value::List(vec!["1".into(), "2".into()]);
        assert_eq!(
            run("int_list", raw, &[]).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        let bad = Value::List(vec!["1".into(), "x".into()]);
        assert!(matches!(
            run("int_list", bad, &[]),
            Err(ValidationError::Element { index: 1, .. })
        ));
    }

    #[test]
    fn test_mixed_list() {
        let raw = Value::List(vec!["3".into(), "yes".into(), "name".into()]);
        assert_eq!(
            run("mixed_list", raw.clone(), &["integer", "boolean", "string"]).unwrap(),
            Value::List(vec![Value::Int(3), Value::Bool(true), "name".into()])
        );
        assert!(matches!(
            run("mixed_list", raw, &["integer", "boolean"]),
            Err(ValidationError::CardinalityViolation { .. })
        ));
    }

    #[test]
    fn test_pass_returns_value_unchanged() {
        assert_eq!(run("pass", "as-is".into(), &[]).unwrap(), Value::Str("as-is".into()));
    }

    #[test]
    fn test_bad_parameter_reported() {
        assert!(matches!(
            run_kw("integer", "3".into(), &[], &[("min", "low")]),
            Err(ValidationError::BadParameter { .. })
        ));
    }

    #[test]
    fn test_register_custom_type() {
        let mut catalog = SchemaCatalog::standard();
        catalog.register("even", false, |value, _args| {
            let n = match value {
                Value::Int(i) => *i,
                Value::Str(s) => s.trim().parse().map_err(|_| ValidationError::NotANumber {
                    wanted: "integer",
                    value: s.clone(),
                })?,
                other => {
                    return Err(ValidationError::TypeMismatch {
                        wanted: "integer",
                        got: other.kind(),
                    })
                }
            };
            if n % 2 != 0 {
                return Err(ValidationError::OutOfRange {
                    value: n.to_string(),
                    limit: "even numbers".to_string(),
                });
            }
            Ok(Value::Int(n))
        });
        let entry = catalog.entry("even").unwrap();
        let empty = IndexMap::new();
        let args = CheckArgs::new(&[], &empty);
        assert!((entry.check)(&"4".into(), &args).is_ok());
        assert!((entry.check)(&"5".into(), &args).is_err());
    }
}
