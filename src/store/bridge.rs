//! Bridge between host-side TOML tables and the configuration store.
//!
//! Hosts that keep their settings in TOML can hand a parsed table to a
//! session and get one back after editing. Datetimes and tables nested
//! inside arrays have no store representation and are stringified; default
//! bookkeeping is not part of a table and is lost on export.

use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value as TomlValue};

use super::{ConfigSection, ConfigStore};
use crate::value::Value;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Converts a TOML table into a store: nested tables become sections,
/// everything else becomes a scalar value.
pub fn store_from_table(table: &Table) -> ConfigStore {
    ConfigStore::from_root(section_from_table(table))
}

fn section_from_table(table: &Table) -> ConfigSection {
    let mut section = ConfigSection::new();
    for (key, value) in table {
        match value {
            TomlValue::Table(child) => {
                section.insert_section(key.clone(), section_from_table(child));
            }
            other => section.set_value(key.clone(), value_from_toml(other)),
        }
    }
    section
}

fn value_from_toml(value: &TomlValue) -> Value {
    match value {
        TomlValue::String(s) => Value::Str(s.clone()),
        TomlValue::Integer(i) => Value::Int(*i),
        TomlValue::Float(x) => Value::Float(*x),
        TomlValue::Boolean(b) => Value::Bool(*b),
        TomlValue::Datetime(dt) => Value::Str(dt.to_string()),
        TomlValue::Array(items) => Value::List(items.iter().map(value_from_toml).collect()),
        // A table inside an array cannot become a section; keep its text.
        TomlValue::Table(t) => Value::Str(t.to_string()),
    }
}

/// Exports the store's current values back into a TOML table.
pub fn table_from_store(store: &ConfigStore) -> Table {
    table_from_section(store.root())
}

fn table_from_section(section: &ConfigSection) -> Table {
    let mut table = Table::new();
    for (name, value) in section.values() {
        table.insert(name.to_string(), value_to_toml(value));
    }
    for (name, child) in section.sections() {
        table.insert(name.to_string(), TomlValue::Table(table_from_section(child)));
    }
    table
}

fn value_to_toml(value: &Value) -> TomlValue {
    match value {
        Value::Str(s) => TomlValue::String(s.clone()),
        Value::Int(i) => TomlValue::Integer(*i),
        Value::Float(x) => TomlValue::Float(*x),
        Value::Bool(b) => TomlValue::Boolean(*b),
        Value::List(items) => TomlValue::Array(items.iter().map(value_to_toml).collect()),
    }
}

/// Loads a store from a TOML file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
pub fn read_store(path: impl AsRef<Path>, required: bool) -> Result<Option<ConfigStore>, BridgeError> {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return if required {
                Err(BridgeError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            };
        }
        Err(e) => {
            return Err(BridgeError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    let table: Table = toml::from_str(&contents).map_err(|e| BridgeError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Some(store_from_table(&table)))
}
