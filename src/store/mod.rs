//! The mutable configuration document: nested named sections of named
//! scalar values, plus per-section default bookkeeping.
//!
//! The store is the single owner of configuration state. View nodes hold
//! paths into it rather than references, so reads and writes borrow the
//! store only for the duration of one call.

mod bridge;

pub use bridge::{read_store, store_from_table, table_from_store, BridgeError};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One section: ordered scalar values, ordered child sections, and the set
/// of scalar names currently carrying their declared default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSection {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    values: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    sections: IndexMap<String, ConfigSection>,
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    defaults: IndexSet<String>,
}

impl ConfigSection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Writes a scalar. Default bookkeeping is separate; see
    /// [`mark_default`](Self::mark_default) / [`clear_default`](Self::clear_default).
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn remove_value(&mut self, name: &str) -> Option<Value> {
        self.defaults.shift_remove(name);
        self.values.shift_remove(name)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut ConfigSection> {
        self.sections.get_mut(name)
    }

    pub fn insert_section(&mut self, name: impl Into<String>, section: ConfigSection) {
        self.sections.insert(name.into(), section);
    }

    pub fn remove_section(&mut self, name: &str) -> Option<ConfigSection> {
        self.sections.shift_remove(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &ConfigSection)> {
        self.sections
            .iter()
            .map(|(name, section)| (name.as_str(), section))
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|name| name.as_str())
    }

    /// True if `name` is taken by either a scalar or a child section.
    pub fn has_child(&self, name: &str) -> bool {
        self.values.contains_key(name) || self.sections.contains_key(name)
    }

    pub fn is_default(&self, name: &str) -> bool {
        self.defaults.contains(name)
    }

    pub fn mark_default(&mut self, name: impl Into<String>) {
        self.defaults.insert(name.into());
    }

    pub fn clear_default(&mut self, name: &str) {
        self.defaults.shift_remove(name);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.sections.is_empty()
    }

    /// Child section, created empty if absent.
    pub(crate) fn ensure_section(&mut self, name: &str) -> &mut ConfigSection {
        self.sections.entry(name.to_string()).or_default()
    }

    fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<&ConfigSection> {
        let mut current = self;
        for part in path {
            current = current.section(part.as_ref())?;
        }
        Some(current)
    }

    fn descend_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut ConfigSection> {
        let mut current = self;
        for part in path {
            current = current.section_mut(part.as_ref())?;
        }
        Some(current)
    }
}

/// The whole document; a thin owner of the root section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigStore {
    root: ConfigSection,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_root(root: ConfigSection) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ConfigSection {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut ConfigSection {
        &mut self.root
    }

    /// Section at `path`, where an empty path is the root.
    pub fn section<S: AsRef<str>>(&self, path: &[S]) -> Option<&ConfigSection> {
        self.root.descend(path)
    }

    pub fn section_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut ConfigSection> {
        self.root.descend_mut(path)
    }
}

/// Renders a path for error messages; the root shows as '<root>'.
pub(crate) fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter()
        .map(|part| part.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigStore {
        let mut store = ConfigStore::new();
        let root = store.root_mut();
        root.set_value("name", "demo".into());
        let mut server = ConfigSection::new();
        server.set_value("port", Value::Int(8080));
        server.mark_default("port");
        root.insert_section("server", server);
        store
    }

    #[test]
    fn test_path_navigation() {
        let store = sample();
        let server = store.section(&["server"]).unwrap();
        assert_eq!(server.value("port"), Some(&Value::Int(8080)));
        assert!(store.section(&["missing"]).is_none());
        assert_eq!(store.section::<&str>(&[]).unwrap().value("name"), Some(&"demo".into()));
    }

    #[test]
    fn test_default_bookkeeping() {
        let mut store = sample();
        let server = store.section_mut(&["server"]).unwrap();
        assert!(server.is_default("port"));
        server.clear_default("port");
        assert!(!server.is_default("port"));
        server.mark_default("port");
        server.remove_value("port");
        assert!(!server.is_default("port"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut section = ConfigSection::new();
        section.set_value("zeta", Value::Int(1));
        section.set_value("alpha", Value::Int(2));
        let names: Vec<&str> = section.values().map(|(name, _)| name).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn test_store_serde_round_trip() {
        let store = sample();
        let json = serde_json::to_string(&store).unwrap();
        let back: ConfigStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path::<&str>(&[]), "<root>");
        assert_eq!(join_path(&["a", "b"]), "a.b");
    }
}
