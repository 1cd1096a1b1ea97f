//! An editing session over one configuration store.
//!
//! A session owns the store, the schema, the catalog, and the merged view,
//! and is the single entry point the presentation layer talks to. In
//! immediate mode edits land in the caller's store as they happen; in
//! deferred mode they land in a working copy until [`Session::apply`]
//! reconciles them back.

use log::debug;

use crate::catalog::SchemaCatalog;
use crate::error::Error;
use crate::events::{ChangeEvent, ChangeKind, Subscribers};
use crate::model::{
    add_section, merge, prime, remove_section, verify_schema, EditError, Field, SectionNode,
};
use crate::schema::Schema;
use crate::store::{join_path, ConfigSection, ConfigStore};
use crate::value::Value;

/// When edits reach the caller's store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyMode {
    /// Every successful edit mutates the store directly.
    #[default]
    Immediate,
    /// Edits mutate a working copy; [`Session::apply`] reconciles.
    Deferred,
}

/// Builder for constructing a [`Session`].
///
/// The catalog defaults to [`SchemaCatalog::standard`] and the mode to
/// [`ApplyMode::Immediate`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct SessionBuilder {
    store: Option<ConfigStore>,
    schema: Option<Schema>,
    catalog: Option<SchemaCatalog>,
    mode: ApplyMode,
}

impl SessionBuilder {
    pub fn with_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Overrides the standard catalog, e.g. to add custom types.
    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_mode(mut self, mode: ApplyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Verifies the schema, primes the store, and builds the view.
    ///
    /// Schema problems (unknown types, defaults failing their own checks)
    /// are fatal here, never later.
    pub fn build(self) -> Result<Session, Error> {
        let mut original = self.store.ok_or(Error::MissingStore)?;
        let schema = self.schema.ok_or(Error::MissingSchema)?;
        let catalog = self.catalog.unwrap_or_default();

        verify_schema(schema.root(), &catalog)?;
        prime(original.root_mut(), schema.root(), &catalog)?;

        let working = match self.mode {
            ApplyMode::Deferred => Some(original.clone()),
            ApplyMode::Immediate => None,
        };
        let subscribers = Subscribers::new();
        let active = working.as_ref().unwrap_or(&original);
        let root = merge(active.root(), schema.root(), &catalog, &subscribers)?;

        Ok(Session {
            catalog,
            schema,
            original,
            working,
            root,
            subscribers,
        })
    }
}

/// An open editing session; see the module docs.
#[derive(Debug)]
pub struct Session {
    catalog: SchemaCatalog,
    schema: Schema,
    original: ConfigStore,
    working: Option<ConfigStore>,
    root: SectionNode,
    subscribers: Subscribers,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    pub fn mode(&self) -> ApplyMode {
        if self.working.is_some() {
            ApplyMode::Deferred
        } else {
            ApplyMode::Immediate
        }
    }

    /// Root of the merged view tree.
    pub fn root(&self) -> &SectionNode {
        &self.root
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    /// The store edits are visible in: the working copy in deferred mode,
    /// the caller's store otherwise.
    pub fn store(&self) -> &ConfigStore {
        self.working.as_ref().unwrap_or(&self.original)
    }

    /// The caller's store, untouched by unapplied deferred edits.
    pub fn original(&self) -> &ConfigStore {
        &self.original
    }

    /// Consumes the session, returning the caller's store.
    pub fn into_store(self) -> ConfigStore {
        self.original
    }

    /// Registers a change listener. Notifications arrive synchronously,
    /// within the mutating call.
    pub fn subscribe(&self, callback: impl Fn(&ChangeEvent) + 'static) {
        self.subscribers.subscribe(callback);
    }

    pub fn section<S: AsRef<str>>(&self, path: &[S]) -> Result<&SectionNode, EditError> {
        self.root.descend(path).ok_or_else(|| EditError::NoSuchSection {
            path: join_path(path),
        })
    }

    pub fn field<S: AsRef<str>>(&self, section: &[S], name: &str) -> Result<&Field, EditError> {
        self.section(section)?
            .field(name)
            .ok_or_else(|| EditError::NoSuchField {
                path: join_path(section),
                name: name.to_string(),
            })
    }

    /// Current coerced value of a field.
    pub fn get<S: AsRef<str>>(&self, section: &[S], name: &str) -> Result<Value, Error> {
        let field = self.field(section, name)?;
        Ok(field.get(self.store())?)
    }

    /// Validates and commits raw input to a field.
    pub fn set<S: AsRef<str>>(
        &mut self,
        section: &[S],
        name: &str,
        raw: &str,
    ) -> Result<Value, Error> {
        let field = self.field(section, name)?.clone();
        Ok(field.set(self.active_mut(), raw)?)
    }

    /// Dry-run validation of raw input; never mutates.
    pub fn validate<S: AsRef<str>>(
        &self,
        section: &[S],
        name: &str,
        raw: &str,
    ) -> Result<Value, Error> {
        let field = self.field(section, name)?;
        Ok(field.validate(raw)?)
    }

    pub fn is_default<S: AsRef<str>>(&self, section: &[S], name: &str) -> Result<bool, Error> {
        let field = self.field(section, name)?;
        Ok(field.is_default(self.store()))
    }

    pub fn restore_default<S: AsRef<str>>(
        &mut self,
        section: &[S],
        name: &str,
    ) -> Result<Value, Error> {
        let field = self.field(section, name)?.clone();
        Ok(field.restore_default(self.active_mut())?)
    }

    /// Instantiates the wildcard template under a repeatable section.
    /// Returns the freshly merged node.
    pub fn add_section<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        name: &str,
    ) -> Result<&SectionNode, Error> {
        let parent_node = self.section(parent)?.clone();
        let store = match self.working {
            Some(ref mut working) => working,
            None => &mut self.original,
        };
        add_section(store, &parent_node, name, &self.catalog, &self.subscribers)?;
        self.rebuild();

        let mut path = parent_node.path().to_vec();
        path.push(name.to_string());
        Ok(self
            .root
            .descend(&path)
            .expect("freshly inserted section is in the rebuilt view"))
    }

    /// Removes a wildcard-instantiated section.
    pub fn remove_section<S: AsRef<str>>(&mut self, path: &[S]) -> Result<(), Error> {
        let node = self.section(path)?.clone();
        let store = match self.working {
            Some(ref mut working) => working,
            None => &mut self.original,
        };
        remove_section(store, &node, &self.subscribers)?;
        self.rebuild();
        Ok(())
    }

    /// Reconciles the working copy into the caller's store.
    ///
    /// Scalars that differ and are not defaults are copied forward; scalars
    /// reverted to default are restored in the original; added and removed
    /// sections are created and deleted recursively. One notification per
    /// logically changed field or section. No-op in immediate mode.
    pub fn apply(&mut self) {
        let Some(working) = self.working.as_ref() else {
            return;
        };
        let mut events = Vec::new();
        let mut path = Vec::new();
        diff_apply(self.original.root_mut(), working.root(), &mut path, &mut events);
        debug!("applied {} change(s) to the original store", events.len());
        for event in &events {
            self.subscribers.emit(event);
        }
        self.working = Some(self.original.clone());
        self.rebuild();
    }

    /// Discards all unapplied edits; the caller's store is untouched.
    /// No-op in immediate mode.
    pub fn cancel(&mut self) {
        if self.working.is_some() {
            debug!("cancelled deferred session edits");
            self.working = Some(self.original.clone());
            self.rebuild();
        }
    }

    fn active_mut(&mut self) -> &mut ConfigStore {
        match self.working {
            Some(ref mut working) => working,
            None => &mut self.original,
        }
    }

    fn rebuild(&mut self) {
        let store = self.working.as_ref().unwrap_or(&self.original);
        let root = merge(store.root(), self.schema.root(), &self.catalog, &self.subscribers)
            .expect("schema verified at construction");
        self.root = root;
    }
}

/// Recursive working-copy vs original diff; see [`Session::apply`].
fn diff_apply(
    original: &mut ConfigSection,
    working: &ConfigSection,
    path: &mut Vec<String>,
    events: &mut Vec<ChangeEvent>,
) {
    let mut added = Vec::new();
    for (name, w_child) in working.sections() {
        if original.section(name).is_none() {
            original.insert_section(name.to_string(), w_child.clone());
            added.push(name.to_string());
            path.push(name.to_string());
            events.push(ChangeEvent::new(path.clone(), ChangeKind::SectionAdded));
            path.pop();
        }
    }

    let removed: Vec<String> = original
        .section_names()
        .filter(|name| working.section(name).is_none())
        .map(str::to_string)
        .collect();
    for name in removed {
        original.remove_section(&name);
        path.push(name);
        events.push(ChangeEvent::new(path.clone(), ChangeKind::SectionRemoved));
        path.pop();
    }

    for (name, w_value) in working.values() {
        let w_default = working.is_default(name);
        let existing = original.value(name).cloned();
        let o_default = original.is_default(name);
        match existing {
            None => {
                if !w_default {
                    original.set_value(name.to_string(), w_value.clone());
                    original.clear_default(name);
                    path.push(name.to_string());
                    events.push(ChangeEvent::new(path.clone(), ChangeKind::FieldSet));
                    path.pop();
                }
            }
            Some(o_value) => {
                if w_default {
                    if !o_default {
                        original.set_value(name.to_string(), w_value.clone());
                        original.mark_default(name.to_string());
                        path.push(name.to_string());
                        events.push(ChangeEvent::new(path.clone(), ChangeKind::FieldRestored));
                        path.pop();
                    }
                } else if o_value != *w_value {
                    original.set_value(name.to_string(), w_value.clone());
                    original.clear_default(name);
                    path.push(name.to_string());
                    events.push(ChangeEvent::new(path.clone(), ChangeKind::FieldSet));
                    path.pop();
                } else if o_default {
                    // Same value, but now explicit rather than defaulted.
                    original.clear_default(name);
                }
            }
        }
    }

    for (name, w_child) in working.sections() {
        if added.iter().any(|a| a == name) {
            continue;
        }
        if let Some(o_child) = original.section_mut(name) {
            path.push(name.to_string());
            diff_apply(o_child, w_child, path, events);
            path.pop();
        }
    }
}
