//! A bound scalar leaf of the view tree.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::catalog::{CatalogEntry, CheckArgs, CheckFn, ValidationError};
use crate::events::{ChangeEvent, ChangeKind, Subscribers};
use crate::model::structural_violation;
use crate::schema::ScalarSpec;
use crate::store::{join_path, ConfigStore};
use crate::value::Value;

/// Errors from reading a bound field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FieldError {
    /// The field has no stored value and no declared default. Recovered
    /// locally; the field is treated as unset.
    #[error("'{name}' has no stored value and no default")]
    KeyNotSet { name: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// A typed, validated scalar bound to one slot of the store.
///
/// Fields never cache values: every read goes to the owning section, found
/// by path. They are recreated on every rebuild of the view tree and carry
/// no authoritative state of their own.
#[derive(Clone)]
pub struct Field {
    name: String,
    section_path: Vec<String>,
    type_name: String,
    args: Vec<String>,
    kwargs: IndexMap<String, String>,
    default: Option<Value>,
    comment: Option<String>,
    check: CheckFn,
    splits_input: bool,
    subscribers: Subscribers,
}

impl Field {
    pub(crate) fn from_spec(
        name: &str,
        section_path: Vec<String>,
        spec: &ScalarSpec,
        entry: &CatalogEntry,
        subscribers: Subscribers,
    ) -> Self {
        Self {
            name: name.to_string(),
            section_path,
            type_name: spec.type_name().to_string(),
            args: spec.args().to_vec(),
            kwargs: spec.kwargs().clone(),
            default: spec.default().cloned(),
            comment: spec.comment().map(str::to_string),
            check: entry.check.clone(),
            splits_input: entry.splits_input,
            subscribers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Description text from the schema declaration's trailing comment.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The declared default, in its raw (uncoerced) form.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn section_path(&self) -> &[String] {
        &self.section_path
    }

    /// Full path of this field's slot: owning section path plus name.
    pub fn path(&self) -> Vec<String> {
        let mut path = self.section_path.clone();
        path.push(self.name.clone());
        path
    }

    /// Raw edits to list-kind fields arrive as one comma-separated string.
    fn prepare(&self, raw: &str) -> Value {
        if self.splits_input {
            Value::split_list(raw)
        } else {
            Value::Str(raw.to_string())
        }
    }

    fn run_check(&self, value: &Value) -> Result<Value, ValidationError> {
        (self.check)(value, &CheckArgs::new(&self.args, &self.kwargs))
    }

    /// Non-mutating dry run over raw input; drives validity feedback
    /// independent of commit.
    pub fn validate(&self, raw: &str) -> Result<Value, ValidationError> {
        self.run_check(&self.prepare(raw))
    }

    /// Live-reads the coerced current value.
    ///
    /// Falls back to the declared default when the slot is empty;
    /// [`FieldError::KeyNotSet`] when there is neither.
    pub fn get(&self, store: &ConfigStore) -> Result<Value, FieldError> {
        let not_set = || FieldError::KeyNotSet {
            name: self.name.clone(),
        };
        let section = store.section(&self.section_path).ok_or_else(not_set)?;
        let stored = match section.value(&self.name) {
            Some(value) => value,
            None => self.default.as_ref().ok_or_else(not_set)?,
        };
        Ok(self.run_check(stored)?)
    }

    /// Validates raw input and, on success, writes the typed value and
    /// clears default status. On failure the stored value is untouched.
    ///
    /// # Panics
    ///
    /// Panics if the owning section has disappeared from the store: the
    /// view and the document have diverged, which is a programming error.
    pub fn set(&self, store: &mut ConfigStore, raw: &str) -> Result<Value, ValidationError> {
        let typed = self.validate(raw)?;
        let section = store
            .section_mut(&self.section_path)
            .unwrap_or_else(|| {
                structural_violation(&format!(
                    "field '{}' bound to missing section '{}'",
                    self.name,
                    join_path(&self.section_path)
                ))
            });
        section.set_value(self.name.clone(), typed.clone());
        section.clear_default(&self.name);
        self.subscribers
            .emit(&ChangeEvent::new(self.path(), ChangeKind::FieldSet));
        Ok(typed)
    }

    /// True iff the field currently carries its declared default.
    pub fn is_default(&self, store: &ConfigStore) -> bool {
        store
            .section(&self.section_path)
            .is_some_and(|section| section.is_default(&self.name))
    }

    /// Reverts the field to its declared default and re-marks default
    /// status. [`FieldError::KeyNotSet`] when no default is declared.
    ///
    /// # Panics
    ///
    /// Panics if the owning section has disappeared from the store.
    pub fn restore_default(&self, store: &mut ConfigStore) -> Result<Value, FieldError> {
        let default = self.default.clone().ok_or_else(|| FieldError::KeyNotSet {
            name: self.name.clone(),
        })?;
        let typed = self.run_check(&default)?;
        let section = store
            .section_mut(&self.section_path)
            .unwrap_or_else(|| {
                structural_violation(&format!(
                    "field '{}' bound to missing section '{}'",
                    self.name,
                    join_path(&self.section_path)
                ))
            });
        section.set_value(self.name.clone(), typed.clone());
        section.mark_default(&self.name);
        self.subscribers
            .emit(&ChangeEvent::new(self.path(), ChangeKind::FieldRestored));
        Ok(typed)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("section_path", &self.section_path)
            .field("type_name", &self.type_name)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("default", &self.default)
            .field("comment", &self.comment)
            .field("splits_input", &self.splits_input)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;
    use crate::store::ConfigSection;

    fn bound_field(decl: &str) -> (Field, ConfigStore) {
        let catalog = SchemaCatalog::standard();
        let spec = ScalarSpec::parse(decl).unwrap();
        let entry = catalog.entry(spec.type_name()).unwrap();
        let field = Field::from_spec(
            "myfield",
            vec!["section".to_string()],
            &spec,
            entry,
            Subscribers::new(),
        );

        let mut store = ConfigStore::new();
        store
            .root_mut()
            .insert_section("section", ConfigSection::new());
        if let Some(default) = field.default_value() {
            let typed = field.run_check(default).unwrap();
            let section = store.section_mut(&["section"]).unwrap();
            section.set_value("myfield", typed);
            section.mark_default("myfield");
        }
        (field, store)
    }

    #[test]
    fn test_rejected_set_keeps_prior_value() {
        let (field, mut store) = bound_field("integer(default=4, min=-2, max=10)");
        assert!(field.set(&mut store, "15").is_err());
        assert_eq!(field.get(&store).unwrap(), Value::Int(4));
        assert!(field.is_default(&store));
    }

    #[test]
    fn test_set_then_get_returns_coerced_value() {
        let (field, mut store) = bound_field("integer(default=4, min=-2, max=10)");
        field.set(&mut store, "7").unwrap();
        assert_eq!(field.get(&store).unwrap(), Value::Int(7));
        assert!(!field.is_default(&store));
    }

    #[test]
    fn test_restore_default_round_trip() {
        let (field, mut store) = bound_field("integer(default=4, min=-2, max=10)");
        field.set(&mut store, "7").unwrap();
        field.restore_default(&mut store).unwrap();
        assert_eq!(field.get(&store).unwrap(), Value::Int(4));
        assert!(field.is_default(&store));
    }

    #[test]
    fn test_list_input_is_split() {
        let (field, mut store) = bound_field("list(default=list('a', 'b'))");
        assert_eq!(
            field.get(&store).unwrap(),
            Value::List(vec!["a".into(), "b".into()])
        );
        field.set(&mut store, "x, y , z").unwrap();
        assert_eq!(
            field.get(&store).unwrap(),
            Value::List(vec!["x".into(), "y".into(), "z".into()])
        );
    }

    #[test]
    fn test_get_without_value_or_default() {
        let (field, mut store) = bound_field("integer");
        assert_eq!(
            field.get(&store),
            Err(FieldError::KeyNotSet {
                name: "myfield".to_string()
            })
        );
        assert!(matches!(
            field.restore_default(&mut store),
            Err(FieldError::KeyNotSet { .. })
        ));
    }

    #[test]
    fn test_get_falls_back_to_default_on_empty_slot() {
        let (field, mut store) = bound_field("integer(default=4)");
        store
            .section_mut(&["section"])
            .unwrap()
            .remove_value("myfield");
        assert_eq!(field.get(&store).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_validate_does_not_mutate() {
        let (field, store) = bound_field("integer(default=4, min=-2, max=10)");
        assert!(field.validate("15").is_err());
        assert_eq!(field.validate("7").unwrap(), Value::Int(7));
        assert_eq!(field.get(&store).unwrap(), Value::Int(4));
    }

    #[test]
    fn test_set_emits_one_event() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let (field, mut store) = bound_field("integer(default=4)");
        let seen: Rc<RefCell<Vec<ChangeEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        field.subscribers.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        field.set(&mut store, "7").unwrap();
        field.restore_default(&mut store).unwrap();
        let _ = field.set(&mut store, "not a number");

        let events = seen.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ChangeKind::FieldSet);
        assert_eq!(events[0].path, vec!["section".to_string(), "myfield".to_string()]);
        assert_eq!(events[1].kind, ChangeKind::FieldRestored);
    }
}
