//! Structural edits: instantiating and removing wildcard-templated
//! sections.
//!
//! Both operations are all-or-nothing. Preconditions are checked before
//! anything is touched, the fresh subtree is built completely before being
//! spliced in, and the caller re-merges the view from the store afterwards,
//! so the two trees cannot diverge.

use log::debug;
use thiserror::Error;

use crate::catalog::SchemaCatalog;
use crate::events::{ChangeEvent, ChangeKind, Subscribers};
use crate::model::{prime, structural_violation, SectionNode};
use crate::store::{join_path, ConfigSection, ConfigStore};

/// A structural-edit precondition violation. No state change occurred.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EditError {
    #[error("'{name}' already exists under '{parent}'")]
    DuplicateName { parent: String, name: String },

    #[error("section '{path}' is declared by the schema and cannot be removed")]
    NotRemovable { path: String },

    #[error("section '{path}' does not accept dynamically added children")]
    NotRepeatable { path: String },

    #[error("no section at '{path}'")]
    NoSuchSection { path: String },

    #[error("no field '{name}' in section '{path}'")]
    NoSuchField { path: String, name: String },
}

/// Builds a fresh section from the parent's wildcard template, with every
/// scalar validated to its default, and attaches it under `name`.
pub(crate) fn add_section(
    store: &mut ConfigStore,
    parent: &SectionNode,
    name: &str,
    catalog: &SchemaCatalog,
    subscribers: &Subscribers,
) -> Result<(), EditError> {
    if !parent.is_repeatable() {
        return Err(EditError::NotRepeatable {
            path: join_path(parent.path()),
        });
    }
    let template = parent
        .spec()
        .wildcard()
        .unwrap_or_else(|| {
            structural_violation(&format!(
                "repeatable section '{}' has no wildcard template",
                join_path(parent.path())
            ))
        })
        .clone();

    let config_parent = store.section_mut(parent.path()).unwrap_or_else(|| {
        structural_violation(&format!(
            "view section '{}' missing from the store",
            join_path(parent.path())
        ))
    });
    if config_parent.has_child(name) {
        return Err(EditError::DuplicateName {
            parent: join_path(parent.path()),
            name: name.to_string(),
        });
    }

    let mut fresh = ConfigSection::new();
    prime(&mut fresh, &template, catalog).expect("wildcard template verified at load");
    config_parent.insert_section(name.to_string(), fresh);
    debug!("added section '{name}' under '{}'", join_path(parent.path()));

    let mut path = parent.path().to_vec();
    path.push(name.to_string());
    subscribers.emit(&ChangeEvent::new(path, ChangeKind::SectionAdded));
    Ok(())
}

/// Detaches a wildcard-instantiated section from its parent.
pub(crate) fn remove_section(
    store: &mut ConfigStore,
    node: &SectionNode,
    subscribers: &Subscribers,
) -> Result<(), EditError> {
    if !node.is_removable() {
        return Err(EditError::NotRemovable {
            path: join_path(node.path()),
        });
    }
    let (name, parent_path) = node
        .path()
        .split_last()
        .unwrap_or_else(|| structural_violation("removable section with an empty path"));

    let config_parent = store.section_mut(parent_path).unwrap_or_else(|| {
        structural_violation(&format!(
            "view section '{}' missing from the store",
            join_path(parent_path)
        ))
    });
    if config_parent.remove_section(name).is_none() {
        structural_violation(&format!(
            "section '{}' present in the view but not the store",
            join_path(node.path())
        ));
    }
    debug!("removed section '{}'", join_path(node.path()));

    subscribers.emit(&ChangeEvent::new(
        node.path().to_vec(),
        ChangeKind::SectionRemoved,
    ));
    Ok(())
}
