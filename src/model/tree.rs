//! The merged view tree: sections of bound fields.

use std::rc::Rc;

use crate::model::Field;
use crate::schema::SectionSpec;

/// One node of the merged view: the fields and child sections visible at a
/// config section, plus cardinality flags.
///
/// Nodes are plain data rebuilt by the merge engine; authoritative state
/// lives in the store. The root node has no name.
#[derive(Debug, Clone)]
pub struct SectionNode {
    name: Option<String>,
    path: Vec<String>,
    fields: Vec<Field>,
    sections: Vec<SectionNode>,
    repeatable: bool,
    removable: bool,
    spec: Rc<SectionSpec>,
}

impl SectionNode {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: Option<String>,
        path: Vec<String>,
        fields: Vec<Field>,
        sections: Vec<SectionNode>,
        repeatable: bool,
        removable: bool,
        spec: Rc<SectionSpec>,
    ) -> Self {
        Self {
            name,
            path,
            fields,
            sections,
            repeatable,
            removable,
            spec,
        }
    }

    /// Section name; `None` at the root.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Path from the root of the store to this section.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn sections(&self) -> &[SectionNode] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&SectionNode> {
        self.sections
            .iter()
            .find(|section| section.name() == Some(name))
    }

    /// Walks down through named child sections; an empty path returns self.
    pub fn descend<S: AsRef<str>>(&self, path: &[S]) -> Option<&SectionNode> {
        let mut current = self;
        for part in path {
            current = current.section(part.as_ref())?;
        }
        Some(current)
    }

    /// True if new same-shaped children may be added under this section.
    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    /// True if this section was instantiated from a wildcard template and
    /// may be removed.
    pub fn is_removable(&self) -> bool {
        self.removable
    }

    /// Names of all visible children, fields and sections alike.
    pub fn child_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.iter().map(|f| f.name()).collect();
        names.extend(self.sections.iter().filter_map(|s| s.name()));
        names
    }

    pub(crate) fn spec(&self) -> &Rc<SectionSpec> {
        &self.spec
    }
}
