//! The schema tree: type declarations, defaults, and wildcard templates.
//!
//! A schema mirrors the shape of the documents it validates: sections hold
//! declared scalars and named child sections, plus an optional `__many__`
//! wildcard template describing arbitrarily-named repeatable children.

mod check;
mod parse;

use std::rc::Rc;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ValidationError;
use crate::value::Value;

pub(crate) use check::parse_check;

/// Errors raised while reading or verifying a schema.
///
/// These are fatal at session construction, never per-edit.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("schema parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("scalar '{name}' declares unknown type '{type_name}'")]
    UnknownType { name: String, type_name: String },

    #[error("default for '{name}' fails its own check: {source}")]
    BadDefault {
        name: String,
        #[source]
        source: ValidationError,
    },
}

/// One declared scalar: type name, check arguments, optional default and
/// description text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSpec {
    type_name: String,
    args: Vec<String>,
    kwargs: IndexMap<String, String>,
    default: Option<Value>,
    comment: Option<String>,
}

impl ScalarSpec {
    /// Parses a check expression such as `integer(default=4, min=-2, max=10)`
    /// or plain `boolean`.
    ///
    /// A quoted `default='x'` or bare `default=4` becomes a string default
    /// (coerced when primed); `default=list('a','b')` becomes a list default;
    /// a bare `default=None` means "no default".
    pub fn parse(decl: &str) -> Result<Self, SchemaError> {
        let parsed = parse_check(decl, 1)?;
        Ok(Self {
            type_name: parsed.type_name,
            args: parsed.args,
            kwargs: parsed.kwargs,
            default: parsed.default,
            comment: None,
        })
    }

    /// Attaches description text (a declaration's trailing comment, marker
    /// already stripped).
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn kwargs(&self) -> &IndexMap<String, String> {
        &self.kwargs
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub(crate) fn from_parts(
        type_name: String,
        args: Vec<String>,
        kwargs: IndexMap<String, String>,
        default: Option<Value>,
        comment: Option<String>,
    ) -> Self {
        Self {
            type_name,
            args,
            kwargs,
            default,
            comment,
        }
    }
}

/// A schema section: declared scalars, named child sections, and the
/// optional wildcard template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    scalars: IndexMap<String, ScalarSpec>,
    sections: IndexMap<String, Rc<SectionSpec>>,
    wildcard: Option<Rc<SectionSpec>>,
}

impl SectionSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a scalar. Declaration order is preserved and drives the
    /// merged layout.
    #[must_use]
    pub fn with_scalar(mut self, name: impl Into<String>, spec: ScalarSpec) -> Self {
        self.scalars.insert(name.into(), spec);
        self
    }

    /// Declares a named child section.
    #[must_use]
    pub fn with_section(mut self, name: impl Into<String>, child: SectionSpec) -> Self {
        self.sections.insert(name.into(), Rc::new(child));
        self
    }

    /// Declares the `__many__` wildcard template for repeatable children.
    #[must_use]
    pub fn with_wildcard(mut self, template: SectionSpec) -> Self {
        self.wildcard = Some(Rc::new(template));
        self
    }

    pub fn scalar(&self, name: &str) -> Option<&ScalarSpec> {
        self.scalars.get(name)
    }

    pub fn scalars(&self) -> impl Iterator<Item = (&str, &ScalarSpec)> {
        self.scalars.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn section(&self, name: &str) -> Option<&Rc<SectionSpec>> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Rc<SectionSpec>)> {
        self.sections.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn wildcard(&self) -> Option<&Rc<SectionSpec>> {
        self.wildcard.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.sections.is_empty() && self.wildcard.is_none()
    }

    pub(crate) fn insert_scalar(&mut self, name: String, spec: ScalarSpec) {
        self.scalars.insert(name, spec);
    }

    pub(crate) fn insert_section(&mut self, name: String, child: SectionSpec) {
        self.sections.insert(name, Rc::new(child));
    }

    pub(crate) fn set_wildcard(&mut self, template: SectionSpec) {
        self.wildcard = Some(Rc::new(template));
    }
}

/// A complete schema: the root section spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    root: Rc<SectionSpec>,
}

impl Schema {
    pub fn new(root: SectionSpec) -> Self {
        Self {
            root: Rc::new(root),
        }
    }

    /// Parses the bracket-nested schema text format:
    ///
    /// ```text
    /// interval = float(default=1.0, min=0.1)  # poll interval, seconds
    /// [servers]
    /// [[__many__]]
    /// enabled = boolean(default=True)
    /// ```
    ///
    /// Depth is the bracket count; a section literally named `__many__`
    /// becomes its parent's wildcard template.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        parse::parse_schema(text).map(Self::new)
    }

    pub fn root(&self) -> &Rc<SectionSpec> {
        &self.root
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}
