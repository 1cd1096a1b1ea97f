//! The editable model: merge engine, bound fields, view tree, and
//! structural edits.

mod field;
mod lifecycle;
mod merge;
mod tree;

pub use field::{Field, FieldError};
pub use lifecycle::EditError;
pub use merge::{merge, prime, verify_schema};
pub use tree::SectionNode;

pub(crate) use lifecycle::{add_section, remove_section};

/// The store and the view tree are kept consistent by construction; a
/// mismatch discovered at runtime is a programming error, not something a
/// caller can recover from.
pub(crate) fn structural_violation(detail: &str) -> ! {
    panic!("structural atomicity violated: {detail}");
}
