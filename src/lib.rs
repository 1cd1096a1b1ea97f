//! Schema-driven configuration merge, validation, and live binding.
//!
//! confbind combines a mutable configuration document (nested sections of
//! named scalar values) with a schema (type declarations, defaults,
//! validators, and `__many__` wildcard templates) into one editable model
//! of typed, validated, default-tracked fields. Repeatable sections can be
//! instantiated and removed at runtime, and a deferred-apply session keeps
//! edits on a working copy until they are reconciled in one step.
//!
//! ## Example
//!
//! ```
//! use confbind::{ApplyMode, ConfigStore, Schema, Session, Value};
//!
//! let schema = Schema::parse(
//!     "retries = integer(default=3, min=0, max=10)  # how often to retry\n\
//!      [servers]\n\
//!      [[__many__]]\n\
//!      enabled = boolean(default=True)\n",
//! )?;
//!
//! let mut session = Session::builder()
//!     .with_store(ConfigStore::new())
//!     .with_schema(schema)
//!     .with_mode(ApplyMode::Deferred)
//!     .build()?;
//!
//! let root: [&str; 0] = [];
//! session.set(&root, "retries", "5")?;
//! session.add_section(&["servers"], "primary")?;
//! assert_eq!(
//!     session.get(&["servers", "primary"], "enabled")?,
//!     Value::Bool(true)
//! );
//!
//! session.apply();
//! assert_eq!(session.original().root().value("retries"), Some(&Value::Int(5)));
//! # Ok::<(), confbind::Error>(())
//! ```

pub mod catalog;
mod error;
pub mod events;
pub mod model;
pub mod remote;
pub mod schema;
pub mod session;
pub mod store;
pub mod value;

pub use catalog::{CheckArgs, SchemaCatalog, ValidationError};
pub use error::Error;
pub use events::{ChangeEvent, ChangeKind, Subscribers};
pub use model::{merge, prime, verify_schema, EditError, Field, FieldError, SectionNode};
pub use schema::{ScalarSpec, Schema, SchemaError, SectionSpec};
pub use session::{ApplyMode, Session, SessionBuilder};
pub use store::{ConfigSection, ConfigStore};
pub use value::Value;
