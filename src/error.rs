use thiserror::Error;

use crate::catalog::ValidationError;
use crate::model::{EditError, FieldError};
use crate::remote::RemoteError;
use crate::schema::SchemaError;
use crate::store::BridgeError;

/// Top-level error type for the confbind library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("field error: {0}")]
    Field(#[from] FieldError),

    #[error("structural edit rejected: {0}")]
    Edit(#[from] EditError),

    #[error("remote contract error: {0}")]
    Remote(#[from] RemoteError),

    #[error("config bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("session requires a configuration store")]
    MissingStore,

    #[error("session requires a schema")]
    MissingSchema,
}
