//! Wire contract for out-of-process editing.
//!
//! The host serializes a (store, schema) pair to the editor process's
//! input, blocks until that process's session ends, and reads the resulting
//! store back from its output. Launching and supervising the process is the
//! host's job; this module only defines the messages and the blocking
//! round trip over caller-supplied handles.

use std::io::{Read, Write};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::Schema;
use crate::store::ConfigStore;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("wire i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },

    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        source: serde_json::Error,
    },
}

/// What the host sends: the document to edit and the schema to edit it by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    pub config: ConfigStore,
    pub schema: Schema,
}

/// What the editor sends back once its session ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditResponse {
    pub config: ConfigStore,
}

pub fn write_request<W: Write>(mut writer: W, request: &EditRequest) -> Result<(), RemoteError> {
    serde_json::to_writer(&mut writer, request).map_err(|source| RemoteError::Encode {
        what: "edit request",
        source,
    })?;
    writer.flush()?;
    Ok(())
}

pub fn read_request<R: Read>(reader: R) -> Result<EditRequest, RemoteError> {
    serde_json::from_reader(reader).map_err(|source| RemoteError::Decode {
        what: "edit request",
        source,
    })
}

pub fn write_response<W: Write>(mut writer: W, response: &EditResponse) -> Result<(), RemoteError> {
    serde_json::to_writer(&mut writer, response).map_err(|source| RemoteError::Encode {
        what: "edit response",
        source,
    })?;
    writer.flush()?;
    Ok(())
}

pub fn read_response<R: Read>(reader: R) -> Result<EditResponse, RemoteError> {
    serde_json::from_reader(reader).map_err(|source| RemoteError::Decode {
        what: "edit response",
        source,
    })
}

/// One blocking round trip: write the request, drop the input handle (so a
/// pipe-backed editor sees end of input), then block reading the response.
///
/// Cancellation is not managed here; the call returns when the editor
/// process ends its session and closes its output.
pub fn round_trip<W: Write, R: Read>(
    input: W,
    output: R,
    request: &EditRequest,
) -> Result<EditResponse, RemoteError> {
    write_request(input, request)?;
    debug!("edit request written, waiting for the editor to finish");
    read_response(output)
}
