//! Built-in node types.
//!
//! Each submodule contributes its [`NodeKind`] entries to
//! [`builtin_kinds`], which [`crate::registry::NodeRegistry::with_builtins`]
//! consumes at startup. State blobs are small serde structs; a blob that
//! fails to deserialize is a [`CoreError::BadStateBlob`], surfaced to the
//! caller instead of being patched up.

pub mod arith;
pub mod gates;
pub mod io;

use crate::error::{CoreError, CoreResult};
use crate::registry::NodeKind;
use serde::de::DeserializeOwned;

/// Every built-in node kind, ready for registration.
pub fn builtin_kinds() -> Vec<NodeKind> {
    let mut kinds = Vec::new();
    kinds.extend(gates::kinds());
    kinds.extend(io::kinds());
    kinds.extend(arith::kinds());
    kinds
}

pub(crate) fn parse_state<T: DeserializeOwned>(
    type_key: &'static str,
    blob: &serde_json::Value,
) -> CoreResult<T> {
    serde_json::from_value(blob.clone()).map_err(|e| CoreError::BadStateBlob {
        type_key: type_key.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn blob_of<T: serde::Serialize>(
    type_key: &'static str,
    state: &T,
) -> CoreResult<serde_json::Value> {
    serde_json::to_value(state).map_err(|e| CoreError::BadStateBlob {
        type_key: type_key.to_string(),
        message: e.to_string(),
    })
}
