//! Custom error types for the simulator core.
//!
//! This module defines the primary error type, `CoreError`, for the whole
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the anomalies that are rejected synchronously at
//! an API boundary.
//!
//! ## Error Hierarchy
//!
//! - **`Structural`**: a malformed segment or an invalid node/segment handle.
//!   The requested edit does not apply and prior state is untouched.
//! - **`UnknownNodeType`**: a type key with no registry entry was encountered
//!   while instantiating a node from a stored record. Fatal to that
//!   instantiation; no default is silently substituted.
//! - **`BadStateBlob`**: a registry entry rejected the opaque state blob it
//!   was asked to deserialize.
//! - **`Io` / `Document`**: file and JSON problems while saving or loading
//!   circuit documents.
//!
//! Simulation-domain anomalies (driver conflicts, oscillation) are *not*
//! errors: they are absorbed into the `UNDEFINED` logic value and exposed as
//! per-net flags, so the tick loop never halts for them. See
//! [`crate::scheduler`].

use crate::geometry::GridPoint;
use crate::topology::{NodeId, SegmentId};
use thiserror::Error;

/// Convenience alias for results using the core error type.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Top-level error type for the simulator core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A structural edit was rejected at the API boundary.
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    /// No registry entry exists for the given node type key.
    #[error("unknown node type '{0}'")]
    UnknownNodeType(String),

    /// A registry entry could not rebuild a behavior from its state blob.
    #[error("malformed state for node type '{type_key}': {message}")]
    BadStateBlob {
        /// Type key whose deserializer failed.
        type_key: String,
        /// Human-readable reason.
        message: String,
    },

    /// I/O failure while reading or writing a document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure in the persistence layer.
    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),

    /// A stored document declares a format newer than this build knows.
    #[error("unsupported document format version {0}")]
    UnsupportedVersion(u32),
}

/// Rejections of malformed geometry or invalid topology handles.
///
/// These are synchronous: the edit that produced one has not been applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    /// Both endpoints of a wire segment coincide.
    #[error("segment at {0} has zero length")]
    ZeroLengthSegment(GridPoint),

    /// A wire segment is neither horizontal nor vertical.
    #[error("segment {a} -> {b} is not axis-aligned")]
    NotAxisAligned {
        /// First endpoint.
        a: GridPoint,
        /// Second endpoint.
        b: GridPoint,
    },

    /// A segment with identical endpoints already exists.
    #[error("segment {a} -> {b} already exists")]
    DuplicateSegment {
        /// First endpoint.
        a: GridPoint,
        /// Second endpoint.
        b: GridPoint,
    },

    /// No live segment is stored under the handle.
    #[error("no such segment: {0:?}")]
    UnknownSegment(SegmentId),

    /// No live segment spans the two endpoints.
    #[error("no segment between {a} and {b}")]
    NoSegmentBetween {
        /// First endpoint.
        a: GridPoint,
        /// Second endpoint.
        b: GridPoint,
    },

    /// No node is stored under the id.
    #[error("no such node: {0}")]
    UnknownNode(NodeId),

    /// A node with the same id is already present.
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// The node exists but has no pin with the given id.
    #[error("node {node} has no pin '{pin}'")]
    UnknownPin {
        /// Owning node.
        node: NodeId,
        /// Requested pin id.
        pin: String,
    },
}
