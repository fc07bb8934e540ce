//! Circuit document persistence.
//!
//! A document captures everything needed to restore a circuit: one record
//! per node (type key, opaque state blob, grid position, rotation, unique
//! id) and the list of wire segment endpoint pairs, plus format metadata.
//! Documents serialize to pretty-printed JSON files.
//!
//! Loading never patches around problems: an unknown type key or a
//! malformed state blob fails the whole instantiation and the caller's
//! previous workbench is untouched (a fresh workbench is built and only
//! handed over on success).

use crate::error::{CoreError, CoreResult};
use crate::geometry::{GridPoint, Rotation};
use crate::registry::NodeRegistry;
use crate::topology::NodeId;
use crate::workbench::Workbench;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Newest document format this build reads and writes.
pub const FORMAT_VERSION: u32 = 1;

/// One stored node instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Stable instance id.
    pub id: NodeId,
    /// Registry type key.
    pub type_key: String,
    /// Opaque per-type state blob.
    pub state: serde_json::Value,
    /// Grid position.
    pub position: GridPoint,
    /// Quarter-turn rotation.
    pub rotation: Rotation,
}

impl NodeRecord {
    /// A record for a freshly-placed node with a new id.
    pub fn new(
        type_key: &str,
        state: serde_json::Value,
        position: GridPoint,
        rotation: Rotation,
    ) -> Self {
        NodeRecord {
            id: NodeId::fresh(),
            type_key: type_key.to_string(),
            state,
            position,
            rotation,
        }
    }
}

/// All stored wire segments, as endpoint pairs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WireRecord {
    /// Segment endpoint pairs.
    pub segments: Vec<(GridPoint, GridPoint)>,
}

/// Document metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Format version, for forward-compatibility checks.
    pub format_version: u32,
    /// When the document was captured.
    pub created: DateTime<Utc>,
    /// Application that wrote it.
    pub generator: String,
}

/// A complete stored circuit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    /// Format and provenance.
    pub meta: DocumentMeta,
    /// Node records.
    pub nodes: Vec<NodeRecord>,
    /// Wire segments.
    pub wires: WireRecord,
}

impl Document {
    /// Capture the current state of a workbench.
    pub fn capture(bench: &Workbench) -> CoreResult<Document> {
        let mut ids: Vec<NodeId> = bench.topology().node_ids().collect();
        ids.sort_unstable();
        let nodes = ids
            .into_iter()
            .map(|id| bench.node_record(id))
            .collect::<CoreResult<Vec<_>>>()?;
        let segments = bench
            .topology()
            .segments()
            .map(|(_, seg)| seg.endpoints())
            .collect();
        Ok(Document {
            meta: DocumentMeta {
                format_version: FORMAT_VERSION,
                created: Utc::now(),
                generator: format!("wirelab {}", env!("CARGO_PKG_VERSION")),
            },
            nodes,
            wires: WireRecord { segments },
        })
    }

    /// Build a live workbench from this document.
    pub fn instantiate(
        &self,
        registry: Arc<NodeRegistry>,
        oscillation_limit: u32,
    ) -> CoreResult<Workbench> {
        if self.meta.format_version > FORMAT_VERSION {
            return Err(CoreError::UnsupportedVersion(self.meta.format_version));
        }
        let mut bench = Workbench::new(registry, oscillation_limit);
        for record in &self.nodes {
            bench.add_node(record)?;
        }
        for &(a, b) in &self.wires.segments {
            bench.add_segment(a, b)?;
        }
        Ok(bench)
    }
}

/// Save a document as pretty-printed JSON.
pub fn save_document(document: &Document, path: &Path) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a document from a JSON file.
pub fn load_document(path: &Path) -> CoreResult<Document> {
    let json = fs::read_to_string(path)?;
    let document: Document = serde_json::from_str(&json)?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_document() -> Document {
        let registry = Arc::new(NodeRegistry::with_builtins());
        let mut bench = Workbench::new(registry, 32);
        let record = NodeRecord::new(
            "and",
            serde_json::json!({ "width": 1, "delay": 2 }),
            GridPoint::new(4, 4),
            Rotation::R90,
        );
        bench.add_node(&record).unwrap();
        bench
            .add_segment(GridPoint::new(0, 0), GridPoint::new(4, 0))
            .unwrap();
        Document::capture(&bench).unwrap()
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("circuit.json");

        let document = sample_document();
        save_document(&document, &path).unwrap();
        let loaded = load_document(&path).unwrap();

        assert_eq!(loaded.meta.format_version, FORMAT_VERSION);
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.nodes[0].type_key, "and");
        assert_eq!(loaded.nodes[0].rotation, Rotation::R90);
        assert_eq!(loaded.wires.segments, document.wires.segments);
    }

    #[test]
    fn newer_format_version_is_rejected() {
        let mut document = sample_document();
        document.meta.format_version = FORMAT_VERSION + 1;
        let registry = Arc::new(NodeRegistry::with_builtins());
        let err = document.instantiate(registry, 32).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedVersion(_)));
    }

    #[test]
    fn unknown_type_key_fails_instantiation() {
        let mut document = sample_document();
        document.nodes[0].type_key = "quantum-flux".to_string();
        let registry = Arc::new(NodeRegistry::with_builtins());
        let err = document.instantiate(registry, 32).unwrap_err();
        assert!(matches!(err, CoreError::UnknownNodeType(_)));
    }
}
