//! Undo/redo as data-carrying command objects.
//!
//! Each structural edit is represented as an [`EditCommand`] value holding
//! everything needed to apply it *and* to build its inverse — no captured
//! closures, so history can be inspected, serialized or bounded. The
//! invertibility contract comes from the workbench edit operations, each
//! of which returns the state the caller must retain (a removed node's
//! full record, a move's previous position, ...).

use crate::error::CoreResult;
use crate::geometry::{GridPoint, Rotation};
use crate::session::NodeRecord;
use crate::topology::NodeId;
use crate::workbench::Workbench;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One invertible structural edit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EditCommand {
    /// Place a node from its full record.
    AddNode {
        /// The node to (re)create.
        record: NodeRecord,
    },
    /// Remove a node; the record makes redo-after-undo exact.
    RemoveNode {
        /// The node as it existed at removal time.
        record: NodeRecord,
    },
    /// Move a node between grid positions.
    MoveNode {
        /// Target node.
        id: NodeId,
        /// Position before the edit.
        from: GridPoint,
        /// Position after the edit.
        to: GridPoint,
    },
    /// Rotate a node.
    RotateNode {
        /// Target node.
        id: NodeId,
        /// Rotation before the edit.
        from: Rotation,
        /// Rotation after the edit.
        to: Rotation,
    },
    /// Replace a node's state blob.
    SetNodeState {
        /// Target node.
        id: NodeId,
        /// Blob before the edit.
        from: serde_json::Value,
        /// Blob after the edit.
        to: serde_json::Value,
    },
    /// Add a wire segment.
    AddSegment {
        /// First endpoint.
        a: GridPoint,
        /// Second endpoint.
        b: GridPoint,
    },
    /// Remove a wire segment.
    RemoveSegment {
        /// First endpoint.
        a: GridPoint,
        /// Second endpoint.
        b: GridPoint,
    },
}

impl EditCommand {
    /// The command that exactly undoes this one.
    pub fn inverse(&self) -> EditCommand {
        match self {
            EditCommand::AddNode { record } => EditCommand::RemoveNode {
                record: record.clone(),
            },
            EditCommand::RemoveNode { record } => EditCommand::AddNode {
                record: record.clone(),
            },
            EditCommand::MoveNode { id, from, to } => EditCommand::MoveNode {
                id: *id,
                from: *to,
                to: *from,
            },
            EditCommand::RotateNode { id, from, to } => EditCommand::RotateNode {
                id: *id,
                from: *to,
                to: *from,
            },
            EditCommand::SetNodeState { id, from, to } => EditCommand::SetNodeState {
                id: *id,
                from: to.clone(),
                to: from.clone(),
            },
            EditCommand::AddSegment { a, b } => EditCommand::RemoveSegment { a: *a, b: *b },
            EditCommand::RemoveSegment { a, b } => EditCommand::AddSegment { a: *a, b: *b },
        }
    }

    /// Apply the edit through the workbench.
    pub fn apply(&self, bench: &mut Workbench) -> CoreResult<()> {
        match self {
            EditCommand::AddNode { record } => bench.add_node(record),
            EditCommand::RemoveNode { record } => bench.remove_node(record.id).map(|_| ()),
            EditCommand::MoveNode { id, to, .. } => bench.move_node(*id, *to).map(|_| ()),
            EditCommand::RotateNode { id, to, .. } => bench.rotate_node(*id, *to).map(|_| ()),
            EditCommand::SetNodeState { id, to, .. } => {
                bench.set_node_state(*id, to).map(|_| ())
            }
            EditCommand::AddSegment { a, b } => bench.add_segment(*a, *b).map(|_| ()),
            EditCommand::RemoveSegment { a, b } => bench.remove_segment_between(*a, *b).map(|_| ()),
        }
    }

    /// Short human-readable label, e.g. for a history panel.
    pub fn describe(&self) -> String {
        match self {
            EditCommand::AddNode { record } => format!("add {} node", record.type_key),
            EditCommand::RemoveNode { record } => format!("remove {} node", record.type_key),
            EditCommand::MoveNode { to, .. } => format!("move node to {to}"),
            EditCommand::RotateNode { to, .. } => {
                format!("rotate node to {} quarter turns", to.quarter_turns())
            }
            EditCommand::SetNodeState { .. } => "edit node state".to_string(),
            EditCommand::AddSegment { a, b } => format!("add wire {a} -> {b}"),
            EditCommand::RemoveSegment { a, b } => format!("remove wire {a} -> {b}"),
        }
    }
}

/// Bounded undo/redo stacks.
pub struct History {
    undo: VecDeque<EditCommand>,
    redo: Vec<EditCommand>,
    capacity: usize,
}

impl History {
    /// A history retaining at most `capacity` undoable edits.
    pub fn new(capacity: usize) -> Self {
        History {
            undo: VecDeque::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record an already-applied edit. Clears the redo stack.
    pub fn record(&mut self, command: EditCommand) {
        self.undo.push_back(command);
        while self.undo.len() > self.capacity {
            self.undo.pop_front();
        }
        self.redo.clear();
    }

    /// Undo the most recent edit. Returns false when there is nothing to
    /// undo.
    pub fn undo(&mut self, bench: &mut Workbench) -> CoreResult<bool> {
        let Some(command) = self.undo.pop_back() else {
            return Ok(false);
        };
        if let Err(err) = command.inverse().apply(bench) {
            // Keep the entry so the caller can inspect what failed.
            self.undo.push_back(command);
            return Err(err);
        }
        self.redo.push(command);
        Ok(true)
    }

    /// Redo the most recently undone edit. Returns false when there is
    /// nothing to redo.
    pub fn redo(&mut self, bench: &mut Workbench) -> CoreResult<bool> {
        let Some(command) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.apply(bench) {
            self.redo.push(command);
            return Err(err);
        }
        self.undo.push_back(command);
        Ok(true)
    }

    /// Undoable edits, oldest first.
    pub fn commands(&self) -> impl Iterator<Item = &EditCommand> {
        self.undo.iter()
    }

    /// True when an undo is available.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// True when a redo is available.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeRegistry;
    use std::sync::Arc;

    fn bench() -> Workbench {
        Workbench::new(Arc::new(NodeRegistry::with_builtins()), 32)
    }

    #[test]
    fn undo_redo_restores_topology() {
        let mut bench = bench();
        let mut history = History::new(16);

        let record = NodeRecord::new(
            "not",
            serde_json::json!({ "width": 1, "delay": 1 }),
            GridPoint::new(0, 0),
            Rotation::R0,
        );
        let command = EditCommand::AddNode {
            record: record.clone(),
        };
        command.apply(&mut bench).unwrap();
        history.record(command);
        assert_eq!(bench.topology().node_count(), 1);

        assert!(history.undo(&mut bench).unwrap());
        assert_eq!(bench.topology().node_count(), 0);
        assert!(!history.can_undo());

        assert!(history.redo(&mut bench).unwrap());
        assert_eq!(bench.topology().node_count(), 1);
        let restored = bench.node_record(record.id).unwrap();
        assert_eq!(restored.type_key, "not");
        assert_eq!(restored.position, record.position);
    }

    #[test]
    fn recording_clears_redo() {
        let mut bench = bench();
        let mut history = History::new(16);

        let add_wire = EditCommand::AddSegment {
            a: GridPoint::new(0, 0),
            b: GridPoint::new(3, 0),
        };
        add_wire.apply(&mut bench).unwrap();
        history.record(add_wire);
        history.undo(&mut bench).unwrap();
        assert!(history.can_redo());

        let other = EditCommand::AddSegment {
            a: GridPoint::new(0, 1),
            b: GridPoint::new(3, 1),
        };
        other.apply(&mut bench).unwrap();
        history.record(other);
        assert!(!history.can_redo());
    }

    #[test]
    fn capacity_drops_oldest_entries() {
        let mut history = History::new(2);
        for x in 0..4 {
            history.record(EditCommand::AddSegment {
                a: GridPoint::new(x, 0),
                b: GridPoint::new(x, 3),
            });
        }
        assert_eq!(history.commands().count(), 2);
        let first = history.commands().next().unwrap();
        assert!(matches!(
            first,
            EditCommand::AddSegment { a, .. } if a.x == 2
        ));
    }

    #[test]
    fn inverse_round_trips() {
        let command = EditCommand::MoveNode {
            id: crate::topology::NodeId::fresh(),
            from: GridPoint::new(1, 1),
            to: GridPoint::new(5, 5),
        };
        let double = command.inverse().inverse();
        assert_eq!(command.describe(), double.describe());
    }
}
