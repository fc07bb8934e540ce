//! Editor gestures as an explicit state machine.
//!
//! Interactions that span multiple frames (dragging a wire, moving a
//! selection, rubber-band select) are modeled as a state enum plus one
//! per-frame [`EditorController::update`] call, not as resumable
//! functions. Every frame the update checks the cancellation predicate
//! (escape) before the completion predicate (primary button released);
//! cancellation abandons the gesture without touching the core, while
//! completion commits the whole edit batch through the concurrency guard
//! and records it in history. Until one of the predicates fires the
//! gesture only updates its own preview state, so the renderer can draw
//! it while the simulation keeps ticking.

use crate::error::CoreResult;
use crate::geometry::GridPoint;
use crate::history::{EditCommand, History};
use crate::topology::NodeId;
use crate::workbench::SharedWorkbench;
use tracing::debug;

/// Editor input sampled once per rendered frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    /// Cursor position snapped to the grid.
    pub cursor: GridPoint,
    /// Primary button held; releasing it completes a gesture.
    pub primary_down: bool,
    /// Escape pressed; cancels the gesture this frame.
    pub cancel: bool,
}

/// The in-progress interaction, if any.
#[derive(Clone, Debug, Default)]
pub enum Gesture {
    /// No interaction in progress.
    #[default]
    Idle,
    /// Dragging a new wire from a fixed start point.
    WireDrag {
        /// Anchor where the drag started.
        start: GridPoint,
        /// Cursor as of the last frame, for preview drawing.
        last: GridPoint,
    },
    /// Dragging the current selection by the cursor delta.
    MoveSelection {
        /// Nodes being moved.
        ids: Vec<NodeId>,
        /// Cursor position where the drag began.
        grab: GridPoint,
        /// Cursor as of the last frame.
        last: GridPoint,
    },
    /// Rubber-band selection rectangle.
    RectSelect {
        /// Fixed corner.
        anchor: GridPoint,
        /// Moving corner.
        corner: GridPoint,
    },
}

/// What one frame of gesture processing produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    /// No gesture active.
    Idle,
    /// Gesture continues; preview state was updated.
    InProgress,
    /// Gesture completed, committing this many edits.
    Committed(usize),
    /// Gesture cancelled; the core was not touched.
    Cancelled,
    /// Rectangle select finished with this selection.
    Selected(Vec<NodeId>),
}

/// Per-frame driver of editor gestures.
#[derive(Default)]
pub struct EditorController {
    gesture: Gesture,
    selection: Vec<NodeId>,
}

impl EditorController {
    /// A controller with no gesture and an empty selection.
    pub fn new() -> Self {
        EditorController::default()
    }

    /// The active gesture, for preview rendering.
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// The current selection.
    pub fn selection(&self) -> &[NodeId] {
        &self.selection
    }

    /// Replace the selection directly (e.g. from a click).
    pub fn select(&mut self, ids: Vec<NodeId>) {
        self.selection = ids;
    }

    /// Start dragging a wire. Ignored unless idle.
    pub fn begin_wire(&mut self, start: GridPoint) {
        if matches!(self.gesture, Gesture::Idle) {
            self.gesture = Gesture::WireDrag { start, last: start };
        }
    }

    /// Start moving the current selection. Ignored unless idle or the
    /// selection is empty.
    pub fn begin_move(&mut self, grab: GridPoint) {
        if matches!(self.gesture, Gesture::Idle) && !self.selection.is_empty() {
            self.gesture = Gesture::MoveSelection {
                ids: self.selection.clone(),
                grab,
                last: grab,
            };
        }
    }

    /// Start a rubber-band selection. Ignored unless idle.
    pub fn begin_rect(&mut self, anchor: GridPoint) {
        if matches!(self.gesture, Gesture::Idle) {
            self.gesture = Gesture::RectSelect {
                anchor,
                corner: anchor,
            };
        }
    }

    /// Advance the active gesture by one frame.
    pub fn update(
        &mut self,
        input: FrameInput,
        bench: &SharedWorkbench,
        history: &mut History,
    ) -> CoreResult<GestureOutcome> {
        if matches!(self.gesture, Gesture::Idle) {
            return Ok(GestureOutcome::Idle);
        }
        if input.cancel {
            debug!("gesture cancelled");
            self.gesture = Gesture::Idle;
            return Ok(GestureOutcome::Cancelled);
        }

        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Ok(GestureOutcome::Idle),

            Gesture::WireDrag { start, .. } => {
                if input.primary_down {
                    self.gesture = Gesture::WireDrag {
                        start,
                        last: input.cursor,
                    };
                    return Ok(GestureOutcome::InProgress);
                }
                let committed = commit_wire(start, input.cursor, bench, history)?;
                Ok(GestureOutcome::Committed(committed))
            }

            Gesture::MoveSelection { ids, grab, .. } => {
                if input.primary_down {
                    self.gesture = Gesture::MoveSelection {
                        ids,
                        grab,
                        last: input.cursor,
                    };
                    return Ok(GestureOutcome::InProgress);
                }
                let delta = (input.cursor.x - grab.x, input.cursor.y - grab.y);
                if delta == (0, 0) {
                    return Ok(GestureOutcome::Committed(0));
                }
                let committed = commit_move(&ids, delta, bench, history)?;
                Ok(GestureOutcome::Committed(committed))
            }

            Gesture::RectSelect { anchor, .. } => {
                if input.primary_down {
                    self.gesture = Gesture::RectSelect {
                        anchor,
                        corner: input.cursor,
                    };
                    return Ok(GestureOutcome::InProgress);
                }
                let picked = bench.with(|w| nodes_in_rect(w.topology(), anchor, input.cursor));
                self.selection = picked.clone();
                Ok(GestureOutcome::Selected(picked))
            }
        }
    }
}

/// Split a drag into its horizontal-then-vertical legs and commit them as
/// one locked batch. Legs that already exist are skipped, so re-tracing an
/// existing wire never duplicates pins or segments.
fn commit_wire(
    start: GridPoint,
    end: GridPoint,
    bench: &SharedWorkbench,
    history: &mut History,
) -> CoreResult<usize> {
    let elbow = GridPoint::new(end.x, start.y);
    let legs = [(start, elbow), (elbow, end)];
    let applied = bench.with(|w| -> CoreResult<Vec<EditCommand>> {
        let mut applied = Vec::new();
        for (a, b) in legs {
            if a == b || w.topology().find_segment(a, b).is_some() {
                continue;
            }
            w.add_segment(a, b)?;
            applied.push(EditCommand::AddSegment { a, b });
        }
        Ok(applied)
    })?;
    let count = applied.len();
    for command in applied {
        history.record(command);
    }
    debug!(segments = count, "wire drag committed");
    Ok(count)
}

fn commit_move(
    ids: &[NodeId],
    delta: (i32, i32),
    bench: &SharedWorkbench,
    history: &mut History,
) -> CoreResult<usize> {
    let applied = bench.with(|w| -> CoreResult<Vec<EditCommand>> {
        let mut applied = Vec::new();
        for &id in ids {
            // Nodes deleted mid-gesture just drop out of the selection.
            let Some(node) = w.topology().node(id) else {
                continue;
            };
            let from = node.position();
            let to = from.offset(delta.0, delta.1);
            w.move_node(id, to)?;
            applied.push(EditCommand::MoveNode { id, from, to });
        }
        Ok(applied)
    })?;
    let count = applied.len();
    for command in applied {
        history.record(command);
    }
    Ok(count)
}

fn nodes_in_rect(
    topo: &crate::topology::Topology,
    a: GridPoint,
    b: GridPoint,
) -> Vec<NodeId> {
    let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
    let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
    let mut picked: Vec<NodeId> = topo
        .nodes()
        .filter(|n| {
            let p = n.position();
            x0 <= p.x && p.x <= x1 && y0 <= p.y && p.y <= y1
        })
        .map(|n| n.id())
        .collect();
    picked.sort_unstable();
    picked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;
    use crate::registry::NodeRegistry;
    use crate::session::NodeRecord;
    use crate::workbench::Workbench;
    use std::sync::Arc;

    fn shared_bench() -> SharedWorkbench {
        SharedWorkbench::new(Workbench::new(Arc::new(NodeRegistry::with_builtins()), 32))
    }

    fn frame(cursor: GridPoint, primary_down: bool, cancel: bool) -> FrameInput {
        FrameInput {
            cursor,
            primary_down,
            cancel,
        }
    }

    #[test]
    fn wire_drag_commits_two_legs() {
        let bench = shared_bench();
        let mut history = History::new(16);
        let mut editor = EditorController::new();

        editor.begin_wire(GridPoint::new(0, 0));
        let out = editor
            .update(frame(GridPoint::new(4, 0), true, false), &bench, &mut history)
            .unwrap();
        assert_eq!(out, GestureOutcome::InProgress);

        let out = editor
            .update(frame(GridPoint::new(4, 3), false, false), &bench, &mut history)
            .unwrap();
        assert_eq!(out, GestureOutcome::Committed(2));
        assert_eq!(bench.with(|w| w.topology().segment_count()), 2);
        assert!(history.can_undo());
    }

    #[test]
    fn cancel_aborts_without_mutation() {
        let bench = shared_bench();
        let mut history = History::new(16);
        let mut editor = EditorController::new();

        editor.begin_wire(GridPoint::new(0, 0));
        let out = editor
            .update(frame(GridPoint::new(5, 5), false, true), &bench, &mut history)
            .unwrap();
        assert_eq!(out, GestureOutcome::Cancelled);
        assert_eq!(bench.with(|w| w.topology().segment_count()), 0);
        assert!(!history.can_undo());
        assert!(matches!(editor.gesture(), Gesture::Idle));
    }

    #[test]
    fn retracing_an_existing_wire_adds_nothing() {
        let bench = shared_bench();
        let mut history = History::new(16);
        let mut editor = EditorController::new();

        editor.begin_wire(GridPoint::new(0, 0));
        editor
            .update(frame(GridPoint::new(4, 0), false, false), &bench, &mut history)
            .unwrap();
        editor.begin_wire(GridPoint::new(0, 0));
        let out = editor
            .update(frame(GridPoint::new(4, 0), false, false), &bench, &mut history)
            .unwrap();
        assert_eq!(out, GestureOutcome::Committed(0));
        assert_eq!(bench.with(|w| w.topology().segment_count()), 1);
    }

    #[test]
    fn rect_select_then_move() {
        let bench = shared_bench();
        let mut history = History::new(16);
        let mut editor = EditorController::new();

        let record = NodeRecord::new(
            "not",
            serde_json::json!({}),
            GridPoint::new(2, 2),
            Rotation::R0,
        );
        bench.with(|w| w.add_node(&record)).unwrap();

        editor.begin_rect(GridPoint::new(0, 0));
        let out = editor
            .update(frame(GridPoint::new(5, 5), false, false), &bench, &mut history)
            .unwrap();
        assert_eq!(out, GestureOutcome::Selected(vec![record.id]));

        editor.begin_move(GridPoint::new(2, 2));
        let out = editor
            .update(frame(GridPoint::new(6, 2), false, false), &bench, &mut history)
            .unwrap();
        assert_eq!(out, GestureOutcome::Committed(1));
        let moved = bench.with(|w| w.topology().node(record.id).map(|n| n.position()));
        assert_eq!(moved, Some(GridPoint::new(6, 2)));

        assert!(bench.with(|w| history.undo(w)).unwrap());
        let back = bench.with(|w| w.topology().node(record.id).map(|n| n.position()));
        assert_eq!(back, Some(GridPoint::new(2, 2)));
    }
}
