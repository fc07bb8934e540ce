//! The workbench: the paired (topology, nets, scheduler) state, its edit
//! operations, the concurrency guard, and the background tick runner.
//!
//! Two activities share this state: the interactive editor (frame-rate
//! driven) and the simulation loop (tick-rate driven). The only protection
//! is one coarse lock — [`SharedWorkbench::with`] — because structural
//! edits are rare next to per-tick evaluation volume and because the net
//! resolver's and scheduler's invariants only hold for a fully-applied
//! state. A full tick and a full edit each run as one locked closure; net
//! re-resolution happens inside the edit, before the lock is released, so
//! the very next reader sees a consistent net list. Nothing inside the
//! lock performs I/O.
//!
//! Every edit returns the data its caller needs to build the inverse edit
//! (see [`crate::history`]); a rejected edit leaves the state untouched.

use crate::behavior::{PinDirection, PinSpec};
use crate::error::{CoreResult, StructuralError};
use crate::geometry::{GridPoint, Rotation, Segment};
use crate::logic::BitVector;
use crate::net::{Net, NetList};
use crate::registry::NodeRegistry;
use crate::scheduler::{Scheduler, TickSummary};
use crate::session::NodeRecord;
use crate::topology::{Node, NodeId, SegmentId, Topology};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// The complete simulator core for one open circuit.
#[derive(Debug)]
pub struct Workbench {
    topology: Topology,
    nets: NetList,
    scheduler: Scheduler,
    registry: Arc<NodeRegistry>,
}

impl Workbench {
    /// An empty workbench using the given registry and oscillation bound.
    pub fn new(registry: Arc<NodeRegistry>, oscillation_limit: u32) -> Self {
        Workbench {
            topology: Topology::new(),
            nets: NetList::new(),
            scheduler: Scheduler::new(oscillation_limit),
            registry,
        }
    }

    /// The registry this workbench constructs nodes through.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Read access to the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// The current net list, with per-net aggregated values and flags.
    pub fn nets(&self) -> impl Iterator<Item = &Net> {
        self.nets.iter()
    }

    /// The net list, for lookups.
    pub fn net_list(&self) -> &NetList {
        &self.nets
    }

    /// Next tick to run.
    pub fn current_tick(&self) -> u64 {
        self.scheduler.current_tick()
    }

    /// Events waiting in the scheduler queue.
    pub fn pending_events(&self) -> usize {
        self.scheduler.pending_events()
    }

    /// Run one full simulation tick.
    pub fn tick(&mut self) -> TickSummary {
        self.scheduler.tick(&mut self.topology, &mut self.nets)
    }

    // Every structural edit funnels through here before returning: the net
    // partition is rebuilt and all nodes re-seeded so the next tick settles
    // the circuit against the new wiring.
    fn after_structural_change(&mut self) {
        self.nets.rebuild(&self.topology);
        let ids: Vec<NodeId> = self.topology.node_ids().collect();
        for id in ids {
            self.scheduler.request_eval(id);
        }
    }

    /// Instantiate and place a node from a stored record.
    pub fn add_node(&mut self, record: &NodeRecord) -> CoreResult<()> {
        let behavior = self.registry.build(&record.type_key, &record.state)?;
        let node = Node::new(record.id, behavior, record.position, record.rotation);
        self.topology.insert_node(node)?;
        debug!(node = %record.id, kind = %record.type_key, "added node");
        self.after_structural_change();
        Ok(())
    }

    /// Remove a node, returning its record so the edit can be inverted.
    pub fn remove_node(&mut self, id: NodeId) -> CoreResult<NodeRecord> {
        let record = self.node_record(id)?;
        self.topology.remove_node(id)?;
        debug!(node = %id, "removed node");
        self.after_structural_change();
        Ok(record)
    }

    /// Move a node, returning its previous position.
    pub fn move_node(&mut self, id: NodeId, to: GridPoint) -> CoreResult<GridPoint> {
        let from = self.topology.move_node(id, to)?;
        self.after_structural_change();
        Ok(from)
    }

    /// Rotate a node, returning its previous rotation.
    pub fn rotate_node(&mut self, id: NodeId, rotation: Rotation) -> CoreResult<Rotation> {
        let from = self.topology.rotate_node(id, rotation)?;
        self.after_structural_change();
        Ok(from)
    }

    /// Replace a node's state blob (e.g. toggling a source), returning the
    /// previous blob. The new blob is validated before anything mutates.
    pub fn set_node_state(
        &mut self,
        id: NodeId,
        blob: &serde_json::Value,
    ) -> CoreResult<serde_json::Value> {
        let node = self
            .topology
            .node(id)
            .ok_or(StructuralError::UnknownNode(id))?;
        let type_key = node.type_key();
        let old = node.behavior().state_blob()?;
        let behavior = self.registry.build(type_key, blob)?;
        if let Some(node) = self.topology.node_mut(id) {
            node.replace_behavior(behavior);
        }
        self.after_structural_change();
        Ok(old)
    }

    /// Add a wire segment between two grid points.
    pub fn add_segment(&mut self, a: GridPoint, b: GridPoint) -> CoreResult<SegmentId> {
        let segment = Segment::new(a, b)?;
        let id = self.topology.add_segment(segment)?;
        self.after_structural_change();
        Ok(id)
    }

    /// Remove a segment by handle, returning its shape.
    pub fn remove_segment(&mut self, id: SegmentId) -> CoreResult<Segment> {
        let segment = self.topology.remove_segment(id)?;
        self.after_structural_change();
        Ok(segment)
    }

    /// Remove the segment spanning two endpoints, if one exists.
    pub fn remove_segment_between(&mut self, a: GridPoint, b: GridPoint) -> CoreResult<Segment> {
        let id = self
            .topology
            .find_segment(a, b)
            .ok_or(StructuralError::NoSegmentBetween { a, b })?;
        self.remove_segment(id)
    }

    /// Serialize one node back to its record shape.
    pub fn node_record(&self, id: NodeId) -> CoreResult<NodeRecord> {
        let node = self
            .topology
            .node(id)
            .ok_or(StructuralError::UnknownNode(id))?;
        Ok(NodeRecord {
            id,
            type_key: node.type_key().to_string(),
            state: node.behavior().state_blob()?,
            position: node.position(),
            rotation: node.rotation(),
        })
    }

    /// The readable value of one pin: the aggregated net value for inputs
    /// (floating when unwired), the driving buffer for outputs.
    pub fn read_pin(&self, id: NodeId, pin: &str) -> CoreResult<BitVector> {
        let node = self
            .topology
            .node(id)
            .ok_or(StructuralError::UnknownNode(id))?;
        let spec = node
            .pin_specs()
            .into_iter()
            .find(|s| s.id == pin)
            .ok_or_else(|| StructuralError::UnknownPin {
                node: id,
                pin: pin.to_string(),
            })?;
        match spec.direction {
            PinDirection::Output => Ok(node
                .pins()
                .value(pin)
                .cloned()
                .unwrap_or_else(|| BitVector::all_z(spec.width))),
            PinDirection::Input => Ok(self
                .nets
                .net_of_pin(id, pin)
                .and_then(|net| self.nets.get(net))
                .map(|net| net.value.clone())
                .unwrap_or_else(|| BitVector::all_z(spec.width))),
        }
    }

    /// Pin configuration of a node with absolute grid positions, for
    /// hit-testing and drawing.
    pub fn pin_sites_of(&self, id: NodeId) -> CoreResult<Vec<(PinSpec, GridPoint)>> {
        let node = self
            .topology
            .node(id)
            .ok_or(StructuralError::UnknownNode(id))?;
        Ok(node
            .pin_specs()
            .into_iter()
            .map(|spec| {
                let at = node.pin_position(&spec);
                (spec, at)
            })
            .collect())
    }
}

/// The concurrency guard: one coarse lock around the workbench.
#[derive(Clone)]
pub struct SharedWorkbench {
    inner: Arc<Mutex<Workbench>>,
}

impl SharedWorkbench {
    /// Wrap a workbench for shared access.
    pub fn new(workbench: Workbench) -> Self {
        SharedWorkbench {
            inner: Arc::new(Mutex::new(workbench)),
        }
    }

    /// Run a closure with exclusive access to the core state.
    ///
    /// The closure observes a fully-applied state (never a half-applied
    /// tick or edit) and anything it applies is fully visible to the next
    /// caller. The closure must not block on I/O.
    pub fn with<R>(&self, f: impl FnOnce(&mut Workbench) -> R) -> R {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            // A panicked editor closure cannot leave a torn state worse
            // than the panic itself; keep the simulation alive.
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

/// Commands accepted by the background tick runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerCommand {
    /// Begin free-running ticks at the configured rate.
    Start,
    /// Stop free-running; queued events are retained.
    Pause,
    /// Run exactly one tick while paused.
    Step,
    /// Terminate the runner task.
    Shutdown,
}

/// Background task driving ticks at a fixed rate.
///
/// The runner only ever touches the core through the guard, one whole tick
/// per lock acquisition, so the editor can interleave edits between ticks
/// but never inside one.
pub struct SimRunner {
    task: JoinHandle<()>,
    command_tx: mpsc::Sender<RunnerCommand>,
}

impl SimRunner {
    /// Spawn a paused runner at `tick_rate_hz` ticks per second.
    pub fn spawn(bench: SharedWorkbench, tick_rate_hz: u32) -> Self {
        let (command_tx, mut command_rx) = mpsc::channel(16);
        let period = std::time::Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz.max(1)));
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut running = false;
            loop {
                tokio::select! {
                    cmd = command_rx.recv() => match cmd {
                        Some(RunnerCommand::Start) => running = true,
                        Some(RunnerCommand::Pause) => running = false,
                        Some(RunnerCommand::Step) => {
                            let summary = bench.with(|w| w.tick());
                            trace!(tick = summary.tick, evals = summary.evaluations, "stepped");
                        }
                        Some(RunnerCommand::Shutdown) | None => break,
                    },
                    _ = interval.tick(), if running => {
                        let summary = bench.with(|w| w.tick());
                        trace!(
                            tick = summary.tick,
                            events = summary.events_applied,
                            evals = summary.evaluations,
                            "ticked"
                        );
                    }
                }
            }
            debug!("simulation runner stopped");
        });
        SimRunner { task, command_tx }
    }

    /// Send a command; returns false if the runner has already stopped.
    pub async fn send(&self, command: RunnerCommand) -> bool {
        self.command_tx.send(command).await.is_ok()
    }

    /// Request shutdown and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(RunnerCommand::Shutdown).await;
        let _ = self.task.await;
    }
}
