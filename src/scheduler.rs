//! The discrete-event scheduler.
//!
//! Time advances in ticks. Within one tick the scheduler runs three phases
//! in a loop until quiescent:
//!
//! 1. **apply** — every event due this tick is written into its target pin
//!    buffer (events aimed at pins that no longer exist are dropped);
//! 2. **recompute** — every net touched by an applied write re-merges its
//!    aggregated value from the current drivers, raising the conflict flag
//!    when defined values disagree;
//! 3. **evaluate** — every node reading a changed net is re-evaluated and
//!    its returned writes enqueued at `tick + delay`; zero-delay writes
//!    feed the next round of the same tick.
//!
//! Zero-delay feedback is bounded: a node is evaluated at most
//! `oscillation_limit` times per tick. When a cycle would evaluate it
//! again, the nets its output pins drive are forced to UNDEFINED, marked
//! oscillating, and the node is quarantined for the remainder of the tick.
//! The bound is exact, so a tick always terminates, and neither conflicts
//! nor oscillation ever halt the loop — both are absorbed into the value
//! domain.

use crate::behavior::{InputView, PinDirection};
use crate::logic::BitVector;
use crate::net::{NetId, NetList};
use crate::topology::{NodeId, Topology};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use tracing::{trace, warn};

/// A pending write to one pin buffer.
#[derive(Clone, Debug)]
pub struct ScheduledWrite {
    /// Target node.
    pub node: NodeId,
    /// Target pin on that node.
    pub pin: String,
    /// Values to store.
    pub values: BitVector,
}

#[derive(Debug)]
struct QueuedEvent {
    due: u64,
    seq: u64,
    write: ScheduledWrite,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    // Reversed so the max-heap pops the earliest due tick, FIFO among ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// What one tick did, for logging and tests.
#[derive(Clone, Debug, Default)]
pub struct TickSummary {
    /// The tick that ran.
    pub tick: u64,
    /// Events written into pin buffers.
    pub events_applied: usize,
    /// Nets whose aggregated value or conflict flag changed.
    pub nets_changed: usize,
    /// Evaluator invocations.
    pub evaluations: usize,
    /// Nodes quarantined by the oscillation guard.
    pub quarantined: Vec<NodeId>,
}

/// Time-ordered event queue plus the per-tick evaluation loop.
#[derive(Debug)]
pub struct Scheduler {
    queue: BinaryHeap<QueuedEvent>,
    seq: u64,
    tick: u64,
    oscillation_limit: u32,
    pending_dirty: BTreeSet<NodeId>,
}

impl Scheduler {
    /// A scheduler with the given zero-delay re-entry bound (minimum 1).
    pub fn new(oscillation_limit: u32) -> Self {
        Scheduler {
            queue: BinaryHeap::new(),
            seq: 0,
            tick: 0,
            oscillation_limit: oscillation_limit.max(1),
            pending_dirty: BTreeSet::new(),
        }
    }

    /// The next tick to run.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Events waiting in the queue.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// The configured zero-delay re-entry bound.
    pub fn oscillation_limit(&self) -> u32 {
        self.oscillation_limit
    }

    /// Ask for a node to be evaluated at the start of the next tick, even
    /// if no event touches it. Structural edits use this to seed the
    /// circuit after a rebuild.
    pub fn request_eval(&mut self, node: NodeId) {
        self.pending_dirty.insert(node);
    }

    /// Drop all queued events and seeds (document replacement).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pending_dirty.clear();
        self.tick = 0;
        self.seq = 0;
    }

    /// Enqueue an externally-produced write `delay` ticks from now.
    pub fn schedule(&mut self, delay: u64, write: ScheduledWrite) {
        self.push_event(self.tick + delay, write);
    }

    fn push_event(&mut self, due: u64, write: ScheduledWrite) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(QueuedEvent { due, seq, write });
    }

    fn pop_due(&mut self) -> Vec<ScheduledWrite> {
        let mut due = Vec::new();
        while let Some(top) = self.queue.peek() {
            if top.due > self.tick {
                break;
            }
            if let Some(event) = self.queue.pop() {
                due.push(event.write);
            }
        }
        due
    }

    /// Run one full tick against the paired topology and net list.
    ///
    /// Must be called under the concurrency guard; see
    /// [`crate::workbench::SharedWorkbench`].
    pub fn tick(&mut self, topo: &mut Topology, nets: &mut NetList) -> TickSummary {
        let mut summary = TickSummary {
            tick: self.tick,
            ..TickSummary::default()
        };
        let mut eval_counts: HashMap<NodeId, u32> = HashMap::new();
        let mut quarantined: HashSet<NodeId> = HashSet::new();
        let mut pending = self.pop_due();
        let mut seeded = std::mem::take(&mut self.pending_dirty);

        loop {
            // Apply phase.
            let mut touched: Vec<(NodeId, String)> = Vec::new();
            for write in pending.drain(..) {
                if topo.write_pin(write.node, &write.pin, write.values) {
                    summary.events_applied += 1;
                    touched.push((write.node, write.pin));
                } else {
                    trace!(node = %write.node, pin = %write.pin, "dropping stale event");
                }
            }

            // Recompute phase.
            let mut touched_nets: BTreeSet<NetId> = BTreeSet::new();
            for (node, pin) in &touched {
                if let Some(id) = nets.net_of_pin(*node, pin) {
                    touched_nets.insert(id);
                }
            }
            let mut changed: Vec<NetId> = Vec::new();
            for id in touched_nets {
                if nets.recompute(id, topo) {
                    summary.nets_changed += 1;
                    changed.push(id);
                }
            }

            // Dirty phase.
            let mut dirty: BTreeSet<NodeId> = std::mem::take(&mut seeded);
            for id in &changed {
                for reader in nets.readers(*id) {
                    dirty.insert(reader);
                }
            }
            dirty.retain(|n| !quarantined.contains(n));
            if dirty.is_empty() {
                break;
            }

            // Evaluate phase.
            for id in dirty {
                let count = eval_counts.entry(id).or_insert(0);
                if *count >= self.oscillation_limit {
                    quarantined.insert(id);
                    summary.quarantined.push(id);
                    self.quarantine(id, topo, nets);
                    continue;
                }
                *count += 1;

                let view = build_inputs(topo, nets, id);
                let writes = match topo.node_mut(id) {
                    Some(node) => node.behavior_mut().evaluate(&view),
                    None => continue,
                };
                summary.evaluations += 1;
                for write in writes {
                    let scheduled = ScheduledWrite {
                        node: id,
                        pin: write.pin,
                        values: write.values,
                    };
                    if write.delay == 0 {
                        pending.push(scheduled);
                    } else {
                        self.push_event(self.tick + write.delay, scheduled);
                    }
                }
            }

            if pending.is_empty() {
                break;
            }
        }

        self.tick += 1;
        summary
    }

    /// Force every net driven by the node's output pins to UNDEFINED.
    fn quarantine(&self, id: NodeId, topo: &Topology, nets: &mut NetList) {
        warn!(
            node = %id,
            limit = self.oscillation_limit,
            "oscillation guard tripped; forcing driven nets to UNDEFINED"
        );
        let Some(node) = topo.node(id) else {
            return;
        };
        for spec in node.pin_specs() {
            if spec.direction == PinDirection::Output {
                if let Some(net) = nets.net_of_pin(id, &spec.id) {
                    nets.force_undefined(net);
                }
            }
        }
    }
}

/// Current readable values of a node's input pins, from its nets.
fn build_inputs(topo: &Topology, nets: &NetList, id: NodeId) -> InputView {
    let Some(node) = topo.node(id) else {
        return InputView::default();
    };
    let pairs = node
        .pin_specs()
        .into_iter()
        .filter(|spec| spec.direction == PinDirection::Input)
        .filter_map(|spec| {
            let net = nets.net_of_pin(id, &spec.id)?;
            let value = nets.get(net)?.value.clone();
            Some((spec.id, value))
        });
    InputView::from_pairs(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::BitVector;

    fn event(due: u64, seq: u64) -> QueuedEvent {
        QueuedEvent {
            due,
            seq,
            write: ScheduledWrite {
                node: NodeId::fresh(),
                pin: "q".to_string(),
                values: BitVector::all_z(1),
            },
        }
    }

    #[test]
    fn queue_pops_earliest_then_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(event(5, 0));
        heap.push(event(2, 1));
        heap.push(event(2, 2));
        heap.push(event(9, 3));

        let order: Vec<(u64, u64)> = std::iter::from_fn(|| heap.pop().map(|e| (e.due, e.seq))).collect();
        assert_eq!(order, vec![(2, 1), (2, 2), (5, 0), (9, 3)]);
    }

    #[test]
    fn pop_due_takes_only_current_tick() {
        let mut scheduler = Scheduler::new(8);
        let node = NodeId::fresh();
        scheduler.schedule(
            0,
            ScheduledWrite {
                node,
                pin: "q".to_string(),
                values: BitVector::all_z(1),
            },
        );
        scheduler.schedule(
            3,
            ScheduledWrite {
                node,
                pin: "q".to_string(),
                values: BitVector::all_z(1),
            },
        );
        assert_eq!(scheduler.pop_due().len(), 1);
        assert_eq!(scheduler.pending_events(), 1);
    }

    #[test]
    fn limit_has_a_floor_of_one() {
        assert_eq!(Scheduler::new(0).oscillation_limit(), 1);
    }
}
