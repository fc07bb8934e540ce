//! Net resolution: from wire segments and pin positions to electrical nets.
//!
//! A net is a maximal set of segments connected under endpoint adjacency,
//! together with every pin whose absolute position lies on any covered
//! lattice point of the set (endpoint or interior, so T-junctions need no
//! explicit marker). Resolution is a full rebuild: an auxiliary
//! coordinate map is built fresh from the segment arena, components are
//! found by index-based breadth-first traversal, and pins are attached by
//! O(1) coordinate lookup.
//!
//! Net identifiers are regenerated on every rebuild. To keep consumer
//! state (a highlighted net, a probe attachment) meaningful across edits,
//! a rebuilt net *inherits* a previous identifier when it is the unique
//! successor sharing the most segment handles with exactly one predecessor;
//! in every other case (splits, merges, fresh wires) it gets a fresh id.

use crate::behavior::PinDirection;
use crate::logic::{self, BitVector};
use crate::topology::{NodeId, SegmentId, Topology};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use tracing::debug;

/// Opaque identifier of a resolved net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetId(u64);

impl fmt::Display for NetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// One pin attached to a net.
#[derive(Clone, Debug)]
pub struct NetPin {
    /// Owning node.
    pub node: NodeId,
    /// Pin id within the node.
    pub pin: String,
    /// Signal width the pin expects.
    pub width: usize,
    /// Whether the pin reads or drives.
    pub direction: PinDirection,
}

/// A maximal connected set of segments and its attached pins.
#[derive(Clone, Debug)]
pub struct Net {
    /// Identifier, possibly inherited across a rebuild.
    pub id: NetId,
    /// Member segment handles.
    pub segments: Vec<SegmentId>,
    /// Attached pins.
    pub pins: Vec<NetPin>,
    /// Aggregated value merged from all drivers.
    pub value: BitVector,
    /// Two or more drivers asserted differing defined values this tick.
    pub conflict: bool,
    /// The oscillation guard forced this net to UNDEFINED this tick.
    pub oscillating: bool,
}

/// The current partition of segments into nets.
#[derive(Debug, Default)]
pub struct NetList {
    nets: Vec<Net>,
    by_id: HashMap<NetId, usize>,
    by_pin: HashMap<(NodeId, String), NetId>,
    next_id: u64,
}

impl NetList {
    /// An empty net list.
    pub fn new() -> Self {
        NetList::default()
    }

    /// Number of nets.
    pub fn len(&self) -> usize {
        self.nets.len()
    }

    /// True when no nets exist.
    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// All nets, in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &Net> {
        self.nets.iter()
    }

    /// A net by id.
    pub fn get(&self, id: NetId) -> Option<&Net> {
        self.by_id.get(&id).map(|&i| &self.nets[i])
    }

    /// The net a pin belongs to, if any. An unattached pin reads floating.
    pub fn net_of_pin(&self, node: NodeId, pin: &str) -> Option<NetId> {
        self.by_pin.get(&(node, pin.to_string())).copied()
    }

    /// Nodes with an input pin on the net, deduplicated.
    pub fn readers(&self, id: NetId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = Vec::new();
        if let Some(net) = self.get(id) {
            for pin in &net.pins {
                if pin.direction == PinDirection::Input && !out.contains(&pin.node) {
                    out.push(pin.node);
                }
            }
        }
        out
    }

    /// Re-merge the aggregated value of one net from its current drivers.
    ///
    /// Returns true when the value or the conflict flag changed. Clears the
    /// oscillating flag; the guard re-asserts it if the net is implicated
    /// again.
    pub fn recompute(&mut self, id: NetId, topo: &Topology) -> bool {
        let Some(&idx) = self.by_id.get(&id) else {
            return false;
        };
        let net = &self.nets[idx];
        let fallback = net.pins.iter().map(|p| p.width).max().unwrap_or(1);
        let drivers: Vec<&BitVector> = net
            .pins
            .iter()
            .filter(|p| p.direction == PinDirection::Output)
            .filter_map(|p| topo.node(p.node).and_then(|n| n.pins().value(&p.pin)))
            .collect();
        let (value, conflict) = logic::resolve_drivers(drivers, fallback);

        let net = &mut self.nets[idx];
        let changed = value != net.value || conflict != net.conflict;
        net.value = value;
        net.conflict = conflict;
        net.oscillating = false;
        changed
    }

    /// Force a net to UNDEFINED (oscillation guard).
    pub fn force_undefined(&mut self, id: NetId) {
        if let Some(&idx) = self.by_id.get(&id) {
            let net = &mut self.nets[idx];
            net.value = BitVector::all_undefined(net.value.width().max(1));
            net.oscillating = true;
        }
    }

    /// Rebuild the whole partition from the current topology.
    ///
    /// Runs after every structural edit, inside the concurrency guard, so
    /// the very next reader sees a consistent net list.
    pub fn rebuild(&mut self, topo: &Topology) {
        // Previous membership, for identifier carry-over.
        let mut old_of_segment: HashMap<SegmentId, NetId> = HashMap::new();
        for net in &self.nets {
            for &seg in &net.segments {
                old_of_segment.insert(seg, net.id);
            }
        }

        let segments: Vec<(SegmentId, crate::geometry::Segment)> = topo.segments().collect();

        // Coordinate maps built fresh per pass: endpoint adjacency for the
        // traversal, full lattice coverage for pin attachment.
        let mut at_endpoint: HashMap<crate::geometry::GridPoint, Vec<usize>> = HashMap::new();
        let mut covering: HashMap<crate::geometry::GridPoint, Vec<usize>> = HashMap::new();
        for (i, (_, seg)) in segments.iter().enumerate() {
            let (a, b) = seg.endpoints();
            at_endpoint.entry(a).or_default().push(i);
            at_endpoint.entry(b).or_default().push(i);
            for p in seg.lattice_points() {
                covering.entry(p).or_default().push(i);
            }
        }

        // Connected components over segment indices (graph over segments:
        // two segments are adjacent iff they share an endpoint coordinate).
        const UNVISITED: usize = usize::MAX;
        let mut component = vec![UNVISITED; segments.len()];
        let mut component_count = 0usize;
        for start in 0..segments.len() {
            if component[start] != UNVISITED {
                continue;
            }
            let comp = component_count;
            component_count += 1;
            let mut queue = VecDeque::from([start]);
            component[start] = comp;
            while let Some(i) = queue.pop_front() {
                let (a, b) = segments[i].1.endpoints();
                for p in [a, b] {
                    if let Some(neighbors) = at_endpoint.get(&p) {
                        for &j in neighbors {
                            if component[j] == UNVISITED {
                                component[j] = comp;
                                queue.push_back(j);
                            }
                        }
                    }
                }
            }
        }

        let mut members: Vec<Vec<SegmentId>> = vec![Vec::new(); component_count];
        for (i, (id, _)) in segments.iter().enumerate() {
            members[component[i]].push(*id);
        }

        // Attach pins. A pin on a crossing point of two unconnected wires
        // is ambiguous; prefer a segment that ends at the pin, then the
        // lowest component index, so resolution is deterministic.
        let mut pins_of: Vec<Vec<NetPin>> = vec![Vec::new(); component_count];
        for site in topo.pin_sites() {
            let Some(candidates) = covering.get(&site.position) else {
                continue;
            };
            let chosen = candidates
                .iter()
                .min_by_key(|&&i| {
                    let endpoint_hit = segments[i].1.has_endpoint(site.position);
                    (if endpoint_hit { 0 } else { 1 }, component[i])
                })
                .copied();
            if let Some(i) = chosen {
                pins_of[component[i]].push(NetPin {
                    node: site.node,
                    pin: site.pin,
                    width: site.width,
                    direction: site.direction,
                });
            }
        }

        // Identifier carry-over by maximal segment overlap, unique both ways.
        let mut claimed: HashMap<NetId, (usize, usize)> = HashMap::new(); // old id -> (comp, overlap)
        for (comp, segs) in members.iter().enumerate() {
            let mut overlap: HashMap<NetId, usize> = HashMap::new();
            for seg in segs {
                if let Some(&old) = old_of_segment.get(seg) {
                    *overlap.entry(old).or_insert(0) += 1;
                }
            }
            let mut best: Option<(NetId, usize)> = None;
            let mut tied = false;
            for (old, count) in overlap {
                match best {
                    None => best = Some((old, count)),
                    Some((_, c)) if count > c => {
                        best = Some((old, count));
                        tied = false;
                    }
                    Some((_, c)) if count == c => tied = true,
                    Some(_) => {}
                }
            }
            if let (Some((old, count)), false) = (best, tied) {
                match claimed.get(&old) {
                    // Contested with equal overlap: nobody inherits.
                    Some(&(_, existing)) if existing == count => {
                        claimed.insert(old, (usize::MAX, count));
                    }
                    Some(&(_, existing)) if existing > count => {}
                    _ => {
                        claimed.insert(old, (comp, count));
                    }
                }
            }
        }
        let mut inherited: HashMap<usize, NetId> = HashMap::new();
        for (old, (comp, _)) in claimed {
            if comp != usize::MAX {
                inherited.insert(comp, old);
            }
        }

        self.nets.clear();
        self.by_id.clear();
        self.by_pin.clear();
        for comp in 0..component_count {
            let id = match inherited.get(&comp) {
                Some(&old) => old,
                None => {
                    let id = NetId(self.next_id);
                    self.next_id += 1;
                    id
                }
            };
            for pin in &pins_of[comp] {
                self.by_pin.insert((pin.node, pin.pin.clone()), id);
            }
            self.by_id.insert(id, comp);
            self.nets.push(Net {
                id,
                segments: std::mem::take(&mut members[comp]),
                pins: std::mem::take(&mut pins_of[comp]),
                value: BitVector::all_z(1),
                conflict: false,
                oscillating: false,
            });
        }

        // Seed aggregated values from the current pin buffers.
        let ids: Vec<NetId> = self.nets.iter().map(|n| n.id).collect();
        for id in ids {
            self.recompute(id, topo);
        }

        debug!(
            nets = self.nets.len(),
            segments = segments.len(),
            attached_pins = self.by_pin.len(),
            "rebuilt net list"
        );
    }
}
