//! The editable circuit topology: node instances and the wire segment arena.
//!
//! Nodes are stored in a map keyed by [`NodeId`]; wire segments live in a
//! flat arena indexed by integer [`SegmentId`] handles with a free list, so
//! connectivity queries are index-based rather than pointer-chasing.
//! Structural edits (add/remove/move/rotate) validate synchronously and
//! return whatever the caller needs to invert the edit; a failed edit
//! leaves the topology untouched.
//!
//! Pin *values* live here too, in each node's [`PinCollection`]. Buffers
//! start all-Z (driving nothing) and are mutated only by the scheduler
//! applying events.

use crate::behavior::{NodeBehavior, PinDirection, PinSpec};
use crate::error::StructuralError;
use crate::geometry::{GridPoint, Rotation, Segment};
use crate::logic::BitVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Stable identifier of a node instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// A fresh random id.
    pub fn fresh() -> Self {
        NodeId(Uuid::new_v4())
    }

    /// Wrap an existing uuid (used when loading documents).
    pub fn from_uuid(id: Uuid) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arena handle of a live wire segment.
///
/// Handles are reused after removal; they are only meaningful against the
/// topology that issued them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

/// Live per-instance buffer of current values for all pins of one node.
#[derive(Debug, Default)]
pub struct PinCollection {
    buffers: HashMap<String, BitVector>,
}

impl PinCollection {
    fn from_specs(specs: &[PinSpec]) -> Self {
        PinCollection {
            buffers: specs
                .iter()
                .map(|s| (s.id.clone(), BitVector::all_z(s.width)))
                .collect(),
        }
    }

    /// Current buffer of a pin.
    pub fn value(&self, pin: &str) -> Option<&BitVector> {
        self.buffers.get(pin)
    }

    /// Overwrite a pin buffer. Returns false if the pin does not exist.
    pub fn set(&mut self, pin: &str, values: BitVector) -> bool {
        match self.buffers.get_mut(pin) {
            Some(slot) => {
                *slot = values;
                true
            }
            None => false,
        }
    }

    /// Rebuild buffers for a new pin configuration, carrying over values of
    /// pins whose id and width survived.
    fn rebind(&mut self, specs: &[PinSpec]) {
        let mut fresh = HashMap::with_capacity(specs.len());
        for spec in specs {
            let carried = self
                .buffers
                .get(&spec.id)
                .filter(|v| v.width() == spec.width)
                .cloned();
            fresh.insert(
                spec.id.clone(),
                carried.unwrap_or_else(|| BitVector::all_z(spec.width)),
            );
        }
        self.buffers = fresh;
    }
}

/// A placed component instance.
pub struct Node {
    id: NodeId,
    behavior: Box<dyn NodeBehavior>,
    position: GridPoint,
    rotation: Rotation,
    pins: PinCollection,
}

impl Node {
    /// Assemble a node from its parts, initializing pin buffers to all-Z.
    pub fn new(
        id: NodeId,
        behavior: Box<dyn NodeBehavior>,
        position: GridPoint,
        rotation: Rotation,
    ) -> Self {
        let specs = behavior.pins(rotation);
        Node {
            id,
            behavior,
            position,
            rotation,
            pins: PinCollection::from_specs(&specs),
        }
    }

    /// Instance id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Registry key of the node type.
    pub fn type_key(&self) -> &'static str {
        self.behavior.type_key()
    }

    /// Grid position.
    pub fn position(&self) -> GridPoint {
        self.position
    }

    /// Current rotation.
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Pin configuration at the current rotation.
    pub fn pin_specs(&self) -> Vec<PinSpec> {
        self.behavior.pins(self.rotation)
    }

    /// Absolute grid position of a pin spec.
    pub fn pin_position(&self, spec: &PinSpec) -> GridPoint {
        self.position.offset(spec.offset.0, spec.offset.1)
    }

    /// Live pin buffers.
    pub fn pins(&self) -> &PinCollection {
        &self.pins
    }

    /// Mutable pin buffers (scheduler apply phase only).
    pub fn pins_mut(&mut self) -> &mut PinCollection {
        &mut self.pins
    }

    /// The behavior, for evaluation.
    pub fn behavior_mut(&mut self) -> &mut dyn NodeBehavior {
        self.behavior.as_mut()
    }

    /// The behavior, for state serialization.
    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }

    /// Replace the behavior instance (state edit), rebinding pin buffers.
    pub fn replace_behavior(&mut self, behavior: Box<dyn NodeBehavior>) {
        self.behavior = behavior;
        let specs = self.behavior.pins(self.rotation);
        self.pins.rebind(&specs);
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
        let specs = self.behavior.pins(self.rotation);
        self.pins.rebind(&specs);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("type", &self.behavior.type_key())
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .finish()
    }
}

/// Flat segment arena with slot reuse.
#[derive(Debug, Default)]
struct SegmentArena {
    slots: Vec<Option<Segment>>,
    free: Vec<u32>,
    by_shape: HashMap<Segment, SegmentId>,
}

impl SegmentArena {
    fn insert(&mut self, segment: Segment) -> Result<SegmentId, StructuralError> {
        if self.by_shape.contains_key(&segment) {
            let (a, b) = segment.endpoints();
            return Err(StructuralError::DuplicateSegment { a, b });
        }
        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize] = Some(segment);
                SegmentId(slot)
            }
            None => {
                self.slots.push(Some(segment));
                SegmentId(self.slots.len() as u32 - 1)
            }
        };
        self.by_shape.insert(segment, id);
        Ok(id)
    }

    fn remove(&mut self, id: SegmentId) -> Result<Segment, StructuralError> {
        let slot = self
            .slots
            .get_mut(id.0 as usize)
            .ok_or(StructuralError::UnknownSegment(id))?;
        let segment = slot.take().ok_or(StructuralError::UnknownSegment(id))?;
        self.by_shape.remove(&segment);
        self.free.push(id.0);
        Ok(segment)
    }

    fn get(&self, id: SegmentId) -> Option<Segment> {
        self.slots.get(id.0 as usize).copied().flatten()
    }

    fn iter(&self) -> impl Iterator<Item = (SegmentId, Segment)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|s| (SegmentId(i as u32), s)))
    }

    fn len(&self) -> usize {
        self.by_shape.len()
    }
}

/// The complete editable circuit: nodes plus wire segments.
#[derive(Debug, Default)]
pub struct Topology {
    nodes: HashMap<NodeId, Node>,
    segments: SegmentArena,
}

impl Topology {
    /// An empty topology.
    pub fn new() -> Self {
        Topology::default()
    }

    /// Insert a fully-built node. Rejects duplicate ids.
    pub fn insert_node(&mut self, node: Node) -> Result<(), StructuralError> {
        if self.nodes.contains_key(&node.id()) {
            return Err(StructuralError::DuplicateNode(node.id()));
        }
        self.nodes.insert(node.id(), node);
        Ok(())
    }

    /// Remove a node, returning it for inversion.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, StructuralError> {
        self.nodes
            .remove(&id)
            .ok_or(StructuralError::UnknownNode(id))
    }

    /// Move a node, returning its previous position.
    pub fn move_node(&mut self, id: NodeId, to: GridPoint) -> Result<GridPoint, StructuralError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(StructuralError::UnknownNode(id))?;
        let from = node.position;
        node.position = to;
        Ok(from)
    }

    /// Rotate a node, returning its previous rotation.
    pub fn rotate_node(
        &mut self,
        id: NodeId,
        rotation: Rotation,
    ) -> Result<Rotation, StructuralError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(StructuralError::UnknownNode(id))?;
        let from = node.rotation;
        node.set_rotation(rotation);
        Ok(from)
    }

    /// Add a validated wire segment.
    pub fn add_segment(&mut self, segment: Segment) -> Result<SegmentId, StructuralError> {
        self.segments.insert(segment)
    }

    /// Remove a segment by handle, returning its shape for inversion.
    pub fn remove_segment(&mut self, id: SegmentId) -> Result<Segment, StructuralError> {
        self.segments.remove(id)
    }

    /// Look up the live handle of a segment by endpoints.
    pub fn find_segment(&self, a: GridPoint, b: GridPoint) -> Option<SegmentId> {
        let segment = Segment::new(a, b).ok()?;
        self.segments.by_shape.get(&segment).copied()
    }

    /// Segment shape under a handle, if still live.
    pub fn segment(&self, id: SegmentId) -> Option<Segment> {
        self.segments.get(id)
    }

    /// All live segments in arena order.
    pub fn segments(&self) -> impl Iterator<Item = (SegmentId, Segment)> + '_ {
        self.segments.iter()
    }

    /// Count of live segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// A node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// A node by id, mutable.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// All nodes, unordered.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node ids, unordered.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Count of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Write into a pin buffer; used by the scheduler apply phase.
    ///
    /// Returns false (without error) when the node or pin has disappeared,
    /// so stale events scheduled before a removal are dropped silently.
    pub fn write_pin(&mut self, id: NodeId, pin: &str, values: BitVector) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => node.pins.set(pin, values),
            None => false,
        }
    }

    /// Absolute positions of every pin of every node.
    pub fn pin_sites(&self) -> Vec<PinSite> {
        let mut sites = Vec::new();
        for node in self.nodes.values() {
            for spec in node.pin_specs() {
                sites.push(PinSite {
                    node: node.id(),
                    position: node.pin_position(&spec),
                    pin: spec.id.clone(),
                    width: spec.width,
                    direction: spec.direction,
                });
            }
        }
        sites
    }
}

/// One pin of one node at its absolute grid position.
#[derive(Clone, Debug)]
pub struct PinSite {
    /// Owning node.
    pub node: NodeId,
    /// Pin id within the node.
    pub pin: String,
    /// Signal width.
    pub width: usize,
    /// Read or drive.
    pub direction: PinDirection,
    /// Absolute grid position.
    pub position: GridPoint,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{InputView, OutputWrite};
    use crate::error::CoreResult;

    #[derive(Debug)]
    struct Dummy;

    impl NodeBehavior for Dummy {
        fn type_key(&self) -> &'static str {
            "dummy"
        }

        fn pins(&self, rotation: Rotation) -> Vec<PinSpec> {
            crate::behavior::rotated(
                vec![
                    PinSpec::input("a", 1, (-2, 0)),
                    PinSpec::output("q", 1, (2, 0)),
                ],
                rotation,
            )
        }

        fn evaluate(&mut self, _inputs: &InputView) -> Vec<OutputWrite> {
            Vec::new()
        }

        fn state_blob(&self) -> CoreResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    fn dummy_node(at: GridPoint) -> Node {
        Node::new(NodeId::fresh(), Box::new(Dummy), at, Rotation::R0)
    }

    #[test]
    fn duplicate_segment_rejected() {
        let mut topo = Topology::new();
        let seg = Segment::new(GridPoint::new(0, 0), GridPoint::new(3, 0)).unwrap();
        topo.add_segment(seg).unwrap();
        assert!(matches!(
            topo.add_segment(seg),
            Err(StructuralError::DuplicateSegment { .. })
        ));
        assert_eq!(topo.segment_count(), 1);
    }

    #[test]
    fn segment_handles_are_reused() {
        let mut topo = Topology::new();
        let s1 = Segment::new(GridPoint::new(0, 0), GridPoint::new(3, 0)).unwrap();
        let id1 = topo.add_segment(s1).unwrap();
        topo.remove_segment(id1).unwrap();
        let s2 = Segment::new(GridPoint::new(0, 1), GridPoint::new(3, 1)).unwrap();
        let id2 = topo.add_segment(s2).unwrap();
        assert_eq!(id1, id2);
        assert!(topo.find_segment(GridPoint::new(0, 1), GridPoint::new(3, 1)).is_some());
    }

    #[test]
    fn remove_unknown_segment_fails_cleanly() {
        let mut topo = Topology::new();
        assert!(matches!(
            topo.remove_segment(SegmentId(7)),
            Err(StructuralError::UnknownSegment(_))
        ));
    }

    #[test]
    fn pin_positions_follow_rotation() {
        let mut topo = Topology::new();
        let node = dummy_node(GridPoint::new(10, 10));
        let id = node.id();
        topo.insert_node(node).unwrap();

        let sites = topo.pin_sites();
        let out = sites.iter().find(|s| s.pin == "q").unwrap();
        assert_eq!(out.position, GridPoint::new(12, 10));

        topo.rotate_node(id, Rotation::R90).unwrap();
        let sites = topo.pin_sites();
        let out = sites.iter().find(|s| s.pin == "q").unwrap();
        assert_eq!(out.position, GridPoint::new(10, 12));
        assert_eq!(out.node, id);
    }

    #[test]
    fn move_returns_previous_position() {
        let mut topo = Topology::new();
        let node = dummy_node(GridPoint::new(0, 0));
        let id = node.id();
        topo.insert_node(node).unwrap();
        let old = topo.move_node(id, GridPoint::new(5, 5)).unwrap();
        assert_eq!(old, GridPoint::new(0, 0));
        assert_eq!(topo.node(id).unwrap().position(), GridPoint::new(5, 5));
    }

    #[test]
    fn stale_pin_writes_are_dropped() {
        let mut topo = Topology::new();
        let node = dummy_node(GridPoint::new(0, 0));
        let id = node.id();
        topo.insert_node(node).unwrap();
        assert!(topo.write_pin(id, "q", BitVector::from_u64(1, 1)));
        assert!(!topo.write_pin(id, "nope", BitVector::from_u64(1, 1)));
        topo.remove_node(id).unwrap();
        assert!(!topo.write_pin(id, "q", BitVector::from_u64(1, 1)));
    }
}
