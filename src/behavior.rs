//! The node evaluator contract.
//!
//! Every component type (gate, arithmetic unit, I/O pin, ...) implements
//! [`NodeBehavior`]: a pin configuration derived from its state and the
//! node's rotation, plus an `evaluate` operation mapping the current
//! readable input values to a finite set of timed output writes. Evaluators
//! never touch pin buffers or nets directly; the scheduler applies their
//! writes as events. Private state updates (a latched value, a toggled
//! switch) are allowed, anything else observable is not.
//!
//! Behaviors are constructed through [`crate::registry::NodeRegistry`] from
//! an opaque JSON state blob and can serialize themselves back to the same
//! blob shape for persistence.

use crate::error::CoreResult;
use crate::geometry::Rotation;
use crate::logic::BitVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a pin reads from or drives its net.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Reads the aggregated net value.
    Input,
    /// Drives the net through its buffer.
    Output,
}

/// One connection point in a node's pin configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PinSpec {
    /// Stable pin identifier, unique within the node.
    pub id: String,
    /// Signal width in bits.
    pub width: usize,
    /// Read or drive.
    pub direction: PinDirection,
    /// Grid offset from the node position, already rotated.
    pub offset: (i32, i32),
}

impl PinSpec {
    /// Input pin at an unrotated offset.
    pub fn input(id: &str, width: usize, offset: (i32, i32)) -> Self {
        PinSpec {
            id: id.to_string(),
            width,
            direction: PinDirection::Input,
            offset,
        }
    }

    /// Output pin at an unrotated offset.
    pub fn output(id: &str, width: usize, offset: (i32, i32)) -> Self {
        PinSpec {
            id: id.to_string(),
            width,
            direction: PinDirection::Output,
            offset,
        }
    }
}

/// Rotate the offsets of a base pin configuration.
pub fn rotated(mut specs: Vec<PinSpec>, rotation: Rotation) -> Vec<PinSpec> {
    for spec in &mut specs {
        spec.offset = rotation.apply(spec.offset);
    }
    specs
}

/// A timed write produced by an evaluator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputWrite {
    /// Target output pin on the evaluated node.
    pub pin: String,
    /// Values to store in the pin buffer.
    pub values: BitVector,
    /// Ticks after the current tick at which the write applies; 0 applies
    /// within the same tick.
    pub delay: u64,
}

impl OutputWrite {
    /// Convenience constructor.
    pub fn new(pin: &str, values: BitVector, delay: u64) -> Self {
        OutputWrite {
            pin: pin.to_string(),
            values,
            delay,
        }
    }
}

/// Snapshot of the readable values of a node's input pins.
///
/// Built by the scheduler from the aggregated net values; a pin with no
/// incident net reads as floating.
#[derive(Clone, Debug, Default)]
pub struct InputView {
    values: HashMap<String, BitVector>,
}

impl InputView {
    /// Build a view from resolved (pin, value) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, BitVector)>) -> Self {
        InputView {
            values: pairs.into_iter().collect(),
        }
    }

    /// Read one input pin at the width the caller expects.
    ///
    /// Missing pins and undriven nets read all-Z. A stored value of a
    /// different width (a net whose drivers disagree with this pin's width)
    /// reads all-UNDEFINED rather than being silently truncated.
    pub fn read(&self, pin: &str, width: usize) -> BitVector {
        match self.values.get(pin) {
            None => BitVector::all_z(width),
            Some(v) if v.width() == width => v.clone(),
            Some(v) if v.is_all_z() => BitVector::all_z(width),
            Some(_) => BitVector::all_undefined(width),
        }
    }
}

/// The per-type contract: pin configuration plus evaluation.
pub trait NodeBehavior: Send + std::fmt::Debug {
    /// Registry key of this node type.
    fn type_key(&self) -> &'static str;

    /// Pin configuration for the given node rotation.
    fn pins(&self, rotation: Rotation) -> Vec<PinSpec>;

    /// Map input values (and private state) to timed output writes.
    fn evaluate(&mut self, inputs: &InputView) -> Vec<OutputWrite>;

    /// Serialize private state back to the opaque blob shape the registry
    /// can rebuild this behavior from.
    fn state_blob(&self) -> CoreResult<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicValue;

    #[test]
    fn input_view_defaults_to_floating() {
        let view = InputView::default();
        assert_eq!(view.read("a", 3), BitVector::all_z(3));
    }

    #[test]
    fn input_view_width_mismatch_reads_undefined() {
        let view = InputView::from_pairs([("a".to_string(), BitVector::from_u64(1, 1))]);
        assert_eq!(view.read("a", 1).bit(0), LogicValue::High);
        assert_eq!(view.read("a", 4), BitVector::all_undefined(4));
    }

    #[test]
    fn input_view_widens_floating_nets() {
        let view = InputView::from_pairs([("a".to_string(), BitVector::all_z(1))]);
        assert_eq!(view.read("a", 4), BitVector::all_z(4));
    }

    #[test]
    fn rotated_specs_rotate_offsets_only() {
        let specs = rotated(vec![PinSpec::input("a", 1, (-2, 0))], Rotation::R180);
        assert_eq!(specs[0].offset, (2, 0));
        assert_eq!(specs[0].id, "a");
    }
}
