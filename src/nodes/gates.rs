//! Combinational gates: AND/OR/XOR/NAND/NOR, the inverter, and the
//! tri-state buffer.
//!
//! All gates share one state shape (`width`, `delay`) and the conservative
//! multi-valued semantics from [`crate::logic`]: a required floating input
//! bit yields a floating output bit, garbage yields garbage, no boolean is
//! ever computed from either.

use crate::behavior::{rotated, InputView, NodeBehavior, OutputWrite, PinSpec};
use crate::error::{CoreError, CoreResult};
use crate::geometry::Rotation;
use crate::logic::{self, BitVector, LogicValue};
use crate::registry::NodeKind;
use serde::{Deserialize, Serialize};

use super::{blob_of, parse_state};

fn default_width() -> usize {
    1
}

fn default_delay() -> u64 {
    1
}

/// Shared gate state blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateState {
    /// Signal width in bits.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Propagation delay in ticks.
    #[serde(default = "default_delay")]
    pub delay: u64,
}

impl Default for GateState {
    fn default() -> Self {
        GateState {
            width: default_width(),
            delay: default_delay(),
        }
    }
}

impl GateState {
    fn checked(self, type_key: &'static str) -> CoreResult<Self> {
        if self.width == 0 || self.width > 64 {
            return Err(CoreError::BadStateBlob {
                type_key: type_key.to_string(),
                message: format!("width must be 1-64, got {}", self.width),
            });
        }
        Ok(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GateOp {
    And,
    Or,
    Xor,
    Nand,
    Nor,
}

impl GateOp {
    fn key(self) -> &'static str {
        match self {
            GateOp::And => "and",
            GateOp::Or => "or",
            GateOp::Xor => "xor",
            GateOp::Nand => "nand",
            GateOp::Nor => "nor",
        }
    }

    fn apply(self, a: &BitVector, b: &BitVector) -> BitVector {
        match self {
            GateOp::And => logic::and(a, b),
            GateOp::Or => logic::or(a, b),
            GateOp::Xor => logic::xor(a, b),
            GateOp::Nand => logic::not(&logic::and(a, b)),
            GateOp::Nor => logic::not(&logic::or(a, b)),
        }
    }
}

/// A two-input gate.
#[derive(Debug)]
pub struct BinaryGate {
    op: GateOp,
    state: GateState,
}

impl NodeBehavior for BinaryGate {
    fn type_key(&self) -> &'static str {
        self.op.key()
    }

    fn pins(&self, rotation: Rotation) -> Vec<PinSpec> {
        rotated(
            vec![
                PinSpec::input("a", self.state.width, (-2, -1)),
                PinSpec::input("b", self.state.width, (-2, 1)),
                PinSpec::output("q", self.state.width, (2, 0)),
            ],
            rotation,
        )
    }

    fn evaluate(&mut self, inputs: &InputView) -> Vec<OutputWrite> {
        let a = inputs.read("a", self.state.width);
        let b = inputs.read("b", self.state.width);
        vec![OutputWrite::new(
            "q",
            self.op.apply(&a, &b),
            self.state.delay,
        )]
    }

    fn state_blob(&self) -> CoreResult<serde_json::Value> {
        blob_of(self.op.key(), &self.state)
    }
}

/// The NOT gate.
#[derive(Debug)]
pub struct Inverter {
    state: GateState,
}

impl NodeBehavior for Inverter {
    fn type_key(&self) -> &'static str {
        "not"
    }

    fn pins(&self, rotation: Rotation) -> Vec<PinSpec> {
        rotated(
            vec![
                PinSpec::input("d", self.state.width, (-2, 0)),
                PinSpec::output("q", self.state.width, (2, 0)),
            ],
            rotation,
        )
    }

    fn evaluate(&mut self, inputs: &InputView) -> Vec<OutputWrite> {
        let d = inputs.read("d", self.state.width);
        vec![OutputWrite::new("q", logic::not(&d), self.state.delay)]
    }

    fn state_blob(&self) -> CoreResult<serde_json::Value> {
        blob_of("not", &self.state)
    }
}

/// Tri-state buffer: passes `d` through while `en` is high, floats while
/// low, and propagates Z/UNDEFINED enables conservatively.
#[derive(Debug)]
pub struct TriStateBuffer {
    state: GateState,
}

impl NodeBehavior for TriStateBuffer {
    fn type_key(&self) -> &'static str {
        "tristate"
    }

    fn pins(&self, rotation: Rotation) -> Vec<PinSpec> {
        rotated(
            vec![
                PinSpec::input("d", self.state.width, (-2, 0)),
                PinSpec::input("en", 1, (0, -2)),
                PinSpec::output("q", self.state.width, (2, 0)),
            ],
            rotation,
        )
    }

    fn evaluate(&mut self, inputs: &InputView) -> Vec<OutputWrite> {
        let d = inputs.read("d", self.state.width);
        let out = match inputs.read("en", 1).bit(0) {
            LogicValue::High => d,
            LogicValue::Low | LogicValue::Z => BitVector::all_z(self.state.width),
            LogicValue::Undefined => BitVector::all_undefined(self.state.width),
        };
        vec![OutputWrite::new("q", out, self.state.delay)]
    }

    fn state_blob(&self) -> CoreResult<serde_json::Value> {
        blob_of("tristate", &self.state)
    }
}

fn gate_kind(op: GateOp) -> NodeKind {
    fn build(op: GateOp, blob: &serde_json::Value) -> CoreResult<Box<dyn NodeBehavior>> {
        let state: GateState = parse_state(op.key(), blob)?;
        Ok(Box::new(BinaryGate {
            op,
            state: state.checked(op.key())?,
        }))
    }
    // One registry entry per operator, sharing the BinaryGate implementation.
    let from_blob: crate::registry::BehaviorFactory = match op {
        GateOp::And => |blob: &serde_json::Value| build(GateOp::And, blob),
        GateOp::Or => |blob: &serde_json::Value| build(GateOp::Or, blob),
        GateOp::Xor => |blob: &serde_json::Value| build(GateOp::Xor, blob),
        GateOp::Nand => |blob: &serde_json::Value| build(GateOp::Nand, blob),
        GateOp::Nor => |blob: &serde_json::Value| build(GateOp::Nor, blob),
    };
    NodeKind {
        key: op.key(),
        default_state: || serde_json::json!({ "width": 1, "delay": 1 }),
        from_blob,
    }
}

/// Registry entries for this module.
pub fn kinds() -> Vec<NodeKind> {
    let mut kinds: Vec<NodeKind> = [GateOp::And, GateOp::Or, GateOp::Xor, GateOp::Nand, GateOp::Nor]
        .into_iter()
        .map(gate_kind)
        .collect();
    kinds.push(NodeKind {
        key: "not",
        default_state: || serde_json::json!({ "width": 1, "delay": 1 }),
        from_blob: |blob| {
            let state: GateState = parse_state("not", blob)?;
            Ok(Box::new(Inverter {
                state: state.checked("not")?,
            }))
        },
    });
    kinds.push(NodeKind {
        key: "tristate",
        default_state: || serde_json::json!({ "width": 1, "delay": 1 }),
        from_blob: |blob| {
            let state: GateState = parse_state("tristate", blob)?;
            Ok(Box::new(TriStateBuffer {
                state: state.checked("tristate")?,
            }))
        },
    });
    kinds
}
