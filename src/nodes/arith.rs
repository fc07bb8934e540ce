//! Arithmetic units.
//!
//! The ripple adder is the vector-semantics workout: it computes a numeric
//! sum only when every input bit is a defined level, and otherwise
//! propagates Z/UNDEFINED across the whole result instead of adding
//! garbage bits.

use crate::behavior::{rotated, InputView, NodeBehavior, OutputWrite, PinSpec};
use crate::error::{CoreError, CoreResult};
use crate::geometry::Rotation;
use crate::logic::BitVector;
use crate::registry::NodeKind;
use serde::{Deserialize, Serialize};

use super::{blob_of, parse_state};

fn default_delay() -> u64 {
    1
}

/// Adder state blob.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdderState {
    /// Operand width in bits (1-63 so the carry fits in u64 arithmetic).
    pub width: usize,
    /// Propagation delay in ticks.
    #[serde(default = "default_delay")]
    pub delay: u64,
}

/// A `width`-bit adder with carry in and carry out.
#[derive(Debug)]
pub struct Adder {
    state: AdderState,
}

impl NodeBehavior for Adder {
    fn type_key(&self) -> &'static str {
        "adder"
    }

    fn pins(&self, rotation: Rotation) -> Vec<PinSpec> {
        rotated(
            vec![
                PinSpec::input("a", self.state.width, (-2, -2)),
                PinSpec::input("b", self.state.width, (-2, 2)),
                PinSpec::input("cin", 1, (0, -3)),
                PinSpec::output("sum", self.state.width, (3, 0)),
                PinSpec::output("cout", 1, (3, -2)),
            ],
            rotation,
        )
    }

    fn evaluate(&mut self, inputs: &InputView) -> Vec<OutputWrite> {
        let width = self.state.width;
        let a = inputs.read("a", width);
        let b = inputs.read("b", width);
        let cin = inputs.read("cin", 1);

        let (sum, cout) = if a.any_z() || b.any_z() || cin.any_z() {
            (BitVector::all_z(width), BitVector::all_z(1))
        } else {
            match (a.to_u64(), b.to_u64(), cin.to_u64()) {
                (Some(a), Some(b), Some(cin)) => {
                    let total = a + b + cin;
                    (
                        BitVector::from_u64(total, width),
                        BitVector::from_u64(total >> width, 1),
                    )
                }
                _ => (BitVector::all_undefined(width), BitVector::all_undefined(1)),
            }
        };
        vec![
            OutputWrite::new("sum", sum, self.state.delay),
            OutputWrite::new("cout", cout, self.state.delay),
        ]
    }

    fn state_blob(&self) -> CoreResult<serde_json::Value> {
        blob_of("adder", &self.state)
    }
}

/// Registry entries for this module.
pub fn kinds() -> Vec<NodeKind> {
    vec![NodeKind {
        key: "adder",
        default_state: || serde_json::json!({ "width": 4, "delay": 1 }),
        from_blob: |blob| {
            let state: AdderState = parse_state("adder", blob)?;
            if state.width == 0 || state.width > 63 {
                return Err(CoreError::BadStateBlob {
                    type_key: "adder".to_string(),
                    message: format!("width must be 1-63, got {}", state.width),
                });
            }
            Ok(Box::new(Adder { state }))
        },
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::LogicValue;

    fn view(pairs: &[(&str, BitVector)]) -> InputView {
        InputView::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())))
    }

    fn adder(width: usize) -> Adder {
        Adder {
            state: AdderState { width, delay: 1 },
        }
    }

    #[test]
    fn adds_with_carry_out() {
        let mut add = adder(4);
        let out = add.evaluate(&view(&[
            ("a", BitVector::from_u64(9, 4)),
            ("b", BitVector::from_u64(9, 4)),
            ("cin", BitVector::from_u64(1, 1)),
        ]));
        let sum = out.iter().find(|w| w.pin == "sum").unwrap();
        let cout = out.iter().find(|w| w.pin == "cout").unwrap();
        assert_eq!(sum.values.to_u64(), Some(3)); // 19 mod 16
        assert_eq!(cout.values.to_u64(), Some(1));
    }

    #[test]
    fn floating_carry_floats_everything() {
        let mut add = adder(4);
        let out = add.evaluate(&view(&[
            ("a", BitVector::from_u64(1, 4)),
            ("b", BitVector::from_u64(2, 4)),
        ]));
        let sum = out.iter().find(|w| w.pin == "sum").unwrap();
        assert_eq!(sum.values, BitVector::all_z(4));
    }

    #[test]
    fn garbage_operand_never_produces_a_number() {
        let mut add = adder(2);
        let mut bad = BitVector::from_u64(1, 2);
        bad.set_bit(1, LogicValue::Undefined);
        let out = add.evaluate(&view(&[
            ("a", bad),
            ("b", BitVector::from_u64(1, 2)),
            ("cin", BitVector::from_u64(0, 1)),
        ]));
        let sum = out.iter().find(|w| w.pin == "sum").unwrap();
        assert_eq!(sum.values, BitVector::all_undefined(2));
    }
}
