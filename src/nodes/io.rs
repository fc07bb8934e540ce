//! I/O endpoints: the value source and the probe.
//!
//! A source drives its stored vector onto its output net; the editor
//! toggles it by replacing the node state (a structural edit, so the
//! change re-seeds evaluation). A probe is a pure sink: its readable
//! value is the aggregated value of the net under its input pin,
//! queried through the workbench.

use crate::behavior::{rotated, InputView, NodeBehavior, OutputWrite, PinSpec};
use crate::error::{CoreError, CoreResult};
use crate::geometry::Rotation;
use crate::logic::{BitVector, LogicValue};
use crate::registry::NodeKind;
use serde::{Deserialize, Serialize};

use super::{blob_of, parse_state};

/// Source state: the vector it drives.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceState {
    /// Driven bits, least significant first.
    pub values: BitVector,
}

/// A constant/toggleable value source.
#[derive(Debug)]
pub struct Source {
    state: SourceState,
}

impl Source {
    /// A one-bit source driving the given level.
    pub fn bit(level: LogicValue) -> Self {
        Source {
            state: SourceState {
                values: BitVector::filled(1, level),
            },
        }
    }
}

impl NodeBehavior for Source {
    fn type_key(&self) -> &'static str {
        "source"
    }

    fn pins(&self, rotation: Rotation) -> Vec<PinSpec> {
        rotated(
            vec![PinSpec::output("q", self.state.values.width(), (2, 0))],
            rotation,
        )
    }

    fn evaluate(&mut self, _inputs: &InputView) -> Vec<OutputWrite> {
        vec![OutputWrite::new("q", self.state.values.clone(), 0)]
    }

    fn state_blob(&self) -> CoreResult<serde_json::Value> {
        blob_of("source", &self.state)
    }
}

/// Probe state: only the expected width.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProbeState {
    /// Signal width in bits.
    pub width: usize,
}

/// A display sink with a single input pin.
#[derive(Debug)]
pub struct Probe {
    state: ProbeState,
}

impl NodeBehavior for Probe {
    fn type_key(&self) -> &'static str {
        "probe"
    }

    fn pins(&self, rotation: Rotation) -> Vec<PinSpec> {
        rotated(
            vec![PinSpec::input("d", self.state.width, (-2, 0))],
            rotation,
        )
    }

    fn evaluate(&mut self, _inputs: &InputView) -> Vec<OutputWrite> {
        Vec::new()
    }

    fn state_blob(&self) -> CoreResult<serde_json::Value> {
        blob_of("probe", &self.state)
    }
}

/// Registry entries for this module.
pub fn kinds() -> Vec<NodeKind> {
    vec![
        NodeKind {
            key: "source",
            default_state: || serde_json::json!({ "values": ["Low"] }),
            from_blob: |blob| {
                let state: SourceState = parse_state("source", blob)?;
                if state.values.width() == 0 {
                    return Err(CoreError::BadStateBlob {
                        type_key: "source".to_string(),
                        message: "source must drive at least one bit".to_string(),
                    });
                }
                Ok(Box::new(Source { state }))
            },
        },
        NodeKind {
            key: "probe",
            default_state: || serde_json::json!({ "width": 1 }),
            from_blob: |blob| {
                let state: ProbeState = parse_state("probe", blob)?;
                if state.width == 0 {
                    return Err(CoreError::BadStateBlob {
                        type_key: "probe".to_string(),
                        message: "probe width must be at least 1".to_string(),
                    });
                }
                Ok(Box::new(Probe { state }))
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_drives_its_state_immediately() {
        let mut source = Source::bit(LogicValue::High);
        let writes = source.evaluate(&InputView::default());
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].pin, "q");
        assert_eq!(writes[0].delay, 0);
        assert_eq!(writes[0].values.bit(0), LogicValue::High);
    }

    #[test]
    fn source_state_round_trips_through_blob() {
        let source = Source::bit(LogicValue::High);
        let blob = source.state_blob().unwrap();
        let kind = kinds().into_iter().find(|k| k.key == "source").unwrap();
        let mut rebuilt = (kind.from_blob)(&blob).unwrap();
        let writes = rebuilt.evaluate(&InputView::default());
        assert_eq!(writes[0].values.bit(0), LogicValue::High);
    }

    #[test]
    fn probe_produces_no_writes() {
        let mut probe = Probe {
            state: ProbeState { width: 8 },
        };
        assert!(probe.evaluate(&InputView::default()).is_empty());
        assert_eq!(probe.pins(Rotation::R0).len(), 1);
    }
}
