//! Runtime node-type registry.
//!
//! Node construction goes through an explicit registry mapping a type key to
//! its default-state constructor and its state deserializer, populated once
//! at startup and threaded (by `Arc`) into every construction call that
//! needs it — there is no process-wide singleton and no reflection-style
//! scan of loaded code. An unknown key is a synchronous [`CoreError::
//! UnknownNodeType`]; nothing is silently substituted.
//!
//! The registry also answers pin-configuration queries for a (type key,
//! state blob, rotation) triple without a live simulation, which is what
//! the persistence and rendering layers use for previews and hit-testing.

use crate::behavior::{NodeBehavior, PinSpec};
use crate::error::{CoreError, CoreResult};
use crate::geometry::Rotation;
use std::collections::HashMap;

/// Factory building a behavior from an opaque state blob.
pub type BehaviorFactory = fn(&serde_json::Value) -> CoreResult<Box<dyn NodeBehavior>>;

/// One registered node type.
#[derive(Debug)]
pub struct NodeKind {
    /// Registry key, e.g. `"and"` or `"source"`.
    pub key: &'static str,
    /// Constructor of the default state blob for freshly-placed nodes.
    pub default_state: fn() -> serde_json::Value,
    /// Deserializer rebuilding a live behavior from a stored blob.
    pub from_blob: BehaviorFactory,
}

/// Central registry of node types.
#[derive(Debug)]
pub struct NodeRegistry {
    kinds: HashMap<&'static str, NodeKind>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        NodeRegistry {
            kinds: HashMap::new(),
        }
    }

    /// A registry pre-populated with every built-in node type.
    pub fn with_builtins() -> Self {
        let mut registry = NodeRegistry::new();
        for kind in crate::nodes::builtin_kinds() {
            // Built-in keys are distinct by construction.
            let _ = registry.register(kind);
        }
        registry
    }

    /// Register a node type. Rejects duplicate keys.
    pub fn register(&mut self, kind: NodeKind) -> CoreResult<()> {
        if self.kinds.contains_key(kind.key) {
            return Err(CoreError::BadStateBlob {
                type_key: kind.key.to_string(),
                message: "type key already registered".to_string(),
            });
        }
        self.kinds.insert(kind.key, kind);
        Ok(())
    }

    /// True when a key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.kinds.contains_key(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self.kinds.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Default state blob for a type.
    pub fn default_state(&self, key: &str) -> CoreResult<serde_json::Value> {
        let kind = self.lookup(key)?;
        Ok((kind.default_state)())
    }

    /// Build a live behavior from a type key and stored state blob.
    pub fn build(&self, key: &str, blob: &serde_json::Value) -> CoreResult<Box<dyn NodeBehavior>> {
        let kind = self.lookup(key)?;
        (kind.from_blob)(blob)
    }

    /// Pin configuration for a stored node, without a live simulation.
    pub fn pin_preview(
        &self,
        key: &str,
        blob: &serde_json::Value,
        rotation: Rotation,
    ) -> CoreResult<Vec<PinSpec>> {
        Ok(self.build(key, blob)?.pins(rotation))
    }

    fn lookup(&self, key: &str) -> CoreResult<&NodeKind> {
        self.kinds
            .get(key)
            .ok_or_else(|| CoreError::UnknownNodeType(key.to_string()))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::PinDirection;

    #[test]
    fn unknown_key_is_a_lookup_error() {
        let registry = NodeRegistry::with_builtins();
        let err = registry
            .build("definitely-not-a-gate", &serde_json::Value::Null)
            .unwrap_err();
        assert!(matches!(err, CoreError::UnknownNodeType(_)));
    }

    #[test]
    fn builtins_are_registered() {
        let registry = NodeRegistry::with_builtins();
        for key in ["and", "or", "xor", "nand", "nor", "not", "tristate", "source", "probe", "adder"] {
            assert!(registry.contains(key), "missing builtin '{key}'");
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = NodeRegistry::with_builtins();
        let dup = crate::nodes::builtin_kinds()
            .into_iter()
            .find(|k| k.key == "and")
            .unwrap();
        assert!(registry.register(dup).is_err());
    }

    #[test]
    fn pin_preview_without_live_simulation() {
        let registry = NodeRegistry::with_builtins();
        let blob = registry.default_state("and").unwrap();
        let pins = registry.pin_preview("and", &blob, Rotation::R0).unwrap();
        let outputs: Vec<_> = pins
            .iter()
            .filter(|p| p.direction == PinDirection::Output)
            .collect();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].id, "q");
    }
}
