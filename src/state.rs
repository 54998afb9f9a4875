//! Versioned state storage for workflow execution.
//!
//! The [`StateStore`] holds one value per declared channel, each paired
//! with a version counter that bumps once per superstep in which the
//! channel changed. Nodes never touch the store directly: they receive an
//! immutable [`StateSnapshot`] taken at the start of their superstep and
//! hand back a [`NodePartial`](crate::node::NodePartial); only the barrier
//! merge mutates the store.
//!
//! Merging is deterministic by construction: contributing partials are
//! applied in node-name order and channels are walked in sorted name
//! order, so concurrent nodes writing the same channel produce the same
//! merged value on every run regardless of scheduling jitter.

use std::collections::BTreeMap;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::channels::StateSchema;
use crate::node::NodePartial;
use crate::types::NodeKind;

/// A channel's current value plus its version counter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSlot {
    pub value: Value,
    pub version: u32,
}

/// The shared state of one workflow thread.
///
/// Every channel declared in the schema is present from the moment the
/// store is seeded, so nodes can rely on reads never missing. Only the
/// scheduler's barrier merge mutates a store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateStore {
    slots: BTreeMap<String, ChannelSlot>,
}

/// Errors raised while seeding or merging state.
#[derive(Debug, Error, Diagnostic)]
pub enum StateError {
    /// A partial referenced a channel the graph never declared. Raised for
    /// caller input at seed time and for node output at the barrier.
    #[error("undeclared channel: {channel}")]
    #[diagnostic(
        code(graphloom::state::undeclared_channel),
        help("Declare the channel on the graph builder before writing to it.")
    )]
    UndeclaredChannel { channel: String },
}

impl StateStore {
    /// Seed a fresh store from channel defaults plus a caller-supplied
    /// initial partial.
    ///
    /// Initial values are taken as-is (no reducer involved); channels the
    /// caller omits get their default factory value. An initial value for
    /// an undeclared channel is rejected.
    pub fn seed(schema: &StateSchema, initial: &NodePartial) -> Result<Self, StateError> {
        for name in initial.updates().keys() {
            if !schema.contains(name) {
                return Err(StateError::UndeclaredChannel {
                    channel: name.clone(),
                });
            }
        }

        let mut slots = BTreeMap::new();
        for channel in schema.iter() {
            let value = initial
                .updates()
                .get(channel.name())
                .cloned()
                .unwrap_or_else(|| channel.default_value());
            slots.insert(
                channel.name().to_string(),
                ChannelSlot { value, version: 1 },
            );
        }
        Ok(Self { slots })
    }

    /// Reassemble a store from persisted slots. Used by checkpoint
    /// restoration; performs no schema checks because the persisted shape
    /// was produced by a compiled graph.
    pub(crate) fn from_slots(slots: BTreeMap<String, ChannelSlot>) -> Self {
        Self { slots }
    }

    pub(crate) fn slots(&self) -> &BTreeMap<String, ChannelSlot> {
        &self.slots
    }

    /// Current value of a channel.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<&Value> {
        self.slots.get(channel).map(|slot| &slot.value)
    }

    /// Current version of a channel.
    #[must_use]
    pub fn version(&self, channel: &str) -> Option<u32> {
        self.slots.get(channel).map(|slot| slot.version)
    }

    /// Merge one superstep's partial updates into the store.
    ///
    /// Partials are applied in node-name order; within a partial, channels
    /// are visited in sorted name order. Each contributing partial applies
    /// the channel's reducer once. Channels whose value actually changed
    /// get their version bumped once, and their names are returned in
    /// sorted order.
    pub fn merge(
        &mut self,
        schema: &StateSchema,
        partials: &[(NodeKind, NodePartial)],
    ) -> Result<Vec<String>, StateError> {
        let mut ordered: Vec<&(NodeKind, NodePartial)> = partials.iter().collect();
        ordered.sort_by_key(|entry| entry.0.encode());

        let mut touched: BTreeMap<String, Value> = BTreeMap::new();
        for (_, partial) in ordered {
            for (name, incoming) in partial.updates() {
                let channel = schema.channel(name).ok_or_else(|| {
                    StateError::UndeclaredChannel {
                        channel: name.clone(),
                    }
                })?;
                let current = match touched.remove(name) {
                    Some(in_flight) => in_flight,
                    None => self
                        .slots
                        .get(name)
                        .map(|slot| slot.value.clone())
                        .unwrap_or(Value::Null),
                };
                touched.insert(name.clone(), channel.reduce(current, incoming.clone()));
            }
        }

        let mut updated = Vec::new();
        for (name, merged) in touched {
            let slot = self.slots.entry(name.clone()).or_insert(ChannelSlot {
                value: Value::Null,
                version: 0,
            });
            if slot.value != merged {
                slot.value = merged;
                slot.version = slot.version.saturating_add(1);
                updated.push(name);
            }
        }
        Ok(updated)
    }

    /// Take an immutable snapshot of the current state.
    ///
    /// Snapshots clone all channel values; they are what nodes and routing
    /// functions read, and what `invoke` ultimately returns.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            values: self
                .slots
                .iter()
                .map(|(name, slot)| (name.clone(), slot.value.clone()))
                .collect(),
            versions: self
                .slots
                .iter()
                .map(|(name, slot)| (name.clone(), slot.version))
                .collect(),
        }
    }
}

/// Immutable view of the state at one point in time.
///
/// Independent of the store it was taken from: later merges do not show
/// through. Typed accessors cover the common JSON shapes so node and
/// router code stays terse.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    values: BTreeMap<String, Value>,
    versions: BTreeMap<String, u32>,
}

impl StateSnapshot {
    /// Raw value of a channel.
    #[must_use]
    pub fn get(&self, channel: &str) -> Option<&Value> {
        self.values.get(channel)
    }

    /// String view of a channel value.
    #[must_use]
    pub fn get_str(&self, channel: &str) -> Option<&str> {
        self.get(channel).and_then(Value::as_str)
    }

    /// Integer view of a channel value.
    #[must_use]
    pub fn get_i64(&self, channel: &str) -> Option<i64> {
        self.get(channel).and_then(Value::as_i64)
    }

    /// Float view of a channel value.
    #[must_use]
    pub fn get_f64(&self, channel: &str) -> Option<f64> {
        self.get(channel).and_then(Value::as_f64)
    }

    /// Boolean view of a channel value.
    #[must_use]
    pub fn get_bool(&self, channel: &str) -> Option<bool> {
        self.get(channel).and_then(Value::as_bool)
    }

    /// Array view of a channel value.
    #[must_use]
    pub fn get_array(&self, channel: &str) -> Option<&Vec<Value>> {
        self.get(channel).and_then(Value::as_array)
    }

    /// Version of a channel at snapshot time.
    #[must_use]
    pub fn version(&self, channel: &str) -> Option<u32> {
        self.versions.get(channel).copied()
    }

    /// Iterate `(channel, value)` pairs in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Number of channels in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the snapshot carries no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
