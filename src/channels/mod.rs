//! Channel descriptors: the declared shape of shared workflow state.
//!
//! A [`Channel`] names one slot of the shared state and fixes two
//! behaviors for it: the default value seeding a fresh thread, and the
//! [`Reducer`](crate::reducers::Reducer) merging concurrent writes at the
//! superstep barrier. Channels are declared on the graph builder and
//! resolved once at compile time into an immutable [`StateSchema`]; there
//! is no runtime shape inference.
//!
//! # Examples
//!
//! ```rust
//! use graphloom::channels::Channel;
//! use graphloom::reducers::{AppendList, SumNumbers};
//! use serde_json::json;
//!
//! // Overwrite semantics, null default:
//! let output = Channel::new("output");
//!
//! // Append semantics with an explicit seed:
//! let history = Channel::new("history")
//!     .with_default(|| json!(["transcript start"]))
//!     .with_reducer(AppendList);
//!
//! // Accumulating counter:
//! let steps = Channel::new("steps")
//!     .with_default(|| json!(0))
//!     .with_reducer(SumNumbers);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::reducers::{AppendList, LastValue, Reducer, SumNumbers};

type DefaultFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// One named slot of the shared state: default value plus merge rule.
///
/// Cheap to clone; the factory and reducer are shared behind `Arc`s.
#[derive(Clone)]
pub struct Channel {
    name: String,
    default_factory: DefaultFactory,
    reducer: Arc<dyn Reducer>,
}

impl Channel {
    /// Declare a channel with overwrite semantics and a `null` default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_factory: Arc::new(|| Value::Null),
            reducer: Arc::new(LastValue),
        }
    }

    /// Shorthand for a list channel: empty-array default, append reducer.
    pub fn appending(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_default(|| Value::Array(Vec::new()))
            .with_reducer(AppendList)
    }

    /// Shorthand for a counter channel: zero default, summing reducer.
    pub fn summing(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_default(|| Value::from(0))
            .with_reducer(SumNumbers)
    }

    /// Replace the default-value factory.
    ///
    /// The factory is called exactly once per fresh thread to seed the
    /// slot; restored threads keep their persisted value instead.
    #[must_use]
    pub fn with_default<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default_factory = Arc::new(factory);
        self
    }

    /// Replace the merge rule.
    #[must_use]
    pub fn with_reducer(mut self, reducer: impl Reducer + 'static) -> Self {
        self.reducer = Arc::new(reducer);
        self
    }

    /// The channel's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce the default value for a fresh thread.
    #[must_use]
    pub fn default_value(&self) -> Value {
        (self.default_factory)()
    }

    /// Apply the channel's reducer to one incoming value.
    #[must_use]
    pub fn reduce(&self, current: Value, incoming: Value) -> Value {
        self.reducer.apply(current, incoming)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("name", &self.name).finish()
    }
}

/// The fixed set of channels a compiled graph executes against.
///
/// Built once at compile time from the builder's declarations; iteration
/// order is sorted by channel name so every schema-driven walk (seeding,
/// merging, snapshotting) is deterministic.
#[derive(Clone, Debug, Default)]
pub struct StateSchema {
    channels: BTreeMap<String, Channel>,
}

impl StateSchema {
    /// Build a schema from declared channels. The builder has already
    /// rejected duplicate names; a later declaration would win here.
    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        let channels = channels
            .into_iter()
            .map(|c| (c.name().to_string(), c))
            .collect();
        Self { channels }
    }

    /// Look up a channel by name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Whether a channel with this name is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Iterate channels in sorted name order.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Number of declared channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether the schema declares no channels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_overwrite_and_null() {
        let ch = Channel::new("output");
        assert_eq!(ch.default_value(), Value::Null);
        assert_eq!(ch.reduce(json!(1), json!(2)), json!(2));
    }

    #[test]
    fn appending_shorthand() {
        let ch = Channel::appending("history");
        assert_eq!(ch.default_value(), json!([]));
        assert_eq!(ch.reduce(json!(["a"]), json!(["b"])), json!(["a", "b"]));
    }

    #[test]
    fn schema_iterates_sorted() {
        let schema = StateSchema::from_channels([
            Channel::new("zeta"),
            Channel::new("alpha"),
            Channel::new("mid"),
        ]);
        let names: Vec<_> = schema.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
