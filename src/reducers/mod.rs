//! Merge strategies for state channels.
//!
//! Every channel owns one [`Reducer`]: the rule combining the channel's
//! current value with an incoming value from a node's partial update. The
//! barrier applies reducers once per contributing partial, in a stable
//! order, so the merged result is reproducible regardless of which node
//! finished first.
//!
//! Built-ins cover the common shapes:
//! - [`LastValue`]: overwrite (the default when none is declared)
//! - [`AppendList`]: list concatenation
//! - [`SumNumbers`]: numeric accumulation
//! - [`MapMerge`]: shallow JSON object merge
//!
//! A reducer must behave sensibly when applied repeatedly across
//! supersteps; it sees no synchronization beyond the barrier itself.

mod append;
mod last_value;
mod map_merge;
mod sum;

pub use append::AppendList;
pub use last_value::LastValue;
pub use map_merge::MapMerge;
pub use sum::SumNumbers;

use serde_json::Value;

/// Combines a channel's current value with one incoming value.
///
/// Implementations must be pure with respect to their inputs: the barrier
/// may apply them any number of times in one run and relies on
/// argument-order determinism, not call timing, for reproducible results.
pub trait Reducer: Send + Sync {
    fn apply(&self, current: Value, incoming: Value) -> Value;
}
