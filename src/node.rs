//! Executable workflow nodes and their execution context.
//!
//! A [`Node`] is one opaque unit of computation: it receives an immutable
//! [`StateSnapshot`] plus a [`NodeContext`] and returns a [`NodePartial`]
//! describing the channel updates it wants merged. Nodes never mutate
//! shared state directly, and nothing a node does is visible to its
//! superstep siblings; the barrier merge is the only publication point.
//!
//! The context also carries the two side-channels a node may use during
//! execution: streaming emission ([`NodeContext::emit_message`],
//! [`NodeContext::emit_custom`]) and suspension
//! ([`NodeContext::interrupt`]).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::state::StateSnapshot;
use crate::stream::StreamEmitter;
use crate::types::NodeKind;

/// One unit of computation in a workflow graph.
///
/// Implementations should be stateless with respect to the workflow:
/// everything they need comes in through the snapshot, everything they
/// produce goes out through the returned partial. A node that may suspend
/// must keep its pre-suspension work side-effect free (or guard it),
/// because resumption replays the node from the top of its superstep.
///
/// Returning `Err` aborts the invocation; the runtime wraps the failure
/// with the node's name and step number.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError>;
}

/// The channel updates one node wants merged at the barrier.
///
/// Keys are channel names; values are handed to the channel's reducer.
/// Sorted map so every walk over an update set is deterministic.
///
/// # Examples
///
/// ```rust
/// use graphloom::node::NodePartial;
/// use serde_json::json;
///
/// let partial = NodePartial::new()
///     .with("output", json!("processed"))
///     .with("history", json!(["step done"]));
/// assert_eq!(partial.updates().len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodePartial {
    updates: BTreeMap<String, Value>,
}

impl NodePartial {
    /// An empty update set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one channel update, consuming self for fluent construction.
    #[must_use]
    pub fn with(mut self, channel: impl Into<String>, value: Value) -> Self {
        self.updates.insert(channel.into(), value);
        self
    }

    /// Add one channel update in place.
    pub fn set(&mut self, channel: impl Into<String>, value: Value) -> &mut Self {
        self.updates.insert(channel.into(), value);
        self
    }

    /// The update map, keyed by channel name.
    #[must_use]
    pub fn updates(&self) -> &BTreeMap<String, Value> {
        &self.updates
    }

    /// Whether this partial updates nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

impl FromIterator<(String, Value)> for NodePartial {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            updates: iter.into_iter().collect(),
        }
    }
}

/// Replay cursor over the resume values recorded for one node.
///
/// Each `interrupt` call site consumes the next recorded value; the first
/// call site with no recorded value suspends. Cloned freely; the cursor
/// is shared within a single node execution.
#[derive(Clone, Debug, Default)]
pub(crate) struct ResumeCursor {
    values: Arc<Vec<Value>>,
    next: Arc<AtomicUsize>,
}

impl ResumeCursor {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self {
            values: Arc::new(values),
            next: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn take(&self) -> Option<Value> {
        let idx = self.next.fetch_add(1, Ordering::SeqCst);
        self.values.get(idx).cloned()
    }
}

/// Execution environment handed to a node for one superstep.
#[derive(Clone, Debug)]
pub struct NodeContext {
    /// The node being executed.
    pub node: NodeKind,
    /// Current superstep number (1-based).
    pub step: u64,
    /// Thread id of the invocation, when one was supplied.
    pub thread_id: String,
    emitter: StreamEmitter,
    resume: ResumeCursor,
}

impl NodeContext {
    pub(crate) fn new(
        node: NodeKind,
        step: u64,
        thread_id: String,
        emitter: StreamEmitter,
        resume: ResumeCursor,
    ) -> Self {
        Self {
            node,
            step,
            thread_id,
            emitter,
            resume,
        }
    }

    /// Publish a token-level fragment to a `Messages`-mode stream.
    ///
    /// No-op unless the invocation streams in that mode; a disconnected
    /// consumer is ignored rather than failing the node.
    pub fn emit_message(&self, fragment: impl Into<String>) {
        self.emitter.message(self.node.clone(), fragment.into());
    }

    /// Publish an application-defined payload to a `Custom`-mode stream.
    pub fn emit_custom(&self, payload: Value) {
        self.emitter.custom(self.node.clone(), payload);
    }

    /// Suspend execution at this call site, handing `payload` to the outer
    /// caller, or return the externally supplied resume value.
    ///
    /// On first execution the call returns
    /// [`NodeError::Interrupted`]; propagate it with `?`. The runtime
    /// checkpoints the thread and surfaces the payload as an interrupt.
    /// When the thread is later resumed, the node is replayed and this
    /// call site returns the resume value instead. Call sites consume
    /// resume values in order, so a node may suspend more than once.
    ///
    /// Work performed before this call must be repeatable: replay runs it
    /// again.
    pub fn interrupt(&self, payload: Value) -> Result<Value, NodeError> {
        match self.resume.take() {
            Some(value) => Ok(value),
            None => Err(NodeError::Interrupted { payload }),
        }
    }
}

/// Errors a node can raise during execution.
///
/// All variants except [`Interrupted`](NodeError::Interrupted) abort the
/// invocation. `Interrupted` is the suspension signal produced by
/// [`NodeContext::interrupt`]; the scheduler intercepts it and it never
/// surfaces as a failure.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(graphloom::node::missing_input),
        help("Check that an upstream node produced the required channel value.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service failure.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(graphloom::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON (de)serialization failure inside the node.
    #[error(transparent)]
    #[diagnostic(code(graphloom::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(code(graphloom::node::validation))]
    ValidationFailed(String),

    /// Suspension signal raised by [`NodeContext::interrupt`]. Carries the
    /// payload shown to the outer caller.
    #[error("node suspended awaiting external input")]
    #[diagnostic(
        code(graphloom::node::interrupted),
        help("Resume the thread with a value to continue past the suspension point.")
    )]
    Interrupted { payload: Value },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with_resume(values: Vec<Value>) -> NodeContext {
        NodeContext::new(
            NodeKind::Custom("n".into()),
            1,
            "t".into(),
            StreamEmitter::disabled(),
            ResumeCursor::new(values),
        )
    }

    #[test]
    fn interrupt_suspends_without_resume_value() {
        let ctx = ctx_with_resume(vec![]);
        let err = ctx.interrupt(json!({"ask": "approve?"})).unwrap_err();
        assert!(matches!(err, NodeError::Interrupted { payload } if payload["ask"] == "approve?"));
    }

    #[test]
    fn interrupt_call_sites_consume_values_in_order() {
        let ctx = ctx_with_resume(vec![json!("first"), json!("second")]);
        assert_eq!(ctx.interrupt(json!(null)).unwrap(), json!("first"));
        assert_eq!(ctx.interrupt(json!(null)).unwrap(), json!("second"));
        assert!(ctx.interrupt(json!(null)).is_err());
    }
}
