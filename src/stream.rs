//! Streaming observation of a running invocation.
//!
//! [`App::stream`](crate::app::App::stream) runs a workflow on a
//! background task and hands back a [`flume`] receiver of
//! [`StreamEvent`]s. The sequence is lazy, finite, and non-restartable:
//! events arrive as supersteps commit, and the channel closes when the
//! run finishes (successfully or not).
//!
//! What flows through the channel depends on the [`StreamMode`]:
//!
//! - `Values`: the full state snapshot after each barrier merge
//! - `Updates`: only the partials merged that step, keyed by node
//! - `Messages`: token-level fragments nodes emit incrementally
//! - `Custom`: application payloads nodes publish explicitly
//!
//! The emitter is owned by the runtime; nodes reach it through their
//! [`NodeContext`](crate::node::NodeContext). Emission is fire-and-forget:
//! a consumer that went away never fails the workflow.

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::node::NodePartial;
use crate::runtime::{RunOutcome, RunnerError};
use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Which events an invocation's stream carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    /// Full state snapshot after every superstep.
    Values,
    /// Per-node partial updates merged each superstep.
    Updates,
    /// Incremental message fragments emitted by nodes.
    Messages,
    /// Application-defined payloads published by nodes.
    Custom,
}

/// One observation from a streaming invocation.
#[derive(Clone, Debug)]
pub enum StreamEvent {
    /// Full snapshot after the numbered superstep's merge.
    Values { step: u64, snapshot: StateSnapshot },
    /// The partials merged during the numbered superstep, in the
    /// deterministic node-name order the barrier applied them.
    Updates {
        step: u64,
        updates: Vec<(NodeKind, NodePartial)>,
    },
    /// A token-level fragment emitted mid-execution by a node.
    Message { node: NodeKind, fragment: String },
    /// An application payload published mid-execution by a node.
    Custom { node: NodeKind, payload: Value },
}

/// Mode-filtered sender feeding an invocation's stream.
///
/// Disabled for plain `invoke` calls: every emission is a no-op. Send
/// failures (receiver dropped) are swallowed; observation must never
/// change execution.
#[derive(Clone, Debug, Default)]
pub struct StreamEmitter {
    mode: Option<StreamMode>,
    tx: Option<flume::Sender<StreamEvent>>,
}

impl StreamEmitter {
    pub(crate) fn new(mode: StreamMode, tx: flume::Sender<StreamEvent>) -> Self {
        Self {
            mode: Some(mode),
            tx: Some(tx),
        }
    }

    /// An emitter that drops everything; used by non-streaming runs.
    #[must_use]
    pub(crate) fn disabled() -> Self {
        Self::default()
    }

    fn send_if(&self, mode: StreamMode, make: impl FnOnce() -> StreamEvent) {
        if self.mode != Some(mode) {
            return;
        }
        if let Some(tx) = &self.tx {
            if tx.send(make()).is_err() {
                tracing::debug!("stream receiver dropped; event discarded");
            }
        }
    }

    pub(crate) fn values(&self, step: u64, snapshot: &StateSnapshot) {
        self.send_if(StreamMode::Values, || StreamEvent::Values {
            step,
            snapshot: snapshot.clone(),
        });
    }

    pub(crate) fn updates(&self, step: u64, updates: &[(NodeKind, NodePartial)]) {
        self.send_if(StreamMode::Updates, || StreamEvent::Updates {
            step,
            updates: updates.to_vec(),
        });
    }

    pub(crate) fn message(&self, node: NodeKind, fragment: String) {
        self.send_if(StreamMode::Messages, || StreamEvent::Message {
            node,
            fragment,
        });
    }

    pub(crate) fn custom(&self, node: NodeKind, payload: Value) {
        self.send_if(StreamMode::Custom, || StreamEvent::Custom { node, payload });
    }
}

/// Handle to a workflow running on a background task.
///
/// Dropping the handle does not stop the run; call
/// [`abort`](InvocationHandle::abort) to cancel between awaits, or
/// [`join`](InvocationHandle::join) to wait for the outcome.
#[derive(Debug)]
pub struct InvocationHandle {
    join_handle: Option<JoinHandle<Result<RunOutcome, RunnerError>>>,
}

impl InvocationHandle {
    pub(crate) fn new(join_handle: JoinHandle<Result<RunOutcome, RunnerError>>) -> Self {
        Self {
            join_handle: Some(join_handle),
        }
    }

    /// Cancel the running invocation. Committed checkpoints are
    /// unaffected; cancellation lands between awaits, so mid-node
    /// interruption is best-effort.
    pub fn abort(&self) {
        if let Some(handle) = &self.join_handle {
            handle.abort();
        }
    }

    /// Whether the underlying task has completed or been aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }

    /// Await the workflow outcome.
    pub async fn join(mut self) -> Result<RunOutcome, RunnerError> {
        let handle = self
            .join_handle
            .take()
            .expect("invocation handle already joined");
        match handle.await {
            Ok(result) => result,
            Err(err) => Err(RunnerError::Join(err)),
        }
    }
}

/// Adapt a stream receiver into a boxed async [`futures_util::Stream`],
/// for callers composing with stream combinators or SSE adapters.
#[must_use]
pub fn into_event_stream(rx: flume::Receiver<StreamEvent>) -> BoxStream<'static, StreamEvent> {
    rx.into_stream().boxed()
}
