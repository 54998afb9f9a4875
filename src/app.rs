//! The compiled, executable form of a workflow graph.
//!
//! [`App`] is what [`GraphBuilder::compile`](crate::graph::GraphBuilder)
//! produces: the immutable node registry, edge topology, state schema,
//! runtime configuration, and optional checkpointer. It is cheap to clone
//! and safe to invoke concurrently: each invocation with a distinct
//! thread id is fully independent, sharing nothing but the checkpointer's
//! storage.
//!
//! Three entry points cover the caller-facing surface:
//!
//! - [`invoke`](App::invoke): run to completion or suspension
//! - [`stream`](App::stream): run on a background task, observing
//!   supersteps through a [`StreamEvent`] channel
//! - [`resume`](App::resume): continue a suspended thread with an
//!   externally supplied value
//!
//! For stepwise control (pausing between supersteps, inspecting session
//! state) drop down to [`AppRunner`](crate::runtime::AppRunner).

use rustc_hash::FxHashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::instrument;

use crate::channels::StateSchema;
use crate::graph::ConditionalEdge;
use crate::node::{Node, NodePartial};
use crate::runtime::{AppRunner, Checkpointer, RunOutcome, RunnerError, RuntimeConfig};
use crate::stream::{InvocationHandle, StreamEmitter, StreamEvent, StreamMode};
use crate::types::NodeKind;
use crate::utils::ids::IdGenerator;

/// Per-invocation options for [`App::invoke_with`].
#[derive(Clone, Debug, Default)]
pub struct InvokeOptions {
    /// Thread id for checkpointing and resume. Defaults to the runtime
    /// config's thread id, else a generated ephemeral id.
    pub thread_id: Option<String>,
    /// Superstep budget override for this invocation.
    pub step_budget: Option<u64>,
}

/// Options for [`App::stream`].
#[derive(Clone, Debug)]
pub struct StreamOptions {
    /// Which events the stream carries.
    pub mode: StreamMode,
    /// Thread id, as in [`InvokeOptions`].
    pub thread_id: Option<String>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            mode: StreamMode::Values,
            thread_id: None,
        }
    }
}

/// An executable workflow graph.
#[derive(Clone)]
pub struct App {
    nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    conditional_edges: Vec<ConditionalEdge>,
    schema: StateSchema,
    runtime_config: RuntimeConfig,
    checkpointer: Option<Arc<dyn Checkpointer>>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("conditional_edges", &self.conditional_edges)
            .field("schema", &self.schema)
            .field("runtime_config", &self.runtime_config)
            .field("checkpointer", &self.checkpointer.is_some())
            .finish()
    }
}

impl App {
    /// Crate-internal factory; only graph compilation constructs apps.
    pub(crate) fn from_parts(
        nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
        edges: FxHashMap<NodeKind, Vec<NodeKind>>,
        conditional_edges: Vec<ConditionalEdge>,
        schema: StateSchema,
        runtime_config: RuntimeConfig,
        checkpointer: Option<Arc<dyn Checkpointer>>,
    ) -> Self {
        Self {
            nodes,
            edges,
            conditional_edges,
            schema,
            runtime_config,
            checkpointer,
        }
    }

    /// The node registry.
    #[must_use]
    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Node>> {
        &self.nodes
    }

    /// Static edges as a source → destinations adjacency map.
    #[must_use]
    pub fn edges(&self) -> &FxHashMap<NodeKind, Vec<NodeKind>> {
        &self.edges
    }

    /// Conditional edges in declaration order.
    #[must_use]
    pub fn conditional_edges(&self) -> &[ConditionalEdge] {
        &self.conditional_edges
    }

    /// The compiled channel schema.
    #[must_use]
    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// The runtime configuration fixed at compile time.
    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }

    /// The injected checkpointer, if the graph was compiled with one.
    #[must_use]
    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer>> {
        self.checkpointer.as_ref()
    }

    /// Run the workflow to completion or suspension.
    ///
    /// Seeds the state from channel defaults plus `input`, then drives
    /// supersteps until the frontier is terminal (returning
    /// [`RunOutcome::Complete`] with the final state) or a node suspends
    /// (returning [`RunOutcome::Interrupted`]). With a checkpointer and a
    /// stable thread id, re-invoking the same thread restores its
    /// accumulated state and merges the new input before starting the
    /// next pass.
    #[instrument(skip(self, input), err)]
    pub async fn invoke(&self, input: NodePartial) -> Result<RunOutcome, RunnerError> {
        self.invoke_with(input, InvokeOptions::default()).await
    }

    /// [`invoke`](Self::invoke) with explicit per-invocation options.
    #[instrument(skip(self, input, options), err)]
    pub async fn invoke_with(
        &self,
        input: NodePartial,
        options: InvokeOptions,
    ) -> Result<RunOutcome, RunnerError> {
        let thread_id = self.resolve_thread_id(options.thread_id);
        let mut runner = AppRunner::new(self.clone());
        if options.step_budget.is_some() {
            runner.set_step_budget(options.step_budget);
        }
        runner.create_session(thread_id.clone(), input).await?;
        runner.run_until_complete(&thread_id).await
    }

    /// Continue a suspended thread with an externally supplied value.
    ///
    /// The value is injected as the return value of the pending
    /// [`interrupt`](crate::node::NodeContext::interrupt) call site; the
    /// interrupted superstep is replayed from its checkpoint. Fails with
    /// [`RunnerError::NoCheckpoint`] for an unknown thread and
    /// [`RunnerError::NotInterrupted`] when nothing is pending.
    #[instrument(skip(self, resume_value), err)]
    pub async fn resume(
        &self,
        resume_value: Value,
        thread_id: &str,
    ) -> Result<RunOutcome, RunnerError> {
        let mut runner = AppRunner::new(self.clone());
        runner
            .resume_session(thread_id.to_string(), resume_value)
            .await?;
        runner.run_until_complete(thread_id).await
    }

    /// Run on a background task, streaming step events to the returned
    /// receiver.
    ///
    /// The event sequence is lazy, finite, and non-restartable: the
    /// channel closes when the run finishes. Dropping the receiver does
    /// not cancel the run; use the handle for that, and
    /// [`join`](InvocationHandle::join) it for the final outcome.
    #[must_use]
    pub fn stream(
        &self,
        input: NodePartial,
        options: StreamOptions,
    ) -> (InvocationHandle, flume::Receiver<StreamEvent>) {
        let (tx, rx) = flume::unbounded();
        let emitter = StreamEmitter::new(options.mode, tx);
        let thread_id = self.resolve_thread_id(options.thread_id);
        let app = self.clone();

        let join = tokio::spawn(async move {
            let mut runner = AppRunner::with_emitter(app, emitter);
            runner.create_session(thread_id.clone(), input).await?;
            runner.run_until_complete(&thread_id).await
        });

        (InvocationHandle::new(join), rx)
    }

    fn resolve_thread_id(&self, explicit: Option<String>) -> String {
        explicit
            .or_else(|| self.runtime_config.thread_id.clone())
            .unwrap_or_else(|| IdGenerator::new().thread_id())
    }
}
