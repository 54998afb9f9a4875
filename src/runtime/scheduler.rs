//! Concurrent superstep execution.
//!
//! One superstep: take the deduplicated frontier, run every executable
//! member concurrently against the same step-start snapshot, and join at
//! the barrier. Nothing a node writes is visible to its siblings; the
//! runner merges the collected partials after the barrier, so the
//! scheduler is purely about fan-out, joining, and classifying each
//! node's outcome (output, suspension, or failure).
//!
//! Determinism: execution order within a step is unspecified and
//! irrelevant: merge order is fixed by node name downstream, and failures
//! and suspensions are reported in node-name order here.

use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::instrument;

use super::interrupts::{InterruptCapture, ResumeLog};
use crate::node::{Node, NodeContext, NodeError, NodePartial, ResumeCursor};
use crate::state::StateSnapshot;
use crate::stream::StreamEmitter;
use crate::types::NodeKind;

/// Outcome of one superstep before the barrier merge.
#[derive(Debug, Default)]
pub struct StepRunResult {
    /// Nodes that executed, in scheduling (frontier) order.
    pub ran_nodes: Vec<NodeKind>,
    /// Frontier members that were not executed: virtual endpoints and
    /// names missing from the registry.
    pub skipped_nodes: Vec<NodeKind>,
    /// Partial updates from completed nodes, in completion order; the
    /// barrier re-sorts by node name before merging.
    pub outputs: Vec<(NodeKind, NodePartial)>,
    /// Suspensions raised during the step.
    pub(crate) interrupts: Vec<InterruptCapture>,
}

/// Errors surfaced by superstep execution.
#[derive(Debug, Error, Diagnostic)]
pub enum SchedulerError {
    /// A node returned a failure. Carries the node name and step number
    /// for diagnosis; aborts the invocation.
    #[error("node {node} failed at step {step}: {source}")]
    #[diagnostic(code(graphloom::scheduler::node_run))]
    NodeRun {
        node: NodeKind,
        step: u64,
        #[source]
        source: NodeError,
    },

    /// A spawned node task panicked or was cancelled.
    #[error("node task join error: {0}")]
    #[diagnostic(code(graphloom::scheduler::join))]
    Join(#[from] JoinError),
}

/// Superstep executor with a concurrency cap.
#[derive(Clone, Debug)]
pub struct Scheduler {
    concurrency_limit: usize,
}

impl Default for Scheduler {
    fn default() -> Self {
        let limit = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(limit)
    }
}

impl Scheduler {
    /// Scheduler running at most `concurrency_limit` nodes at once.
    #[must_use]
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    /// Execute one superstep over the frontier.
    ///
    /// Every executable frontier member runs against the same `snapshot`.
    /// Suspensions ([`NodeError::Interrupted`]) are collected, not
    /// treated as failures. Any other node error aborts the step; when
    /// several nodes fail, the one first in node-name order is reported.
    #[instrument(skip(self, nodes, frontier, snapshot, emitter, resume_log), fields(frontier_len = frontier.len()), err)]
    pub async fn superstep(
        &self,
        nodes: &FxHashMap<NodeKind, Arc<dyn Node>>,
        frontier: &[NodeKind],
        snapshot: StateSnapshot,
        step: u64,
        thread_id: &str,
        emitter: &StreamEmitter,
        resume_log: &ResumeLog,
    ) -> Result<StepRunResult, SchedulerError> {
        let mut ran_nodes: Vec<NodeKind> = Vec::new();
        let mut skipped_nodes: Vec<NodeKind> = Vec::new();
        let mut seen: FxHashSet<NodeKind> = FxHashSet::default();

        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks: JoinSet<(NodeKind, Result<NodePartial, NodeError>)> = JoinSet::new();

        for kind in frontier {
            if !seen.insert(kind.clone()) {
                continue;
            }
            let node = match kind {
                NodeKind::Start | NodeKind::End => {
                    skipped_nodes.push(kind.clone());
                    continue;
                }
                NodeKind::Custom(_) => match nodes.get(kind) {
                    Some(node) => Arc::clone(node),
                    None => {
                        tracing::warn!(node = %kind, step, "frontier names unregistered node; skipping");
                        skipped_nodes.push(kind.clone());
                        continue;
                    }
                },
            };

            ran_nodes.push(kind.clone());
            let ctx = NodeContext::new(
                kind.clone(),
                step,
                thread_id.to_string(),
                emitter.clone(),
                ResumeCursor::new(resume_log.get(kind).cloned().unwrap_or_default()),
            );
            let kind = kind.clone();
            let snapshot = snapshot.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("superstep semaphore never closed");
                let result = node.run(snapshot, ctx).await;
                (kind, result)
            });
        }

        let mut outputs: Vec<(NodeKind, NodePartial)> = Vec::new();
        let mut interrupts: Vec<InterruptCapture> = Vec::new();
        let mut failures: Vec<(NodeKind, NodeError)> = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (kind, result) = joined?;
            match result {
                Ok(partial) => outputs.push((kind, partial)),
                Err(NodeError::Interrupted { payload }) => {
                    tracing::debug!(node = %kind, step, "node suspended");
                    interrupts.push(InterruptCapture {
                        node: kind,
                        payload,
                    });
                }
                Err(error) => failures.push((kind, error)),
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|(kind, _)| kind.encode());
            let (node, source) = failures.remove(0);
            return Err(SchedulerError::NodeRun { node, step, source });
        }

        Ok(StepRunResult {
            ran_nodes,
            skipped_nodes,
            outputs,
            interrupts,
        })
    }
}
