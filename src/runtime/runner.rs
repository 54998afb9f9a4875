//! Session-level execution: the superstep loop, routing, and checkpoint
//! boundaries.
//!
//! [`AppRunner`] drives a compiled [`App`](crate::app::App) one superstep
//! at a time. Each step: snapshot the state, run the frontier through the
//! [`Scheduler`], merge the collected partials at the barrier, route to
//! the next frontier, and persist a checkpoint when the graph carries a
//! checkpointer. Suspensions short-circuit the step (outputs are
//! discarded, so the saved checkpoint is pre-completion) and surface as
//! an [`Interrupt`] token.
//!
//! The runner is the stepwise API; most callers go through
//! `App::invoke` / `App::stream` / `App::resume`, which construct a
//! runner internally.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::instrument;

use super::checkpointer::{Checkpoint, CheckpointerError, restore_session_state};
use super::interrupts::{Interrupt, PendingInterrupt, ResumeLog, select_capture};
use super::scheduler::{Scheduler, SchedulerError};
use crate::app::App;
use crate::node::NodePartial;
use crate::state::{StateError, StateSnapshot, StateStore};
use crate::stream::StreamEmitter;
use crate::types::NodeKind;

/// In-memory execution state of one thread.
#[derive(Clone, Debug)]
pub struct SessionState {
    /// The thread's state store.
    pub state: StateStore,
    /// Last committed superstep number (0 before the first step).
    pub step: u64,
    /// Pending tasks: the frontier the next superstep executes.
    pub frontier: Vec<NodeKind>,
    pub(crate) resume_log: ResumeLog,
    pub(crate) pending_interrupt: Option<PendingInterrupt>,
}

/// How a session came into being.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInit {
    /// Fresh thread seeded from channel defaults plus the initial input.
    Fresh,
    /// Existing thread restored from its latest checkpoint; the new input
    /// was merged and a new pass starts from `Start`.
    Continued { checkpoint_step: u64 },
    /// Suspended thread restored for resumption at its pending interrupt.
    Resumed { checkpoint_step: u64 },
}

/// Result of one committed superstep.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// The superstep number that was executed.
    pub step: u64,
    /// Nodes that ran.
    pub ran_nodes: Vec<NodeKind>,
    /// Frontier members skipped (virtual endpoints, unknown names).
    pub skipped_nodes: Vec<NodeKind>,
    /// Channels whose value changed in the barrier merge, sorted.
    pub updated_channels: Vec<String>,
    /// The frontier for the next superstep.
    pub next_frontier: Vec<NodeKind>,
    /// Whether the thread reached a terminal frontier.
    pub completed: bool,
    /// Whether the boundary checkpoint was persisted. `false` when no
    /// checkpointer is configured or the save failed (failure is logged
    /// and does not abort the run, but resume stays at the last good
    /// save).
    pub checkpoint_saved: bool,
}

/// Outcome of attempting one superstep.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// The superstep committed.
    Completed(StepReport),
    /// A node suspended; the thread is checkpointed pre-completion.
    Interrupted(Interrupt),
}

/// Final outcome of an invocation.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The run reached a terminal frontier; carries the final state.
    Complete(StateSnapshot),
    /// The run suspended awaiting external input; resume the thread with
    /// a value to continue.
    Interrupted(Interrupt),
}

impl RunOutcome {
    /// The final state of a completed run, or `None` if it suspended.
    #[must_use]
    pub fn into_state(self) -> Option<StateSnapshot> {
        match self {
            RunOutcome::Complete(snapshot) => Some(snapshot),
            RunOutcome::Interrupted(_) => None,
        }
    }

    /// The interrupt token of a suspended run, or `None` if it completed.
    #[must_use]
    pub fn into_interrupt(self) -> Option<Interrupt> {
        match self {
            RunOutcome::Complete(_) => None,
            RunOutcome::Interrupted(interrupt) => Some(interrupt),
        }
    }
}

/// Errors raised while driving a session.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("session not found: {thread_id}")]
    #[diagnostic(code(graphloom::runner::session_not_found))]
    SessionNotFound { thread_id: String },

    #[error("no nodes to run from Start (empty initial frontier)")]
    #[diagnostic(
        code(graphloom::runner::no_start_nodes),
        help("Add edges out of NodeKind::Start, or check conditional entry routing.")
    )]
    NoStartNodes,

    /// Resume was requested for a thread with no stored checkpoint (or no
    /// checkpointer at all).
    #[error("no checkpoint found for thread {thread_id}")]
    #[diagnostic(
        code(graphloom::runner::no_checkpoint),
        help("Resume requires a prior interrupted run persisted under this thread id.")
    )]
    NoCheckpoint { thread_id: String },

    /// Resume was requested but the thread's latest checkpoint is not
    /// suspended.
    #[error("thread {thread_id} has no pending interrupt to resume")]
    #[diagnostic(code(graphloom::runner::not_interrupted))]
    NotInterrupted { thread_id: String },

    /// Invoke was requested on a thread that is suspended; the pending
    /// suspend call site needs a resume value, not fresh input.
    #[error("thread {thread_id} is suspended awaiting a resume value")]
    #[diagnostic(
        code(graphloom::runner::interrupt_pending),
        help("Call resume with a value for the pending interrupt instead of invoking.")
    )]
    InterruptPending { thread_id: String },

    /// The configured step budget ran out before a terminal frontier.
    #[error("step budget of {budget} supersteps exceeded at step {step}")]
    #[diagnostic(
        code(graphloom::runner::step_budget),
        help("Raise the budget, or check the loop's terminating condition.")
    )]
    StepBudgetExceeded { budget: u64, step: u64 },

    /// A superstep exceeded the configured timeout. Outputs of the
    /// expired step are discarded; committed state is untouched.
    #[error("superstep {step} timed out")]
    #[diagnostic(code(graphloom::runner::step_timeout))]
    StepTimeout { step: u64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Checkpoint load failure (save failures are warnings, not errors).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpointer(#[from] CheckpointerError),

    #[error("workflow task join error: {0}")]
    #[diagnostic(code(graphloom::runner::join))]
    Join(#[from] JoinError),
}

/// Stepwise execution engine over a compiled graph.
///
/// Holds any number of in-memory sessions keyed by thread id. The
/// checkpointer (if any) lives on the [`App`], so separate runners over
/// the same app share persistence.
pub struct AppRunner {
    app: App,
    emitter: StreamEmitter,
    scheduler: Scheduler,
    sessions: FxHashMap<String, SessionState>,
    step_budget: Option<u64>,
}

impl AppRunner {
    /// Runner without streaming; step events go nowhere.
    #[must_use]
    pub fn new(app: App) -> Self {
        Self::with_emitter(app, StreamEmitter::disabled())
    }

    pub(crate) fn with_emitter(app: App, emitter: StreamEmitter) -> Self {
        let scheduler = match app.runtime_config().concurrency_limit {
            Some(limit) => Scheduler::new(limit),
            None => Scheduler::default(),
        };
        let step_budget = app.runtime_config().step_budget;
        Self {
            app,
            emitter,
            scheduler,
            sessions: FxHashMap::default(),
            step_budget,
        }
    }

    /// Override the superstep budget for this runner's invocations.
    pub fn set_step_budget(&mut self, budget: Option<u64>) {
        self.step_budget = budget;
    }

    /// Initialize a session for `thread_id`.
    ///
    /// With a checkpointer and an existing thread, the stored state is
    /// restored, the fresh input merged through the channel reducers, and
    /// a new pass starts from `Start`; accumulated channels (message
    /// histories, counters) survive across invocations. A suspended
    /// thread cannot be re-invoked; resume it instead.
    #[instrument(skip(self, initial), err)]
    pub async fn create_session(
        &mut self,
        thread_id: String,
        initial: NodePartial,
    ) -> Result<SessionInit, RunnerError> {
        let stored = match self.app.checkpointer() {
            Some(cp) => cp.load_latest(&thread_id).await?,
            None => None,
        };

        if let Some(checkpoint) = stored {
            if checkpoint.pending_interrupt.is_some() {
                return Err(RunnerError::InterruptPending { thread_id });
            }
            let checkpoint_step = checkpoint.step;
            let mut session = restore_session_state(&checkpoint);
            session.resume_log.clear();
            if !initial.is_empty() {
                session
                    .state
                    .merge(self.app.schema(), &[(NodeKind::Start, initial)])?;
            }
            session.frontier = self.initial_frontier(&session.state.snapshot())?;
            self.sessions.insert(thread_id.clone(), session);
            self.checkpoint(&thread_id).await;
            return Ok(SessionInit::Continued { checkpoint_step });
        }

        let state = StateStore::seed(self.app.schema(), &initial)?;
        let frontier = self.initial_frontier(&state.snapshot())?;
        let session = SessionState {
            state,
            step: 0,
            frontier,
            resume_log: ResumeLog::default(),
            pending_interrupt: None,
        };
        self.sessions.insert(thread_id.clone(), session);
        self.checkpoint(&thread_id).await;
        Ok(SessionInit::Fresh)
    }

    /// Restore a suspended thread and queue `resume_value` for its
    /// pending interrupt.
    ///
    /// The interrupted superstep is replayed on the next step; the
    /// suspend call site returns `resume_value` instead of suspending
    /// again.
    #[instrument(skip(self, resume_value), err)]
    pub async fn resume_session(
        &mut self,
        thread_id: String,
        resume_value: Value,
    ) -> Result<SessionInit, RunnerError> {
        let checkpointer = self
            .app
            .checkpointer()
            .ok_or_else(|| RunnerError::NoCheckpoint {
                thread_id: thread_id.clone(),
            })?;
        let checkpoint = checkpointer
            .load_latest(&thread_id)
            .await?
            .ok_or_else(|| RunnerError::NoCheckpoint {
                thread_id: thread_id.clone(),
            })?;
        let pending =
            checkpoint
                .pending_interrupt
                .clone()
                .ok_or_else(|| RunnerError::NotInterrupted {
                    thread_id: thread_id.clone(),
                })?;

        let checkpoint_step = checkpoint.step;
        let mut session = restore_session_state(&checkpoint);
        session
            .resume_log
            .entry(pending.node)
            .or_default()
            .push(resume_value);
        session.pending_interrupt = None;
        self.sessions.insert(thread_id, session);
        Ok(SessionInit::Resumed { checkpoint_step })
    }

    /// Execute one superstep for the session.
    #[instrument(skip(self), err)]
    pub async fn run_step(&mut self, thread_id: &str) -> Result<StepOutcome, RunnerError> {
        let mut session =
            self.sessions
                .remove(thread_id)
                .ok_or_else(|| RunnerError::SessionNotFound {
                    thread_id: thread_id.to_string(),
                })?;

        if Self::is_terminal(&session.frontier) {
            let report = StepReport {
                step: session.step,
                ran_nodes: vec![],
                skipped_nodes: session.frontier.clone(),
                updated_channels: vec![],
                next_frontier: vec![],
                completed: true,
                checkpoint_saved: false,
            };
            self.sessions.insert(thread_id.to_string(), session);
            return Ok(StepOutcome::Completed(report));
        }

        let step = session.step + 1;
        let snapshot = session.state.snapshot();
        let superstep = self.scheduler.superstep(
            self.app.nodes(),
            &session.frontier,
            snapshot,
            step,
            thread_id,
            &self.emitter,
            &session.resume_log,
        );

        let timed = match self.app.runtime_config().step_timeout {
            Some(limit) => tokio::time::timeout(limit, superstep).await,
            None => Ok(superstep.await),
        };
        let run = match timed {
            Ok(Ok(run)) => run,
            Ok(Err(error)) => {
                self.sessions.insert(thread_id.to_string(), session);
                return Err(error.into());
            }
            Err(_elapsed) => {
                self.sessions.insert(thread_id.to_string(), session);
                return Err(RunnerError::StepTimeout { step });
            }
        };

        if !run.interrupts.is_empty() {
            // Pre-completion: outputs are dropped, state/frontier/step
            // stay as they were, only the pending interrupt is recorded.
            let capture = select_capture(run.interrupts).expect("interrupts checked non-empty");
            session.pending_interrupt = Some(PendingInterrupt {
                node: capture.node.clone(),
                payload: capture.payload.clone(),
            });
            self.sessions.insert(thread_id.to_string(), session);
            self.checkpoint(thread_id).await;
            tracing::info!(thread = %thread_id, node = %capture.node, step, "run suspended");
            return Ok(StepOutcome::Interrupted(Interrupt {
                thread_id: thread_id.to_string(),
                node: capture.node,
                payload: capture.payload,
            }));
        }

        session.step = step;
        let mut outputs = run.outputs;
        outputs.sort_by_key(|(node, _)| node.encode());

        let updated_channels = match session.state.merge(self.app.schema(), &outputs) {
            Ok(updated) => updated,
            Err(error) => {
                self.sessions.insert(thread_id.to_string(), session);
                return Err(error.into());
            }
        };

        let post_merge = session.state.snapshot();
        self.emitter.updates(step, &outputs);
        self.emitter.values(step, &post_merge);

        let next_frontier = self.compute_next_frontier(&run.ran_nodes, &post_merge, step);
        for node in &run.ran_nodes {
            session.resume_log.remove(node);
        }
        session.frontier = next_frontier.clone();
        let completed = Self::is_terminal(&next_frontier);

        tracing::debug!(
            thread = %thread_id,
            step,
            updated_channels = ?updated_channels,
            next_frontier = ?next_frontier,
            "superstep committed"
        );

        self.sessions.insert(thread_id.to_string(), session);
        let checkpoint_saved = self.checkpoint(thread_id).await;

        Ok(StepOutcome::Completed(StepReport {
            step,
            ran_nodes: run.ran_nodes,
            skipped_nodes: run.skipped_nodes,
            updated_channels,
            next_frontier,
            completed,
            checkpoint_saved,
        }))
    }

    /// Drive the session until a terminal frontier or a suspension.
    #[instrument(skip(self), err)]
    pub async fn run_until_complete(
        &mut self,
        thread_id: &str,
    ) -> Result<RunOutcome, RunnerError> {
        tracing::info!(thread = %thread_id, "workflow run started");
        let mut steps_taken: u64 = 0;

        loop {
            let session =
                self.sessions
                    .get(thread_id)
                    .ok_or_else(|| RunnerError::SessionNotFound {
                        thread_id: thread_id.to_string(),
                    })?;
            if Self::is_terminal(&session.frontier) {
                break;
            }
            if let Some(budget) = self.step_budget {
                if steps_taken >= budget {
                    return Err(RunnerError::StepBudgetExceeded {
                        budget,
                        step: session.step,
                    });
                }
            }

            match self.run_step(thread_id).await? {
                StepOutcome::Interrupted(interrupt) => {
                    return Ok(RunOutcome::Interrupted(interrupt));
                }
                StepOutcome::Completed(report) => {
                    steps_taken += 1;
                    if report.completed {
                        break;
                    }
                }
            }
        }

        let session = self
            .sessions
            .get(thread_id)
            .ok_or_else(|| RunnerError::SessionNotFound {
                thread_id: thread_id.to_string(),
            })?;
        tracing::info!(thread = %thread_id, step = session.step, "workflow run completed");
        Ok(RunOutcome::Complete(session.state.snapshot()))
    }

    /// Peek at a session's in-memory state.
    #[must_use]
    pub fn get_session(&self, thread_id: &str) -> Option<&SessionState> {
        self.sessions.get(thread_id)
    }

    /// All thread ids with in-memory sessions.
    #[must_use]
    pub fn list_sessions(&self) -> Vec<&String> {
        self.sessions.keys().collect()
    }

    fn is_terminal(frontier: &[NodeKind]) -> bool {
        frontier.is_empty() || frontier.iter().all(NodeKind::is_end)
    }

    /// First frontier of a pass: `Start`'s static edges plus conditional
    /// routes from `Start` evaluated against the seeded state.
    fn initial_frontier(&self, snapshot: &StateSnapshot) -> Result<Vec<NodeKind>, RunnerError> {
        let mut targets = self
            .app
            .edges()
            .get(&NodeKind::Start)
            .cloned()
            .unwrap_or_default();
        for edge in self
            .app
            .conditional_edges()
            .iter()
            .filter(|edge| edge.from().is_start())
        {
            targets.extend(edge.route(snapshot));
        }
        let frontier = self.validated_frontier(targets, 0);
        if frontier.is_empty() {
            return Err(RunnerError::NoStartNodes);
        }
        Ok(frontier)
    }

    /// Resolve outgoing edges for every node that ran: static edges, then
    /// conditional edges evaluated against the post-merge snapshot. The
    /// union is deduplicated by destination, so a shared downstream node
    /// joins fan-out branches by running exactly once next step.
    fn compute_next_frontier(
        &self,
        ran: &[NodeKind],
        snapshot: &StateSnapshot,
        step: u64,
    ) -> Vec<NodeKind> {
        let mut targets: Vec<NodeKind> = Vec::new();
        for id in ran {
            if let Some(static_targets) = self.app.edges().get(id) {
                targets.extend(static_targets.iter().cloned());
            }
            for edge in self
                .app
                .conditional_edges()
                .iter()
                .filter(|edge| edge.from() == id)
            {
                targets.extend(edge.route(snapshot));
            }
        }
        self.validated_frontier(targets, step)
    }

    /// Deduplicate (first occurrence wins) and drop targets the graph
    /// does not know, warning about the latter.
    fn validated_frontier(&self, targets: Vec<NodeKind>, step: u64) -> Vec<NodeKind> {
        let mut seen: FxHashSet<NodeKind> = FxHashSet::default();
        let mut frontier = Vec::new();
        for target in targets {
            let valid = match &target {
                NodeKind::End => true,
                NodeKind::Start => false,
                NodeKind::Custom(_) => self.app.nodes().contains_key(&target),
            };
            if !valid {
                tracing::warn!(step, target = %target.encode(), "frontier target not found; skipping");
                continue;
            }
            if seen.insert(target.clone()) {
                frontier.push(target);
            }
        }
        frontier
    }

    /// Persist a boundary checkpoint if a checkpointer is configured.
    /// Save failures are warnings: the in-memory run continues, but
    /// resume for this thread stays at the last successful save.
    async fn checkpoint(&self, thread_id: &str) -> bool {
        let Some(checkpointer) = self.app.checkpointer() else {
            return false;
        };
        let Some(session) = self.sessions.get(thread_id) else {
            return false;
        };
        match checkpointer
            .save(Checkpoint::from_session(thread_id, session))
            .await
        {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    thread = %thread_id,
                    step = session.step,
                    %error,
                    "checkpoint save failed; resume unavailable past last good save"
                );
                false
            }
        }
    }
}
