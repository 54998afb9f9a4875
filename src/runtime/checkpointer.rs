//! Checkpoint persistence: the trait, the checkpoint shape, and the
//! in-memory backend.
//!
//! A checkpoint captures everything needed to resume a thread without
//! replaying prior node executions: the state store, the pending-task
//! frontier, the resume log, and any pending interrupt. The runner saves
//! one at every superstep boundary when the compiled graph carries a
//! checkpointer; `load_latest` reconstructs the session.
//!
//! Save failures are non-fatal: the in-memory run proceeds and the
//! failure is surfaced as a warning, but resume is only as fresh as
//! the last successful save.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use super::interrupts::PendingInterrupt;
use super::runner::SessionState;
use crate::state::StateStore;
use crate::types::NodeKind;

/// One persisted superstep boundary for a thread.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    /// Logical session identifier grouping this thread's history.
    pub thread_id: String,
    /// Superstep counter at save time; monotonic per thread.
    pub step: u64,
    /// Full state store snapshot.
    pub state: StateStore,
    /// Pending tasks: the frontier to execute next (or re-execute, when a
    /// pending interrupt is recorded).
    pub frontier: Vec<NodeKind>,
    /// Resume values already supplied for suspended nodes, replayed in
    /// call-site order.
    pub resume_log: FxHashMap<NodeKind, Vec<serde_json::Value>>,
    /// Set when the thread is suspended awaiting external input.
    pub pending_interrupt: Option<PendingInterrupt>,
    /// Save timestamp.
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Capture a session at a superstep boundary.
    #[must_use]
    pub(crate) fn from_session(thread_id: &str, session: &SessionState) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            step: session.step,
            state: session.state.clone(),
            frontier: session.frontier.clone(),
            resume_log: session.resume_log.clone(),
            pending_interrupt: session.pending_interrupt.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Rebuild an in-memory session from a stored checkpoint.
#[must_use]
pub fn restore_session_state(checkpoint: &Checkpoint) -> SessionState {
    SessionState {
        state: checkpoint.state.clone(),
        step: checkpoint.step,
        frontier: checkpoint.frontier.clone(),
        resume_log: checkpoint.resume_log.clone(),
        pending_interrupt: checkpoint.pending_interrupt.clone(),
    }
}

/// Errors raised by checkpoint backends.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    /// Storage-layer failure (connection, I/O, constraint).
    #[error("checkpoint backend error: {0}")]
    #[diagnostic(code(graphloom::checkpointer::backend))]
    Backend(String),

    /// A stored payload failed to (de)serialize.
    #[error("checkpoint serialization error: {source}")]
    #[diagnostic(
        code(graphloom::checkpointer::serde),
        help("The stored payload does not match the persisted checkpoint shape.")
    )]
    Serde {
        #[from]
        source: serde_json::Error,
    },

    /// A stored payload was structurally incomplete.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Persistence(#[from] super::persistence::PersistenceError),
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Pluggable checkpoint storage, keyed by thread id.
///
/// Implementations must tolerate concurrent access for distinct thread
/// ids and apply last-write-wins per `(thread_id, step)`. The caller owns
/// the backend's lifecycle and injects it at graph compile time.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist one checkpoint, replacing any prior save for the same
    /// `(thread_id, step)`.
    async fn save(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Fetch the most recent checkpoint for a thread, if any.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;
}

/// Volatile checkpoint storage for tests and development.
///
/// Keeps the full step history per thread, mirroring what durable
/// backends store.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    threads: RwLock<FxHashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints stored for a thread.
    pub async fn history_len(&self, thread_id: &str) -> usize {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<()> {
        let mut threads = self.threads.write().await;
        let history = threads.entry(checkpoint.thread_id.clone()).or_default();
        match history.iter_mut().find(|c| c.step == checkpoint.step) {
            Some(existing) => *existing = checkpoint,
            None => {
                history.push(checkpoint);
                history.sort_by_key(|c| c.step);
            }
        }
        Ok(())
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .and_then(|history| history.last().cloned()))
    }
}
