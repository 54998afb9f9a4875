//! Workflow runtime: superstep scheduling, session management, and
//! checkpoint persistence.
//!
//! The runtime layers:
//!
//! - **[`Scheduler`]**: one concurrent superstep with a barrier join
//! - **[`AppRunner`]**: the session loop: step, merge, route,
//!   checkpoint; plus suspend/resume bookkeeping
//! - **[`Checkpointer`]**: pluggable persistence
//!   ([`InMemoryCheckpointer`]; [`SqliteCheckpointer`] behind the
//!   `sqlite` feature)
//! - **Persistence models**: serde-friendly checkpoint shapes shared by
//!   every backend
//!
//! Most callers drive the runtime through
//! [`App`](crate::app::App)'s `invoke` / `stream` / `resume`; the types
//! here are the stepwise surface beneath those entry points.

pub mod checkpointer;
#[cfg(feature = "sqlite")]
pub mod checkpointer_sqlite;
pub mod config;
pub mod interrupts;
pub mod persistence;
pub mod runner;
pub mod scheduler;

pub use checkpointer::{
    Checkpoint, Checkpointer, CheckpointerError, InMemoryCheckpointer, restore_session_state,
};
#[cfg(feature = "sqlite")]
pub use checkpointer_sqlite::SqliteCheckpointer;
pub use config::RuntimeConfig;
pub use interrupts::{Interrupt, PendingInterrupt};
pub use persistence::{
    PersistedCheckpoint, PersistedInterrupt, PersistedState, PersistenceError,
};
pub use runner::{
    AppRunner, RunOutcome, RunnerError, SessionInit, SessionState, StepOutcome, StepReport,
};
pub use scheduler::{Scheduler, SchedulerError, StepRunResult};
