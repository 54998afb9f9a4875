//! Runtime configuration for compiled graphs.

use std::time::Duration;

/// Execution knobs fixed at compile time and shared by every invocation
/// of the resulting [`App`](crate::app::App). Per-invocation overrides go
/// through [`InvokeOptions`](crate::app::InvokeOptions).
#[derive(Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Default thread id when the caller supplies none. With `None`, each
    /// anonymous invocation gets a generated ephemeral id.
    pub thread_id: Option<String>,

    /// Maximum supersteps per invocation. The engine imposes no implicit
    /// iteration cap (cycles may run indefinitely), so this is
    /// the recommended safety valve for loops whose terminating condition
    /// might not hold. Exhaustion fails the run with
    /// [`RunnerError::StepBudgetExceeded`](crate::runtime::RunnerError::StepBudgetExceeded)
    /// and leaves the last committed checkpoint intact.
    pub step_budget: Option<u64>,

    /// Timeout applied per superstep (not per node). On expiry the run
    /// fails with a timeout error; the superstep's outputs are discarded,
    /// so committed state is never corrupted.
    pub step_timeout: Option<Duration>,

    /// Concurrent node executions per superstep. Defaults to available
    /// parallelism.
    pub concurrency_limit: Option<usize>,
}

impl RuntimeConfig {
    /// Configuration with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default thread id.
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Set the superstep budget.
    #[must_use]
    pub fn with_step_budget(mut self, budget: u64) -> Self {
        self.step_budget = Some(budget);
        self
    }

    /// Set the per-superstep timeout.
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Cap concurrent node executions per superstep.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit.max(1));
        self
    }
}
