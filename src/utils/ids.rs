//! Identifier generation for threads and runs.

use rand::Rng;
use rand::distr::Alphanumeric;
use uuid::Uuid;

/// Generates the identifiers the runtime hands out when the caller does
/// not supply its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Ephemeral thread id for anonymous invocations.
    #[must_use]
    pub fn thread_id(&self) -> String {
        format!("thread-{}", Uuid::new_v4())
    }

    /// Run id for tracing correlation: a UUID plus a short human-scannable
    /// suffix.
    #[must_use]
    pub fn run_id(&self) -> String {
        format!("run-{}-{}", Uuid::new_v4().simple(), self.short_code())
    }

    /// Six alphanumeric characters, for log-friendly display names.
    #[must_use]
    pub fn short_code(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_ids_are_unique() {
        let generator = IdGenerator::new();
        assert_ne!(generator.thread_id(), generator.thread_id());
    }

    #[test]
    fn short_code_is_six_alphanumerics() {
        let code = IdGenerator::new().short_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
