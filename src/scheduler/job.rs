//! Job contract shared by all scheduler jobs.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Counters for one job run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Candidates selected for this run.
    pub processed: usize,

    /// Candidates whose operation completed.
    pub succeeded: usize,

    /// Candidates whose operation failed; the next run sees them again.
    pub failed: usize,

    /// Candidates skipped without an attempt (e.g. a concurrent writer
    /// got to the record first).
    pub skipped: usize,
}

/// A named scheduler job.
///
/// `run` receives the current instant from the scheduler's clock so the
/// whole job body executes on virtual time in tests. Implementations
/// must catch per-item errors themselves; returning `Err` means the run
/// could not select its candidates at all.
#[async_trait]
pub trait BillingJob: Send + Sync {
    /// Stable job name, also the lease key.
    fn name(&self) -> &'static str;

    async fn run(&self, now: Timestamp) -> Result<JobReport, DomainError>;
}
