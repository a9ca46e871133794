//! Billing scheduler.
//!
//! Named jobs with fixed cadences, each running on its own tokio task
//! so a slow gateway call in one job never delays the others. Every run
//! is guarded by a persisted lease, reads its instant from the injected
//! clock, and processes its full candidate list once, logging per-item
//! failures and continuing.

mod job;
mod jobs;
mod runner;

pub use job::{BillingJob, JobReport};
pub use jobs::{GraceSweepJob, RenewalJob, RetryJob, TrialSweepJob, RETRY_MIN_AGE_HOURS};
pub use runner::{Scheduler, SchedulerConfig};
