//! Scheduler runner: one tokio task per registered job.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::domain::foundation::DomainError;
use crate::ports::{Clock, LeaseStore};

use super::{BillingJob, JobReport};

/// Scheduler-wide settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Identifies this instance as the lease holder.
    pub holder: String,

    /// How long an acquired lease lives if the holder crashes mid-run.
    pub lease_ttl: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            holder: format!("homeport-billing-{}", uuid::Uuid::new_v4()),
            lease_ttl: Duration::from_secs(600),
        }
    }
}

#[derive(Clone)]
struct ScheduledJob {
    job: Arc<dyn BillingJob>,
    cadence: Duration,
}

/// Drives registered jobs on their cadences.
///
/// Each run acquires the job's persisted lease first; losing the race
/// to another instance skips the run rather than double-billing.
pub struct Scheduler {
    jobs: Vec<ScheduledJob>,
    clock: Arc<dyn Clock>,
    leases: Arc<dyn LeaseStore>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        leases: Arc<dyn LeaseStore>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            jobs: Vec::new(),
            clock,
            leases,
            config,
        }
    }

    /// Registers a job to run every `cadence`.
    pub fn register(mut self, job: Arc<dyn BillingJob>, cadence: Duration) -> Self {
        self.jobs.push(ScheduledJob { job, cadence });
        self
    }

    /// Runs one job once, behind its lease.
    ///
    /// Returns `None` when another holder owns the lease. Also directly
    /// drivable from tests, bypassing the interval loop.
    pub async fn run_job_once(
        &self,
        job: &Arc<dyn BillingJob>,
    ) -> Result<Option<JobReport>, DomainError> {
        let lease = self
            .leases
            .acquire(job.name(), &self.config.holder, self.config.lease_ttl)
            .await?;
        if lease.is_none() {
            tracing::info!(job = job.name(), "Lease held elsewhere; skipping run");
            return Ok(None);
        }

        let now = self.clock.now();
        let result = job.run(now).await;
        self.leases.release(job.name(), &self.config.holder).await?;

        match &result {
            Ok(report) => {
                tracing::info!(
                    job = job.name(),
                    processed = report.processed,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    skipped = report.skipped,
                    "Job run finished"
                );
            }
            Err(err) => {
                tracing::error!(job = job.name(), error = %err, "Job run failed");
            }
        }
        result.map(Some)
    }

    /// Spawns one task per registered job; each loops on its cadence
    /// until the shutdown channel flips to `true`.
    pub fn spawn(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        self.jobs
            .iter()
            .cloned()
            .map(|scheduled| {
                let scheduler = Arc::clone(self);
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    let mut interval = time::interval(scheduled.cadence);
                    // The first tick fires immediately; skip it so jobs
                    // start one cadence after boot.
                    interval.tick().await;
                    loop {
                        tokio::select! {
                            _ = shutdown.changed() => {
                                if *shutdown.borrow() {
                                    tracing::info!(job = scheduled.job.name(), "Job task stopping");
                                    return;
                                }
                            }
                            _ = interval.tick() => {
                                if let Err(err) = scheduler.run_job_once(&scheduled.job).await {
                                    tracing::error!(
                                        job = scheduled.job.name(),
                                        error = %err,
                                        "Job run errored; next tick will retry"
                                    );
                                }
                            }
                        }
                    }
                })
            })
            .collect()
    }
}
