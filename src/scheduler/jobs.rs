//! The four billing jobs.
//!
//! Each job selects its candidates with one repository query and drives
//! them through the corresponding handler. Per-item failures are logged
//! and counted; the batch always runs to completion. A version conflict
//! means another writer (API call or sibling job) got to the record
//! first, so the item is skipped and picked up on the next pass.

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::handlers::billing::{
    ChargeSubscriptionCommand, ChargeSubscriptionHandler, EndFreeTrialCommand,
    EndFreeTrialHandler, ExpireGracePeriodCommand, ExpireGracePeriodHandler,
};
use crate::domain::billing::BillingError;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{PremiumStateStore, SubscriptionRepository};

use super::{BillingJob, JobReport};

/// Hours a failed attempt must age before the retry job re-attempts it.
pub const RETRY_MIN_AGE_HOURS: i64 = 24;

fn count_charge_result(
    report: &mut JobReport,
    job: &'static str,
    result: Result<crate::application::handlers::billing::ChargeOutcome, BillingError>,
) {
    match result {
        Ok(outcome) if outcome.succeeded() => report.succeeded += 1,
        Ok(outcome) => {
            // The failure was applied to the record (retry counted or
            // suspended); the record is consistent, the charge is not.
            tracing::warn!(
                job,
                subscription_id = %outcome.subscription.id,
                "Charge attempt failed"
            );
            report.failed += 1;
        }
        Err(BillingError::Conflict(id)) => {
            tracing::warn!(job, subscription_id = %id, "Concurrent writer; skipping");
            report.skipped += 1;
        }
        Err(err) => {
            tracing::error!(job, error = %err, "Charge could not be processed");
            report.failed += 1;
        }
    }
}

/// Renewal billing: charges every due subscription.
pub struct RenewalJob {
    repository: Arc<dyn SubscriptionRepository>,
    charge: Arc<ChargeSubscriptionHandler>,
}

impl RenewalJob {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        charge: Arc<ChargeSubscriptionHandler>,
    ) -> Self {
        Self { repository, charge }
    }
}

#[async_trait]
impl BillingJob for RenewalJob {
    fn name(&self) -> &'static str {
        "renewal-billing"
    }

    async fn run(&self, now: Timestamp) -> Result<JobReport, DomainError> {
        let due = self.repository.find_due(now).await?;
        let mut report = JobReport {
            processed: due.len(),
            ..Default::default()
        };

        for subscription in due {
            let result = self
                .charge
                .handle(ChargeSubscriptionCommand::new(subscription.id))
                .await;
            count_charge_result(&mut report, self.name(), result);
        }
        Ok(report)
    }
}

/// Failed-payment retry: re-attempts suspended subscriptions with
/// retries remaining, once the previous attempt is old enough.
pub struct RetryJob {
    repository: Arc<dyn SubscriptionRepository>,
    charge: Arc<ChargeSubscriptionHandler>,
}

impl RetryJob {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        charge: Arc<ChargeSubscriptionHandler>,
    ) -> Self {
        Self { repository, charge }
    }
}

#[async_trait]
impl BillingJob for RetryJob {
    fn name(&self) -> &'static str {
        "failed-payment-retry"
    }

    async fn run(&self, now: Timestamp) -> Result<JobReport, DomainError> {
        let candidates = self
            .repository
            .find_retry_candidates(now, RETRY_MIN_AGE_HOURS)
            .await?;
        let mut report = JobReport {
            processed: candidates.len(),
            ..Default::default()
        };

        for subscription in candidates {
            let result = self
                .charge
                .handle(ChargeSubscriptionCommand::new(subscription.id))
                .await;
            count_charge_result(&mut report, self.name(), result);
        }
        Ok(report)
    }
}

/// Grace-period sweep: expires cancelled subscriptions whose grace
/// period has elapsed.
pub struct GraceSweepJob {
    repository: Arc<dyn SubscriptionRepository>,
    expire: Arc<ExpireGracePeriodHandler>,
}

impl GraceSweepJob {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        expire: Arc<ExpireGracePeriodHandler>,
    ) -> Self {
        Self { repository, expire }
    }
}

#[async_trait]
impl BillingJob for GraceSweepJob {
    fn name(&self) -> &'static str {
        "grace-period-sweep"
    }

    async fn run(&self, now: Timestamp) -> Result<JobReport, DomainError> {
        let expired = self.repository.find_grace_expired(now).await?;
        let mut report = JobReport {
            processed: expired.len(),
            ..Default::default()
        };

        for subscription in expired {
            match self
                .expire
                .handle(ExpireGracePeriodCommand {
                    subscription_id: subscription.id,
                })
                .await
            {
                Ok(_) => report.succeeded += 1,
                Err(BillingError::Conflict(id)) => {
                    tracing::warn!(
                        job = self.name(),
                        subscription_id = %id,
                        "Concurrent writer; skipping"
                    );
                    report.skipped += 1;
                }
                Err(err) => {
                    tracing::error!(
                        job = self.name(),
                        subscription_id = %subscription.id,
                        error = %err,
                        "Grace-period expiry failed"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}

/// Free-trial sweep: retires trials whose window has closed.
pub struct TrialSweepJob {
    premium_store: Arc<dyn PremiumStateStore>,
    end_trial: Arc<EndFreeTrialHandler>,
}

impl TrialSweepJob {
    pub fn new(
        premium_store: Arc<dyn PremiumStateStore>,
        end_trial: Arc<EndFreeTrialHandler>,
    ) -> Self {
        Self {
            premium_store,
            end_trial,
        }
    }
}

#[async_trait]
impl BillingJob for TrialSweepJob {
    fn name(&self) -> &'static str {
        "free-trial-sweep"
    }

    async fn run(&self, now: Timestamp) -> Result<JobReport, DomainError> {
        let candidates = self.premium_store.find_expiring_trials(now).await?;
        let mut report = JobReport {
            processed: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            match self
                .end_trial
                .handle(EndFreeTrialCommand {
                    customer_id: candidate.customer_id.clone(),
                })
                .await
            {
                Ok(_) => report.succeeded += 1,
                // A customer who upgraded to the paid plan before the
                // window closed keeps their subscription.
                Err(BillingError::ValidationFailed { .. }) => report.skipped += 1,
                Err(err) => {
                    tracing::error!(
                        job = self.name(),
                        customer_id = %candidate.customer_id,
                        error = %err,
                        "Trial retirement failed"
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
