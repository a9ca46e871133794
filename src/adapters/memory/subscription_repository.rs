//! In-memory implementation of SubscriptionRepository.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::{Subscription, SubscriptionStatus, MAX_RETRIES};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, SubscriptionId, Timestamp};
use crate::ports::SubscriptionRepository;

/// In-memory subscription store with optimistic concurrency.
///
/// `update` is compare-and-swap on the aggregate version, matching the
/// postgres adapter, so concurrency conflicts are reproducible in tests.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    records: Mutex<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, bypassing the unique-customer check.
    pub fn with_subscription(subscription: Subscription) -> Self {
        let repo = Self::new();
        repo.records
            .lock()
            .expect("repo lock")
            .insert(subscription.id, subscription);
        repo
    }

    /// Snapshot of every stored record, for assertions.
    pub fn all(&self) -> Vec<Subscription> {
        self.records
            .lock()
            .expect("repo lock")
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut records = self.records.lock().expect("repo lock");
        if records
            .values()
            .any(|s| s.customer_id == subscription.customer_id)
        {
            return Err(DomainError::new(
                ErrorCode::SubscriptionExists,
                format!(
                    "Customer {} already has a subscription",
                    subscription.customer_id
                ),
            ));
        }
        records.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let mut records = self.records.lock().expect("repo lock");
        let stored = records.get_mut(&subscription.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", subscription.id),
            )
        })?;

        if stored.version != subscription.version {
            return Err(DomainError::new(
                ErrorCode::ConflictDetected,
                format!(
                    "Subscription {} was modified concurrently",
                    subscription.id
                ),
            ));
        }

        let mut updated = subscription.clone();
        updated.version += 1;
        *stored = updated;
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.records.lock().expect("repo lock").get(id).cloned())
    }

    async fn find_by_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .records
            .lock()
            .expect("repo lock")
            .values()
            .find(|s| &s.customer_id == customer_id)
            .cloned())
    }

    async fn find_due(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .records
            .lock()
            .expect("repo lock")
            .values()
            .filter(|s| s.is_due(now))
            .cloned()
            .collect())
    }

    async fn find_retry_candidates(
        &self,
        now: Timestamp,
        min_attempt_age_hours: i64,
    ) -> Result<Vec<Subscription>, DomainError> {
        let cutoff = now.add_hours(-min_attempt_age_hours);
        Ok(self
            .records
            .lock()
            .expect("repo lock")
            .values()
            .filter(|s| {
                s.status == SubscriptionStatus::Suspended
                    && s.retry_count < MAX_RETRIES
                    && s.last_payment_attempt.map_or(true, |at| at <= cutoff)
            })
            .cloned()
            .collect())
    }

    async fn find_grace_expired(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .records
            .lock()
            .expect("repo lock")
            .values()
            .filter(|s| {
                s.status == SubscriptionStatus::Cancelled
                    && s.grace_period_end_date.map_or(false, |end| end < now)
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        self.records.lock().expect("repo lock").remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{find_plan, PREMIUM_PLAN};
    use crate::domain::foundation::PlanId;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn subscription(customer: &str, now: Timestamp) -> Subscription {
        let plan = find_plan(&PlanId::new(PREMIUM_PLAN).unwrap()).unwrap();
        Subscription::create(
            SubscriptionId::new(),
            CustomerId::new(customer).unwrap(),
            plan,
            now,
        )
    }

    #[tokio::test]
    async fn save_rejects_second_subscription_for_same_customer() {
        let repo = InMemorySubscriptionRepository::new();
        let now = ts("2024-01-10T00:00:00Z");
        repo.save(&subscription("cust-1", now)).await.unwrap();

        let err = repo.save(&subscription("cust-1", now)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SubscriptionExists);
    }

    #[tokio::test]
    async fn update_bumps_version_and_detects_conflicts() {
        let repo = InMemorySubscriptionRepository::new();
        let now = ts("2024-01-10T00:00:00Z");
        let sub = subscription("cust-1", now);
        repo.save(&sub).await.unwrap();

        // Two readers take the same snapshot.
        let first = repo.find_by_id(&sub.id).await.unwrap().unwrap();
        let second = repo.find_by_id(&sub.id).await.unwrap().unwrap();

        repo.update(&first).await.unwrap();
        let err = repo.update(&second).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConflictDetected);

        let stored = repo.find_by_id(&sub.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
    }

    #[tokio::test]
    async fn find_due_selects_active_auto_renew_past_date() {
        let repo = InMemorySubscriptionRepository::new();
        let start = ts("2024-01-10T00:00:00Z");
        let due = subscription("cust-due", start);
        let mut off = subscription("cust-off", start);
        off.auto_renew = false;
        repo.save(&due).await.unwrap();
        repo.save(&off).await.unwrap();

        let found = repo.find_due(ts("2024-02-10T00:00:00Z")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].customer_id, due.customer_id);
    }

    #[tokio::test]
    async fn retry_candidates_require_age_and_remaining_budget() {
        let repo = InMemorySubscriptionRepository::new();
        let now = ts("2024-02-10T00:00:00Z");

        // Manually suspended with retries remaining, last attempt 2 days ago.
        let mut eligible = subscription("cust-a", ts("2024-01-01T00:00:00Z"));
        eligible.suspend(now).unwrap();
        eligible.last_payment_attempt = Some(now.add_days(-2));
        repo.save(&eligible).await.unwrap();

        // Exhausted budget: never retried by the job.
        let mut exhausted = subscription("cust-b", ts("2024-01-01T00:00:00Z"));
        for _ in 0..3 {
            let _ = exhausted.apply_payment_failure("declined", false, now);
        }
        repo.save(&exhausted).await.unwrap();

        // Attempt too fresh.
        let mut fresh = subscription("cust-c", ts("2024-01-01T00:00:00Z"));
        fresh.suspend(now).unwrap();
        fresh.last_payment_attempt = Some(now.add_hours(-1));
        repo.save(&fresh).await.unwrap();

        let found = repo.find_retry_candidates(now, 24).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].customer_id, eligible.customer_id);
    }

    #[tokio::test]
    async fn grace_expired_selects_cancelled_past_window() {
        let repo = InMemorySubscriptionRepository::new();
        let mut sub = subscription("cust-1", ts("2024-01-01T00:00:00Z"));
        sub.cancel(ts("2024-01-05T00:00:00Z")).unwrap();
        repo.save(&sub).await.unwrap();
        let grace_end = sub.grace_period_end_date.unwrap();

        assert!(repo.find_grace_expired(grace_end).await.unwrap().is_empty());
        let found = repo
            .find_grace_expired(grace_end.add_days(1))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
