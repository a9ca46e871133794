//! SuspendSubscriptionHandler - administrative suspension.

use std::sync::Arc;

use crate::domain::billing::{BillingError, HistoryEvent, HistoryEventKind, Subscription};
use crate::domain::foundation::CustomerId;
use crate::ports::{Clock, HistoryLogger, PremiumStateStore, SubscriptionRepository};

use super::{map_update_error, record_history};

/// Command to suspend the customer's subscription.
#[derive(Debug, Clone)]
pub struct SuspendSubscriptionCommand {
    pub customer_id: CustomerId,

    /// Operator-supplied reason, recorded in the history log.
    pub reason: Option<String>,
}

/// Handler for administrative suspension.
pub struct SuspendSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl SuspendSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        premium_store: Arc<dyn PremiumStateStore>,
        history: Arc<dyn HistoryLogger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            premium_store,
            history,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: SuspendSubscriptionCommand,
    ) -> Result<Subscription, BillingError> {
        let now = self.clock.now();

        let mut subscription = self
            .repository
            .find_by_customer(&cmd.customer_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?
            .ok_or_else(|| BillingError::not_found_for_customer(cmd.customer_id.clone()))?;

        let current = subscription.status;
        subscription
            .suspend(now)
            .map_err(|_| BillingError::illegal_transition(current.to_string(), "suspend"))?;

        self.repository
            .update(&subscription)
            .await
            .map_err(|e| map_update_error(subscription.id, e))?;
        self.premium_store
            .project(&subscription.customer_id, &subscription.premium_projection())
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;

        tracing::info!(
            customer_id = %subscription.customer_id,
            subscription_id = %subscription.id,
            "Subscription suspended manually"
        );
        let mut event = HistoryEvent::new(
            HistoryEventKind::SubscriptionSuspended,
            subscription.customer_id.clone(),
            subscription.id,
            subscription.status,
            now,
        );
        if let Some(reason) = cmd.reason {
            event = event.with_error(reason);
        }
        record_history(&self.history, event).await;

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::memory::{
        InMemoryHistoryLogger, InMemoryPremiumStore, InMemorySubscriptionRepository,
    };
    use crate::domain::billing::{find_plan, ProjectedStatus, SubscriptionStatus, PREMIUM_PLAN};
    use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn active_subscription() -> Subscription {
        let plan = find_plan(&PlanId::new(PREMIUM_PLAN).unwrap()).unwrap();
        Subscription::create(
            SubscriptionId::new(),
            CustomerId::new("cust-1").unwrap(),
            plan,
            ts("2024-01-01T00:00:00Z"),
        )
    }

    #[tokio::test]
    async fn suspend_projects_and_logs_the_reason() {
        let sub = active_subscription();
        let customer = sub.customer_id.clone();
        let premium = Arc::new(InMemoryPremiumStore::new());
        let log = Arc::new(InMemoryHistoryLogger::new());
        let handler = SuspendSubscriptionHandler::new(
            Arc::new(InMemorySubscriptionRepository::with_subscription(sub)),
            premium.clone(),
            log.clone(),
            Arc::new(ManualClock::new(ts("2024-01-05T00:00:00Z"))),
        );

        let suspended = handler
            .handle(SuspendSubscriptionCommand {
                customer_id: customer.clone(),
                reason: Some("chargeback dispute".into()),
            })
            .await
            .unwrap();

        assert_eq!(suspended.status, SubscriptionStatus::Suspended);
        assert_eq!(
            premium.projection(&customer).unwrap().subscription_status,
            ProjectedStatus::Suspended
        );
        assert_eq!(
            log.entries()[0].error.as_deref(),
            Some("chargeback dispute")
        );
    }

    #[tokio::test]
    async fn suspending_twice_is_illegal() {
        let sub = active_subscription();
        let customer = sub.customer_id.clone();
        let handler = SuspendSubscriptionHandler::new(
            Arc::new(InMemorySubscriptionRepository::with_subscription(sub)),
            Arc::new(InMemoryPremiumStore::new()),
            Arc::new(InMemoryHistoryLogger::new()),
            Arc::new(ManualClock::new(ts("2024-01-05T00:00:00Z"))),
        );

        handler
            .handle(SuspendSubscriptionCommand {
                customer_id: customer.clone(),
                reason: None,
            })
            .await
            .unwrap();
        let err = handler
            .handle(SuspendSubscriptionCommand {
                customer_id: customer,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::IllegalTransition { .. }));
    }
}
