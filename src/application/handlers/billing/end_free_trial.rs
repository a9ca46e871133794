//! EndFreeTrialHandler - retire a trial whose window closed.
//!
//! Invoked by the free-trial sweep. Trials carry no grace period: the
//! record expires in one step and premium access ends immediately.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, HistoryEvent, HistoryEventKind, Subscription, TRIAL_PLAN,
};
use crate::domain::foundation::CustomerId;
use crate::ports::{Clock, HistoryLogger, PremiumStateStore, SubscriptionRepository};

use super::{map_update_error, record_history};

/// Command to end a customer's free trial.
#[derive(Debug, Clone)]
pub struct EndFreeTrialCommand {
    pub customer_id: CustomerId,
}

/// Handler for retiring expired trials.
pub struct EndFreeTrialHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl EndFreeTrialHandler {
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

    pub async fn handle(&self, cmd: EndFreeTrialCommand) -> Result<Subscription, BillingError> {
        let now = self.clock.now();

        let mut subscription = self
            .repository
            .find_by_customer(&cmd.customer_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?
            .ok_or_else(|| BillingError::not_found_for_customer(cmd.customer_id.clone()))?;

        // A customer who upgraded to the paid plan keeps their premium
        // access; the trial window no longer governs the record.
        if subscription.plan_id.as_str() != TRIAL_PLAN {
            return Err(BillingError::validation(
                "customer_id",
                "subscription is not a trial",
            ));
        }

        let current = subscription.status;
        subscription
            .expire_trial(now)
            .map_err(|_| BillingError::illegal_transition(current.to_string(), "end trial"))?;

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
            "Free trial ended"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::FreeTrialEnded,
                subscription.customer_id.clone(),
                subscription.id,
                subscription.status,
                now,
            ),
        )
        .await;

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
    use crate::domain::billing::{find_plan, trial_plan, SubscriptionStatus, PREMIUM_PLAN};
    use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn handler_with(
        sub: Subscription,
        now: Timestamp,
    ) -> (EndFreeTrialHandler, Arc<InMemoryPremiumStore>) {
        let premium = Arc::new(InMemoryPremiumStore::new());
        let handler = EndFreeTrialHandler::new(
            Arc::new(InMemorySubscriptionRepository::with_subscription(sub)),
            premium.clone(),
            Arc::new(InMemoryHistoryLogger::new()),
            Arc::new(ManualClock::new(now)),
        );
        (handler, premium)
    }

    #[tokio::test]
    async fn ending_a_trial_expires_it_without_a_grace_period() {
        let customer = CustomerId::new("cust-1").unwrap();
        let sub = Subscription::create_trial(
            SubscriptionId::new(),
            customer.clone(),
            trial_plan(),
            ts("2024-01-10T00:00:00Z"),
        );
        let (handler, premium) = handler_with(sub, ts("2024-02-10T00:00:00Z"));

        let ended = handler
            .handle(EndFreeTrialCommand {
                customer_id: customer.clone(),
            })
            .await
            .unwrap();

        assert_eq!(ended.status, SubscriptionStatus::Expired);
        assert!(ended.grace_period_end_date.is_none());
        assert!(!premium.projection(&customer).unwrap().is_premium);
    }

    #[tokio::test]
    async fn paid_subscriptions_are_left_alone() {
        let customer = CustomerId::new("cust-1").unwrap();
        let plan = find_plan(&PlanId::new(PREMIUM_PLAN).unwrap()).unwrap();
        let sub = Subscription::create(
            SubscriptionId::new(),
            customer.clone(),
            plan,
            ts("2024-01-10T00:00:00Z"),
        );
        let (handler, _premium) = handler_with(sub, ts("2024-02-10T00:00:00Z"));

        let err = handler
            .handle(EndFreeTrialCommand {
                customer_id: customer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::ValidationFailed { .. }));
    }
}
