//! ReactivateSubscriptionHandler - undo a cancellation inside the
//! grace period.
//!
//! Only legal while the next billing date has not passed; after that
//! the customer has to subscribe again.

use std::sync::Arc;

use crate::domain::billing::{BillingError, HistoryEvent, HistoryEventKind, Subscription};
use crate::domain::foundation::{CustomerId, ErrorCode};
use crate::ports::{Clock, HistoryLogger, PremiumStateStore, SubscriptionRepository};

use super::{map_update_error, record_history};

/// Command to reactivate a cancelled subscription.
#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionCommand {
    pub customer_id: CustomerId,
}

/// Handler for reactivation.
pub struct ReactivateSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl ReactivateSubscriptionHandler {
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
        cmd: ReactivateSubscriptionCommand,
    ) -> Result<Subscription, BillingError> {
        let now = self.clock.now();

        let mut subscription = self
            .repository
            .find_by_customer(&cmd.customer_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?
            .ok_or_else(|| BillingError::not_found_for_customer(cmd.customer_id.clone()))?;

        let current = subscription.status;
        let window_end = subscription.next_billing_date;
        subscription.reactivate(now).map_err(|err| match err.code {
            ErrorCode::ReactivationWindowClosed => {
                BillingError::reactivation_window_closed(window_end)
            }
            _ => BillingError::illegal_transition(current.to_string(), "reactivate"),
        })?;

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
            "Subscription reactivated"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::SubscriptionReactivated,
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
    use crate::domain::billing::{find_plan, ChargeReceipt, SubscriptionStatus, PREMIUM_PLAN};
    use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    // Paid on Jan 10, cancelled Jan 20: grace runs until Feb 10.
    fn cancelled_subscription() -> Subscription {
        let plan = find_plan(&PlanId::new(PREMIUM_PLAN).unwrap()).unwrap();
        let mut sub = Subscription::create(
            SubscriptionId::new(),
            CustomerId::new("cust-1").unwrap(),
            plan,
            ts("2024-01-01T00:00:00Z"),
        );
        sub.apply_payment_success(
            &ChargeReceipt {
                payment_key: "pay_1".into(),
                amount: 80_000,
            },
            ts("2024-01-10T00:00:00Z"),
        )
        .unwrap();
        sub.cancel(ts("2024-01-20T00:00:00Z")).unwrap();
        sub
    }

    fn handler_at(sub: Subscription, now: Timestamp) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(
            Arc::new(InMemorySubscriptionRepository::with_subscription(sub)),
            Arc::new(InMemoryPremiumStore::new()),
            Arc::new(InMemoryHistoryLogger::new()),
            Arc::new(ManualClock::new(now)),
        )
    }

    #[tokio::test]
    async fn reactivation_succeeds_inside_the_window() {
        let sub = cancelled_subscription();
        let customer = sub.customer_id.clone();
        let handler = handler_at(sub, ts("2024-02-05T00:00:00Z"));

        let reactivated = handler
            .handle(ReactivateSubscriptionCommand {
                customer_id: customer,
            })
            .await
            .unwrap();

        assert_eq!(reactivated.status, SubscriptionStatus::Active);
        assert!(reactivated.auto_renew);
        assert!(reactivated.grace_period_end_date.is_none());
    }

    #[tokio::test]
    async fn reactivation_fails_after_the_billing_date() {
        let sub = cancelled_subscription();
        let customer = sub.customer_id.clone();
        let handler = handler_at(sub, ts("2024-02-15T00:00:00Z"));

        let err = handler
            .handle(ReactivateSubscriptionCommand {
                customer_id: customer,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BillingError::ReactivationWindowClosed { .. }
        ));
    }

    #[tokio::test]
    async fn reactivating_an_active_subscription_is_illegal() {
        let plan = find_plan(&PlanId::new(PREMIUM_PLAN).unwrap()).unwrap();
        let sub = Subscription::create(
            SubscriptionId::new(),
            CustomerId::new("cust-1").unwrap(),
            plan,
            ts("2024-01-01T00:00:00Z"),
        );
        let customer = sub.customer_id.clone();
        let handler = handler_at(sub, ts("2024-01-02T00:00:00Z"));

        let err = handler
            .handle(ReactivateSubscriptionCommand {
                customer_id: customer,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::IllegalTransition { .. }));
    }
}
