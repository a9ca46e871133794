//! CancelSubscriptionHandler - user-initiated cancellation.
//!
//! Cancellation enters the grace period: premium access continues until
//! one cycle after the last payment, after which the grace-period sweep
//! retires the record.

use std::sync::Arc;

use crate::domain::billing::{BillingError, HistoryEvent, HistoryEventKind, Subscription};
use crate::domain::foundation::CustomerId;
use crate::ports::{Clock, HistoryLogger, PremiumStateStore, SubscriptionRepository};

use super::{map_update_error, record_history};

/// Command to cancel the customer's subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub customer_id: CustomerId,
}

/// Handler for subscription cancellation.
pub struct CancelSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl CancelSubscriptionHandler {
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
        cmd: CancelSubscriptionCommand,
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
            .cancel(now)
            .map_err(|_| BillingError::illegal_transition(current.to_string(), "cancel"))?;

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
            grace_period_end = ?subscription.grace_period_end_date,
            "Subscription cancelled"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::SubscriptionCancelled,
                subscription.customer_id.clone(),
                subscription.id,
                subscription.status,
                now,
            )
            .with_metadata(serde_json::json!({
                "grace_period_end_date": subscription
                    .grace_period_end_date
                    .map(|t| t.to_string()),
            })),
        )
        .await;

        Ok(subscription)
    }
}
