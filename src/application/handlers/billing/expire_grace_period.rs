//! ExpireGracePeriodHandler - retire a cancelled subscription once its
//! grace period has elapsed.
//!
//! Invoked by the grace-period sweep; this is the moment premium access
//! actually ends after a cancellation.

use std::sync::Arc;

use crate::domain::billing::{BillingError, HistoryEvent, HistoryEventKind, Subscription};
use crate::domain::foundation::SubscriptionId;
use crate::ports::{Clock, HistoryLogger, PremiumStateStore, SubscriptionRepository};

use super::{map_update_error, record_history};

/// Command to expire a subscription's grace period.
#[derive(Debug, Clone)]
pub struct ExpireGracePeriodCommand {
    pub subscription_id: SubscriptionId,
}

/// Handler for grace-period expiry.
pub struct ExpireGracePeriodHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl ExpireGracePeriodHandler {
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
        cmd: ExpireGracePeriodCommand,
    ) -> Result<Subscription, BillingError> {
        let now = self.clock.now();

        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?
            .ok_or_else(|| BillingError::not_found(cmd.subscription_id))?;

        let current = subscription.status;
        subscription
            .expire_grace_period(now)
            .map_err(|_| BillingError::illegal_transition(current.to_string(), "expire"))?;

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
            "Grace period expired"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::SubscriptionExpired,
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
