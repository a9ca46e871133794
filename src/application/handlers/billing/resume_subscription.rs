//! ResumeSubscriptionHandler - administrative resume.
//!
//! Clears the retry budget so the next scheduler pass can attempt the
//! outstanding charge again.

use std::sync::Arc;

use crate::domain::billing::{BillingError, HistoryEvent, HistoryEventKind, Subscription};
use crate::domain::foundation::CustomerId;
use crate::ports::{Clock, HistoryLogger, PremiumStateStore, SubscriptionRepository};

use super::{map_update_error, record_history};

/// Command to resume a suspended subscription.
#[derive(Debug, Clone)]
pub struct ResumeSubscriptionCommand {
    pub customer_id: CustomerId,
}

/// Handler for administrative resume.
pub struct ResumeSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl ResumeSubscriptionHandler {
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
        cmd: ResumeSubscriptionCommand,
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
            .resume(now)
            .map_err(|_| BillingError::illegal_transition(current.to_string(), "resume"))?;

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
            "Subscription resumed"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::SubscriptionResumed,
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
