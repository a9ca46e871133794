//! StartFreeTrialHandler - one free trial per customer, ever.
//!
//! The trial is a zero-price subscription on the trial plan so billing
//! history stays uniform; it does not auto-renew, and the trial sweep
//! retires it when the window closes.

use std::sync::Arc;

use crate::domain::billing::{
    next_billing_date, trial_plan, BillingError, HistoryEvent, HistoryEventKind, Subscription,
    TrialState,
};
use crate::domain::foundation::{CustomerId, SubscriptionId};
use crate::ports::{Clock, HistoryLogger, PremiumStateStore, SubscriptionRepository};

use super::record_history;

/// Command to start the customer's free trial.
#[derive(Debug, Clone)]
pub struct StartFreeTrialCommand {
    pub customer_id: CustomerId,
}

/// Handler for starting a free trial.
pub struct StartFreeTrialHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl StartFreeTrialHandler {
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

    pub async fn handle(&self, cmd: StartFreeTrialCommand) -> Result<Subscription, BillingError> {
        let now = self.clock.now();

        let trial = self
            .premium_store
            .trial_state(&cmd.customer_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;
        if trial.used {
            return Err(BillingError::free_trial_already_used(cmd.customer_id));
        }

        if self
            .repository
            .find_by_customer(&cmd.customer_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?
            .is_some()
        {
            return Err(BillingError::validation(
                "customer_id",
                "customer already has a subscription",
            ));
        }

        let plan = trial_plan();
        let subscription =
            Subscription::create_trial(SubscriptionId::new(), cmd.customer_id.clone(), plan, now);
        let trial_end = next_billing_date(now, plan.cycle);

        self.repository
            .save(&subscription)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;
        self.premium_store
            .record_trial(&cmd.customer_id, TrialState::started(now, trial_end))
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;
        self.premium_store
            .project(&cmd.customer_id, &subscription.premium_projection())
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;

        tracing::info!(
            customer_id = %cmd.customer_id,
            subscription_id = %subscription.id,
            trial_end = %trial_end,
            "Free trial started"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::FreeTrialStarted,
                cmd.customer_id,
                subscription.id,
                subscription.status,
                now,
            )
            .with_metadata(serde_json::json!({
                "trial_end_date": trial_end.to_string(),
            })),
        )
        .await;

        Ok(subscription)
    }
}
