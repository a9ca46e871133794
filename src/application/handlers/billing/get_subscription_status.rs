//! GetSubscriptionStatusHandler - read side of the subscription API.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, HistoryEvent, PremiumProjection, Subscription, TrialState,
};
use crate::domain::foundation::CustomerId;
use crate::ports::{HistoryLogger, PremiumStateStore, SubscriptionRepository};

/// Entries returned with the status view.
const HISTORY_LIMIT: u32 = 10;

/// Query for a customer's subscription status.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub customer_id: CustomerId,
}

/// Everything the status endpoint shows: the record, the premium
/// projection, the trial window, and the most recent history entries.
#[derive(Debug, Clone)]
pub struct SubscriptionStatusView {
    pub subscription: Subscription,
    pub projection: PremiumProjection,
    pub trial: TrialState,
    pub recent_history: Vec<HistoryEvent>,
}

/// Handler for the status query.
pub struct GetSubscriptionStatusHandler {
    repository: Arc<dyn SubscriptionRepository>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        premium_store: Arc<dyn PremiumStateStore>,
        history: Arc<dyn HistoryLogger>,
    ) -> Self {
        Self {
            repository,
            premium_store,
            history,
        }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<SubscriptionStatusView, BillingError> {
        let subscription = self
            .repository
            .find_by_customer(&query.customer_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?
            .ok_or_else(|| BillingError::not_found_for_customer(query.customer_id.clone()))?;

        let trial = self
            .premium_store
            .trial_state(&query.customer_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;
        let recent_history = self
            .history
            .recent(&query.customer_id, HISTORY_LIMIT)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;

        let projection = subscription.premium_projection();
        Ok(SubscriptionStatusView {
            subscription,
            projection,
            trial,
            recent_history,
        })
    }
}
