//! Get-or-create for the subscription record.
//!
//! The source system creates a subscription lazily on first
//! billing-credential issuance or first payment confirmation. That
//! behavior is kept, but as one named operation instead of a check
//! scattered across call sites.

use std::sync::Arc;

use crate::domain::billing::{
    find_plan, BillingError, HistoryEvent, HistoryEventKind, Subscription,
};
use crate::domain::foundation::{CustomerId, PlanId, SubscriptionId, Timestamp};
use crate::ports::{HistoryLogger, SubscriptionRepository};

use super::record_history;

/// Returns the customer's subscription, creating one on the given plan
/// if none exists yet.
///
/// # Errors
///
/// - `PlanNotFound` when creation is needed and the plan id is unknown
/// - `Infrastructure` on persistence failure
pub async fn get_or_create_subscription(
    repository: &Arc<dyn SubscriptionRepository>,
    history: &Arc<dyn HistoryLogger>,
    customer_id: &CustomerId,
    plan_id: &PlanId,
    now: Timestamp,
) -> Result<Subscription, BillingError> {
    if let Some(existing) = repository
        .find_by_customer(customer_id)
        .await
        .map_err(|e| BillingError::infrastructure(e.to_string()))?
    {
        return Ok(existing);
    }

    let plan = find_plan(plan_id)
        .ok_or_else(|| BillingError::plan_not_found(plan_id.as_str()))?;
    let subscription = Subscription::create(SubscriptionId::new(), customer_id.clone(), plan, now);

    repository
        .save(&subscription)
        .await
        .map_err(|e| BillingError::infrastructure(e.to_string()))?;

    tracing::info!(
        customer_id = %customer_id,
        subscription_id = %subscription.id,
        plan_id = %plan_id,
        "Subscription created lazily"
    );
    record_history(
        history,
        HistoryEvent::new(
            HistoryEventKind::SubscriptionCreated,
            customer_id.clone(),
            subscription.id,
            subscription.status,
            now,
        )
        .with_amount(subscription.price),
    )
    .await;

    Ok(subscription)
}
