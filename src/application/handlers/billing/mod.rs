//! Billing command and query handlers.
//!
//! One handler per operation of the subscription API. Handlers hold
//! Arc'd ports, read the current instant from the injected clock, drive
//! the aggregate's state machine, persist through the repository's
//! compare-and-swap update, push the premium projection, and append to
//! the history log (log-and-continue on history failures).

mod cancel_subscription;
mod charge_subscription;
mod confirm_billing;
mod end_free_trial;
mod expire_grace_period;
mod get_or_create;
mod get_subscription_status;
mod issue_billing_key;
mod reactivate_subscription;
mod resume_subscription;
mod start_free_trial;
mod suspend_subscription;

pub use cancel_subscription::{CancelSubscriptionCommand, CancelSubscriptionHandler};
pub use charge_subscription::{ChargeOutcome, ChargeSubscriptionCommand, ChargeSubscriptionHandler};
pub use confirm_billing::{ConfirmBillingCommand, ConfirmBillingHandler, ConfirmBillingResult};
pub use end_free_trial::{EndFreeTrialCommand, EndFreeTrialHandler};
pub use expire_grace_period::{ExpireGracePeriodCommand, ExpireGracePeriodHandler};
pub use get_or_create::get_or_create_subscription;
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, SubscriptionStatusView,
};
pub use issue_billing_key::{IssueBillingKeyCommand, IssueBillingKeyHandler};
pub use reactivate_subscription::{ReactivateSubscriptionCommand, ReactivateSubscriptionHandler};
pub use resume_subscription::{ResumeSubscriptionCommand, ResumeSubscriptionHandler};
pub use start_free_trial::{StartFreeTrialCommand, StartFreeTrialHandler};
pub use suspend_subscription::{SuspendSubscriptionCommand, SuspendSubscriptionHandler};

use std::sync::Arc;

use crate::domain::billing::{BillingError, HistoryEvent};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::ports::HistoryLogger;

/// Appends a history entry, logging and swallowing any failure.
///
/// History writes never affect billing state.
pub(crate) async fn record_history(logger: &Arc<dyn HistoryLogger>, event: HistoryEvent) {
    if let Err(err) = logger.record(&event).await {
        tracing::warn!(
            kind = %event.kind,
            customer_id = %event.customer_id,
            error = %err,
            "History write failed; continuing"
        );
    }
}

/// Maps a repository update failure, surfacing version conflicts as
/// `Conflict` so callers can distinguish them from plain outages.
pub(crate) fn map_update_error(id: SubscriptionId, err: DomainError) -> BillingError {
    match err.code {
        ErrorCode::ConflictDetected => BillingError::conflict(id),
        ErrorCode::SubscriptionNotFound => BillingError::not_found(id),
        _ => BillingError::infrastructure(err.to_string()),
    }
}
