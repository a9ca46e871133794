//! Axum router configuration for the subscription endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_subscription, confirm_billing, create_subscription, get_subscription_status,
    issue_billing_key, reactivate_subscription, resume_subscription, start_free_trial,
    suspend_subscription, BillingAppState,
};

/// Create the subscription API router.
///
/// # Routes
///
/// All endpoints require the caller's identity (`X-Customer-Id`).
/// - `POST /free-trial/start` - Start the one-time free trial
/// - `POST /subscriptions` - Ensure a premium subscription record
/// - `POST /cancel` - Cancel with a grace period
/// - `POST /reactivate` - Undo a cancellation inside the window
/// - `POST /suspend` - Pause billing
/// - `POST /resume` - Resume billing
/// - `POST /issue-billing-key` - Register a billing credential
/// - `POST /confirm-billing` - First charge after credential issuance
/// - `GET /status` - Subscription, premium projection, trial, history
pub fn billing_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/free-trial/start", post(start_free_trial))
        .route("/subscriptions", post(create_subscription))
        .route("/cancel", post(cancel_subscription))
        .route("/reactivate", post(reactivate_subscription))
        .route("/suspend", post(suspend_subscription))
        .route("/resume", post(resume_subscription))
        .route("/issue-billing-key", post(issue_billing_key))
        .route("/confirm-billing", post(confirm_billing))
        .route("/status", get(get_subscription_status))
}

/// Create the complete billing module router, mounted at `/subscription`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new().nest("/subscription", billing_routes())
}
