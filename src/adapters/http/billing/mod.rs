//! HTTP adapter for the subscription endpoints.
//!
//! Exposes the billing core via REST:
//! - `POST /subscription/free-trial/start` - Start the one-time free trial
//! - `POST /subscription/subscriptions` - Ensure a premium subscription record
//! - `POST /subscription/cancel` - Cancel with a grace period
//! - `POST /subscription/reactivate` - Undo a cancellation inside the window
//! - `POST /subscription/suspend` - Pause billing
//! - `POST /subscription/resume` - Resume billing
//! - `POST /subscription/issue-billing-key` - Register a billing credential
//! - `POST /subscription/confirm-billing` - First charge after issuance
//! - `GET /subscription/status` - Subscription, projection, trial, history

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{AuthenticatedCustomer, BillingApiError, BillingAppState};
pub use routes::{billing_router, billing_routes};
