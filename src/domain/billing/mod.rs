//! Billing domain - the recurring-subscription engine.
//!
//! The subscription aggregate and its state machine live here, together
//! with the pure next-billing-date calculator, the append-only payment
//! history, the premium projection pushed onto the user record, and the
//! pricing policy applied before each charge.

pub mod cycle;
pub mod errors;
pub mod events;
pub mod payment_history;
pub mod plan;
pub mod premium;
pub mod pricing;
pub mod status;
pub mod subscription;

pub use cycle::{next_billing_date, BillingCycle};
pub use errors::BillingError;
pub use events::{HistoryEvent, HistoryEventKind};
pub use payment_history::{AttemptStatus, PaymentAttempt, PaymentHistory};
pub use plan::{find_plan, trial_plan, Plan, PREMIUM_PLAN, TRIAL_PLAN};
pub use premium::{PremiumProjection, ProjectedStatus, TrialState};
pub use pricing::{FirstChargeDiscount, PricingPolicy, StandardPricing};
pub use status::SubscriptionStatus;
pub use subscription::{ChargeReceipt, PaymentApplied, Subscription, MAX_RETRIES};
