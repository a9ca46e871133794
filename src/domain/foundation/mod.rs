//! Foundation module - shared value objects and domain primitives.
//!
//! These types are used across the billing domain: timestamps, typed
//! identifiers, error types, and the state machine trait implemented by
//! every lifecycle status enum.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{CustomerId, OrderId, PlanId, SubscriptionId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
