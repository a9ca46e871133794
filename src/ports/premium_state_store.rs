//! User premium-state store port.
//!
//! The CRM user record carries a denormalized copy of the billing facts
//! (premium flag, subscription status, payment dates, trial window).
//! This port keeps that projection eventually consistent with the
//! subscription record.

use crate::domain::billing::{PremiumProjection, TrialState};
use crate::domain::foundation::{CustomerId, DomainError, Timestamp};
use async_trait::async_trait;

/// A user whose free trial ends within the sweep window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialCandidate {
    pub customer_id: CustomerId,
    pub trial_end_date: Timestamp,
}

/// Port for the user premium projection.
#[async_trait]
pub trait PremiumStateStore: Send + Sync {
    /// Push the billing projection onto the user record.
    ///
    /// # Errors
    ///
    /// - `CustomerNotFound` if no such user exists
    /// - `DatabaseError` on persistence failure
    async fn project(
        &self,
        customer_id: &CustomerId,
        projection: &PremiumProjection,
    ) -> Result<(), DomainError>;

    /// Read the customer's free-trial window.
    ///
    /// Returns the unused state for customers that never started one.
    async fn trial_state(&self, customer_id: &CustomerId) -> Result<TrialState, DomainError>;

    /// Record that the customer's free trial started.
    async fn record_trial(
        &self,
        customer_id: &CustomerId,
        state: TrialState,
    ) -> Result<(), DomainError>;

    /// Users whose trial window closes at or before `now` and who still
    /// project an active subscription status.
    async fn find_expiring_trials(
        &self,
        now: Timestamp,
    ) -> Result<Vec<TrialCandidate>, DomainError>;
}
