//! Subscription repository port (write side plus scheduler queries).
//!
//! Defines the contract for persisting and retrieving the Subscription
//! aggregate. The store keeps one subscription document per customer.
//!
//! # Design
//!
//! - **Optimistic concurrency**: `update` is compare-and-swap on the
//!   aggregate's `version` field. A concurrent writer surfaces as
//!   `ConflictDetected`, which the scheduler logs and skips.
//! - **Scheduler queries**: due selection, retry candidates, and
//!   grace-period expiry are repository concerns so each job run is one
//!   indexed query, not a full scan in the application layer.

use crate::domain::billing::Subscription;
use crate::domain::foundation::{CustomerId, DomainError, SubscriptionId, Timestamp};
use async_trait::async_trait;

/// Repository port for Subscription aggregate persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    ///
    /// # Errors
    ///
    /// - `SubscriptionExists` if the customer already has one
    /// - `DatabaseError` on persistence failure
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription.
    ///
    /// Compare-and-swap on `subscription.version`: the write only lands
    /// when the stored version still matches, and the stored version is
    /// bumped by one.
    ///
    /// # Errors
    ///
    /// - `ConflictDetected` if the record changed since it was read
    /// - `SubscriptionNotFound` if the record does not exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Find a subscription by its ID.
    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find the customer's subscription.
    ///
    /// Primary lookup: each customer has at most one subscription.
    async fn find_by_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Subscriptions due for a billing attempt: `active`, auto-renew on,
    /// and `next_billing_date <= now`.
    async fn find_due(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError>;

    /// Suspended subscriptions eligible for a retry: retries remaining
    /// and the last attempt at least `min_attempt_age_hours` old.
    async fn find_retry_candidates(
        &self,
        now: Timestamp,
        min_attempt_age_hours: i64,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Cancelled subscriptions whose grace period has elapsed.
    async fn find_grace_expired(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError>;

    /// Delete a subscription (primarily for testing).
    ///
    /// In production, subscriptions transition to `expired` rather than
    /// being deleted.
    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError>;
}
