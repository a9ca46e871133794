//! Subscription aggregate entity.
//!
//! One active subscription per customer. All transitions take the
//! current instant as an argument so the scheduler's injected clock
//! flows through the whole state machine and tests can run on virtual
//! time.
//!
//! # Design Decisions
//!
//! - **Money in smallest currency unit**: prices are i64, never floats
//! - **Retry, don't skip**: a failed charge never advances
//!   `next_billing_date`; the same due date is retried
//! - **Versioned mutations**: `version` backs compare-and-swap updates
//!   in the repository, so concurrent writers surface as conflicts

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CustomerId, DomainError, ErrorCode, PlanId, StateMachine, SubscriptionId, Timestamp,
};

use super::{
    next_billing_date, BillingCycle, PaymentHistory, Plan, PremiumProjection, SubscriptionStatus,
};

/// Retry attempts allowed before a subscription is suspended.
pub const MAX_RETRIES: u32 = 3;

/// Successful charge as reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    pub payment_key: String,
    pub amount: i64,
}

/// Outcome of applying a payment result to the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentApplied {
    /// State advanced; persist and log.
    Applied,

    /// The same gateway result was already applied; nothing changed.
    Duplicate,

    /// The failure exhausted the retries and suspended the record.
    Suspended,
}

/// Subscription aggregate - one recurring-billing record per customer.
///
/// # Invariants
///
/// - `retry_count` resets to 0 exactly on successful payment, manual
///   resume, and renewal
/// - `status == Suspended` implies retries were exhausted at the
///   transition moment
/// - `status == Cancelled` implies `grace_period_end_date` is set and
///   `end_date` equals it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub customer_id: CustomerId,
    pub plan_id: PlanId,
    pub plan_name: String,

    /// Price in the smallest currency unit.
    pub price: i64,

    pub status: SubscriptionStatus,

    /// Opaque reusable token from the payment gateway; absent until the
    /// first successful credential issuance.
    pub billing_credential: Option<String>,

    pub billing_cycle: BillingCycle,

    /// Gate on whether the scheduler considers this record at all.
    pub auto_renew: bool,

    pub start_date: Timestamp,
    pub next_billing_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub grace_period_end_date: Option<Timestamp>,
    pub suspended_at: Option<Timestamp>,
    pub last_payment_date: Option<Timestamp>,
    pub last_payment_attempt: Option<Timestamp>,

    pub retry_count: u32,

    /// Append-only attempt log, never truncated.
    pub payment_history: PaymentHistory,

    /// Optimistic concurrency token, bumped by the repository on update.
    pub version: i64,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a new active subscription on the given plan.
    ///
    /// The first billing instant is one full cycle from `now`.
    pub fn create(id: SubscriptionId, customer_id: CustomerId, plan: &Plan, now: Timestamp) -> Self {
        Self {
            id,
            customer_id,
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            price: plan.price,
            status: SubscriptionStatus::Active,
            billing_credential: None,
            billing_cycle: plan.cycle,
            auto_renew: true,
            start_date: now,
            next_billing_date: next_billing_date(now, plan.cycle),
            end_date: None,
            cancelled_at: None,
            grace_period_end_date: None,
            suspended_at: None,
            last_payment_date: None,
            last_payment_attempt: None,
            retry_count: 0,
            payment_history: PaymentHistory::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a zero-price trial subscription.
    ///
    /// Trial records do not auto-renew; the free-trial sweep retires
    /// them when the window closes.
    pub fn create_trial(id: SubscriptionId, customer_id: CustomerId, plan: &Plan, now: Timestamp) -> Self {
        let mut sub = Self::create(id, customer_id, plan, now);
        sub.auto_renew = false;
        sub
    }

    /// Stores the billing credential issued by the gateway.
    pub fn attach_billing_credential(&mut self, credential: impl Into<String>, now: Timestamp) {
        self.billing_credential = Some(credential.into());
        self.updated_at = now;
    }

    /// Returns true when this record is eligible for a billing attempt.
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active
            && self.auto_renew
            && self.next_billing_date <= now
    }

    /// Returns true if any attempt in the history succeeded.
    pub fn has_successful_payment(&self) -> bool {
        self.last_payment_date.is_some()
            || self
                .payment_history
                .attempts()
                .iter()
                .any(|a| a.status == super::AttemptStatus::Success)
    }

    /// Applies a successful charge.
    ///
    /// Resets the retry counter, stamps the payment, and advances
    /// `next_billing_date` one cycle from *now* (not from the stale due
    /// date). A replayed receipt (same payment key) is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the status cannot (re-)enter `Active`.
    pub fn apply_payment_success(
        &mut self,
        receipt: &ChargeReceipt,
        now: Timestamp,
    ) -> Result<PaymentApplied, DomainError> {
        if self.payment_history.contains_payment_key(&receipt.payment_key) {
            return Ok(PaymentApplied::Duplicate);
        }

        self.transition_to(SubscriptionStatus::Active)?;
        self.payment_history
            .append_success(now, receipt.amount, receipt.payment_key.clone());
        self.last_payment_date = Some(now);
        self.last_payment_attempt = Some(now);
        self.next_billing_date = next_billing_date(now, self.billing_cycle);
        self.retry_count = 0;
        self.suspended_at = None;
        self.updated_at = now;
        Ok(PaymentApplied::Applied)
    }

    /// Applies a failed charge.
    ///
    /// Increments the retry counter and records the attempt without
    /// touching `next_billing_date`. A terminal gateway error, or an
    /// exhausted retry budget, suspends the record immediately.
    ///
    /// # Errors
    ///
    /// Returns error if suspension is required but not legal from the
    /// current status.
    pub fn apply_payment_failure(
        &mut self,
        error: &str,
        terminal: bool,
        now: Timestamp,
    ) -> Result<PaymentApplied, DomainError> {
        self.retry_count = if terminal {
            MAX_RETRIES.max(self.retry_count + 1)
        } else {
            self.retry_count + 1
        };
        self.last_payment_attempt = Some(now);
        self.payment_history.append_failure(now, error, self.retry_count);
        self.updated_at = now;

        if self.retry_count >= MAX_RETRIES && self.status != SubscriptionStatus::Suspended {
            self.transition_to(SubscriptionStatus::Suspended)?;
            self.suspended_at = Some(now);
            return Ok(PaymentApplied::Suspended);
        }
        Ok(PaymentApplied::Applied)
    }

    /// Cancels the subscription, entering the grace period.
    ///
    /// Premium access continues until one cycle after the last payment
    /// (or one cycle from now when nothing was ever paid).
    ///
    /// # Errors
    ///
    /// Returns error if cancellation is not legal from the current status.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        let anchor = self.last_payment_date.unwrap_or(now);
        let grace_end = next_billing_date(anchor, self.billing_cycle);
        self.cancelled_at = Some(now);
        self.auto_renew = false;
        self.grace_period_end_date = Some(grace_end);
        self.end_date = Some(grace_end);
        self.updated_at = now;
        Ok(())
    }

    /// Reactivates a cancelled subscription.
    ///
    /// Only legal while the next billing date has not passed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when not cancelled, and
    /// `ReactivationWindowClosed` after the billing date.
    pub fn reactivate(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Cancelled {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot reactivate subscription in {} state", self.status),
            ));
        }
        if now > self.next_billing_date {
            return Err(DomainError::new(
                ErrorCode::ReactivationWindowClosed,
                format!(
                    "Reactivation window closed at {}",
                    self.next_billing_date
                ),
            ));
        }
        self.transition_to(SubscriptionStatus::Active)?;
        self.cancelled_at = None;
        self.grace_period_end_date = None;
        self.end_date = None;
        self.auto_renew = true;
        self.updated_at = now;
        Ok(())
    }

    /// Administrative suspension.
    ///
    /// # Errors
    ///
    /// Returns error if suspension is not legal from the current status.
    pub fn suspend(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Suspended)?;
        self.suspended_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Administrative resume; resets the retry budget.
    ///
    /// # Errors
    ///
    /// Returns error if the subscription is not suspended.
    pub fn resume(&mut self, now: Timestamp) -> Result<(), DomainError> {
        if self.status != SubscriptionStatus::Suspended {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot resume subscription in {} state", self.status),
            ));
        }
        self.transition_to(SubscriptionStatus::Active)?;
        self.retry_count = 0;
        self.suspended_at = None;
        self.updated_at = now;
        Ok(())
    }

    /// Scheduled transition out of the grace period.
    ///
    /// # Errors
    ///
    /// Returns error if the record is not cancelled or the grace period
    /// has not elapsed yet.
    pub fn expire_grace_period(&mut self, now: Timestamp) -> Result<(), DomainError> {
        let grace_end = self.grace_period_end_date.ok_or_else(|| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Subscription has no grace period to expire",
            )
        })?;
        if now <= grace_end {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Grace period runs until {}", grace_end),
            ));
        }
        self.transition_to(SubscriptionStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    /// Retires a trial subscription at the end of its window.
    ///
    /// Trials carry no grace period: the record goes straight through
    /// `cancelled` to `expired` and premium access ends now.
    ///
    /// # Errors
    ///
    /// Returns error if the record is not active.
    pub fn expire_trial(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Cancelled)?;
        self.transition_to(SubscriptionStatus::Expired)?;
        self.auto_renew = false;
        self.cancelled_at = Some(now);
        self.end_date = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Builds the premium-state projection for the user record.
    pub fn premium_projection(&self) -> PremiumProjection {
        PremiumProjection {
            is_premium: self.status.grants_premium(),
            subscription_status: self.status.into(),
            last_payment_date: self.last_payment_date,
            next_payment_date: Some(self.next_billing_date),
            grace_period_end_date: self.grace_period_end_date,
        }
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {} to {}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
