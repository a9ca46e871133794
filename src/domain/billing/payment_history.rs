//! Embedded payment-attempt history.
//!
//! Every charge attempt, successful or not, appends one record. The
//! sequence is append-only and never truncated. Successful attempts are
//! deduplicated by gateway payment key so replaying the same gateway
//! result cannot double-append.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Outcome of a single payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Failed,
}

/// One recorded payment attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    /// When the attempt happened.
    pub date: Timestamp,

    /// Whether the charge went through.
    pub status: AttemptStatus,

    /// Amount charged, present on success.
    pub amount: Option<i64>,

    /// Gateway transaction key, present on success.
    pub payment_key: Option<String>,

    /// Gateway error message, present on failure.
    pub error: Option<String>,

    /// Retry counter value after this attempt was applied.
    pub retry_count: u32,
}

/// Append-only sequence of payment attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentHistory(Vec<PaymentAttempt>);

impl PaymentHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Restores a history from persisted attempts.
    pub fn from_attempts(attempts: Vec<PaymentAttempt>) -> Self {
        Self(attempts)
    }

    /// Returns the recorded attempts, oldest first.
    pub fn attempts(&self) -> &[PaymentAttempt] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if a successful attempt with this gateway payment
    /// key has already been recorded.
    pub fn contains_payment_key(&self, payment_key: &str) -> bool {
        self.0
            .iter()
            .any(|a| a.payment_key.as_deref() == Some(payment_key))
    }

    /// Appends a successful attempt.
    ///
    /// Returns false without appending when the payment key was already
    /// recorded; the gateway result is being replayed.
    pub fn append_success(
        &mut self,
        date: Timestamp,
        amount: i64,
        payment_key: impl Into<String>,
    ) -> bool {
        let payment_key = payment_key.into();
        if self.contains_payment_key(&payment_key) {
            return false;
        }
        self.0.push(PaymentAttempt {
            date,
            status: AttemptStatus::Success,
            amount: Some(amount),
            payment_key: Some(payment_key),
            error: None,
            retry_count: 0,
        });
        true
    }

    /// Appends a failed attempt carrying the retry counter value after
    /// the failure was applied.
    pub fn append_failure(&mut self, date: Timestamp, error: impl Into<String>, retry_count: u32) {
        self.0.push(PaymentAttempt {
            date,
            status: AttemptStatus::Failed,
            amount: None,
            payment_key: None,
            error: Some(error.into()),
            retry_count,
        });
    }

    /// Most recent attempt, if any.
    pub fn last(&self) -> Option<&PaymentAttempt> {
        self.0.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_success_records_amount_and_key() {
        let mut history = PaymentHistory::new();
        let appended = history.append_success(Timestamp::now(), 80000, "pay_abc");

        assert!(appended);
        assert_eq!(history.len(), 1);
        let attempt = history.last().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Success);
        assert_eq!(attempt.amount, Some(80000));
        assert_eq!(attempt.payment_key.as_deref(), Some("pay_abc"));
        assert_eq!(attempt.retry_count, 0);
    }

    #[test]
    fn append_success_dedups_by_payment_key() {
        let mut history = PaymentHistory::new();
        assert!(history.append_success(Timestamp::now(), 80000, "pay_abc"));
        assert!(!history.append_success(Timestamp::now(), 80000, "pay_abc"));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn distinct_payment_keys_both_append() {
        let mut history = PaymentHistory::new();
        assert!(history.append_success(Timestamp::now(), 80000, "pay_a"));
        assert!(history.append_success(Timestamp::now(), 80000, "pay_b"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn append_failure_records_error_and_retry_count() {
        let mut history = PaymentHistory::new();
        history.append_failure(Timestamp::now(), "insufficient balance", 2);

        let attempt = history.last().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Failed);
        assert_eq!(attempt.error.as_deref(), Some("insufficient balance"));
        assert_eq!(attempt.retry_count, 2);
        assert!(attempt.amount.is_none());
    }

    #[test]
    fn failures_are_never_deduplicated() {
        let mut history = PaymentHistory::new();
        history.append_failure(Timestamp::now(), "timeout", 1);
        history.append_failure(Timestamp::now(), "timeout", 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn history_serializes_as_plain_array() {
        let mut history = PaymentHistory::new();
        history.append_failure(Timestamp::now(), "timeout", 1);

        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
    }
}
