//! Subscription status state machine.
//!
//! Defines the subscription lifecycle states and valid transitions.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Pre-state for records created ahead of any billing activity.
    /// The billing flow itself never lands here.
    Inactive,

    /// Payments succeeding or retries remaining.
    Active,

    /// Retries exhausted; awaits manual resume or the retry job.
    Suspended,

    /// Cancelled by the customer; premium access continues through the
    /// grace period.
    Cancelled,

    /// Grace period elapsed. Terminal.
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if this status keeps the customer's premium
    /// projection switched on.
    pub fn grants_premium(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::Suspended | SubscriptionStatus::Cancelled
        )
    }

    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Suspended => "suspended",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(SubscriptionStatus::Inactive),
            "active" => Some(SubscriptionStatus::Active),
            "suspended" => Some(SubscriptionStatus::Suspended),
            "cancelled" => Some(SubscriptionStatus::Cancelled),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From INACTIVE
            (Inactive, Active)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, Suspended)
                | (Active, Cancelled)
            // From SUSPENDED
                | (Suspended, Active) // Resume
                | (Suspended, Cancelled)
            // From CANCELLED
                | (Cancelled, Active) // Reactivate (time-gated by the aggregate)
                | (Cancelled, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Inactive => vec![Active],
            Active => vec![Active, Suspended, Cancelled],
            Suspended => vec![Active, Cancelled],
            Cancelled => vec![Active, Expired],
            Expired => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_can_suspend_and_cancel() {
        let status = SubscriptionStatus::Active;
        assert!(status.can_transition_to(&SubscriptionStatus::Suspended));
        assert!(status.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn active_can_renew_to_active() {
        let result = SubscriptionStatus::Active.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn suspended_can_resume_to_active() {
        let result = SubscriptionStatus::Suspended.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn suspended_cannot_expire_directly() {
        assert!(!SubscriptionStatus::Suspended.can_transition_to(&SubscriptionStatus::Expired));
    }

    #[test]
    fn cancelled_can_reactivate_or_expire() {
        let status = SubscriptionStatus::Cancelled;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));
        assert!(status.can_transition_to(&SubscriptionStatus::Expired));
    }

    #[test]
    fn expired_is_terminal() {
        assert!(SubscriptionStatus::Expired.is_terminal());
        let result = SubscriptionStatus::Expired.transition_to(SubscriptionStatus::Active);
        assert!(result.is_err());
    }

    #[test]
    fn active_cannot_expire_without_cancellation() {
        assert!(!SubscriptionStatus::Active.can_transition_to(&SubscriptionStatus::Expired));
    }

    #[test]
    fn grants_premium_matches_lifecycle() {
        assert!(SubscriptionStatus::Active.grants_premium());
        assert!(SubscriptionStatus::Suspended.grants_premium());
        assert!(SubscriptionStatus::Cancelled.grants_premium());
        assert!(!SubscriptionStatus::Inactive.grants_premium());
        assert!(!SubscriptionStatus::Expired.grants_premium());
    }

    #[test]
    fn status_string_form_roundtrips() {
        for status in [
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Active,
            SubscriptionStatus::Suspended,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in [
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Active,
            SubscriptionStatus::Suspended,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            for target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    target
                );
            }
        }
    }
}
