//! Premium-state projection onto the user record.
//!
//! The user store keeps a denormalized copy of the billing facts the
//! rest of the CRM reads (premium flag, status, payment dates). It is
//! kept eventually consistent with the subscription record: every state
//! machine transition recomputes and pushes this projection.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::SubscriptionStatus;

/// Subscription status as shown on the user record.
///
/// Mirrors [`SubscriptionStatus`] with one extra value: a cancelled
/// subscription still inside its grace period projects `grace_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectedStatus {
    Inactive,
    Active,
    Suspended,
    GracePeriod,
    Expired,
}

impl ProjectedStatus {
    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectedStatus::Inactive => "inactive",
            ProjectedStatus::Active => "active",
            ProjectedStatus::Suspended => "suspended",
            ProjectedStatus::GracePeriod => "grace_period",
            ProjectedStatus::Expired => "expired",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(ProjectedStatus::Inactive),
            "active" => Some(ProjectedStatus::Active),
            "suspended" => Some(ProjectedStatus::Suspended),
            "grace_period" => Some(ProjectedStatus::GracePeriod),
            "expired" => Some(ProjectedStatus::Expired),
            _ => None,
        }
    }
}

impl From<SubscriptionStatus> for ProjectedStatus {
    fn from(status: SubscriptionStatus) -> Self {
        match status {
            SubscriptionStatus::Inactive => ProjectedStatus::Inactive,
            SubscriptionStatus::Active => ProjectedStatus::Active,
            SubscriptionStatus::Suspended => ProjectedStatus::Suspended,
            SubscriptionStatus::Cancelled => ProjectedStatus::GracePeriod,
            SubscriptionStatus::Expired => ProjectedStatus::Expired,
        }
    }
}

/// The billing facts projected onto the user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumProjection {
    pub is_premium: bool,
    pub subscription_status: ProjectedStatus,
    pub last_payment_date: Option<Timestamp>,
    pub next_payment_date: Option<Timestamp>,
    pub grace_period_end_date: Option<Timestamp>,
}

/// Free-trial window recorded on the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialState {
    pub used: bool,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

impl TrialState {
    /// Trial never started.
    pub fn unused() -> Self {
        Self {
            used: false,
            start_date: None,
            end_date: None,
        }
    }

    /// Trial window spanning `start..=end`.
    pub fn started(start: Timestamp, end: Timestamp) -> Self {
        Self {
            used: true,
            start_date: Some(start),
            end_date: Some(end),
        }
    }
}
