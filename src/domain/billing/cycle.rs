//! Billing cycle unit and the next-billing-date calculator.
//!
//! The calculator is a pure function over calendar arithmetic. Month
//! advancement keeps the day-of-month and clamps to the last valid day
//! of the target month (Jan 31 + 1 month = Feb 28/29). Time of day is
//! preserved.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Unit of recurrence governing `next_billing_date` advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    Daily,
    Monthly,
    Quarterly,
    Yearly,

    /// Diagnostic-only unit that advances by one minute.
    /// Rejected by configuration validation in production.
    TestMinute,
}

impl BillingCycle {
    /// Returns true for the diagnostic-only cycle that must never be
    /// reachable in a production configuration.
    pub fn is_test_only(&self) -> bool {
        matches!(self, BillingCycle::TestMinute)
    }

    /// Stable string form used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Daily => "daily",
            BillingCycle::Monthly => "monthly",
            BillingCycle::Quarterly => "quarterly",
            BillingCycle::Yearly => "yearly",
            BillingCycle::TestMinute => "test_minute",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(BillingCycle::Daily),
            "monthly" => Some(BillingCycle::Monthly),
            "quarterly" => Some(BillingCycle::Quarterly),
            "yearly" => Some(BillingCycle::Yearly),
            "test_minute" => Some(BillingCycle::TestMinute),
            _ => None,
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computes the next billing instant one cycle after `current`.
///
/// Month-based cycles clamp to the last valid day of the target month,
/// so a subscription billed on the 31st bills on Feb 28 (or Feb 29 in a
/// leap year) and a Feb 29 yearly subscription bills on Feb 28 of a
/// non-leap target year.
pub fn next_billing_date(current: Timestamp, cycle: BillingCycle) -> Timestamp {
    let dt = *current.as_datetime();
    let next = match cycle {
        BillingCycle::Daily => dt + Duration::days(1),
        BillingCycle::Monthly => add_months(dt, 1),
        BillingCycle::Quarterly => add_months(dt, 3),
        BillingCycle::Yearly => add_months(dt, 12),
        BillingCycle::TestMinute => dt + Duration::minutes(1),
    };
    Timestamp::from_datetime(next)
}

/// Advances `dt` by `months` calendar months, clamping the day to the
/// last valid day of the target month and preserving time of day.
fn add_months(dt: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total = dt.year() * 12 + dt.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = dt.day().min(days_in_month(year, month));

    // Components are derived from a valid date, so this cannot fail.
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
        .unwrap_or_else(|| dt.date_naive());
    Utc.from_utc_datetime(&date.and_time(dt.time()))
}

/// Number of days in the given month.
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => unreachable!("month out of range"),
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
