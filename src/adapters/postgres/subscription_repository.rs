//! PostgreSQL implementation of SubscriptionRepository.
//!
//! One row per subscription; the embedded payment history is a JSONB
//! column. Updates are compare-and-swap on the version column.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    BillingCycle, PaymentAttempt, PaymentHistory, Subscription, SubscriptionStatus, MAX_RETRIES,
};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, SubscriptionId, Timestamp};
use crate::ports::SubscriptionRepository;

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    customer_id: String,
    plan_id: String,
    plan_name: String,
    price: i64,
    status: String,
    billing_credential: Option<String>,
    billing_cycle: String,
    auto_renew: bool,
    start_date: DateTime<Utc>,
    next_billing_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    grace_period_end_date: Option<DateTime<Utc>>,
    suspended_at: Option<DateTime<Utc>>,
    last_payment_date: Option<DateTime<Utc>>,
    last_payment_attempt: Option<DateTime<Utc>>,
    retry_count: i32,
    payment_history: serde_json::Value,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = parse_status(&row.status)?;
        let billing_cycle = parse_cycle(&row.billing_cycle)?;
        let payment_history = parse_payment_history(row.payment_history)?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            customer_id: CustomerId::new(row.customer_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid customer_id: {}", e))
            })?,
            plan_id: crate::domain::foundation::PlanId::new(row.plan_id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid plan_id: {}", e))
            })?,
            plan_name: row.plan_name,
            price: row.price,
            status,
            billing_credential: row.billing_credential,
            billing_cycle,
            auto_renew: row.auto_renew,
            start_date: Timestamp::from_datetime(row.start_date),
            next_billing_date: Timestamp::from_datetime(row.next_billing_date),
            end_date: row.end_date.map(Timestamp::from_datetime),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            grace_period_end_date: row.grace_period_end_date.map(Timestamp::from_datetime),
            suspended_at: row.suspended_at.map(Timestamp::from_datetime),
            last_payment_date: row.last_payment_date.map(Timestamp::from_datetime),
            last_payment_attempt: row.last_payment_attempt.map(Timestamp::from_datetime),
            retry_count: u32::try_from(row.retry_count).map_err(|_| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid retry_count: {}", row.retry_count),
                )
            })?,
            payment_history,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    SubscriptionStatus::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )
    })
}

fn parse_cycle(s: &str) -> Result<BillingCycle, DomainError> {
    BillingCycle::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid billing_cycle value: {}", s),
        )
    })
}

fn parse_payment_history(value: serde_json::Value) -> Result<PaymentHistory, DomainError> {
    let attempts: Vec<PaymentAttempt> = serde_json::from_value(value).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid payment_history JSON: {}", e),
        )
    })?;
    Ok(PaymentHistory::from_attempts(attempts))
}

fn payment_history_json(history: &PaymentHistory) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(history).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Failed to serialize payment_history: {}", e),
        )
    })
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, customer_id, plan_id, plan_name, price, status, billing_credential,
           billing_cycle, auto_renew, start_date, next_billing_date, end_date,
           cancelled_at, grace_period_end_date, suspended_at, last_payment_date,
           last_payment_attempt, retry_count, payment_history, version,
           created_at, updated_at
    FROM subscriptions
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, customer_id, plan_id, plan_name, price, status, billing_credential,
                billing_cycle, auto_renew, start_date, next_billing_date, end_date,
                cancelled_at, grace_period_end_date, suspended_at, last_payment_date,
                last_payment_attempt, retry_count, payment_history, version,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22
            )
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.customer_id.as_str())
        .bind(subscription.plan_id.as_str())
        .bind(&subscription.plan_name)
        .bind(subscription.price)
        .bind(subscription.status.as_str())
        .bind(&subscription.billing_credential)
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.auto_renew)
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.next_billing_date.as_datetime())
        .bind(subscription.end_date.map(|t| *t.as_datetime()))
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(subscription.grace_period_end_date.map(|t| *t.as_datetime()))
        .bind(subscription.suspended_at.map(|t| *t.as_datetime()))
        .bind(subscription.last_payment_date.map(|t| *t.as_datetime()))
        .bind(subscription.last_payment_attempt.map(|t| *t.as_datetime()))
        .bind(subscription.retry_count as i32)
        .bind(payment_history_json(&subscription.payment_history)?)
        .bind(subscription.version)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_customer_id_key") {
                    return DomainError::new(
                        ErrorCode::SubscriptionExists,
                        "Customer already has a subscription",
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to save subscription: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                plan_id = $3,
                plan_name = $4,
                price = $5,
                status = $6,
                billing_credential = $7,
                billing_cycle = $8,
                auto_renew = $9,
                next_billing_date = $10,
                end_date = $11,
                cancelled_at = $12,
                grace_period_end_date = $13,
                suspended_at = $14,
                last_payment_date = $15,
                last_payment_attempt = $16,
                retry_count = $17,
                payment_history = $18,
                updated_at = $19,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.version)
        .bind(subscription.plan_id.as_str())
        .bind(&subscription.plan_name)
        .bind(subscription.price)
        .bind(subscription.status.as_str())
        .bind(&subscription.billing_credential)
        .bind(subscription.billing_cycle.as_str())
        .bind(subscription.auto_renew)
        .bind(subscription.next_billing_date.as_datetime())
        .bind(subscription.end_date.map(|t| *t.as_datetime()))
        .bind(subscription.cancelled_at.map(|t| *t.as_datetime()))
        .bind(subscription.grace_period_end_date.map(|t| *t.as_datetime()))
        .bind(subscription.suspended_at.map(|t| *t.as_datetime()))
        .bind(subscription.last_payment_date.map(|t| *t.as_datetime()))
        .bind(subscription.last_payment_attempt.map(|t| *t.as_datetime()))
        .bind(subscription.retry_count as i32)
        .bind(payment_history_json(&subscription.payment_history)?)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            // Zero rows: stale version or missing row.
            let exists: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM subscriptions WHERE id = $1")
                    .bind(subscription.id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Failed to check subscription: {}", e),
                        )
                    })?;
            if exists.is_some() {
                return Err(DomainError::new(
                    ErrorCode::ConflictDetected,
                    "Subscription was modified concurrently",
                ));
            }
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to find subscription: {}", e),
                    )
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_customer(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE customer_id = $1", SELECT_COLUMNS))
                .bind(customer_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::new(
                        ErrorCode::DatabaseError,
                        format!("Failed to find subscription: {}", e),
                    )
                })?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_due(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = 'active'
              AND auto_renew = TRUE
              AND next_billing_date <= $1
            ORDER BY next_billing_date ASC
            "#,
            SELECT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find due subscriptions: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_retry_candidates(
        &self,
        now: Timestamp,
        min_attempt_age_hours: i64,
    ) -> Result<Vec<Subscription>, DomainError> {
        let cutoff = *now.as_datetime() - Duration::hours(min_attempt_age_hours);

        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = 'suspended'
              AND retry_count < $1
              AND (last_payment_attempt IS NULL OR last_payment_attempt <= $2)
            ORDER BY last_payment_attempt ASC NULLS FIRST
            "#,
            SELECT_COLUMNS
        ))
        .bind(MAX_RETRIES as i32)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find retry candidates: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_grace_expired(&self, now: Timestamp) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE status = 'cancelled'
              AND grace_period_end_date IS NOT NULL
              AND grace_period_end_date < $1
            ORDER BY grace_period_end_date ASC
            "#,
            SELECT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find expired grace periods: {}", e),
            )
        })?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to delete subscription: {}", e),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                "Subscription not found",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_accepts_all_persisted_values() {
        for s in ["inactive", "active", "suspended", "cancelled", "expired"] {
            assert_eq!(parse_status(s).unwrap().as_str(), s);
        }
        assert!(parse_status("invalid").is_err());
    }

    #[test]
    fn parse_cycle_accepts_all_persisted_values() {
        for s in ["daily", "monthly", "quarterly", "yearly", "test_minute"] {
            assert_eq!(parse_cycle(s).unwrap().as_str(), s);
        }
        assert!(parse_cycle("weekly").is_err());
    }

    #[test]
    fn payment_history_roundtrips_through_json() {
        let mut history = PaymentHistory::new();
        history.append_success(Timestamp::now(), 80_000, "pay_1");
        history.append_failure(Timestamp::now(), "declined", 1);

        let json = payment_history_json(&history).unwrap();
        let restored = parse_payment_history(json).unwrap();
        assert_eq!(restored, history);
    }

    #[test]
    fn malformed_payment_history_is_a_database_error() {
        let err = parse_payment_history(serde_json::json!({"not": "an array"})).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
