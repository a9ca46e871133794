//! PostgreSQL implementation of PremiumStateStore.
//!
//! The projection lives as denormalized columns on the CRM's `users`
//! table; the billing service only ever touches these columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::billing::{PremiumProjection, ProjectedStatus, TrialState};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, Timestamp};
use crate::ports::{PremiumStateStore, TrialCandidate};

/// PostgreSQL implementation of the PremiumStateStore port.
pub struct PostgresPremiumStore {
    pool: PgPool,
}

impl PostgresPremiumStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_projected_status(s: &str) -> Result<ProjectedStatus, DomainError> {
    ProjectedStatus::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription_status value: {}", s),
        )
    })
}

#[derive(Debug, sqlx::FromRow)]
struct TrialRow {
    free_trial_used: bool,
    free_trial_start_date: Option<DateTime<Utc>>,
    free_trial_end_date: Option<DateTime<Utc>>,
}

impl From<TrialRow> for TrialState {
    fn from(row: TrialRow) -> Self {
        TrialState {
            used: row.free_trial_used,
            start_date: row.free_trial_start_date.map(Timestamp::from_datetime),
            end_date: row.free_trial_end_date.map(Timestamp::from_datetime),
        }
    }
}

#[async_trait]
impl PremiumStateStore for PostgresPremiumStore {
    async fn project(
        &self,
        customer_id: &CustomerId,
        projection: &PremiumProjection,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                is_premium = $2,
                subscription_status = $3,
                last_payment_date = $4,
                next_payment_date = $5,
                grace_period_end_date = $6,
                updated_at = NOW()
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id.as_str())
        .bind(projection.is_premium)
        .bind(projection.subscription_status.as_str())
        .bind(projection.last_payment_date.map(|t| *t.as_datetime()))
        .bind(projection.next_payment_date.map(|t| *t.as_datetime()))
        .bind(projection.grace_period_end_date.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to project premium state: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::CustomerNotFound,
                format!("No user record for customer {}", customer_id),
            ));
        }

        Ok(())
    }

    async fn trial_state(&self, customer_id: &CustomerId) -> Result<TrialState, DomainError> {
        let row: Option<TrialRow> = sqlx::query_as(
            r#"
            SELECT free_trial_used, free_trial_start_date, free_trial_end_date
            FROM users
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to read trial state: {}", e),
            )
        })?;

        Ok(row.map(TrialState::from).unwrap_or_else(TrialState::unused))
    }

    async fn record_trial(
        &self,
        customer_id: &CustomerId,
        state: TrialState,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                free_trial_used = $2,
                free_trial_start_date = $3,
                free_trial_end_date = $4,
                updated_at = NOW()
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id.as_str())
        .bind(state.used)
        .bind(state.start_date.map(|t| *t.as_datetime()))
        .bind(state.end_date.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record trial: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::CustomerNotFound,
                format!("No user record for customer {}", customer_id),
            ));
        }

        Ok(())
    }

    async fn find_expiring_trials(
        &self,
        now: Timestamp,
    ) -> Result<Vec<TrialCandidate>, DomainError> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT customer_id, free_trial_end_date
            FROM users
            WHERE free_trial_used = TRUE
              AND free_trial_end_date IS NOT NULL
              AND free_trial_end_date <= $1
              AND subscription_status = 'active'
            ORDER BY free_trial_end_date ASC
            "#,
        )
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find expiring trials: {}", e),
            )
        })?;

        rows.into_iter()
            .map(|(customer_id, end)| {
                Ok(TrialCandidate {
                    customer_id: CustomerId::new(customer_id).map_err(|e| {
                        DomainError::new(
                            ErrorCode::DatabaseError,
                            format!("Invalid customer_id: {}", e),
                        )
                    })?,
                    trial_end_date: Timestamp::from_datetime(end),
                })
            })
            .collect()
    }
}
