//! PostgreSQL implementation of HistoryLogger.
//!
//! Entries go into the append-only `subscription_history` table. There
//! are no updates or deletes on this table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{HistoryEvent, HistoryEventKind, SubscriptionStatus};
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode, SubscriptionId, Timestamp};
use crate::ports::HistoryLogger;

/// PostgreSQL implementation of the HistoryLogger port.
pub struct PostgresHistoryLogger {
    pool: PgPool,
}

impl PostgresHistoryLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    kind: String,
    customer_id: String,
    subscription_id: Uuid,
    status: String,
    amount: Option<i64>,
    error: Option<String>,
    metadata: serde_json::Value,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for HistoryEvent {
    type Error = DomainError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let kind = HistoryEventKind::parse(&row.kind).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid history event kind: {}", row.kind),
            )
        })?;
        let status = SubscriptionStatus::parse(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid subscription status: {}", row.status),
            )
        })?;
        let customer_id = CustomerId::new(row.customer_id).map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid customer_id: {}", e),
            )
        })?;

        Ok(HistoryEvent {
            kind,
            customer_id,
            subscription_id: SubscriptionId::from_uuid(row.subscription_id),
            status,
            amount: row.amount,
            error: row.error,
            metadata: row.metadata,
            occurred_at: Timestamp::from_datetime(row.occurred_at),
        })
    }
}

#[async_trait]
impl HistoryLogger for PostgresHistoryLogger {
    async fn record(&self, event: &HistoryEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscription_history (
                kind, customer_id, subscription_id, status,
                amount, error, metadata, occurred_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.kind.as_str())
        .bind(event.customer_id.as_str())
        .bind(event.subscription_id.as_uuid())
        .bind(event.status.as_str())
        .bind(event.amount)
        .bind(event.error.as_deref())
        .bind(&event.metadata)
        .bind(event.occurred_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record history event: {}", e),
            )
        })?;

        Ok(())
    }

    async fn recent(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<HistoryEvent>, DomainError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT kind, customer_id, subscription_id, status,
                   amount, error, metadata, occurred_at
            FROM subscription_history
            WHERE customer_id = $1
            ORDER BY occurred_at DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to fetch history: {}", e),
            )
        })?;

        rows.into_iter().map(HistoryEvent::try_from).collect()
    }
}
