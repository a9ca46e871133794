//! PostgreSQL implementation of LeaseStore.
//!
//! One row per job in `job_leases`. Acquisition is a single upsert so
//! two instances racing for the same job resolve inside the database.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use std::time::Duration;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{Lease, LeaseStore};

/// PostgreSQL implementation of the LeaseStore port.
pub struct PostgresLeaseStore {
    pool: PgPool,
}

impl PostgresLeaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ttl_to_chrono(ttl: Duration) -> Result<ChronoDuration, DomainError> {
    ChronoDuration::from_std(ttl).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Lease TTL out of range: {}", e),
        )
    })
}

#[async_trait]
impl LeaseStore for PostgresLeaseStore {
    async fn acquire(
        &self,
        job: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, DomainError> {
        let now = Utc::now();
        let expires_at = now + ttl_to_chrono(ttl)?;

        // The WHERE on the conflict arm only lets the upsert through when
        // the existing lease has expired or we already hold it.
        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            INSERT INTO job_leases (job, holder, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (job) DO UPDATE
            SET holder = EXCLUDED.holder, expires_at = EXCLUDED.expires_at
            WHERE job_leases.expires_at <= $4
               OR job_leases.holder = EXCLUDED.holder
            RETURNING expires_at
            "#,
        )
        .bind(job)
        .bind(holder)
        .bind(expires_at)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to acquire lease for {}: {}", job, e),
            )
        })?;

        Ok(row.map(|(expires_at,)| Lease {
            job: job.to_string(),
            holder: holder.to_string(),
            expires_at: Timestamp::from_datetime(expires_at),
        }))
    }

    async fn release(&self, job: &str, holder: &str) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM job_leases WHERE job = $1 AND holder = $2")
            .bind(job)
            .bind(holder)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to release lease for {}: {}", job, e),
                )
            })?;

        Ok(())
    }
}
