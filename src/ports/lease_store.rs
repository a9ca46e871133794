//! Job lease port.
//!
//! A scheduler job acquires a named lease before its body executes and
//! releases it on completion. The lease carries a TTL so a crashed
//! holder cannot wedge the job forever, and because it is persisted, it
//! holds across multiple instances of the service - an in-process flag
//! would not.

use crate::domain::foundation::{DomainError, Timestamp};
use async_trait::async_trait;
use std::time::Duration;

/// A held lease on a named job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub job: String,
    pub holder: String,
    pub expires_at: Timestamp,
}

/// Port for the persisted job lease.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Try to acquire the lease for `job`.
    ///
    /// Returns the lease when acquired, `None` when another holder owns
    /// an unexpired lease. An expired lease may be taken over.
    async fn acquire(
        &self,
        job: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, DomainError>;

    /// Release a held lease.
    ///
    /// Releasing a lease owned by someone else is a no-op.
    async fn release(&self, job: &str, holder: &str) -> Result<(), DomainError>;
}
