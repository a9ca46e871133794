//! In-memory implementation of LeaseStore.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{Clock, Lease, LeaseStore};

/// In-memory TTL lease store.
///
/// Expiry is evaluated against the injected clock, so lease takeover is
/// testable on virtual time.
pub struct InMemoryLeaseStore {
    clock: Arc<dyn Clock>,
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryLeaseStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            leases: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn acquire(
        &self,
        job: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<Option<Lease>, DomainError> {
        let now = self.clock.now();
        let mut leases = self.leases.lock().expect("lease lock");

        if let Some(existing) = leases.get(job) {
            if existing.holder != holder && existing.expires_at > now {
                return Ok(None);
            }
        }

        let lease = Lease {
            job: job.to_string(),
            holder: holder.to_string(),
            expires_at: Timestamp::from_datetime(
                *now.as_datetime() + chrono::Duration::from_std(ttl).unwrap_or_default(),
            ),
        };
        leases.insert(job.to_string(), lease.clone());
        Ok(Some(lease))
    }

    async fn release(&self, job: &str, holder: &str) -> Result<(), DomainError> {
        let mut leases = self.leases.lock().expect("lease lock");
        if leases.get(job).map(|l| l.holder == holder).unwrap_or(false) {
            leases.remove(job);
        }
        Ok(())
    }
}
