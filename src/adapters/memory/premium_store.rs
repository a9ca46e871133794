//! In-memory implementation of PremiumStateStore.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::{PremiumProjection, ProjectedStatus, TrialState};
use crate::domain::foundation::{CustomerId, DomainError, Timestamp};
use crate::ports::{PremiumStateStore, TrialCandidate};

#[derive(Debug, Clone, Default)]
struct UserRecord {
    projection: Option<PremiumProjection>,
    trial: Option<TrialState>,
}

/// In-memory user premium projection store.
#[derive(Default)]
pub struct InMemoryPremiumStore {
    users: Mutex<HashMap<CustomerId, UserRecord>>,
}

impl InMemoryPremiumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the last projection pushed for a customer, for assertions.
    pub fn projection(&self, customer_id: &CustomerId) -> Option<PremiumProjection> {
        self.users
            .lock()
            .expect("store lock")
            .get(customer_id)
            .and_then(|u| u.projection.clone())
    }
}

#[async_trait]
impl PremiumStateStore for InMemoryPremiumStore {
    async fn project(
        &self,
        customer_id: &CustomerId,
        projection: &PremiumProjection,
    ) -> Result<(), DomainError> {
        let mut users = self.users.lock().expect("store lock");
        users.entry(customer_id.clone()).or_default().projection = Some(projection.clone());
        Ok(())
    }

    async fn trial_state(&self, customer_id: &CustomerId) -> Result<TrialState, DomainError> {
        Ok(self
            .users
            .lock()
            .expect("store lock")
            .get(customer_id)
            .and_then(|u| u.trial)
            .unwrap_or_else(TrialState::unused))
    }

    async fn record_trial(
        &self,
        customer_id: &CustomerId,
        state: TrialState,
    ) -> Result<(), DomainError> {
        let mut users = self.users.lock().expect("store lock");
        users.entry(customer_id.clone()).or_default().trial = Some(state);
        Ok(())
    }

    async fn find_expiring_trials(
        &self,
        now: Timestamp,
    ) -> Result<Vec<TrialCandidate>, DomainError> {
        Ok(self
            .users
            .lock()
            .expect("store lock")
            .iter()
            .filter_map(|(customer_id, user)| {
                let trial = user.trial?;
                let end = trial.end_date?;
                let active = user
                    .projection
                    .as_ref()
                    .map(|p| p.subscription_status == ProjectedStatus::Active)
                    .unwrap_or(false);
                (end <= now && active).then(|| TrialCandidate {
                    customer_id: customer_id.clone(),
                    trial_end_date: end,
                })
            })
            .collect())
    }
}
