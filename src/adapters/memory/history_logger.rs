//! In-memory implementation of HistoryLogger.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::billing::HistoryEvent;
use crate::domain::foundation::{CustomerId, DomainError, ErrorCode};
use crate::ports::HistoryLogger;

/// In-memory append-only history log.
#[derive(Default)]
pub struct InMemoryHistoryLogger {
    entries: Mutex<Vec<HistoryEvent>>,
    fail_writes: bool,
}

impl InMemoryHistoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A logger whose writes always fail, for verifying that history
    /// failures never affect billing state.
    pub fn failing() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    /// All recorded entries, oldest first.
    pub fn entries(&self) -> Vec<HistoryEvent> {
        self.entries.lock().expect("log lock").clone()
    }
}

#[async_trait]
impl HistoryLogger for InMemoryHistoryLogger {
    async fn record(&self, event: &HistoryEvent) -> Result<(), DomainError> {
        if self.fail_writes {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Simulated history write failure",
            ));
        }
        self.entries.lock().expect("log lock").push(event.clone());
        Ok(())
    }

    async fn recent(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<HistoryEvent>, DomainError> {
        let entries = self.entries.lock().expect("log lock");
        Ok(entries
            .iter()
            .rev()
            .filter(|e| &e.customer_id == customer_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
