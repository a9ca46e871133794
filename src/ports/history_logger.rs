//! History logger port.
//!
//! Append-only audit trail of every state transition and payment
//! outcome. Writes are fire-and-forget from the caller's point of view:
//! a failure here is logged and swallowed, never propagated into
//! billing state.

use crate::domain::billing::HistoryEvent;
use crate::domain::foundation::{CustomerId, DomainError};
use async_trait::async_trait;

/// Port for the append-only subscription history log.
#[async_trait]
pub trait HistoryLogger: Send + Sync {
    /// Append one history entry.
    ///
    /// Callers treat a failure as log-and-continue; it must not fail the
    /// billing operation itself.
    async fn record(&self, event: &HistoryEvent) -> Result<(), DomainError>;

    /// Most recent entries for a customer, newest first.
    async fn recent(
        &self,
        customer_id: &CustomerId,
        limit: u32,
    ) -> Result<Vec<HistoryEvent>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_logger_is_object_safe() {
        fn _accepts_dyn(_logger: &dyn HistoryLogger) {}
    }
}
