//! IssueBillingKeyHandler - exchange a gateway authorization code for a
//! reusable billing credential.
//!
//! Creates the subscription record lazily when the customer does not
//! have one yet, then stores the issued credential on it.

use std::sync::Arc;

use crate::domain::billing::{BillingError, HistoryEvent, HistoryEventKind, Subscription, PREMIUM_PLAN};
use crate::domain::foundation::{CustomerId, PlanId};
use crate::ports::{Clock, HistoryLogger, PaymentGateway, SubscriptionRepository};

use super::{get_or_create_subscription, map_update_error, record_history};

/// Command to issue a billing credential.
#[derive(Debug, Clone)]
pub struct IssueBillingKeyCommand {
    pub customer_id: CustomerId,

    /// One-shot authorization code from the gateway's card-registration
    /// flow.
    pub authorization_code: String,
}

/// Handler for billing-credential issuance.
pub struct IssueBillingKeyHandler {
    repository: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    history: Arc<dyn HistoryLogger>,
    clock: Arc<dyn Clock>,
}

impl IssueBillingKeyHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        history: Arc<dyn HistoryLogger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            gateway,
            history,
            clock,
        }
    }

    pub async fn handle(&self, cmd: IssueBillingKeyCommand) -> Result<Subscription, BillingError> {
        if cmd.authorization_code.trim().is_empty() {
            return Err(BillingError::validation(
                "authorization_code",
                "must not be empty",
            ));
        }
        let now = self.clock.now();

        let plan_id = PlanId::new(PREMIUM_PLAN)
            .map_err(|e| BillingError::validation("plan_id", e.to_string()))?;
        let mut subscription = get_or_create_subscription(
            &self.repository,
            &self.history,
            &cmd.customer_id,
            &plan_id,
            now,
        )
        .await?;

        let credential = self
            .gateway
            .issue_billing_credential(&cmd.customer_id, &cmd.authorization_code)
            .await
            .map_err(|err| {
                tracing::warn!(
                    customer_id = %cmd.customer_id,
                    code = %err.code,
                    "Billing credential issuance failed"
                );
                BillingError::payment_failed(err.message)
            })?;

        subscription.attach_billing_credential(credential.credential, now);
        self.repository
            .update(&subscription)
            .await
            .map_err(|e| map_update_error(subscription.id, e))?;

        tracing::info!(
            customer_id = %subscription.customer_id,
            subscription_id = %subscription.id,
            "Billing credential issued"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::BillingKeyIssued,
                subscription.customer_id.clone(),
                subscription.id,
                subscription.status,
                now,
            ),
        )
        .await;

        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{InMemoryHistoryLogger, InMemorySubscriptionRepository};
    use crate::domain::foundation::Timestamp;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    fn handler() -> (
        IssueBillingKeyHandler,
        Arc<InMemorySubscriptionRepository>,
        Arc<InMemoryHistoryLogger>,
    ) {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let log = Arc::new(InMemoryHistoryLogger::new());
        let h = IssueBillingKeyHandler::new(
            repo.clone(),
            Arc::new(MockPaymentGateway::new()),
            log.clone(),
            Arc::new(ManualClock::new(ts("2024-01-10T00:00:00Z"))),
        );
        (h, repo, log)
    }

    #[tokio::test]
    async fn issuance_creates_the_subscription_lazily_and_stores_the_key() {
        let (handler, repo, log) = handler();
        let customer = CustomerId::new("cust-1").unwrap();

        let sub = handler
            .handle(IssueBillingKeyCommand {
                customer_id: customer.clone(),
                authorization_code: "auth_123".into(),
            })
            .await
            .unwrap();

        assert_eq!(sub.billing_credential.as_deref(), Some("bk_cust-1_auth_123"));
        let stored = repo.find_by_customer(&customer).await.unwrap().unwrap();
        assert_eq!(stored.billing_credential, sub.billing_credential);

        let kinds: Vec<_> = log.entries().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                HistoryEventKind::SubscriptionCreated,
                HistoryEventKind::BillingKeyIssued,
            ]
        );
    }

    #[tokio::test]
    async fn reissuing_replaces_the_credential_without_a_second_record() {
        let (handler, repo, _log) = handler();
        let customer = CustomerId::new("cust-1").unwrap();

        let first = handler
            .handle(IssueBillingKeyCommand {
                customer_id: customer.clone(),
                authorization_code: "auth_123".into(),
            })
            .await
            .unwrap();
        let second = handler
            .handle(IssueBillingKeyCommand {
                customer_id: customer,
                authorization_code: "auth_456".into(),
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(
            second.billing_credential.as_deref(),
            Some("bk_cust-1_auth_456")
        );
        assert_eq!(repo.all().len(), 1);
    }

    #[tokio::test]
    async fn empty_authorization_code_is_rejected() {
        let (handler, _repo, _log) = handler();
        let err = handler
            .handle(IssueBillingKeyCommand {
                customer_id: CustomerId::new("cust-1").unwrap(),
                authorization_code: "  ".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::ValidationFailed { .. }));
    }
}
