//! ConfirmBillingHandler - customer-initiated first charge.
//!
//! Called by the API after the card-registration flow: creates the
//! subscription record when absent and runs one charge through the
//! shared charge path. Unlike the scheduler, a rejected charge here is
//! surfaced to the caller as a payment failure.

use std::sync::Arc;

use crate::domain::billing::{BillingError, Subscription, PREMIUM_PLAN};
use crate::domain::foundation::{CustomerId, PlanId};
use crate::ports::{Clock, GatewayReceipt, HistoryLogger, SubscriptionRepository};

use super::{
    get_or_create_subscription, ChargeSubscriptionCommand, ChargeSubscriptionHandler,
};

/// Command to confirm billing for a customer.
#[derive(Debug, Clone)]
pub struct ConfirmBillingCommand {
    pub customer_id: CustomerId,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
}

/// Result of a confirmed billing run.
#[derive(Debug, Clone)]
pub struct ConfirmBillingResult {
    pub subscription: Subscription,

    /// Absent when the gateway result had already been applied.
    pub receipt: Option<GatewayReceipt>,
}

/// Handler for the confirm-billing operation.
pub struct ConfirmBillingHandler {
    repository: Arc<dyn SubscriptionRepository>,
    history: Arc<dyn HistoryLogger>,
    charge: Arc<ChargeSubscriptionHandler>,
    clock: Arc<dyn Clock>,
}

impl ConfirmBillingHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        history: Arc<dyn HistoryLogger>,
        charge: Arc<ChargeSubscriptionHandler>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            history,
            charge,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmBillingCommand,
    ) -> Result<ConfirmBillingResult, BillingError> {
        let now = self.clock.now();

        let plan_id = PlanId::new(PREMIUM_PLAN)
            .map_err(|e| BillingError::validation("plan_id", e.to_string()))?;
        let subscription = get_or_create_subscription(
            &self.repository,
            &self.history,
            &cmd.customer_id,
            &plan_id,
            now,
        )
        .await?;

        let outcome = self
            .charge
            .handle(ChargeSubscriptionCommand {
                subscription_id: subscription.id,
                customer_email: cmd.customer_email,
                customer_name: cmd.customer_name,
            })
            .await?;

        if let Some(failure) = outcome.failure {
            return Err(BillingError::payment_failed(failure.message));
        }

        Ok(ConfirmBillingResult {
            subscription: outcome.subscription,
            receipt: outcome.receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::ManualClock;
    use crate::adapters::gateway::MockPaymentGateway;
    use crate::adapters::memory::{
        InMemoryHistoryLogger, InMemoryPremiumStore, InMemorySubscriptionRepository,
    };
    use crate::domain::billing::{
        find_plan, FirstChargeDiscount, StandardPricing, SubscriptionStatus,
    };
    use crate::domain::foundation::{SubscriptionId, Timestamp};
    use crate::ports::GatewayError;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    struct Fixture {
        repo: Arc<InMemorySubscriptionRepository>,
        gateway: Arc<MockPaymentGateway>,
        handler: ConfirmBillingHandler,
    }

    fn fixture() -> Fixture {
        fixture_with_pricing(Arc::new(StandardPricing))
    }

    fn fixture_with_pricing(pricing: Arc<dyn crate::domain::billing::PricingPolicy>) -> Fixture {
        let repo = Arc::new(InMemorySubscriptionRepository::new());
        let gateway = Arc::new(MockPaymentGateway::new());
        let premium = Arc::new(InMemoryPremiumStore::new());
        let log = Arc::new(InMemoryHistoryLogger::new());
        let clock = Arc::new(ManualClock::new(ts("2024-01-10T00:00:00Z")));

        let charge = Arc::new(ChargeSubscriptionHandler::new(
            repo.clone(),
            gateway.clone(),
            premium,
            log.clone(),
            pricing,
            clock.clone(),
        ));
        let handler = ConfirmBillingHandler::new(repo.clone(), log, charge, clock);

        Fixture {
            repo,
            gateway,
            handler,
        }
    }

    async fn seed_with_credential(f: &Fixture) -> CustomerId {
        let customer = CustomerId::new("cust-1").unwrap();
        let plan = find_plan(&PlanId::new(PREMIUM_PLAN).unwrap()).unwrap();
        let mut sub = crate::domain::billing::Subscription::create(
            SubscriptionId::new(),
            customer.clone(),
            plan,
            ts("2024-01-01T00:00:00Z"),
        );
        sub.attach_billing_credential("bk_test", ts("2024-01-01T00:00:00Z"));
        f.repo.save(&sub).await.unwrap();
        customer
    }

    #[tokio::test]
    async fn confirm_charges_and_returns_the_receipt() {
        let f = fixture();
        let customer = seed_with_credential(&f).await;

        let result = f
            .handler
            .handle(ConfirmBillingCommand {
                customer_id: customer,
                customer_email: Some("agent@example.com".into()),
                customer_name: None,
            })
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Active);
        assert_eq!(result.receipt.unwrap().total_amount, 80_000);
        assert_eq!(
            f.gateway.charges()[0].customer_email.as_deref(),
            Some("agent@example.com")
        );
    }

    #[tokio::test]
    async fn first_charge_discount_applies_the_minimum_charge() {
        let f = fixture_with_pricing(Arc::new(FirstChargeDiscount::default()));
        let customer = seed_with_credential(&f).await;

        let result = f
            .handler
            .handle(ConfirmBillingCommand {
                customer_id: customer,
                customer_email: None,
                customer_name: None,
            })
            .await
            .unwrap();

        // First month free, but the gateway needs a non-zero minimum.
        assert_eq!(result.receipt.unwrap().total_amount, 100);
    }

    #[tokio::test]
    async fn gateway_rejection_surfaces_as_payment_failed() {
        let f = fixture();
        let customer = seed_with_credential(&f).await;
        f.gateway
            .fail_charges_with(GatewayError::insufficient_balance("no funds"));

        let err = f
            .handler
            .handle(ConfirmBillingCommand {
                customer_id: customer,
                customer_email: None,
                customer_name: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::PaymentFailed { .. }));
    }

    #[tokio::test]
    async fn missing_credential_surfaces_as_payment_failed() {
        let f = fixture();
        // No seeded record: confirm creates one lazily, without a credential.
        let err = f
            .handler
            .handle(ConfirmBillingCommand {
                customer_id: CustomerId::new("cust-2").unwrap(),
                customer_email: None,
                customer_name: None,
            })
            .await
            .unwrap_err();

        match err {
            BillingError::PaymentFailed { reason } => {
                assert!(reason.contains("credential not issued"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The record itself was still created.
        assert_eq!(f.repo.all().len(), 1);
    }
}
