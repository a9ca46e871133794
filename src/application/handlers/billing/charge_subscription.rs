//! ChargeSubscriptionHandler - one payment attempt against a subscription.
//!
//! The single charge path shared by the renewal job, the retry job, and
//! the confirm-billing endpoint. It re-reads the aggregate, computes
//! the amount through the pricing policy, composes a per-attempt order
//! id (the gateway's duplicate-order rejection is the double-charge
//! guard), charges the stored credential, and applies the outcome to
//! the state machine.
//!
//! A missing billing credential is a hard failure for the record: no
//! gateway call is made, but the attempt is still counted and the
//! record suspends.

use std::sync::Arc;

use crate::domain::billing::{
    BillingError, ChargeReceipt, HistoryEvent, HistoryEventKind, PaymentApplied, PricingPolicy,
    Subscription,
};
use crate::domain::foundation::{OrderId, SubscriptionId};
use crate::ports::{
    ChargeRequest, Clock, GatewayError, GatewayReceipt, HistoryLogger, PaymentGateway,
    PremiumStateStore, SubscriptionRepository,
};

use super::{map_update_error, record_history};

/// Command to attempt one charge.
#[derive(Debug, Clone)]
pub struct ChargeSubscriptionCommand {
    pub subscription_id: SubscriptionId,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
}

impl ChargeSubscriptionCommand {
    pub fn new(subscription_id: SubscriptionId) -> Self {
        Self {
            subscription_id,
            customer_email: None,
            customer_name: None,
        }
    }
}

/// Outcome of one charge attempt, successful or not.
///
/// A rejected charge is a normal outcome here, not an error: the error
/// channel is reserved for transition and persistence failures.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    pub subscription: Subscription,
    pub applied: PaymentApplied,
    pub receipt: Option<GatewayReceipt>,
    pub failure: Option<GatewayError>,
}

impl ChargeOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Handler for a single payment attempt.
pub struct ChargeSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    premium_store: Arc<dyn PremiumStateStore>,
    history: Arc<dyn HistoryLogger>,
    pricing: Arc<dyn PricingPolicy>,
    clock: Arc<dyn Clock>,
}

impl ChargeSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        premium_store: Arc<dyn PremiumStateStore>,
        history: Arc<dyn HistoryLogger>,
        pricing: Arc<dyn PricingPolicy>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            gateway,
            premium_store,
            history,
            pricing,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: ChargeSubscriptionCommand,
    ) -> Result<ChargeOutcome, BillingError> {
        let now = self.clock.now();

        // Fresh read: the caller's snapshot may be stale by the time the
        // attempt runs.
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?
            .ok_or_else(|| BillingError::not_found(cmd.subscription_id))?;

        // No credential: no gateway call, but the attempt counts.
        let credential = match subscription.billing_credential.clone() {
            Some(credential) => credential,
            None => {
                let failure =
                    GatewayError::invalid_credential("Billing credential not issued");
                let applied =
                    subscription.apply_payment_failure(&failure.message, true, now)?;
                self.persist(&subscription).await?;
                self.record_failure(&subscription, &failure, applied, None).await;
                return Ok(ChargeOutcome {
                    subscription,
                    applied,
                    receipt: None,
                    failure: Some(failure),
                });
            }
        };

        let amount = self.pricing.charge_amount(&subscription);
        let order_id = OrderId::compose(&subscription.customer_id, &subscription.plan_id, now);

        let result = self
            .gateway
            .charge(ChargeRequest {
                credential,
                amount,
                order_id: order_id.clone(),
                order_name: subscription.plan_name.clone(),
                customer_email: cmd.customer_email,
                customer_name: cmd.customer_name,
            })
            .await;

        match result {
            Ok(receipt) => {
                let applied = subscription.apply_payment_success(
                    &ChargeReceipt {
                        payment_key: receipt.payment_key.clone(),
                        amount: receipt.total_amount,
                    },
                    now,
                )?;
                self.persist(&subscription).await?;

                if applied == PaymentApplied::Duplicate {
                    tracing::info!(
                        subscription_id = %subscription.id,
                        payment_key = %receipt.payment_key,
                        "Gateway result already applied; skipping"
                    );
                } else {
                    tracing::info!(
                        subscription_id = %subscription.id,
                        amount = receipt.total_amount,
                        order_id = %order_id,
                        "Payment succeeded"
                    );
                    record_history(
                        &self.history,
                        HistoryEvent::new(
                            HistoryEventKind::PaymentSuccess,
                            subscription.customer_id.clone(),
                            subscription.id,
                            subscription.status,
                            now,
                        )
                        .with_amount(receipt.total_amount)
                        .with_metadata(serde_json::json!({
                            "order_id": order_id.as_str(),
                            "payment_key": receipt.payment_key,
                        })),
                    )
                    .await;
                }

                Ok(ChargeOutcome {
                    subscription,
                    applied,
                    receipt: Some(receipt),
                    failure: None,
                })
            }
            Err(failure) => {
                let applied = subscription.apply_payment_failure(
                    &failure.message,
                    failure.is_terminal(),
                    now,
                )?;
                self.persist(&subscription).await?;
                self.record_failure(&subscription, &failure, applied, Some(&order_id))
                    .await;

                Ok(ChargeOutcome {
                    subscription,
                    applied,
                    receipt: None,
                    failure: Some(failure),
                })
            }
        }
    }

    /// Persists the aggregate and pushes the premium projection.
    async fn persist(&self, subscription: &Subscription) -> Result<(), BillingError> {
        self.repository
            .update(subscription)
            .await
            .map_err(|e| map_update_error(subscription.id, e))?;
        self.premium_store
            .project(&subscription.customer_id, &subscription.premium_projection())
            .await
            .map_err(|e| BillingError::infrastructure(e.to_string()))?;
        Ok(())
    }

    async fn record_failure(
        &self,
        subscription: &Subscription,
        failure: &GatewayError,
        applied: PaymentApplied,
        order_id: Option<&OrderId>,
    ) {
        tracing::warn!(
            subscription_id = %subscription.id,
            retry_count = subscription.retry_count,
            code = %failure.code,
            "Payment failed"
        );
        record_history(
            &self.history,
            HistoryEvent::new(
                HistoryEventKind::PaymentFailed,
                subscription.customer_id.clone(),
                subscription.id,
                subscription.status,
                subscription.last_payment_attempt.unwrap_or(self.clock.now()),
            )
            .with_amount(subscription.price)
            .with_error(failure.message.clone())
            .with_metadata(serde_json::json!({
                "gateway_code": failure.code.to_string(),
                "retry_count": subscription.retry_count,
                "order_id": order_id.map(|o| o.as_str().to_string()),
            })),
        )
        .await;

        if applied == PaymentApplied::Suspended {
            record_history(
                &self.history,
                HistoryEvent::new(
                    HistoryEventKind::SubscriptionSuspended,
                    subscription.customer_id.clone(),
                    subscription.id,
                    subscription.status,
                    subscription.suspended_at.unwrap_or(self.clock.now()),
                )
                .with_error(failure.message.clone()),
            )
            .await;
        }
    }
}
