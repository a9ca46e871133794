//! Mock payment gateway for tests.
//!
//! Charges succeed by default; individual customers or whole calls can
//! be scripted to fail with a chosen gateway error. Duplicate order ids
//! are rejected like the real provider does.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::CustomerId;
use crate::ports::{
    BillingCredential, ChargeRequest, GatewayError, GatewayErrorCode, GatewayReceipt,
    PaymentGateway,
};

/// Scriptable in-memory gateway.
#[derive(Default)]
pub struct MockPaymentGateway {
    next_error: Mutex<Option<GatewayError>>,
    seen_order_ids: Mutex<HashSet<String>>,
    charges: Mutex<Vec<ChargeRequest>>,
    counter: Mutex<u64>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent charge fail with `error` until cleared.
    pub fn fail_charges_with(&self, error: GatewayError) {
        *self.next_error.lock().expect("gateway lock") = Some(error);
    }

    /// Charges succeed again.
    pub fn succeed_charges(&self) {
        *self.next_error.lock().expect("gateway lock") = None;
    }

    /// Every charge request seen so far.
    pub fn charges(&self) -> Vec<ChargeRequest> {
        self.charges.lock().expect("gateway lock").clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn issue_billing_credential(
        &self,
        customer_id: &CustomerId,
        authorization_code: &str,
    ) -> Result<BillingCredential, GatewayError> {
        // Idempotent per authorization code.
        Ok(BillingCredential {
            credential: format!("bk_{}_{}", customer_id.as_str(), authorization_code),
        })
    }

    async fn charge(&self, request: ChargeRequest) -> Result<GatewayReceipt, GatewayError> {
        {
            let mut seen = self.seen_order_ids.lock().expect("gateway lock");
            if !seen.insert(request.order_id.as_str().to_string()) {
                return Err(GatewayError::new(
                    GatewayErrorCode::DuplicateOrder,
                    format!("Order id already processed: {}", request.order_id),
                ));
            }
        }

        self.charges.lock().expect("gateway lock").push(request.clone());

        if let Some(error) = self.next_error.lock().expect("gateway lock").clone() {
            return Err(error);
        }

        let mut counter = self.counter.lock().expect("gateway lock");
        *counter += 1;
        Ok(GatewayReceipt {
            payment_key: format!("pay_mock_{}", counter),
            total_amount: request.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{OrderId, PlanId, Timestamp};

    fn charge_request(order_suffix: i64) -> ChargeRequest {
        ChargeRequest {
            credential: "bk_test".to_string(),
            amount: 80_000,
            order_id: OrderId::compose(
                &CustomerId::new("cust-1").unwrap(),
                &PlanId::new("premium").unwrap(),
                Timestamp::from_unix_millis(order_suffix),
            ),
            order_name: "Homeport Premium".to_string(),
            customer_email: None,
            customer_name: None,
        }
    }

    #[tokio::test]
    async fn charge_succeeds_with_unique_payment_keys() {
        let gateway = MockPaymentGateway::new();
        let a = gateway.charge(charge_request(1)).await.unwrap();
        let b = gateway.charge(charge_request(2)).await.unwrap();
        assert_ne!(a.payment_key, b.payment_key);
        assert_eq!(a.total_amount, 80_000);
    }

    #[tokio::test]
    async fn duplicate_order_id_is_rejected() {
        let gateway = MockPaymentGateway::new();
        gateway.charge(charge_request(1)).await.unwrap();

        let err = gateway.charge(charge_request(1)).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::DuplicateOrder);
        assert!(err.is_terminal());
    }

    #[tokio::test]
    async fn scripted_failure_applies_until_cleared() {
        let gateway = MockPaymentGateway::new();
        gateway.fail_charges_with(GatewayError::insufficient_balance("no funds"));

        let err = gateway.charge(charge_request(1)).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::InsufficientBalance);

        gateway.succeed_charges();
        assert!(gateway.charge(charge_request(2)).await.is_ok());
    }

    #[tokio::test]
    async fn credential_issuance_is_deterministic_per_auth_code() {
        let gateway = MockPaymentGateway::new();
        let customer = CustomerId::new("cust-1").unwrap();
        let a = gateway
            .issue_billing_credential(&customer, "auth-1")
            .await
            .unwrap();
        let b = gateway
            .issue_billing_credential(&customer, "auth-1")
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
