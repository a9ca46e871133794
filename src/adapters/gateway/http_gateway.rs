//! HTTP payment gateway adapter.
//!
//! Implements the `PaymentGateway` port against the provider's REST
//! API. The secret key is sent as basic auth and held in a
//! `secrecy::SecretString` so it never lands in debug output.
//!
//! Every call carries a bounded timeout; an elapsed timeout is reported
//! as a retryable payment failure, not a crash.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::domain::foundation::CustomerId;
use crate::ports::{
    BillingCredential, ChargeRequest, GatewayError, GatewayErrorCode, GatewayReceipt,
    PaymentGateway,
};

/// Gateway call timeout. An elapsed timeout counts as a failed attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Payment gateway API configuration.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Provider secret key (live_sk_... or test_sk_...).
    secret_key: SecretString,

    /// Base URL for the provider API.
    api_base_url: String,
}

impl GatewayConfig {
    pub fn new(secret_key: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            api_base_url: api_base_url.into(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// REST implementation of the `PaymentGateway` port.
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    /// Creates the adapter with its own pooled HTTP client.
    pub fn new(config: GatewayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        self.http_client
            .post(self.url(path))
            .basic_auth(self.config.secret_key.expose_secret(), Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::timeout("Gateway request timed out")
                } else {
                    GatewayError::network(format!("Gateway request failed: {}", e))
                }
            })
    }

    async fn parse_error(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        match response.json::<ProviderErrorBody>().await {
            Ok(body) => GatewayError::new(classify_provider_code(&body.code), body.message)
                .with_provider_code(body.code),
            Err(_) => GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Gateway returned HTTP {}", status),
            ),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn issue_billing_credential(
        &self,
        customer_id: &CustomerId,
        authorization_code: &str,
    ) -> Result<BillingCredential, GatewayError> {
        let response = self
            .post(
                "/v1/billing/authorizations/issue",
                json!({
                    "customerKey": customer_id.as_str(),
                    "authKey": authorization_code,
                }),
            )
            .await?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let body: IssueResponse = response.json().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Malformed issue response: {}", e),
            )
        })?;

        tracing::info!(customer_id = %customer_id, "Billing credential issued");
        Ok(BillingCredential {
            credential: body.billing_key,
        })
    }

    async fn charge(&self, request: ChargeRequest) -> Result<GatewayReceipt, GatewayError> {
        let response = self
            .post(
                &format!("/v1/billing/{}", request.credential),
                json!({
                    "amount": request.amount,
                    "orderId": request.order_id.as_str(),
                    "orderName": request.order_name,
                    "customerEmail": request.customer_email,
                    "customerName": request.customer_name,
                }),
            )
            .await?;

        if !response.status().is_success() {
            let err = Self::parse_error(response).await;
            tracing::warn!(
                order_id = %request.order_id,
                code = %err.code,
                "Gateway charge rejected"
            );
            return Err(err);
        }

        let body: ChargeResponse = response.json().await.map_err(|e| {
            GatewayError::new(
                GatewayErrorCode::ProviderError,
                format!("Malformed charge response: {}", e),
            )
        })?;

        Ok(GatewayReceipt {
            payment_key: body.payment_key,
            total_amount: body.total_amount,
        })
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    #[serde(rename = "billingKey")]
    billing_key: String,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    #[serde(rename = "paymentKey")]
    payment_key: String,
    #[serde(rename = "totalAmount")]
    total_amount: i64,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    code: String,
    message: String,
}

/// Maps the provider's error codes onto the port's classification.
fn classify_provider_code(code: &str) -> GatewayErrorCode {
    match code {
        "REQUEST_TIMEOUT" | "PROVIDER_TIMEOUT" => GatewayErrorCode::Timeout,
        "INSUFFICIENT_BALANCE" | "EXCEED_MAX_CARD_INSTALLMENT_PLAN" => {
            GatewayErrorCode::InsufficientBalance
        }
        "EXCEED_MAX_DAILY_PAYMENT_COUNT" | "EXCEED_MAX_PAYMENT_AMOUNT" => {
            GatewayErrorCode::RateLimitExceeded
        }
        "INVALID_BILL_KEY_REQUEST" | "NOT_FOUND_BILLING_KEY" | "INVALID_CARD" => {
            GatewayErrorCode::InvalidCredential
        }
        "UNAUTHORIZED_KEY" | "INVALID_API_KEY" => GatewayErrorCode::UnauthorizedKey,
        "NOT_SUPPORTED_METHOD" | "INVALID_REQUEST" => GatewayErrorCode::UnsupportedMethod,
        "ALREADY_PROCESSED_PAYMENT" | "DUPLICATED_ORDER_ID" => GatewayErrorCode::DuplicateOrder,
        _ => GatewayErrorCode::ProviderError,
    }
}
