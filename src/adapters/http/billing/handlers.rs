//! HTTP handlers for the subscription endpoints.
//!
//! These handlers connect Axum routes to the application layer command
//! and query handlers.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::billing::{
    get_or_create_subscription, CancelSubscriptionCommand, CancelSubscriptionHandler,
    ChargeSubscriptionHandler, ConfirmBillingCommand, ConfirmBillingHandler,
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, IssueBillingKeyCommand,
    IssueBillingKeyHandler, ReactivateSubscriptionCommand, ReactivateSubscriptionHandler,
    ResumeSubscriptionCommand, ResumeSubscriptionHandler, StartFreeTrialCommand,
    StartFreeTrialHandler, SuspendSubscriptionCommand, SuspendSubscriptionHandler,
};
use crate::domain::billing::{BillingError, PricingPolicy, PREMIUM_PLAN};
use crate::domain::foundation::{CustomerId, PlanId};
use crate::ports::{
    Clock, HistoryLogger, PaymentGateway, PremiumStateStore, SubscriptionRepository,
};

use super::dto::{
    ApiResponse, ConfirmBillingRequest, ConfirmBillingResponse, IssueBillingKeyRequest,
    ReceiptResponse, StatusResponse, SubscriptionResponse, SuspendRequest,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all billing dependencies.
///
/// Cloned per request; everything inside is Arc-wrapped.
#[derive(Clone)]
pub struct BillingAppState {
    pub repository: Arc<dyn SubscriptionRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub premium_store: Arc<dyn PremiumStateStore>,
    pub history: Arc<dyn HistoryLogger>,
    pub pricing: Arc<dyn PricingPolicy>,
    pub clock: Arc<dyn Clock>,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn start_free_trial_handler(&self) -> StartFreeTrialHandler {
        StartFreeTrialHandler::new(
            self.repository.clone(),
            self.premium_store.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.repository.clone(),
            self.premium_store.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
    }

    pub fn reactivate_handler(&self) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(
            self.repository.clone(),
            self.premium_store.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
    }

    pub fn suspend_handler(&self) -> SuspendSubscriptionHandler {
        SuspendSubscriptionHandler::new(
            self.repository.clone(),
            self.premium_store.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
    }

    pub fn resume_handler(&self) -> ResumeSubscriptionHandler {
        ResumeSubscriptionHandler::new(
            self.repository.clone(),
            self.premium_store.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
    }

    pub fn issue_billing_key_handler(&self) -> IssueBillingKeyHandler {
        IssueBillingKeyHandler::new(
            self.repository.clone(),
            self.gateway.clone(),
            self.history.clone(),
            self.clock.clone(),
        )
    }

    pub fn charge_handler(&self) -> Arc<ChargeSubscriptionHandler> {
        Arc::new(ChargeSubscriptionHandler::new(
            self.repository.clone(),
            self.gateway.clone(),
            self.premium_store.clone(),
            self.history.clone(),
            self.pricing.clone(),
            self.clock.clone(),
        ))
    }

    pub fn confirm_billing_handler(&self) -> ConfirmBillingHandler {
        ConfirmBillingHandler::new(
            self.repository.clone(),
            self.history.clone(),
            self.charge_handler(),
            self.clock.clone(),
        )
    }

    pub fn status_handler(&self) -> GetSubscriptionStatusHandler {
        GetSubscriptionStatusHandler::new(
            self.repository.clone(),
            self.premium_store.clone(),
            self.history.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Customer Context (would come from auth middleware in production)
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated customer context extracted from the request.
///
/// The CRM fronts this service and forwards the caller's identity in
/// the `X-Customer-Id` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedCustomer {
    pub customer_id: CustomerId,
}

/// Rejection type for AuthenticatedCustomer extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let body = ApiResponse::error("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedCustomer
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let customer_id = parts
                .headers
                .get("X-Customer-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| CustomerId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedCustomer { customer_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscription/free-trial/start - Start the one-time free trial
pub async fn start_free_trial(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.start_free_trial_handler();
    let cmd = StartFreeTrialCommand {
        customer_id: customer.customer_id,
    };

    let subscription = handler.handle(cmd).await?;

    let body = ApiResponse::ok(
        SubscriptionResponse::from(&subscription),
        "Free trial started",
    );
    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /subscription/subscriptions - Ensure a premium subscription record
pub async fn create_subscription(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
) -> Result<impl IntoResponse, BillingApiError> {
    let now = state.clock.now();
    let plan_id = PlanId::new(PREMIUM_PLAN)
        .map_err(|e| BillingError::validation("plan_id", e.to_string()))?;

    let subscription = get_or_create_subscription(
        &state.repository,
        &state.history,
        &customer.customer_id,
        &plan_id,
        now,
    )
    .await?;

    let body = ApiResponse::ok(
        SubscriptionResponse::from(&subscription),
        "Subscription ready",
    );
    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /subscription/cancel - Cancel at period end with a grace period
pub async fn cancel_subscription(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.cancel_handler();
    let cmd = CancelSubscriptionCommand {
        customer_id: customer.customer_id,
    };

    let subscription = handler.handle(cmd).await?;

    let body = ApiResponse::ok(
        SubscriptionResponse::from(&subscription),
        "Subscription cancelled",
    );
    Ok(Json(body))
}

/// POST /subscription/reactivate - Undo a cancellation inside the window
pub async fn reactivate_subscription(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.reactivate_handler();
    let cmd = ReactivateSubscriptionCommand {
        customer_id: customer.customer_id,
    };

    let subscription = handler.handle(cmd).await?;

    let body = ApiResponse::ok(
        SubscriptionResponse::from(&subscription),
        "Subscription reactivated",
    );
    Ok(Json(body))
}

/// POST /subscription/suspend - Pause billing for an active subscription
pub async fn suspend_subscription(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<SuspendRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.suspend_handler();
    let cmd = SuspendSubscriptionCommand {
        customer_id: customer.customer_id,
        reason: request.reason,
    };

    let subscription = handler.handle(cmd).await?;

    let body = ApiResponse::ok(
        SubscriptionResponse::from(&subscription),
        "Subscription suspended",
    );
    Ok(Json(body))
}

/// POST /subscription/resume - Resume a suspended subscription
pub async fn resume_subscription(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.resume_handler();
    let cmd = ResumeSubscriptionCommand {
        customer_id: customer.customer_id,
    };

    let subscription = handler.handle(cmd).await?;

    let body = ApiResponse::ok(
        SubscriptionResponse::from(&subscription),
        "Subscription resumed",
    );
    Ok(Json(body))
}

/// POST /subscription/issue-billing-key - Register a billing credential
pub async fn issue_billing_key(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<IssueBillingKeyRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.issue_billing_key_handler();
    let cmd = IssueBillingKeyCommand {
        customer_id: customer.customer_id,
        authorization_code: request.auth_key,
    };

    let subscription = handler.handle(cmd).await?;

    let body = ApiResponse::ok(
        SubscriptionResponse::from(&subscription),
        "Billing key issued",
    );
    Ok(Json(body))
}

/// POST /subscription/confirm-billing - First charge after credential issuance
pub async fn confirm_billing(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<ConfirmBillingRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.confirm_billing_handler();
    let cmd = ConfirmBillingCommand {
        customer_id: customer.customer_id,
        customer_email: request.customer_email,
        customer_name: request.customer_name,
    };

    let result = handler.handle(cmd).await?;

    let response = ConfirmBillingResponse {
        subscription: SubscriptionResponse::from(&result.subscription),
        receipt: result.receipt.as_ref().map(ReceiptResponse::from),
    };
    let body = ApiResponse::ok(response, "Billing confirmed");
    Ok(Json(body))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /subscription/status - Subscription, projection, trial, history
pub async fn get_subscription_status(
    State(state): State<BillingAppState>,
    customer: AuthenticatedCustomer,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.status_handler();
    let query = GetSubscriptionStatusQuery {
        customer_id: customer.customer_id,
    };

    let view = handler.handle(query).await?;

    let body = ApiResponse::ok(StatusResponse::from(&view), "OK");
    Ok(Json(body))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl From<crate::domain::foundation::DomainError> for BillingApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self(BillingError::infrastructure(err.to_string()))
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code) = match &self.0 {
            BillingError::NotFound(_) | BillingError::NotFoundForCustomer(_) => {
                (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND")
            }
            BillingError::PlanNotFound(_) => (StatusCode::NOT_FOUND, "PLAN_NOT_FOUND"),
            BillingError::IllegalTransition { .. } => {
                (StatusCode::BAD_REQUEST, "ILLEGAL_TRANSITION")
            }
            BillingError::ReactivationWindowClosed { .. } => {
                (StatusCode::BAD_REQUEST, "REACTIVATION_WINDOW_CLOSED")
            }
            BillingError::FreeTrialAlreadyUsed(_) => {
                (StatusCode::BAD_REQUEST, "FREE_TRIAL_ALREADY_USED")
            }
            BillingError::CredentialMissing(_) => {
                (StatusCode::BAD_REQUEST, "BILLING_KEY_MISSING")
            }
            BillingError::ValidationFailed { .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED")
            }
            BillingError::PaymentFailed { .. } => {
                (StatusCode::PAYMENT_REQUIRED, "PAYMENT_FAILED")
            }
            BillingError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT_DETECTED"),
            BillingError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ApiResponse::error(error_code, self.0.message());
        (status, Json(body)).into_response()
    }
}
