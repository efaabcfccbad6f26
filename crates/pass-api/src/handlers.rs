//! # Request Handlers
//!
//! Axum request handlers for the payment API.
//! Each handler validates a few fields, makes one or two provider calls and
//! maps the outcome to a status code.

use crate::gateway::{ProcessingResult, RawWebhookRequest};
use crate::state::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use pass_core::{
    Amount, CheckoutMode, Customer, PaymentError, Refund, RefundRequest, Subscription,
    WebhookError,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

/// Largest webhook body read into memory
const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Amount as clients send it: a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    /// Zero and the empty string count as not provided
    fn is_blank(&self) -> bool {
        match self {
            AmountInput::Number(n) => *n == 0.0,
            AmountInput::Text(s) => s.trim().is_empty(),
        }
    }

    /// Unparseable text becomes NaN and fails amount validation
    fn major_units(&self) -> f64 {
        match self {
            AmountInput::Number(n) => *n,
            AmountInput::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        }
    }
}

/// One-time checkout request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeCheckoutRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Subscription checkout request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCheckoutRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub safe_monthly_amount: Option<AmountInput>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Checkout response
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    /// Hosted checkout page; empty if the provider returned none
    pub url: String,
}

/// Subscription id as query string or body field
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionIdRequest {
    #[serde(default)]
    pub subscription_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Subscription,
}

#[derive(Debug, Serialize)]
pub struct CancelSubscriptionResponse {
    pub canceled: Subscription,
}

/// Refund request; no amount (or zero) refunds in full
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundPaymentRequest {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub amount: Option<AmountInput>,
}

#[derive(Debug, Serialize)]
pub struct RefundResponse {
    pub refund: Refund,
}

/// Webhook acknowledgment
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

fn payment_error_to_response(err: PaymentError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    // Provider internals stay in the logs
    let message = if status.is_server_error() {
        "Internal server error".to_string()
    } else {
        err.to_string()
    };
    (status, Json(ErrorResponse::new(message)))
}

fn rejection_to_response(message: &str, details: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message).with_details(details)),
    )
}

fn json_rejection_to_response(rejection: JsonRejection) -> ApiError {
    rejection_to_response("Invalid JSON body", rejection.body_text())
}

fn method_not_allowed(allow: Method) -> Response {
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse::new("Method not allowed")),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(allow.as_str()) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "cashflow-pass",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Fallback for POST-only routes
pub async fn post_only() -> Response {
    method_not_allowed(Method::POST)
}

/// Fallback for GET-only routes
pub async fn get_only() -> Response {
    method_not_allowed(Method::GET)
}

/// Create a one-time payment checkout session
#[instrument(skip(state, payload))]
pub async fn create_one_time_checkout(
    State(state): State<AppState>,
    payload: Result<Json<OneTimeCheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    let fields = CheckoutFields::validate(
        request.email,
        request.amount,
        request.success_url,
        request.cancel_url,
    )
    .ok_or_else(|| bad_request("Missing required fields: email, amount, successUrl, cancelUrl"))?;

    let amount = Amount::from_major_units(fields.amount.major_units(), state.catalog.currency)
        .map_err(|_| bad_request("Invalid amount value"))?;

    create_checkout(&state, CheckoutMode::Payment, fields, amount)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Error creating one-time checkout: {}", e);
            payment_error_to_response(e)
        })
}

/// Create a recurring (monthly) payment checkout session
#[instrument(skip(state, payload))]
pub async fn create_subscription_checkout(
    State(state): State<AppState>,
    payload: Result<Json<SubscriptionCheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    let fields = CheckoutFields::validate(
        request.email,
        request.safe_monthly_amount,
        request.success_url,
        request.cancel_url,
    )
    .ok_or_else(|| {
        bad_request("Missing required fields: email, safeMonthlyAmount, successUrl, cancelUrl")
    })?;

    let amount = Amount::from_major_units(fields.amount.major_units(), state.catalog.currency)
        .map_err(|_| bad_request("Invalid safeMonthlyAmount value"))?;

    create_checkout(&state, CheckoutMode::Subscription, fields, amount)
        .await
        .map(Json)
        .map_err(|e| {
            error!("Error creating subscription checkout: {}", e);
            payment_error_to_response(e)
        })
}

/// Validated checkout input
struct CheckoutFields {
    email: String,
    amount: AmountInput,
    success_url: String,
    cancel_url: String,
}

impl CheckoutFields {
    /// `None` if any field is missing or blank
    fn validate(
        email: Option<String>,
        amount: Option<AmountInput>,
        success_url: Option<String>,
        cancel_url: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            email: non_blank(email)?,
            amount: amount.filter(|a| !a.is_blank())?,
            success_url: non_blank(success_url)?,
            cancel_url: non_blank(cancel_url)?,
        })
    }
}

/// Shared checkout flow: resolve the customer, then open a session
async fn create_checkout(
    state: &AppState,
    mode: CheckoutMode,
    fields: CheckoutFields,
    amount: Amount,
) -> Result<CheckoutResponse, PaymentError> {
    let customer: Customer = state.provider.find_or_create_customer(&fields.email).await?;

    let request = state.catalog.checkout_request(
        mode,
        customer.id,
        amount,
        fields.success_url,
        fields.cancel_url,
    );
    let session = state.provider.create_checkout_session(&request).await?;

    info!(
        "Created {} checkout session: {}",
        mode.as_str(),
        session.id
    );

    Ok(CheckoutResponse {
        url: session.url.unwrap_or_default(),
    })
}

/// Retrieve a subscription by id
#[instrument(skip(state, query))]
pub async fn get_subscription(
    State(state): State<AppState>,
    query: Result<Query<SubscriptionIdRequest>, QueryRejection>,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let Query(request) =
        query.map_err(|e| rejection_to_response("Invalid query", e.body_text()))?;
    let subscription_id =
        non_blank(request.subscription_id).ok_or_else(|| bad_request("Missing subscriptionId"))?;

    let subscription = state
        .provider
        .retrieve_subscription(&subscription_id)
        .await
        .map_err(|e| {
            error!("Error retrieving subscription: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(Json(SubscriptionResponse { subscription }))
}

/// Cancel a subscription immediately
#[instrument(skip(state, payload))]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    payload: Result<Json<SubscriptionIdRequest>, JsonRejection>,
) -> Result<Json<CancelSubscriptionResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;
    let subscription_id =
        non_blank(request.subscription_id).ok_or_else(|| bad_request("Missing subscriptionId"))?;

    let canceled = state
        .provider
        .cancel_subscription(&subscription_id)
        .await
        .map_err(|e| {
            error!("Cancel subscription error: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(Json(CancelSubscriptionResponse { canceled }))
}

/// Refund a payment, fully or partially
#[instrument(skip(state, payload))]
pub async fn refund_payment(
    State(state): State<AppState>,
    payload: Result<Json<RefundPaymentRequest>, JsonRejection>,
) -> Result<Json<RefundResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;
    let payment_intent_id = non_blank(request.payment_intent_id)
        .ok_or_else(|| bad_request("Missing paymentIntentId"))?;

    let amount = match request.amount.filter(|a| !a.is_blank()) {
        Some(input) => Some(
            Amount::from_major_units(input.major_units(), state.catalog.currency)
                .map_err(|_| bad_request("Invalid amount value"))?
                .minor_units(),
        ),
        None => None,
    };

    let refund = state
        .provider
        .create_refund(&RefundRequest {
            payment_intent_id,
            amount,
        })
        .await
        .map_err(|e| {
            error!("Error creating refund: {}", e);
            payment_error_to_response(e)
        })?;

    Ok(Json(RefundResponse { refund }))
}

/// Handle Stripe webhook deliveries.
///
/// The body is read only after the method check, as raw bytes.
#[instrument(skip(state, headers, body))]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Response {
    if let Err(rejection) = state.gateway.check_method(&method) {
        return webhook_response(ProcessingResult::Rejected(rejection));
    }

    let body = match to_bytes(body, MAX_WEBHOOK_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Failed to read webhook body: {}", e);
            return webhook_response(ProcessingResult::Rejected(WebhookError::SignatureInvalid(
                "Unable to read request body".to_string(),
            )));
        }
    };

    let request = RawWebhookRequest::from_parts(&headers, body);
    webhook_response(state.gateway.handle(&method, request).await)
}

fn webhook_response(result: ProcessingResult) -> Response {
    match result {
        ProcessingResult::Accepted(_) => {
            (StatusCode::OK, Json(WebhookAck { received: true })).into_response()
        }
        ProcessingResult::Rejected(WebhookError::MethodNotAllowed) => {
            method_not_allowed(Method::POST)
        }
        ProcessingResult::Rejected(err) => {
            let status = StatusCode::from_u16(err.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ErrorResponse::new(err.public_message()))).into_response()
        }
    }
}
