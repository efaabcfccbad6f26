//! # Stripe Client
//!
//! `PaymentProvider` implementation over the Stripe REST API.
//! Requests are form-encoded; responses are JSON.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pass_core::{
    CheckoutRequest, CheckoutSession, Customer, HmacVerifier, PaymentError, PaymentProvider,
    PaymentResult, Refund, RefundRequest, Subscription, VerifiedEvent, WebhookSecret,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const PROVIDER: &str = "stripe";

/// Stripe API client
pub struct StripeClient {
    config: StripeConfig,
    client: Client,
    verifier: HmacVerifier,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(config: StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PaymentError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        let verifier = HmacVerifier::new(config.webhook_tolerance_secs);

        Ok(Self {
            config,
            client,
            verifier,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base_url, path)
    }

    /// POST with a fresh idempotency key
    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Idempotency-Key", Uuid::new_v4().to_string())
    }

    /// Send a request and decode the JSON response, mapping Stripe errors
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> PaymentResult<T> {
        let response = request
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .send()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            // Parse Stripe error
            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                let err = error_response.error;
                if status == reqwest::StatusCode::NOT_FOUND
                    || err.code.as_deref() == Some("resource_missing")
                {
                    return Err(PaymentError::NotFound {
                        resource: err.message,
                    });
                }
                return Err(PaymentError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: match err.error_type {
                        Some(kind) => format!("{}: {}", kind, err.message),
                        None => err.message,
                    },
                });
            }

            return Err(PaymentError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            PaymentError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })
    }

    /// Build form data for a checkout session with a single line item
    fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
        let mut form_params: Vec<(String, String)> = vec![
            ("mode".to_string(), request.mode.as_str().to_string()),
            ("customer".to_string(), request.customer_id.clone()),
            ("success_url".to_string(), request.success_url.clone()),
            ("cancel_url".to_string(), request.cancel_url.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                request.amount.currency().as_str().to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                request.amount.minor_units().to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                request.product_name.clone(),
            ),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
        ];

        if let Some(interval) = request.recurring_interval {
            form_params.push((
                "line_items[0][price_data][recurring][interval]".to_string(),
                interval.as_str().to_string(),
            ));
        }

        form_params
    }
}

/// Stripe object ids are `prefix_alphanumeric`. Anything else would end up
/// interpolated into a request path.
fn validate_object_id(kind: &str, id: &str) -> PaymentResult<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PaymentError::InvalidRequest(format!("Invalid {} id", kind)))
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    #[instrument(skip(self, email))]
    async fn find_customer_by_email(&self, email: &str) -> PaymentResult<Option<Customer>> {
        let request = self
            .client
            .get(self.url("customers"))
            .query(&[("email", email), ("limit", "1")]);

        let list: StripeList<Customer> = self.send(request).await?;
        Ok(list.data.into_iter().next())
    }

    #[instrument(skip(self, email))]
    async fn create_customer(&self, email: &str) -> PaymentResult<Customer> {
        let request = self.post("customers").form(&[("email", email)]);
        let customer: Customer = self.send(request).await?;

        info!("Created Stripe customer: id={}", customer.id);
        Ok(customer)
    }

    #[instrument(skip(self, request), fields(mode = request.mode.as_str(), amount = request.amount.minor_units()))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> PaymentResult<CheckoutSession> {
        let form_params = Self::checkout_form(request);
        debug!("Creating Stripe checkout session for customer {}", request.customer_id);

        let session: CheckoutSession = self
            .send(self.post("checkout/sessions").form(&form_params))
            .await?;

        info!("Created Stripe checkout session: id={}", session.id);
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn retrieve_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription> {
        validate_object_id("subscription", subscription_id)?;
        let request = self
            .client
            .get(self.url(&format!("subscriptions/{}", subscription_id)));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn cancel_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription> {
        validate_object_id("subscription", subscription_id)?;
        let request = self
            .client
            .delete(self.url(&format!("subscriptions/{}", subscription_id)));
        let subscription: Subscription = self.send(request).await?;

        info!(
            "Cancelled Stripe subscription: id={}, status={:?}",
            subscription.id, subscription.status
        );
        Ok(subscription)
    }

    #[instrument(skip(self, request), fields(payment_intent = %request.payment_intent_id))]
    async fn create_refund(&self, request: &RefundRequest) -> PaymentResult<Refund> {
        validate_object_id("payment intent", &request.payment_intent_id)?;

        let mut form_params = vec![(
            "payment_intent".to_string(),
            request.payment_intent_id.clone(),
        )];
        if let Some(amount) = request.amount {
            form_params.push(("amount".to_string(), amount.to_string()));
        }

        let refund: Refund = self.send(self.post("refunds").form(&form_params)).await?;

        info!("Created Stripe refund: id={}, amount={:?}", refund.id, refund.amount);
        Ok(refund)
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        secret: &WebhookSecret,
        received_at: DateTime<Utc>,
    ) -> PaymentResult<VerifiedEvent> {
        webhook::construct_event(payload, signature, secret, &self.verifier, received_at)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pass_core::{Amount, CheckoutCatalog, CheckoutMode, Currency};
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> StripeClient {
        StripeClient::new(StripeConfig::new("sk_test_abc").with_api_base_url(server.uri())).unwrap()
    }

    fn request(mode: CheckoutMode) -> CheckoutRequest {
        CheckoutCatalog::default().checkout_request(
            mode,
            "cus_1",
            Amount::from_minor_units(4999, Currency::USD).unwrap(),
            "https://example.com/ok",
            "https://example.com/cancel",
        )
    }

    fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_checkout_form_one_time() {
        let form = StripeClient::checkout_form(&request(CheckoutMode::Payment));

        assert_eq!(form_value(&form, "mode"), Some("payment"));
        assert_eq!(form_value(&form, "customer"), Some("cus_1"));
        assert_eq!(form_value(&form, "line_items[0][price_data][unit_amount]"), Some("4999"));
        assert_eq!(form_value(&form, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(form_value(&form, "line_items[0][price_data][recurring][interval]"), None);
    }

    #[test]
    fn test_checkout_form_subscription() {
        let form = StripeClient::checkout_form(&request(CheckoutMode::Subscription));

        assert_eq!(form_value(&form, "mode"), Some("subscription"));
        assert_eq!(
            form_value(&form, "line_items[0][price_data][recurring][interval]"),
            Some("month")
        );
        assert_eq!(
            form_value(&form, "line_items[0][price_data][product_data][name]"),
            Some("Cash Flow Pass Repayment Plan")
        );
    }

    #[test]
    fn test_object_id_validation() {
        assert!(validate_object_id("subscription", "sub_1N2x3Y").is_ok());
        assert!(validate_object_id("subscription", "").is_err());
        assert!(validate_object_id("subscription", "sub_1/../../customers").is_err());
        assert!(validate_object_id("subscription", "sub 1").is_err());
    }

    #[tokio::test]
    async fn test_find_customer_by_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/customers"))
            .and(query_param("email", "pat@example.com"))
            .and(query_param("limit", "1"))
            .and(header("Authorization", "Bearer sk_test_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{"id": "cus_existing", "email": "pat@example.com"}],
                "has_more": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let customer = client(&server)
            .find_customer_by_email("pat@example.com")
            .await
            .unwrap();
        assert_eq!(customer.map(|c| c.id), Some("cus_existing".to_string()));
    }

    #[tokio::test]
    async fn test_find_or_create_creates_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(header_exists("Idempotency-Key"))
            .and(body_string_contains("email=new%40example.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "cus_new", "email": "new@example.com"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let customer = client(&server)
            .find_or_create_customer("new@example.com")
            .await
            .unwrap();
        assert_eq!(customer.id, "cus_new");
    }

    #[tokio::test]
    async fn test_create_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("Stripe-Version", "2024-06-20"))
            .and(body_string_contains("mode=subscription"))
            .and(body_string_contains("customer=cus_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cs_test_1",
                "object": "checkout.session",
                "url": "https://checkout.stripe.com/c/pay/cs_test_1"
            })))
            .mount(&server)
            .await;

        let session = client(&server)
            .create_checkout_session(&request(CheckoutMode::Subscription))
            .await
            .unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert_eq!(
            session.url.as_deref(),
            Some("https://checkout.stripe.com/c/pay/cs_test_1")
        );
    }

    #[tokio::test]
    async fn test_cancel_subscription() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/subscriptions/sub_123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sub_123",
                "object": "subscription",
                "status": "canceled"
            })))
            .mount(&server)
            .await;

        let subscription = client(&server).cancel_subscription("sub_123").await.unwrap();
        assert!(subscription.is_canceled());
    }

    #[tokio::test]
    async fn test_missing_subscription_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/subscriptions/sub_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": "resource_missing",
                    "message": "No such subscription: 'sub_missing'",
                    "type": "invalid_request_error"
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .retrieve_subscription("sub_missing")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_partial_refund() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .and(body_string_contains("payment_intent=pi_1"))
            .and(body_string_contains("amount=1250"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "re_1",
                "amount": 1250,
                "payment_intent": "pi_1",
                "status": "succeeded"
            })))
            .mount(&server)
            .await;

        let refund = client(&server)
            .create_refund(&RefundRequest {
                payment_intent_id: "pi_1".to_string(),
                amount: Some(1250),
            })
            .await
            .unwrap();
        assert_eq!(refund.amount, Some(1250));
    }

    #[tokio::test]
    async fn test_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": "charge_already_refunded",
                    "message": "Charge ch_1 has already been refunded.",
                    "type": "invalid_request_error"
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .create_refund(&RefundRequest {
                payment_intent_id: "pi_1".to_string(),
                amount: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::ProviderError { .. }));
        assert!(err.to_string().contains("already been refunded"));
    }
}
