//! Test doubles shared by the gateway, handler and router tests.

use crate::gateway::RawWebhookRequest;
use crate::state::{AppConfig, AppState};
use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use pass_core::{
    CheckoutCatalog, CheckoutRequest, CheckoutSession, CheckoutSessionCompleted, Customer,
    EventHandler, HmacVerifier, InvoicePaymentFailed, MemoryDedupStore, PaymentError,
    PaymentProvider, PaymentResult, Refund, RefundRequest, Subscription, VerifiedEvent,
    WebhookSecret,
};
use pass_stripe::{construct_event, sign_payload};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};

pub const TEST_SECRET: &str = "whsec_test_gateway";

/// Sign `body` now with the test secret
pub fn signature_for(body: &str) -> String {
    sign_payload(&WebhookSecret::new(TEST_SECRET), Utc::now().timestamp(), body.as_bytes())
        .unwrap()
}

pub fn signed_request(body: &str) -> RawWebhookRequest {
    RawWebhookRequest {
        body: Bytes::from(body.to_string()),
        signature: Some(signature_for(body)),
        received_at: Utc::now(),
    }
}

/// How the fake provider fails its API calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FakeFailure {
    #[default]
    None,
    NotFound,
    Provider,
}

/// In-memory payment provider. Webhook verification is the real Stripe one.
#[derive(Default)]
pub struct FakeProvider {
    pub existing_customer: Option<Customer>,
    pub failure: FakeFailure,
    pub calls: Mutex<Vec<String>>,
    pub checkouts: Mutex<Vec<CheckoutRequest>>,
    pub refunds: Mutex<Vec<RefundRequest>>,
}

impl FakeProvider {
    pub fn with_customer(id: &str, email: &str) -> Self {
        Self {
            existing_customer: Some(Customer {
                id: id.to_string(),
                email: Some(email.to_string()),
            }),
            ..Default::default()
        }
    }

    pub fn failing(failure: FakeFailure) -> Self {
        Self {
            failure,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> PaymentResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.failure {
            FakeFailure::None => Ok(()),
            FakeFailure::NotFound => Err(PaymentError::NotFound {
                resource: "No such object".to_string(),
            }),
            FakeFailure::Provider => Err(PaymentError::ProviderError {
                provider: "fake".to_string(),
                message: "api_error: boom".to_string(),
            }),
        }
    }

    fn subscription(id: &str, status: &str) -> Subscription {
        Subscription {
            id: id.to_string(),
            status: Some(status.to_string()),
            customer: Some("cus_fake".to_string()),
            extra: Map::new(),
        }
    }
}

#[async_trait]
impl PaymentProvider for FakeProvider {
    async fn find_customer_by_email(&self, email: &str) -> PaymentResult<Option<Customer>> {
        self.record(format!("find_customer:{}", email))?;
        Ok(self.existing_customer.clone())
    }

    async fn create_customer(&self, email: &str) -> PaymentResult<Customer> {
        self.record(format!("create_customer:{}", email))?;
        Ok(Customer {
            id: "cus_new".to_string(),
            email: Some(email.to_string()),
        })
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> PaymentResult<CheckoutSession> {
        self.record(format!("checkout:{}", request.customer_id))?;
        self.checkouts.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            id: "cs_fake".to_string(),
            url: Some("https://checkout.stripe.com/c/pay/cs_fake".to_string()),
        })
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription> {
        self.record(format!("retrieve_subscription:{}", subscription_id))?;
        Ok(Self::subscription(subscription_id, "active"))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription> {
        self.record(format!("cancel_subscription:{}", subscription_id))?;
        Ok(Self::subscription(subscription_id, "canceled"))
    }

    async fn create_refund(&self, request: &RefundRequest) -> PaymentResult<Refund> {
        self.record(format!("refund:{}", request.payment_intent_id))?;
        self.refunds.lock().unwrap().push(request.clone());
        Ok(Refund {
            id: "re_fake".to_string(),
            amount: request.amount,
            payment_intent: Some(request.payment_intent_id.clone()),
            status: Some("succeeded".to_string()),
            extra: Map::new(),
        })
    }

    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        secret: &WebhookSecret,
        received_at: DateTime<Utc>,
    ) -> PaymentResult<VerifiedEvent> {
        construct_event(payload, signature, secret, &HmacVerifier::default(), received_at)
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Event handler that records what it was called with
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<String>>,
    fail_invoices: bool,
}

impl RecordingHandler {
    pub fn failing_invoices() -> Self {
        Self {
            fail_invoices: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn checkout_sessions(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| c.strip_prefix("checkout:").map(String::from))
            .collect()
    }

    pub fn invoice_attempts(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("invoice:")).count()
    }
}

impl EventHandler for RecordingHandler {
    fn on_checkout_session_completed(
        &self,
        _event: &VerifiedEvent,
        session: &CheckoutSessionCompleted,
    ) -> PaymentResult<()> {
        self.calls.lock().unwrap().push(format!("checkout:{}", session.id));
        Ok(())
    }

    fn on_invoice_payment_failed(
        &self,
        _event: &VerifiedEvent,
        invoice: &InvoicePaymentFailed,
    ) -> PaymentResult<()> {
        self.calls.lock().unwrap().push(format!("invoice:{}", invoice.id));
        if self.fail_invoices {
            return Err(PaymentError::HandlerFailed("ledger unavailable".to_string()));
        }
        Ok(())
    }

    fn on_unhandled(&self, _event: &VerifiedEvent, event_type: &str, _payload: &Value) {
        self.calls.lock().unwrap().push(format!("unhandled:{}", event_type));
    }

    fn on_malformed(&self, _event: &VerifiedEvent, event_type: &str, _payload: &Value, _reason: &str) {
        self.calls.lock().unwrap().push(format!("malformed:{}", event_type));
    }
}

/// App state over the given fakes
pub fn test_state(
    provider: Arc<FakeProvider>,
    handler: Arc<RecordingHandler>,
    secret: Option<&str>,
) -> AppState {
    AppState::with_parts(
        provider,
        secret.map(WebhookSecret::new),
        handler,
        Arc::new(MemoryDedupStore::default()),
        CheckoutCatalog::default(),
        AppConfig::default(),
    )
}
