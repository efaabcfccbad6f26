//! # Payment Provider Trait
//!
//! The narrow interface this service needs from a payment processor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentProvider (trait)                    │
//! │  ├── find_customer_by_email() / create_customer()           │
//! │  ├── create_checkout_session()                              │
//! │  ├── retrieve_subscription() / cancel_subscription()        │
//! │  ├── create_refund()                                        │
//! │  └── verify_webhook()                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┴─────────────────┐
//!  ┌───────┴───────┐                   ┌───────┴───────┐
//!  │ StripeClient  │                   │  test doubles │
//!  └───────────────┘                   └───────────────┘
//! ```

use crate::billing::{Customer, Refund, RefundRequest, Subscription};
use crate::checkout::{CheckoutRequest, CheckoutSession};
use crate::error::PaymentResult;
use crate::event::VerifiedEvent;
use crate::signature::WebhookSecret;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Operations the gateway performs against the payment processor.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// First customer registered with this email, if any.
    async fn find_customer_by_email(&self, email: &str) -> PaymentResult<Option<Customer>>;

    /// Register a new customer.
    async fn create_customer(&self, email: &str) -> PaymentResult<Customer>;

    /// Reuse the customer for this email or create one.
    async fn find_or_create_customer(&self, email: &str) -> PaymentResult<Customer> {
        match self.find_customer_by_email(email).await? {
            Some(customer) => Ok(customer),
            None => self.create_customer(email).await,
        }
    }

    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> PaymentResult<CheckoutSession>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription>;

    /// Cancel immediately.
    async fn cancel_subscription(&self, subscription_id: &str) -> PaymentResult<Subscription>;

    async fn create_refund(&self, request: &RefundRequest) -> PaymentResult<Refund>;

    /// Verify a webhook signature and decode the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes, exactly as received
    /// * `signature` - Signature header value, `None` if the header was absent
    /// * `secret` - Webhook signing secret
    /// * `received_at` - When the request arrived
    fn verify_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        secret: &WebhookSecret,
        received_at: DateTime<Utc>,
    ) -> PaymentResult<VerifiedEvent>;

    /// Get the provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared payment provider (dynamic dispatch)
pub type BoxedPaymentProvider = Arc<dyn PaymentProvider>;
