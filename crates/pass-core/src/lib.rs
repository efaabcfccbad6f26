//! # pass-core
//!
//! Core types and traits for the Cash Flow Pass payment gateway.
//!
//! This crate provides:
//! - `PaymentProvider` trait for the payment processor client
//! - `Amount`, `CheckoutCatalog` and `CheckoutRequest` for checkout flows
//! - `VerifiedEvent` and `EventKind` for webhook events
//! - `HmacVerifier`, the signature check every `VerifiedEvent` comes from
//! - `EventDedupStore` for idempotent webhook handling
//! - `EventHandler` and `dispatch_event` for per-type event handling
//! - `PaymentError` and `WebhookError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use pass_core::{dispatch_event, LoggingEventHandler, PaymentProvider};
//!
//! let event = provider.verify_webhook(&body, signature, &secret, Utc::now())?;
//! if dedup.mark_seen(event.id()).await? {
//!     dispatch_event(&LoggingEventHandler, &event)?;
//! }
//! ```

pub mod amount;
pub mod billing;
pub mod checkout;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod provider;
pub mod signature;

// Re-exports for convenience
pub use amount::{Amount, Currency};
pub use billing::{Customer, Refund, RefundRequest, Subscription};
pub use checkout::{BillingInterval, CheckoutCatalog, CheckoutMode, CheckoutRequest, CheckoutSession};
pub use dedup::{BoxedDedupStore, EventDedupStore, MemoryDedupStore};
pub use dispatch::{dispatch_event, DispatchOutcome, EventHandler, LoggingEventHandler};
pub use error::{PaymentError, PaymentResult, WebhookError};
pub use event::{
    CheckoutSessionCompleted, CustomerDetails, EventKind, InvoicePaymentFailed, VerifiedEvent,
    CHECKOUT_SESSION_COMPLETED, HANDLED_EVENT_TYPES, INVOICE_PAYMENT_FAILED,
};
pub use provider::{BoxedPaymentProvider, PaymentProvider};
pub use signature::{compute_signature, HmacVerifier, SignedPayload, WebhookSecret};
