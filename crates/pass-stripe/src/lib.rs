//! # pass-stripe
//!
//! Stripe client for the Cash Flow Pass payment gateway.
//!
//! `StripeClient` implements `pass_core::PaymentProvider`:
//! - customer lookup and creation
//! - checkout sessions for one-time and monthly payments
//! - subscription retrieval and cancellation
//! - refunds
//! - webhook signature verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pass_stripe::StripeClient;
//! use pass_core::PaymentProvider;
//!
//! let client = StripeClient::from_env()?;
//! let customer = client.find_or_create_customer("pat@example.com").await?;
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! let event = client.verify_webhook(&body, signature, &secret, Utc::now())?;
//! dispatch_event(&LoggingEventHandler, &event)?;
//! ```

pub mod client;
pub mod config;
pub mod webhook;

// Re-exports
pub use client::StripeClient;
pub use config::StripeConfig;
pub use webhook::{construct_event, sign_payload, SignatureHeader, REQUIRED_WEBHOOK_EVENTS, SIGNATURE_HEADER};
