//! # pass-api
//!
//! HTTP API layer for the Cash Flow Pass payment gateway.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Checkout, subscription and refund endpoints
//! - The Stripe webhook gateway (verify, deduplicate, dispatch)
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/create-one-time-checkout` | One-time payment checkout |
//! | POST | `/api/create-subscription-checkout` | Monthly payment checkout |
//! | GET | `/api/get-subscription` | Retrieve a subscription |
//! | POST | `/api/cancel-subscription` | Cancel a subscription |
//! | POST | `/api/refund-payment` | Refund a payment |
//! | POST | `/api/webhook` | Stripe webhook |

pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use gateway::{Delivery, ProcessingResult, RawWebhookRequest, WebhookGateway};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
