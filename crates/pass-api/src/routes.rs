//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{any, get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health, / - Health check
/// - POST /api/create-one-time-checkout - One-time payment checkout
/// - POST /api/create-subscription-checkout - Monthly payment checkout
/// - GET  /api/get-subscription?subscriptionId= - Retrieve subscription
/// - POST /api/cancel-subscription - Cancel subscription
/// - POST /api/refund-payment - Refund a payment
/// - *    /api/webhook (and /webhook) - Stripe webhook, POST only
///
/// Wrong methods get a 405 JSON body with an `Allow` header. The request
/// timeout covers the payment endpoints only; the webhook answers with its
/// own status codes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let api_routes = Router::new()
        .route(
            "/create-one-time-checkout",
            post(handlers::create_one_time_checkout).fallback(handlers::post_only),
        )
        .route(
            "/create-subscription-checkout",
            post(handlers::create_subscription_checkout).fallback(handlers::post_only),
        )
        .route(
            "/get-subscription",
            get(handlers::get_subscription).fallback(handlers::get_only),
        )
        .route(
            "/cancel-subscription",
            post(handlers::cancel_subscription).fallback(handlers::post_only),
        )
        .route(
            "/refund-payment",
            post(handlers::refund_payment).fallback(handlers::post_only),
        )
        .layer(TimeoutLayer::new(timeout));

    // Every method reaches the gateway so it can answer 405 itself
    let webhook_routes = Router::new()
        .route("/api/webhook", any(handlers::stripe_webhook))
        .route("/webhook", any(handlers::stripe_webhook));

    Router::new()
        .route("/health", get(handlers::health).fallback(handlers::get_only))
        .route("/", get(handlers::health).fallback(handlers::get_only))
        .nest("/api", api_routes)
        .merge(webhook_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}
