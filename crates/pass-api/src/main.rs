//! # Cash Flow Pass
//!
//! Payment gateway server: checkout, subscriptions, refunds and Stripe webhooks.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//!
//! # Run the server
//! cashflow-pass
//! ```

use pass_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let production = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");

    // JSON logs in production, human-readable otherwise
    tracing_subscriber::registry()
        .with(production.then(|| fmt::layer().json()))
        .with((!production).then(|| fmt::layer()))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.provider.provider_name());
    info!(
        "Request timeout: {}s, webhook dedup retention: {}h",
        state.config.request_timeout_secs, state.config.dedup_retention_hours
    );

    let app = routes::create_router(state);

    info!("Cash Flow Pass starting on http://{}", addr);

    if !is_prod {
        info!("Health: GET http://{}/health", addr);
        info!("Checkout: POST http://{}/api/create-one-time-checkout", addr);
        info!("Webhook: POST http://{}/api/webhook", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

fn print_banner() {
    println!(
        r#"
  Cash Flow Pass
  ━━━━━━━━━━━━━━━━━━━━━━━
  Payment gateway
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
