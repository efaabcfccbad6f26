//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the payment provider, the webhook gateway, the checkout catalog
//! and configuration. Everything is injected here; nothing is global.

use crate::gateway::WebhookGateway;
use chrono::Duration;
use pass_core::{
    BoxedDedupStore, BoxedPaymentProvider, CheckoutCatalog, EventHandler, LoggingEventHandler,
    MemoryDedupStore, WebhookSecret,
};
use pass_stripe::StripeClient;
use std::sync::Arc;

/// Default for `WEBHOOK_DEDUP_RETENTION_HOURS`
pub const DEFAULT_DEDUP_RETENTION_HOURS: i64 = 72;

/// Longest accepted dedup retention (one year)
pub const MAX_DEDUP_RETENTION_HOURS: i64 = 24 * 365;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// How long processed webhook event ids are remembered
    pub dedup_retention_hours: i64,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load through a variable lookup; unparseable or out-of-range numbers fall
    /// back to defaults
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            request_timeout_secs: var("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            dedup_retention_hours: var("WEBHOOK_DEDUP_RETENTION_HOURS")
                .and_then(|v| v.parse().ok())
                .filter(|hours| (1..=MAX_DEDUP_RETENTION_HOURS).contains(hours))
                .unwrap_or(DEFAULT_DEDUP_RETENTION_HOURS),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_vars(|_| None)
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment provider client
    pub provider: BoxedPaymentProvider,
    /// Webhook ingestion
    pub gateway: Arc<WebhookGateway>,
    /// What the checkout endpoints sell
    pub catalog: Arc<CheckoutCatalog>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState backed by Stripe, configured from the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let catalog = load_checkout_catalog()?;

        let stripe = StripeClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
        let webhook_secret = stripe.config().webhook_secret.clone();
        if webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, webhook deliveries will be refused");
        }

        let retention = Duration::try_hours(config.dedup_retention_hours).ok_or_else(|| {
            anyhow::anyhow!("Invalid dedup retention: {}h", config.dedup_retention_hours)
        })?;
        let dedup = Arc::new(MemoryDedupStore::new(retention));

        Ok(Self::with_parts(
            Arc::new(stripe),
            webhook_secret,
            Arc::new(LoggingEventHandler),
            dedup,
            catalog,
            config,
        ))
    }

    /// Assemble state from explicit parts
    pub fn with_parts(
        provider: BoxedPaymentProvider,
        webhook_secret: Option<WebhookSecret>,
        handler: Arc<dyn EventHandler>,
        dedup: BoxedDedupStore,
        catalog: CheckoutCatalog,
        config: AppConfig,
    ) -> Self {
        let gateway = WebhookGateway::new(provider.clone(), webhook_secret, handler, dedup);

        Self {
            provider,
            gateway: Arc::new(gateway),
            catalog: Arc::new(catalog),
            config,
        }
    }
}

/// Load the checkout catalog from config file
fn load_checkout_catalog() -> anyhow::Result<CheckoutCatalog> {
    // Try to load from config/checkout.toml
    let config_paths = [
        "config/checkout.toml",
        "../config/checkout.toml",
        "../../config/checkout.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = parse_checkout_catalog(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded checkout catalog from {}", path);
            return Ok(catalog);
        }
    }

    // Fall back to built-in product names if no config found
    tracing::warn!("No checkout catalog found, using defaults");
    Ok(CheckoutCatalog::default())
}

fn parse_checkout_catalog(content: &str) -> Result<CheckoutCatalog, toml::de::Error> {
    toml::from_str(content)
}
