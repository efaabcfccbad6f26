//! # Stripe Configuration
//!
//! Configuration management for Stripe integration.
//! All secrets are loaded from environment variables.

use pass_core::signature::{DEFAULT_TOLERANCE_SECS, MAX_TOLERANCE_SECS};
use pass_core::{PaymentError, WebhookSecret};
use secrecy::{ExposeSecret, SecretString};
use std::env;

/// API version the client pins with the `Stripe-Version` header
pub const DEFAULT_API_VERSION: &str = "2024-06-20";

/// Default Stripe API endpoint
pub const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_test_... or sk_live_...)
    secret_key: SecretString,

    /// Webhook signing secret (whsec_...). The webhook endpoint answers 500
    /// while this is unset.
    pub webhook_secret: Option<WebhookSecret>,

    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Accepted clock difference for webhook signatures, in seconds
    pub webhook_tolerance_secs: i64,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `STRIPE_SECRET_KEY`
    ///
    /// Optional:
    /// - `STRIPE_WEBHOOK_SECRET`
    /// - `STRIPE_API_BASE_URL`
    /// - `STRIPE_API_VERSION`
    /// - `STRIPE_WEBHOOK_TOLERANCE_SECS`
    pub fn from_env() -> Result<Self, PaymentError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, PaymentError> {
        let secret_key = var("STRIPE_SECRET_KEY").filter(|v| !v.is_empty()).ok_or_else(|| {
            PaymentError::Configuration("STRIPE_SECRET_KEY not set".to_string())
        })?;

        // Validate key formats
        if !secret_key.starts_with("sk_test_") && !secret_key.starts_with("sk_live_") {
            return Err(PaymentError::Configuration(
                "STRIPE_SECRET_KEY must start with sk_test_ or sk_live_".to_string(),
            ));
        }

        let webhook_secret = var("STRIPE_WEBHOOK_SECRET").filter(|v| !v.is_empty());
        if let Some(ref secret) = webhook_secret {
            if !secret.starts_with("whsec_") {
                return Err(PaymentError::Configuration(
                    "STRIPE_WEBHOOK_SECRET must start with whsec_".to_string(),
                ));
            }
        }

        let webhook_tolerance_secs = match var("STRIPE_WEBHOOK_TOLERANCE_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                PaymentError::Configuration(format!(
                    "STRIPE_WEBHOOK_TOLERANCE_SECS is not a number: {}",
                    raw
                ))
            })?,
            None => DEFAULT_TOLERANCE_SECS,
        };
        if !(1..=MAX_TOLERANCE_SECS).contains(&webhook_tolerance_secs) {
            return Err(PaymentError::Configuration(format!(
                "STRIPE_WEBHOOK_TOLERANCE_SECS must be between 1 and {}",
                MAX_TOLERANCE_SECS
            )));
        }

        Ok(Self {
            secret_key: SecretString::new(secret_key),
            webhook_secret: webhook_secret.map(WebhookSecret::new),
            api_base_url: var("STRIPE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            api_version: var("STRIPE_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            webhook_tolerance_secs,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: SecretString::new(secret_key.into()),
            webhook_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            webhook_tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using live keys
    pub fn is_live_mode(&self) -> bool {
        self.secret_key.expose_secret().starts_with("sk_live_")
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.secret_key.expose_secret())
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the webhook signing secret
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(WebhookSecret::new(secret));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_key_modes() {
        let config = StripeConfig::new("sk_test_abc123");
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());

        let config = StripeConfig::new("sk_live_abc123");
        assert!(!config.is_test_mode());
        assert!(config.is_live_mode());
    }

    #[test]
    fn test_auth_header() {
        let config = StripeConfig::new("sk_test_abc123");
        assert_eq!(config.auth_header(), "Bearer sk_test_abc123");
    }

    #[test]
    fn test_debug_hides_keys() {
        let config = StripeConfig::new("sk_test_abc123").with_webhook_secret("whsec_hidden");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk_test_abc123"));
        assert!(!debug.contains("whsec_hidden"));
    }

    #[test]
    fn test_missing_secret_key() {
        let result = StripeConfig::from_vars(lookup(&[]));
        assert!(matches!(result, Err(PaymentError::Configuration(_))));
    }

    #[test]
    fn test_invalid_key_prefixes() {
        assert!(StripeConfig::from_vars(lookup(&[("STRIPE_SECRET_KEY", "pk_test_1")])).is_err());
        assert!(StripeConfig::from_vars(lookup(&[
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("STRIPE_WEBHOOK_SECRET", "secret"),
        ]))
        .is_err());
    }

    #[test]
    fn test_webhook_secret_is_optional() {
        let config = StripeConfig::from_vars(lookup(&[("STRIPE_SECRET_KEY", "sk_test_1")])).unwrap();
        assert!(config.webhook_secret.is_none());
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.webhook_tolerance_secs, 300);
    }

    #[test]
    fn test_overrides() {
        let config = StripeConfig::from_vars(lookup(&[
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("STRIPE_WEBHOOK_SECRET", "whsec_1"),
            ("STRIPE_API_BASE_URL", "http://localhost:12111"),
            ("STRIPE_WEBHOOK_TOLERANCE_SECS", "60"),
        ]))
        .unwrap();
        assert!(config.webhook_secret.is_some());
        assert_eq!(config.api_base_url, "http://localhost:12111");
        assert_eq!(config.webhook_tolerance_secs, 60);

        assert!(StripeConfig::from_vars(lookup(&[
            ("STRIPE_SECRET_KEY", "sk_test_1"),
            ("STRIPE_WEBHOOK_TOLERANCE_SECS", "soon"),
        ]))
        .is_err());
    }

    #[test]
    fn test_tolerance_out_of_range() {
        for raw in ["0", "-300", "86401", "9223372036854775807"] {
            let err = StripeConfig::from_vars(lookup(&[
                ("STRIPE_SECRET_KEY", "sk_test_1"),
                ("STRIPE_WEBHOOK_TOLERANCE_SECS", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, PaymentError::Configuration(_)), "{}", raw);
        }
    }
}
