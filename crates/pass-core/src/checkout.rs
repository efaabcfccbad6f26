//! # Checkout Types
//!
//! Checkout session requests for one-time and recurring payments, and the
//! catalog that names what is being sold. The catalog is loaded from
//! `config/checkout.toml` when present.

use crate::amount::{Amount, Currency};
use serde::{Deserialize, Serialize};

/// Checkout mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    /// One-time payment
    Payment,
    /// Recurring payment
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

/// Billing interval for recurring prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Day,
    Week,
    #[default]
    Month,
    Year,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Day => "day",
            BillingInterval::Week => "week",
            BillingInterval::Month => "month",
            BillingInterval::Year => "year",
        }
    }
}

/// What the checkout endpoints sell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutCatalog {
    /// Currency for every line item
    pub currency: Currency,
    /// Product name shown for one-time payments
    pub one_time_product_name: String,
    /// Product name shown for the recurring plan
    pub subscription_product_name: String,
    /// How often the recurring plan bills
    pub subscription_interval: BillingInterval,
}

impl Default for CheckoutCatalog {
    fn default() -> Self {
        Self {
            currency: Currency::USD,
            one_time_product_name: "Cash Flow Pass One-Time Payment".to_string(),
            subscription_product_name: "Cash Flow Pass Repayment Plan".to_string(),
            subscription_interval: BillingInterval::Month,
        }
    }
}

impl CheckoutCatalog {
    /// Product name for the given mode
    pub fn product_name(&self, mode: CheckoutMode) -> &str {
        match mode {
            CheckoutMode::Payment => &self.one_time_product_name,
            CheckoutMode::Subscription => &self.subscription_product_name,
        }
    }

    /// Build a single-item checkout request for a customer
    pub fn checkout_request(
        &self,
        mode: CheckoutMode,
        customer_id: impl Into<String>,
        amount: Amount,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> CheckoutRequest {
        let recurring_interval = match mode {
            CheckoutMode::Payment => None,
            CheckoutMode::Subscription => Some(self.subscription_interval),
        };

        CheckoutRequest {
            customer_id: customer_id.into(),
            mode,
            amount,
            product_name: self.product_name(mode).to_string(),
            recurring_interval,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }
}

/// A checkout session to create at the provider (one line item, quantity 1)
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub customer_id: String,
    pub mode: CheckoutMode,
    pub amount: Amount,
    pub product_name: String,
    /// Set for subscriptions only
    pub recurring_interval: Option<BillingInterval>,
    pub success_url: String,
    pub cancel_url: String,
}

/// A checkout session created by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID
    pub id: String,

    /// Hosted payment page; absent for some session states
    #[serde(default)]
    pub url: Option<String>,
}
