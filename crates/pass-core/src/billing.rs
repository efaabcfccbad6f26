//! # Billing Records
//!
//! Customers, subscriptions and refunds as returned by the provider.
//! Only the fields this service reads are typed; everything else the
//! provider sends is kept in `extra` and serialized back out unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A provider-side customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// A recurring billing agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,

    /// e.g. `active`, `past_due`, `canceled`
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subscription {
    pub fn is_canceled(&self) -> bool {
        self.status.as_deref() == Some("canceled")
    }
}

/// A refund against a payment intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,

    /// Refunded amount in minor units
    #[serde(default)]
    pub amount: Option<i64>,

    #[serde(default)]
    pub payment_intent: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Refund to create. `amount` of `None` refunds the full charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub payment_intent_id: String,
    pub amount: Option<i64>,
}
