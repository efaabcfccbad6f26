//! # Webhook Events
//!
//! Events delivered by the payment provider, decoded only after their
//! signature has been checked.

use crate::error::{PaymentError, PaymentResult};
use crate::signature::SignedPayload;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// `checkout.session.completed`
pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// `invoice.payment_failed`
pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";

/// Event types the dispatcher has dedicated handlers for.
pub const HANDLED_EVENT_TYPES: &[&str] = &[CHECKOUT_SESSION_COMPLETED, INVOICE_PAYMENT_FAILED];

/// Data of a completed checkout session
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSessionCompleted {
    /// Session ID (cs_...)
    pub id: String,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,

    #[serde(default)]
    pub payment_intent: Option<String>,

    #[serde(default)]
    pub subscription: Option<String>,

    /// `payment` or `subscription`
    #[serde(default)]
    pub mode: Option<String>,

    #[serde(default)]
    pub payment_status: Option<String>,

    #[serde(default)]
    pub amount_total: Option<i64>,

    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSessionCompleted {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn customer_email(&self) -> Option<&str> {
        self.customer_details.as_ref()?.email.as_deref()
    }
}

/// Data of an invoice whose payment attempt failed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvoicePaymentFailed {
    /// Invoice ID (in_...)
    pub id: String,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub subscription: Option<String>,

    #[serde(default)]
    pub amount_due: Option<i64>,

    #[serde(default)]
    pub attempt_count: Option<u32>,

    #[serde(default)]
    pub currency: Option<String>,

    /// Unix time of the provider's next retry, if any
    #[serde(default)]
    pub next_payment_attempt: Option<i64>,
}

/// What happened, with the payload typed per event type
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    CheckoutSessionCompleted(CheckoutSessionCompleted),
    InvoicePaymentFailed(InvoicePaymentFailed),
    /// Any other type, kept verbatim
    Unknown { event_type: String, payload: Value },
    /// A handled type whose object did not have the expected shape
    Malformed {
        event_type: String,
        payload: Value,
        reason: String,
    },
}

impl EventKind {
    /// Decode `object` according to `event_type`.
    ///
    /// Never fails: an object that does not fit its type becomes `Malformed`.
    pub fn decode(event_type: &str, object: Value) -> Self {
        let decoded = match event_type {
            CHECKOUT_SESSION_COMPLETED => {
                decode_object(&object).map(EventKind::CheckoutSessionCompleted)
            }
            INVOICE_PAYMENT_FAILED => decode_object(&object).map(EventKind::InvoicePaymentFailed),
            other => {
                return EventKind::Unknown {
                    event_type: other.to_string(),
                    payload: object,
                }
            }
        };

        decoded.unwrap_or_else(|e| EventKind::Malformed {
            event_type: event_type.to_string(),
            payload: object,
            reason: e.to_string(),
        })
    }

    /// Provider's type string
    pub fn event_type(&self) -> &str {
        match self {
            EventKind::CheckoutSessionCompleted(_) => CHECKOUT_SESSION_COMPLETED,
            EventKind::InvoicePaymentFailed(_) => INVOICE_PAYMENT_FAILED,
            EventKind::Unknown { event_type, .. } | EventKind::Malformed { event_type, .. } => {
                event_type
            }
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, EventKind::Unknown { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, EventKind::Malformed { .. })
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(object: &Value) -> serde_json::Result<T> {
    T::deserialize(object)
}

/// An event whose signature has been verified.
///
/// Fields are private; the only constructor consumes a [`SignedPayload`].
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedEvent {
    id: String,
    kind: EventKind,
    created_at: DateTime<Utc>,
    received_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: Option<i64>,
    #[serde(default)]
    data: EventData,
}

#[derive(Debug, Default, Deserialize)]
struct EventData {
    #[serde(default)]
    object: Value,
}

impl VerifiedEvent {
    /// Decode the event envelope carried by a verified payload.
    ///
    /// An envelope without `id` gets `sha256:<digest of body>`, so identical
    /// redeliveries still share an id.
    pub fn from_signed(signed: SignedPayload<'_>, received_at: DateTime<Utc>) -> PaymentResult<Self> {
        let envelope: EventEnvelope = serde_json::from_slice(signed.body()).map_err(|e| {
            PaymentError::WebhookParseError(format!("Invalid event payload: {}", e))
        })?;

        let id = match envelope.id {
            Some(id) if !id.is_empty() => id,
            _ => format!("sha256:{}", hex::encode(Sha256::digest(signed.body()))),
        };

        let created_at = envelope
            .created
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or(received_at);

        let kind = EventKind::decode(&envelope.event_type, envelope.data.object);

        Ok(Self {
            id,
            kind,
            created_at,
            received_at,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn event_type(&self) -> &str {
        self.kind.event_type()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{compute_signature, HmacVerifier, WebhookSecret};
    use serde_json::json;

    fn verified(body: &[u8]) -> PaymentResult<VerifiedEvent> {
        let secret = WebhookSecret::new("whsec_events");
        let now = Utc::now();
        let sig = compute_signature(&secret, now.timestamp(), body)?;
        let signed = HmacVerifier::default().verify(body, now.timestamp(), &[sig], &secret, now)?;
        VerifiedEvent::from_signed(signed, now)
    }

    #[test]
    fn test_checkout_completed_decoding() {
        let body = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": 1_700_000_000,
            "data": {"object": {
                "id": "cs_test_123",
                "customer": "cus_1",
                "customer_details": {"email": "pat@example.com"},
                "payment_intent": "pi_1",
                "mode": "payment",
                "payment_status": "paid",
                "amount_total": 2500,
                "currency": "usd",
                "metadata": {"plan": "starter"}
            }}
        })
        .to_string();

        let event = verified(body.as_bytes()).unwrap();
        assert_eq!(event.id(), "evt_1");
        assert_eq!(event.event_type(), CHECKOUT_SESSION_COMPLETED);
        assert_eq!(event.created_at().timestamp(), 1_700_000_000);

        match event.kind() {
            EventKind::CheckoutSessionCompleted(session) => {
                assert_eq!(session.id, "cs_test_123");
                assert!(session.is_paid());
                assert_eq!(session.customer_email(), Some("pat@example.com"));
                assert_eq!(session.metadata.get("plan").map(String::as_str), Some("starter"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_missing_id_derives_stable_digest() {
        let body = br#"{"type":"checkout.session.completed","data":{"object":{"id":"cs_123"}}}"#;
        let first = verified(body).unwrap();
        let second = verified(body).unwrap();

        assert!(first.id().starts_with("sha256:"));
        assert_eq!(first.id(), second.id());
        assert_eq!(first.created_at(), first.received_at());
    }

    #[test]
    fn test_unknown_type_keeps_payload() {
        let body = br#"{"id":"evt_2","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
        let event = verified(body).unwrap();

        assert!(event.kind().is_unknown());
        assert_eq!(event.event_type(), "customer.created");
        assert_eq!(
            event.kind(),
            &EventKind::Unknown {
                event_type: "customer.created".to_string(),
                payload: json!({"id": "cus_1"}),
            }
        );
    }

    #[test]
    fn test_known_type_with_bad_object_is_malformed() {
        let body = br#"{"id":"evt_3","type":"invoice.payment_failed","data":{"object":{"object":"invoice"}}}"#;
        let event = verified(body).unwrap();

        assert_eq!(event.id(), "evt_3");
        assert_eq!(event.event_type(), INVOICE_PAYMENT_FAILED);
        match event.kind() {
            EventKind::Malformed {
                payload, reason, ..
            } => {
                assert_eq!(payload, &json!({"object": "invoice"}));
                assert!(reason.contains("id"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }

        let body = br#"{"id":"evt_4","type":"checkout.session.completed","data":{"object":{"id":"cs_1","amount_total":"lots"}}}"#;
        assert!(verified(body).unwrap().kind().is_malformed());
    }

    #[test]
    fn test_non_json_body_rejected() {
        let err = verified(b"not json").unwrap_err();
        assert!(matches!(err, PaymentError::WebhookParseError(_)));
    }
}
