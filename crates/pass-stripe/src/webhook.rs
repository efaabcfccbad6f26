//! # Stripe Webhook Signatures
//!
//! Parsing of the `Stripe-Signature` header and verification of incoming
//! webhook payloads.
//!
//! Header format: `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`. Stripe sends
//! several `v1` values while a signing secret is being rolled. Other schemes
//! (`v0`) are ignored.

use chrono::{DateTime, Utc};
use pass_core::{HmacVerifier, PaymentError, PaymentResult, VerifiedEvent, WebhookSecret};
use tracing::debug;

/// Header Stripe signs webhook deliveries with
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Events that should be enabled in the Stripe Dashboard for this endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = pass_core::HANDLED_EVENT_TYPES;

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse the header value
    pub fn parse(header: &str) -> PaymentResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    timestamp = value.parse().ok();
                }
                "v1" => {
                    signatures.push(value.to_string());
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            PaymentError::WebhookVerificationFailed(
                "Unable to extract timestamp and signatures from header".to_string(),
            )
        })?;

        if signatures.is_empty() {
            return Err(PaymentError::WebhookVerificationFailed(
                "No signatures found with expected scheme".to_string(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Verify a Stripe webhook delivery and decode its event.
pub fn construct_event(
    payload: &[u8],
    signature: Option<&str>,
    secret: &WebhookSecret,
    verifier: &HmacVerifier,
    received_at: DateTime<Utc>,
) -> PaymentResult<VerifiedEvent> {
    let header = signature.filter(|s| !s.is_empty()).ok_or_else(|| {
        PaymentError::WebhookVerificationFailed(
            "No stripe-signature header value was provided".to_string(),
        )
    })?;

    let header = SignatureHeader::parse(header)?;
    let signed = verifier.verify(
        payload,
        header.timestamp,
        &header.signatures,
        secret,
        received_at,
    )?;

    let event = VerifiedEvent::from_signed(signed, received_at)?;
    debug!(event_id = %event.id(), "Verified Stripe webhook: type={}", event.event_type());
    Ok(event)
}

/// Build a `Stripe-Signature` header value for `payload`.
///
/// Used to sign fixtures and to replay deliveries locally.
pub fn sign_payload(secret: &WebhookSecret, timestamp: i64, payload: &[u8]) -> PaymentResult<String> {
    let signature = pass_core::compute_signature(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, signature))
}
