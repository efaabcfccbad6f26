//! # Webhook Signatures
//!
//! Timestamped HMAC-SHA256 verification over raw webhook bytes.
//!
//! The signed message is `"<timestamp>." ++ body`, exactly as received.
//! The body is never decoded or re-serialized before hashing.
//!
//! A successful check yields a [`SignedPayload`], which is the only way to
//! obtain one. [`crate::event::VerifiedEvent`] can only be built from it.

use crate::error::{PaymentError, PaymentResult};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default replay window, matching the provider's own library.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Widest accepted replay window (one day)
pub const MAX_TOLERANCE_SECS: i64 = 86_400;

/// Webhook signing secret. Never printed by `Debug`.
#[derive(Clone)]
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(SecretString::new(secret.into()))
    }

    fn key(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }
}

impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret([REDACTED])")
    }
}

/// Proof that a body passed signature verification.
#[derive(Debug)]
pub struct SignedPayload<'a> {
    body: &'a [u8],
    timestamp: i64,
}

impl<'a> SignedPayload<'a> {
    /// The verified bytes
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Signing timestamp from the header
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Verifies timestamped HMAC-SHA256 signatures
#[derive(Debug, Clone, Copy)]
pub struct HmacVerifier {
    tolerance: Duration,
}

impl Default for HmacVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE_SECS)
    }
}

impl HmacVerifier {
    /// Tolerance is clamped to `0..=MAX_TOLERANCE_SECS`
    pub fn new(tolerance_secs: i64) -> Self {
        let secs = tolerance_secs.clamp(0, MAX_TOLERANCE_SECS);
        Self {
            tolerance: Duration::try_seconds(secs).unwrap_or_else(Duration::zero),
        }
    }

    pub fn tolerance_secs(&self) -> i64 {
        self.tolerance.num_seconds()
    }

    /// Check `body` against the hex-encoded `candidates` signed at `timestamp`.
    ///
    /// Any one matching candidate is enough. Comparison is constant-time.
    pub fn verify<'a>(
        &self,
        body: &'a [u8],
        timestamp: i64,
        candidates: &[String],
        secret: &WebhookSecret,
        now: DateTime<Utc>,
    ) -> PaymentResult<SignedPayload<'a>> {
        let mac = signing_mac(secret, timestamp, body)?;

        let matched = candidates.iter().any(|candidate| match hex::decode(candidate) {
            Ok(bytes) => mac.clone().verify_slice(&bytes).is_ok(),
            Err(_) => false,
        });

        if !matched {
            return Err(PaymentError::WebhookVerificationFailed(
                "No signatures found matching the expected signature for payload".to_string(),
            ));
        }

        let age = now.timestamp() - timestamp;
        if age.abs() > self.tolerance.num_seconds() {
            return Err(PaymentError::WebhookVerificationFailed(
                "Timestamp outside the tolerance zone".to_string(),
            ));
        }

        Ok(SignedPayload { body, timestamp })
    }
}

/// Hex signature for `body` at `timestamp`. Used to sign outgoing test payloads.
pub fn compute_signature(
    secret: &WebhookSecret,
    timestamp: i64,
    body: &[u8],
) -> PaymentResult<String> {
    let mac = signing_mac(secret, timestamp, body)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn signing_mac(secret: &WebhookSecret, timestamp: i64, body: &[u8]) -> PaymentResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.key())
        .map_err(|e| PaymentError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}
