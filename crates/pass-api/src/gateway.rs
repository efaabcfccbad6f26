//! # Webhook Gateway
//!
//! Receives signed event deliveries, verifies them, claims the event id and
//! dispatches to the event handler.
//!
//! ```text
//! method ─▶ secret ─▶ verify(raw bytes) ─▶ claim id ─▶ dispatch ─▶ 200
//!   405       500          400               dup:200     500
//! ```

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use chrono::{DateTime, Utc};
use pass_core::{
    dispatch_event, BoxedDedupStore, BoxedPaymentProvider, DispatchOutcome, EventHandler,
    WebhookError, WebhookSecret,
};
use pass_stripe::SIGNATURE_HEADER;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// A webhook delivery as it came off the wire
#[derive(Debug, Clone)]
pub struct RawWebhookRequest {
    /// Unparsed body
    pub body: Bytes,
    /// Signature header value, if sent
    pub signature: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl RawWebhookRequest {
    /// Capture body and signature header
    pub fn from_parts(headers: &HeaderMap, body: Bytes) -> Self {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self {
            body,
            signature,
            received_at: Utc::now(),
        }
    }
}

/// What happened to an accepted delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A dedicated handler ran
    Dispatched { event_id: String },
    /// Already processed; nothing done
    Duplicate { event_id: String },
    /// Event type without a handler; logged only
    Ignored { event_id: String },
}

/// Outcome of one webhook request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingResult {
    Accepted(Delivery),
    Rejected(WebhookError),
}

impl ProcessingResult {
    pub fn status_code(&self) -> u16 {
        match self {
            ProcessingResult::Accepted(_) => 200,
            ProcessingResult::Rejected(err) => err.status_code(),
        }
    }
}

impl From<Result<Delivery, WebhookError>> for ProcessingResult {
    fn from(result: Result<Delivery, WebhookError>) -> Self {
        match result {
            Ok(delivery) => ProcessingResult::Accepted(delivery),
            Err(err) => ProcessingResult::Rejected(err),
        }
    }
}

/// Webhook ingestion gateway
pub struct WebhookGateway {
    provider: BoxedPaymentProvider,
    secret: Option<WebhookSecret>,
    handler: Arc<dyn EventHandler>,
    dedup: BoxedDedupStore,
}

impl WebhookGateway {
    pub fn new(
        provider: BoxedPaymentProvider,
        secret: Option<WebhookSecret>,
        handler: Arc<dyn EventHandler>,
        dedup: BoxedDedupStore,
    ) -> Self {
        Self {
            provider,
            secret,
            handler,
            dedup,
        }
    }

    /// Only POST is accepted. Checked before the body is read.
    pub fn check_method(&self, method: &Method) -> Result<(), WebhookError> {
        if *method == Method::POST {
            Ok(())
        } else {
            Err(WebhookError::MethodNotAllowed)
        }
    }

    /// Process one delivery
    pub async fn handle(&self, method: &Method, request: RawWebhookRequest) -> ProcessingResult {
        self.process(method, request).await.into()
    }

    #[instrument(skip_all, fields(provider = self.provider.provider_name()))]
    async fn process(
        &self,
        method: &Method,
        request: RawWebhookRequest,
    ) -> Result<Delivery, WebhookError> {
        self.check_method(method)?;

        let secret = self.secret.as_ref().ok_or_else(|| {
            error!("Webhook secret not configured, refusing delivery");
            WebhookError::NotConfigured
        })?;

        let event = self
            .provider
            .verify_webhook(
                &request.body,
                request.signature.as_deref(),
                secret,
                request.received_at,
            )
            .map_err(|e| {
                warn!("Webhook verification failed: {}", e);
                WebhookError::from(e)
            })?;

        let event_id = event.id().to_string();
        let event_type = event.event_type().to_string();
        info!(event_id = %event_id, "Webhook received: {}", event_type);

        let first_delivery = self.dedup.mark_seen(&event_id).await.map_err(|e| {
            error!(event_id = %event_id, event_type = %event_type, "Dedup store error: {}", e);
            WebhookError::InternalDispatchFailure {
                event_id: event_id.clone(),
                event_type: event_type.clone(),
                message: e.to_string(),
            }
        })?;

        if !first_delivery {
            info!(event_id = %event_id, "Duplicate delivery of {}, skipping", event_type);
            return Ok(Delivery::Duplicate { event_id });
        }

        match dispatch_event(self.handler.as_ref(), &event) {
            Ok(DispatchOutcome::Handled) => Ok(Delivery::Dispatched { event_id }),
            Ok(DispatchOutcome::Unhandled | DispatchOutcome::Malformed) => {
                Ok(Delivery::Ignored { event_id })
            }
            Err(e) => {
                error!(
                    event_id = %event_id,
                    event_type = %event_type,
                    "Error handling webhook event: {}",
                    e
                );
                // Let the provider's redelivery try again
                if let Err(release_err) = self.dedup.release(&event_id).await {
                    error!(event_id = %event_id, "Failed to release dedup claim: {}", release_err);
                }
                Err(WebhookError::InternalDispatchFailure {
                    event_id,
                    event_type,
                    message: e.to_string(),
                })
            }
        }
    }
}
