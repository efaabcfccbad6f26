//! # Event Dispatch
//!
//! Routes a verified event to the handler method for its type.
//!
//! Handlers run inline on the webhook request, so they must be quick and
//! must not block on I/O. Anything slow belongs on a queue or a spawned task.
//! They must also tolerate being called again for the same event should a
//! claim be released after a failure.

use crate::error::PaymentResult;
use crate::event::{CheckoutSessionCompleted, EventKind, InvoicePaymentFailed, VerifiedEvent};
use serde_json::Value;
use tracing::{info, warn};

/// Per-type webhook event handlers.
///
/// Every method has a logging default, so implementors override only the
/// events they act on.
#[allow(unused_variables)]
pub trait EventHandler: Send + Sync {
    /// Called when a checkout session is completed
    fn on_checkout_session_completed(
        &self,
        event: &VerifiedEvent,
        session: &CheckoutSessionCompleted,
    ) -> PaymentResult<()> {
        info!(
            event_id = %event.id(),
            session_id = %session.id,
            amount_total = ?session.amount_total,
            "Checkout session completed"
        );
        Ok(())
    }

    /// Called when an invoice payment attempt fails
    fn on_invoice_payment_failed(
        &self,
        event: &VerifiedEvent,
        invoice: &InvoicePaymentFailed,
    ) -> PaymentResult<()> {
        warn!(
            event_id = %event.id(),
            invoice_id = %invoice.id,
            attempt_count = ?invoice.attempt_count,
            "Invoice payment failed"
        );
        Ok(())
    }

    /// Called for every other event type. Cannot fail.
    fn on_unhandled(&self, event: &VerifiedEvent, event_type: &str, payload: &Value) {
        info!(event_id = %event.id(), "Unhandled event type {}", event_type);
    }

    /// Called when a handled type arrives with an object of the wrong shape.
    /// The delivery is still acknowledged. Cannot fail.
    fn on_malformed(&self, event: &VerifiedEvent, event_type: &str, payload: &Value, reason: &str) {
        warn!(event_id = %event.id(), reason = %reason, "Malformed {} payload", event_type);
    }
}

/// Default handler (just logs events)
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {}

/// How dispatch went for an event that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A dedicated handler ran
    Handled,
    /// No handler for this type; only logged
    Unhandled,
    /// Handled type that could not be decoded; only logged
    Malformed,
}

/// Dispatch a verified event to the appropriate handler method
pub fn dispatch_event(handler: &dyn EventHandler, event: &VerifiedEvent) -> PaymentResult<DispatchOutcome> {
    match event.kind() {
        EventKind::CheckoutSessionCompleted(session) => {
            handler.on_checkout_session_completed(event, session)?;
            Ok(DispatchOutcome::Handled)
        }
        EventKind::InvoicePaymentFailed(invoice) => {
            handler.on_invoice_payment_failed(event, invoice)?;
            Ok(DispatchOutcome::Handled)
        }
        EventKind::Unknown {
            event_type,
            payload,
        } => {
            handler.on_unhandled(event, event_type, payload);
            Ok(DispatchOutcome::Unhandled)
        }
        EventKind::Malformed {
            event_type,
            payload,
            reason,
        } => {
            handler.on_malformed(event, event_type, payload, reason);
            Ok(DispatchOutcome::Malformed)
        }
    }
}
