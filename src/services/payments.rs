//! Payment provider webhook processing.
//!
//! The pipeline is authenticate, deduplicate, resolve, apply. Dedup uses the
//! processed-events ledger; the status-guarded Pending→Paid transition is
//! the backstop that makes duplicated and reordered deliveries harmless even
//! when a ledger write is lost.

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::error::BookingError;
use crate::services::gateway::CheckoutGateway;
use crate::services::notify::Notifier;
use crate::services::signature::SignatureVerifier;
use crate::store::{BookingStore, PaidOutcome};

pub const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const EVENT_PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventParseError {
    #[error("invalid event json: {0}")]
    Json(String),

    #[error("event missing {0}")]
    MissingField(&'static str),
}

/// The two supported event shapes resolve to a booking id through different
/// paths; everything else is acknowledged and ignored.
#[derive(Debug, PartialEq, Eq)]
pub enum PaymentEvent {
    /// Carries the booking id directly in session metadata.
    CheckoutCompleted {
        event_id: String,
        booking_id: Option<Uuid>,
    },
    /// Carries only the payment reference; the originating checkout session
    /// has to be looked up at the gateway.
    PaymentSucceeded {
        event_id: String,
        payment_ref: String,
    },
    Unrecognized { event_id: String, kind: String },
}

impl PaymentEvent {
    pub fn event_id(&self) -> &str {
        match self {
            PaymentEvent::CheckoutCompleted { event_id, .. } => event_id,
            PaymentEvent::PaymentSucceeded { event_id, .. } => event_id,
            PaymentEvent::Unrecognized { event_id, .. } => event_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: RawData,
}

#[derive(Debug, Default, Deserialize)]
struct RawData {
    #[serde(default)]
    object: Value,
}

pub fn parse_event(raw: &[u8]) -> Result<PaymentEvent, EventParseError> {
    let event: RawEvent =
        serde_json::from_slice(raw).map_err(|e| EventParseError::Json(e.to_string()))?;
    Ok(match event.kind.as_str() {
        EVENT_CHECKOUT_COMPLETED => {
            let booking_id = event
                .data
                .object
                .get("metadata")
                .and_then(|m| m.get("bookingId"))
                .and_then(Value::as_str)
                .and_then(|s| Uuid::parse_str(s).ok());
            PaymentEvent::CheckoutCompleted {
                event_id: event.id,
                booking_id,
            }
        }
        EVENT_PAYMENT_SUCCEEDED => {
            let payment_ref = event
                .data
                .object
                .get("id")
                .and_then(Value::as_str)
                .ok_or(EventParseError::MissingField("payment reference"))?
                .to_string();
            PaymentEvent::PaymentSucceeded {
                event_id: event.id,
                payment_ref,
            }
        }
        _ => PaymentEvent::Unrecognized {
            event_id: event.id,
            kind: event.kind,
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAck {
    /// The booking transitioned to Paid in this call.
    Applied,
    /// This event, or another event for the same payment, was applied
    /// before.
    AlreadyApplied,
    /// Authenticated but nothing to apply (unhandled type, terminal
    /// booking).
    Ignored,
}

#[derive(Clone)]
pub struct PaymentEventProcessor {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn CheckoutGateway>,
    notifier: Arc<dyn Notifier>,
    verifier: SignatureVerifier,
}

impl PaymentEventProcessor {
    pub fn new(
        store: Arc<dyn BookingStore>,
        gateway: Arc<dyn CheckoutGateway>,
        notifier: Arc<dyn Notifier>,
        verifier: SignatureVerifier,
    ) -> Self {
        PaymentEventProcessor {
            store,
            gateway,
            notifier,
            verifier,
        }
    }

    pub async fn handle_event(
        &self,
        raw: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookAck, BookingError> {
        // Authentication runs over the exact request bytes; nothing is
        // parsed until the signature checks out.
        let header = signature_header.ok_or(BookingError::Unauthenticated)?;
        if let Err(e) = self.verifier.verify(raw, header, Utc::now().timestamp()) {
            tracing::warn!("webhook signature rejected: {e}");
            return Err(BookingError::Unauthenticated);
        }

        let event = parse_event(raw).map_err(|e| {
            tracing::error!("authenticated webhook with unusable body: {e}");
            BookingError::ResolutionFailed(e.to_string())
        })?;
        let event_id = event.event_id().to_string();

        if self.store.ledger_contains(&event_id).await? {
            tracing::debug!("event {event_id} already applied");
            return Ok(WebhookAck::AlreadyApplied);
        }

        let booking_id = match event {
            PaymentEvent::CheckoutCompleted { booking_id, .. } => booking_id.ok_or_else(|| {
                BookingError::ResolutionFailed(format!(
                    "event {event_id} carries no booking metadata"
                ))
            })?,
            PaymentEvent::PaymentSucceeded { payment_ref, .. } => {
                self.resolve_payment(&payment_ref).await?
            }
            PaymentEvent::Unrecognized { kind, .. } => {
                tracing::info!("ignoring unhandled event type {kind}");
                return Ok(WebhookAck::Ignored);
            }
        };

        match self.store.mark_paid(booking_id, Utc::now()).await? {
            PaidOutcome::Applied(booking) => {
                tracing::info!("booking {} paid (event {event_id})", booking.id);
                self.notifier.booking_confirmed(&booking).await;
                self.record(&event_id).await;
                Ok(WebhookAck::Applied)
            }
            PaidOutcome::AlreadyPaid => {
                // The same payment arrived under another event shape.
                self.record(&event_id).await;
                Ok(WebhookAck::AlreadyApplied)
            }
            PaidOutcome::Cancelled => {
                // Terminal state, retrying cannot help: the charge exists
                // but the hold is gone. Flag for operator follow-up.
                tracing::error!("paid event {event_id} for cancelled booking {booking_id}");
                self.record(&event_id).await;
                Ok(WebhookAck::Ignored)
            }
            PaidOutcome::NotFound => Err(BookingError::ResolutionFailed(format!(
                "no booking {booking_id} for event {event_id}"
            ))),
        }
    }

    async fn resolve_payment(&self, payment_ref: &str) -> Result<Uuid, BookingError> {
        let session = self
            .gateway
            .session_for_payment(payment_ref)
            .await
            .map_err(|e| {
                tracing::warn!("session lookup failed for payment {payment_ref}: {e}");
                BookingError::ResolutionFailed(format!(
                    "session lookup failed for payment {payment_ref}"
                ))
            })?;
        session.and_then(|s| s.booking_id).ok_or_else(|| {
            BookingError::ResolutionFailed(format!("no checkout session for payment {payment_ref}"))
        })
    }

    // Best-effort: a lost write only costs one extra no-op delivery, which
    // the status guard absorbs.
    async fn record(&self, event_id: &str) {
        match self.store.ledger_record(event_id).await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("event {event_id} recorded concurrently"),
            Err(e) => tracing::warn!("ledger write failed for event {event_id}: {e}"),
        }
    }
}
