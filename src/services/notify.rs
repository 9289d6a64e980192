//! Downstream booking confirmation.
//!
//! Confirmation is strictly fire-and-forget: the paid state is the source of
//! truth, and a lost notification never fails or delays a webhook response.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::NotificationConfig;
use crate::models::Booking;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Must return promptly and never surface failures to the caller.
    async fn booking_confirmed(&self, booking: &Booking);
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmationPayload {
    booking_id: Uuid,
    user_id: String,
    show_id: Uuid,
    seats: Vec<String>,
    amount_minor: i64,
}

/// Posts confirmations to the configured consumer on a detached task.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build notifier HTTP client");
        HttpNotifier { client, url }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn booking_confirmed(&self, booking: &Booking) {
        let payload = ConfirmationPayload {
            booking_id: booking.id,
            user_id: booking.user_id.clone(),
            show_id: booking.show_id,
            seats: booking.seats.iter().map(ToString::to_string).collect(),
            amount_minor: booking.amount_minor,
        };
        let client = self.client.clone();
        let url = self.url.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&payload).send().await {
                Ok(resp) if !resp.status().is_success() => {
                    tracing::warn!("confirmation notify answered {}", resp.status());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("confirmation notify failed: {e}"),
            }
        });
    }
}

/// Used when no consumer is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn booking_confirmed(&self, booking: &Booking) {
        tracing::info!(
            "booking {} confirmed for user {} ({} seats)",
            booking.id,
            booking.user_id,
            booking.seats.len()
        );
    }
}

pub fn from_config(config: &NotificationConfig) -> Arc<dyn Notifier> {
    match &config.confirmation_url {
        Some(url) => Arc::new(HttpNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}
