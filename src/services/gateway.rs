//! Checkout session gateway client.
//!
//! The payment provider hosts the actual checkout flow; this service only
//! creates a session bound to a booking (reservation path) and resolves a
//! payment reference back to its originating session (webhook path).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::models::{Booking, Show};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("gateway returned an unusable response: {0}")]
    Malformed(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    /// Redirect URL. Present on freshly created sessions; lookups of
    /// completed sessions may not carry one.
    pub url: Option<String>,
    /// Booking bound to the session via metadata at creation time.
    pub booking_id: Option<Uuid>,
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Creates a provider-hosted checkout session for the booking, with the
    /// booking id attached as session metadata.
    async fn create_session(
        &self,
        booking: &Booking,
        show: &Show,
    ) -> Result<CheckoutSession, GatewayError>;

    /// Finds the checkout session that originated a payment reference, or
    /// None if the provider knows no such session.
    async fn session_for_payment(
        &self,
        payment_ref: &str,
    ) -> Result<Option<CheckoutSession>, GatewayError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    amount: i64,
    currency: &'a str,
    description: String,
    success_url: &'a str,
    cancel_url: &'a str,
    metadata: SessionMetadata,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    booking_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    metadata: SessionMetadata,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    data: Vec<SessionBody>,
}

impl From<SessionBody> for CheckoutSession {
    fn from(body: SessionBody) -> Self {
        CheckoutSession {
            id: body.id,
            url: body.url,
            booking_id: body.metadata.booking_id,
        }
    }
}

pub struct HttpCheckoutGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
    currency: String,
    success_url: String,
    cancel_url: String,
}

impl HttpCheckoutGateway {
    pub fn from_config(config: &PaymentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build gateway HTTP client");
        HttpCheckoutGateway {
            client,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            currency: config.currency.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }
}

#[async_trait]
impl CheckoutGateway for HttpCheckoutGateway {
    async fn create_session(
        &self,
        booking: &Booking,
        show: &Show,
    ) -> Result<CheckoutSession, GatewayError> {
        let request = CreateSessionRequest {
            amount: booking.amount_minor,
            currency: &self.currency,
            description: format!("{} ({} seats)", show.movie_title, booking.seats.len()),
            success_url: &self.success_url,
            cancel_url: &self.cancel_url,
            metadata: SessionMetadata {
                booking_id: Some(booking.id),
            },
        };

        let body: SessionBody = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(body.into())
    }

    async fn session_for_payment(
        &self,
        payment_ref: &str,
    ) -> Result<Option<CheckoutSession>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .query(&[("payment_ref", payment_ref), ("limit", "1")])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let list: SessionList = response.error_for_status()?.json().await?;
        Ok(list.data.into_iter().next().map(Into::into))
    }
}
