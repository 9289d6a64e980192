use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;

use crate::error::BookingError;
use crate::AppState;

/// Header carrying the `t=...,v1=...` signature over the raw body.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/payments/webhook", post(payment_webhook))
}

// POST /api/payments/webhook
//
// The body must stay raw bytes: the signature covers the exact payload,
// so deserializing before verification would break it.
async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BookingError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    state.payments.handle_event(&body, signature).await?;

    Ok(Json(serde_json::json!({ "received": true })))
}
