use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::seatmap::SeatId;
use crate::services::gateway::GatewayError;
use crate::store::StoreError;

/// Everything the reservation and webhook paths can answer with.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("invalid seat selection: {0}")]
    InvalidSelection(String),

    #[error("seats already taken: {}", fmt_seats(.0))]
    SeatUnavailable(Vec<SeatId>),

    #[error("show not found")]
    ShowNotFound,

    #[error("payment gateway unavailable")]
    GatewayUnavailable(#[from] GatewayError),

    #[error("authentication failed")]
    Unauthenticated,

    #[error("event cannot be matched to a booking: {0}")]
    ResolutionFailed(String),

    #[error("storage failure")]
    Store(#[from] StoreError),
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::InvalidSelection(_) => StatusCode::BAD_REQUEST,
            BookingError::SeatUnavailable(_) => StatusCode::CONFLICT,
            BookingError::ShowNotFound => StatusCode::NOT_FOUND,
            BookingError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            BookingError::Unauthenticated => StatusCode::UNAUTHORIZED,
            // Retryable: the provider redelivers until resolution succeeds.
            BookingError::ResolutionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    conflicting_seats: Option<Vec<String>>,
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {self} ({status})");
        } else {
            tracing::warn!("request rejected: {self} ({status})");
        }

        let conflicting_seats = match &self {
            BookingError::SeatUnavailable(seats) => {
                Some(seats.iter().map(ToString::to_string).collect())
            }
            _ => None,
        };

        let body = ApiError {
            success: false,
            message: self.to_string(),
            conflicting_seats,
        };
        (status, Json(body)).into_response()
    }
}

fn fmt_seats(seats: &[SeatId]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
