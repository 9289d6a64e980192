use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::BookingError;
use crate::middleware::AuthUser;
use crate::models::Booking;
use crate::seatmap::SeatId;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/booking/seats/{show_id}", get(occupied_seats))
        .route("/booking/create", post(create_booking))
        .route("/booking/mine", get(my_bookings))
}

/* ---------- SEATS ---------- */

// GET /api/booking/seats/{show_id}
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OccupiedSeatsResponse {
    success: bool,
    occupied_seats: Vec<SeatId>,
}

// Advisory snapshot for seat-map rendering; create re-checks atomically.
async fn occupied_seats(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<Uuid>,
) -> Result<impl IntoResponse, BookingError> {
    let occupied = state.reservations.occupied_seats(show_id).await?;
    Ok(Json(OccupiedSeatsResponse {
        success: true,
        occupied_seats: occupied.into_iter().collect(),
    }))
}

/* ---------- BOOKINGS ---------- */

// POST /api/booking/create
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub show_id: Uuid,
    #[validate(length(min = 1, max = 5, message = "select between 1 and 5 seats"))]
    pub selected_seats: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingResponse {
    success: bool,
    booking_id: Uuid,
    url: String,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, BookingError> {
    req.validate()
        .map_err(|e| BookingError::InvalidSelection(e.to_string()))?;

    let seats = req
        .selected_seats
        .iter()
        .map(|raw| {
            raw.parse::<SeatId>()
                .map_err(|e| BookingError::InvalidSelection(e.to_string()))
        })
        .collect::<Result<Vec<SeatId>, _>>()?;

    let reservation = state
        .reservations
        .reserve(req.show_id, &user.user_id, &seats)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            success: true,
            booking_id: reservation.booking_id,
            url: reservation.checkout_url,
        }),
    ))
}

// GET /api/booking/mine
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MyBookingsResponse {
    success: bool,
    bookings: Vec<Booking>,
}

async fn my_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, BookingError> {
    let bookings = state.reservations.bookings_for_user(&user.user_id).await?;
    Ok(Json(MyBookingsResponse {
        success: true,
        bookings,
    }))
}
