use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seatmap::SeatId;

pub const MAX_SEATS_PER_BOOKING: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Paid,
    Cancelled,
}

impl BookingStatus {
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "paid" => Some(BookingStatus::Paid),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// A user's claim on a seat set for one show.
///
/// The seat set is fixed at creation. The only mutations over a booking's
/// lifetime are Pending→Paid (webhook confirmation) and Pending→Cancelled
/// (gateway rollback or expiry), plus the one-shot session reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<SeatId>,
    pub status: BookingStatus,
    /// Total due: seat count times the show's per-seat price.
    pub amount_minor: i64,
    /// Checkout session reference, set when the session is created and
    /// cleared when the booking is paid.
    pub session_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Live bookings hold their seats against new reservations.
    pub fn holds_seats(&self) -> bool {
        matches!(self.status, BookingStatus::Pending | BookingStatus::Paid)
    }
}
