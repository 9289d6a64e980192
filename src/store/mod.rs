pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Booking, Show};
use crate::seatmap::SeatId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt row: {0}")]
    Decode(String),
}

/// Input to an atomic reservation. Validation (seat-map membership, size,
/// duplicates) happens before this is built; the store only arbitrates
/// conflicts with concurrent holders.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<SeatId>,
    pub amount_minor: i64,
}

#[derive(Debug)]
pub enum ReserveOutcome {
    Created(Booking),
    /// The reservation lost the race; names every requested seat that is
    /// already held.
    Conflict(Vec<SeatId>),
}

#[derive(Debug)]
pub enum PaidOutcome {
    /// The booking moved Pending to Paid in this call.
    Applied(Booking),
    /// Already Paid; repeated confirmation is a no-op success.
    AlreadyPaid,
    /// The booking reached Cancelled first; terminal states never mutate.
    Cancelled,
    NotFound,
}

/// The authoritative booking store.
///
/// Occupancy is always derived from live bookings inside the store, never
/// kept as separate state, so every implementation answers reservations
/// against the same snapshot it commits them into. `create_booking` and
/// `mark_paid` carry the two atomicity obligations: check-and-create is
/// indivisible per show, and the paid transition is guarded by current
/// status.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn show(&self, show_id: Uuid) -> Result<Option<Show>, StoreError>;

    /// Seats held by Pending or Paid bookings of the show.
    async fn occupied_seats(&self, show_id: Uuid) -> Result<BTreeSet<SeatId>, StoreError>;

    /// Atomically re-checks occupancy and creates a Pending booking, or
    /// reports the conflicting seats.
    async fn create_booking(&self, new: NewBooking) -> Result<ReserveOutcome, StoreError>;

    /// Records the checkout session reference on a freshly created booking.
    /// No-op once the booking has left Pending: settled bookings keep their
    /// cleared reference.
    async fn attach_session_ref(
        &self,
        booking_id: Uuid,
        session_ref: &str,
    ) -> Result<(), StoreError>;

    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError>;

    /// Pending→Paid, conditional on the booking still being Pending.
    async fn mark_paid(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidOutcome, StoreError>;

    /// Pending→Cancelled, freeing the seats. Returns false if the booking
    /// was not Pending (or does not exist).
    async fn cancel_booking(&self, booking_id: Uuid) -> Result<bool, StoreError>;

    /// Cancels every Pending booking created before `cutoff` and frees its
    /// seats; returns the released bookings.
    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Idempotency ledger: has this provider event id been applied?
    async fn ledger_contains(&self, event_id: &str) -> Result<bool, StoreError>;

    /// Idempotency ledger: record an applied event id. Returns false if it
    /// was already present (lost a race with a concurrent delivery).
    async fn ledger_record(&self, event_id: &str) -> Result<bool, StoreError>;
}
