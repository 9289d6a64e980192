use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookingStore, NewBooking, PaidOutcome, ReserveOutcome, StoreError};
use crate::models::{Booking, BookingStatus, Show};
use crate::seatmap::SeatId;

/// In-memory store for tests and local runs. A single mutex held across the
/// occupancy check and the insert gives the same indivisible
/// check-and-create the Postgres store gets from its per-show transaction
/// lock.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    shows: HashMap<Uuid, Show>,
    bookings: HashMap<Uuid, Booking>,
    ledger: HashSet<String>,
}

impl Inner {
    fn occupied(&self, show_id: Uuid) -> BTreeSet<SeatId> {
        self.bookings
            .values()
            .filter(|b| b.show_id == show_id && b.holds_seats())
            .flat_map(|b| b.seats.iter().copied())
            .collect()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_show(&self, show: Show) {
        self.inner.lock().await.shows.insert(show.id, show);
    }
}

#[async_trait]
impl BookingStore for MemStore {
    async fn show(&self, show_id: Uuid) -> Result<Option<Show>, StoreError> {
        Ok(self.inner.lock().await.shows.get(&show_id).cloned())
    }

    async fn occupied_seats(&self, show_id: Uuid) -> Result<BTreeSet<SeatId>, StoreError> {
        Ok(self.inner.lock().await.occupied(show_id))
    }

    async fn create_booking(&self, new: NewBooking) -> Result<ReserveOutcome, StoreError> {
        let mut inner = self.inner.lock().await;

        let occupied = inner.occupied(new.show_id);
        let conflicts: Vec<SeatId> = new
            .seats
            .iter()
            .filter(|s| occupied.contains(s))
            .copied()
            .collect();
        if !conflicts.is_empty() {
            return Ok(ReserveOutcome::Conflict(conflicts));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            show_id: new.show_id,
            user_id: new.user_id,
            seats: new.seats,
            status: BookingStatus::Pending,
            amount_minor: new.amount_minor,
            session_ref: None,
            created_at: Utc::now(),
            paid_at: None,
        };
        inner.bookings.insert(booking.id, booking.clone());
        Ok(ReserveOutcome::Created(booking))
    }

    async fn attach_session_ref(
        &self,
        booking_id: Uuid,
        session_ref: &str,
    ) -> Result<(), StoreError> {
        if let Some(b) = self.inner.lock().await.bookings.get_mut(&booking_id) {
            if b.status == BookingStatus::Pending {
                b.session_ref = Some(session_ref.to_string());
            }
        }
        Ok(())
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.inner.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        let inner = self.inner.lock().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn mark_paid(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(booking) = inner.bookings.get_mut(&booking_id) else {
            return Ok(PaidOutcome::NotFound);
        };
        match booking.status {
            BookingStatus::Paid => Ok(PaidOutcome::AlreadyPaid),
            BookingStatus::Cancelled => Ok(PaidOutcome::Cancelled),
            BookingStatus::Pending => {
                booking.status = BookingStatus::Paid;
                booking.paid_at = Some(paid_at);
                booking.session_ref = None;
                Ok(PaidOutcome::Applied(booking.clone()))
            }
        }
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.bookings.get_mut(&booking_id) {
            Some(b) if b.status == BookingStatus::Pending => {
                b.status = BookingStatus::Cancelled;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut inner = self.inner.lock().await;
        let mut released = Vec::new();
        for b in inner.bookings.values_mut() {
            if b.status == BookingStatus::Pending && b.created_at < cutoff {
                b.status = BookingStatus::Cancelled;
                released.push(b.clone());
            }
        }
        Ok(released)
    }

    async fn ledger_contains(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.ledger.contains(event_id))
    }

    async fn ledger_record(&self, event_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.ledger.insert(event_id.to_string()))
    }
}
