//! Seat reservation.
//!
//! The occupancy check and the booking insert are one indivisible store
//! operation; everything network-bound (the checkout session) happens after
//! the commit, with cancellation as the compensation when it fails.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::BookingError;
use crate::models::{Booking, Show, MAX_SEATS_PER_BOOKING};
use crate::seatmap::{SeatId, SeatMap};
use crate::services::gateway::{CheckoutGateway, GatewayError};
use crate::store::{BookingStore, NewBooking, ReserveOutcome};

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn BookingStore>,
    gateway: Arc<dyn CheckoutGateway>,
}

#[derive(Debug)]
pub struct Reservation {
    pub booking_id: Uuid,
    pub checkout_url: String,
}

impl ReservationService {
    pub fn new(store: Arc<dyn BookingStore>, gateway: Arc<dyn CheckoutGateway>) -> Self {
        ReservationService { store, gateway }
    }

    /// Seats currently held by pending or paid bookings. Advisory for
    /// clients; `reserve` re-checks inside the atomic step.
    pub async fn occupied_seats(&self, show_id: Uuid) -> Result<BTreeSet<SeatId>, BookingError> {
        self.store
            .show(show_id)
            .await?
            .ok_or(BookingError::ShowNotFound)?;
        Ok(self.store.occupied_seats(show_id).await?)
    }

    pub async fn reserve(
        &self,
        show_id: Uuid,
        user_id: &str,
        seats: &[SeatId],
    ) -> Result<Reservation, BookingError> {
        let show = self
            .store
            .show(show_id)
            .await?
            .ok_or(BookingError::ShowNotFound)?;
        validate_selection(seats, &show.seat_map())?;

        let new = NewBooking {
            show_id,
            user_id: user_id.to_string(),
            seats: seats.to_vec(),
            amount_minor: show.price_minor * seats.len() as i64,
        };
        let booking = match self.store.create_booking(new).await? {
            ReserveOutcome::Created(booking) => booking,
            ReserveOutcome::Conflict(conflicts) => {
                return Err(BookingError::SeatUnavailable(conflicts));
            }
        };

        match self.checkout_for(&booking, &show).await {
            Ok((session_ref, checkout_url)) => {
                if let Err(e) = self.store.attach_session_ref(booking.id, &session_ref).await {
                    tracing::error!(
                        "failed to attach session {session_ref} to booking {}: {e}",
                        booking.id
                    );
                    self.rollback(booking.id).await;
                    return Err(e.into());
                }
                tracing::info!(
                    "booking {} created for show {} ({} seats)",
                    booking.id,
                    show_id,
                    seats.len()
                );
                Ok(Reservation {
                    booking_id: booking.id,
                    checkout_url,
                })
            }
            Err(err) => {
                tracing::warn!("checkout session failed for booking {}: {err}", booking.id);
                self.rollback(booking.id).await;
                Err(err.into())
            }
        }
    }

    pub async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.bookings_for_user(user_id).await?)
    }

    async fn checkout_for(
        &self,
        booking: &Booking,
        show: &Show,
    ) -> Result<(String, String), GatewayError> {
        let session = self.gateway.create_session(booking, show).await?;
        let url = session.url.ok_or_else(|| {
            GatewayError::Malformed("checkout session missing redirect url".to_string())
        })?;
        Ok((session.id, url))
    }

    /// Frees the seats after a failed checkout. If the cancel itself fails,
    /// the expiry sweep reclaims the hold.
    async fn rollback(&self, booking_id: Uuid) {
        if let Err(e) = self.store.cancel_booking(booking_id).await {
            tracing::error!("failed to cancel booking {booking_id}: {e}");
        }
    }
}

fn validate_selection(seats: &[SeatId], map: &SeatMap) -> Result<(), BookingError> {
    if seats.is_empty() {
        return Err(BookingError::InvalidSelection("no seats selected".into()));
    }
    if seats.len() > MAX_SEATS_PER_BOOKING {
        return Err(BookingError::InvalidSelection(format!(
            "at most {MAX_SEATS_PER_BOOKING} seats per booking"
        )));
    }
    let mut seen = HashSet::new();
    for seat in seats {
        if !map.contains(seat) {
            return Err(BookingError::InvalidSelection(format!(
                "seat {seat} is not on the seat map"
            )));
        }
        if !seen.insert(*seat) {
            return Err(BookingError::InvalidSelection(format!(
                "seat {seat} selected twice"
            )));
        }
    }
    Ok(())
}
