use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use uuid::Uuid;

use super::{BookingStore, NewBooking, PaidOutcome, ReserveOutcome, StoreError};
use crate::models::{Booking, BookingStatus, Show};
use crate::seatmap::SeatId;

/// Postgres-backed store.
///
/// Reservations for one show serialize on a transaction-scoped advisory
/// lock, so the occupancy read and the insert commit as one indivisible
/// step. The `booking_seats` table keeps one row per live seat claim with a
/// `UNIQUE (show_id, seat_id)` key as the store-level backstop; rows are
/// deleted when a booking leaves the live set.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    show_id: Uuid,
    user_id: String,
    seats: Vec<String>,
    status: String,
    amount_minor: i64,
    session_ref: Option<String>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, StoreError> {
        let status = BookingStatus::from_db(&self.status)
            .ok_or_else(|| StoreError::Decode(format!("unknown booking status {:?}", self.status)))?;
        let seats = self
            .seats
            .iter()
            .map(|s| s.parse::<SeatId>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Booking {
            id: self.id,
            show_id: self.show_id,
            user_id: self.user_id,
            seats,
            status,
            amount_minor: self.amount_minor,
            session_ref: self.session_ref,
            created_at: self.created_at,
            paid_at: self.paid_at,
        })
    }
}

impl PgStore {
    pub async fn connect(database_url: &str, pool_size: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(PgStore { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/migrations").run(&self.pool).await
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn show(&self, show_id: Uuid) -> Result<Option<Show>, StoreError> {
        let show: Option<Show> = sqlx::query_as(
            "SELECT id, movie_title, starts_at, price_minor, seat_rows, seats_per_row
             FROM shows WHERE id = $1",
        )
        .bind(show_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(show)
    }

    async fn occupied_seats(&self, show_id: Uuid) -> Result<BTreeSet<SeatId>, StoreError> {
        let held: Vec<String> =
            sqlx::query_scalar("SELECT seat_id FROM booking_seats WHERE show_id = $1")
                .bind(show_id)
                .fetch_all(&self.pool)
                .await?;
        held.iter()
            .map(|s| s.parse::<SeatId>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn create_booking(&self, new: NewBooking) -> Result<ReserveOutcome, StoreError> {
        let seat_strings: Vec<String> = new.seats.iter().map(ToString::to_string).collect();

        let mut tx = self.pool.begin().await?;

        // Serializes all reservations for this show; released at commit or
        // rollback.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(new.show_id.to_string())
            .execute(&mut *tx)
            .await?;

        let held: Vec<String> =
            sqlx::query_scalar("SELECT seat_id FROM booking_seats WHERE show_id = $1")
                .bind(new.show_id)
                .fetch_all(&mut *tx)
                .await?;
        let held: HashSet<String> = held.into_iter().collect();

        let conflicts: Vec<SeatId> = new
            .seats
            .iter()
            .filter(|s| held.contains(&s.to_string()))
            .copied()
            .collect();
        if !conflicts.is_empty() {
            // Dropping the transaction rolls back and releases the lock.
            return Ok(ReserveOutcome::Conflict(conflicts));
        }

        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO bookings (id, show_id, user_id, seats, status, amount_minor, created_at)
             VALUES ($1, $2, $3, $4, 'pending', $5, $6)",
        )
        .bind(id)
        .bind(new.show_id)
        .bind(&new.user_id)
        .bind(&seat_strings)
        .bind(new.amount_minor)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO booking_seats (show_id, seat_id, booking_id)
             SELECT $1, seat, $2 FROM UNNEST($3::text[]) AS seat",
        )
        .bind(new.show_id)
        .bind(id)
        .bind(&seat_strings)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ReserveOutcome::Created(Booking {
            id,
            show_id: new.show_id,
            user_id: new.user_id,
            seats: new.seats,
            status: BookingStatus::Pending,
            amount_minor: new.amount_minor,
            session_ref: None,
            created_at,
            paid_at: None,
        }))
    }

    async fn attach_session_ref(
        &self,
        booking_id: Uuid,
        session_ref: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE bookings SET session_ref = $2 WHERE id = $1 AND status = 'pending'")
            .bind(booking_id)
            .bind(session_ref)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row: Option<BookingRow> = sqlx::query_as(
            "SELECT id, show_id, user_id, seats, status, amount_minor, session_ref, created_at, paid_at
             FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn bookings_for_user(&self, user_id: &str) -> Result<Vec<Booking>, StoreError> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            "SELECT id, show_id, user_id, seats, status, amount_minor, session_ref, created_at, paid_at
             FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn mark_paid(
        &self,
        booking_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<PaidOutcome, StoreError> {
        // Conditional update: only a Pending booking transitions.
        let row: Option<BookingRow> = sqlx::query_as(
            "UPDATE bookings SET status = 'paid', paid_at = $2, session_ref = NULL
             WHERE id = $1 AND status = 'pending'
             RETURNING id, show_id, user_id, seats, status, amount_minor, session_ref, created_at, paid_at",
        )
        .bind(booking_id)
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(PaidOutcome::Applied(row.into_booking()?));
        }

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1")
                .bind(booking_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(match status.as_deref() {
            None => PaidOutcome::NotFound,
            Some("paid") => PaidOutcome::AlreadyPaid,
            _ => PaidOutcome::Cancelled,
        })
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE bookings SET status = 'cancelled' WHERE id = $1 AND status = 'pending'",
        )
        .bind(booking_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM booking_seats WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn expire_pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<BookingRow> = sqlx::query_as(
            "UPDATE bookings SET status = 'cancelled'
             WHERE status = 'pending' AND created_at < $1
             RETURNING id, show_id, user_id, seats, status, amount_minor, session_ref, created_at, paid_at",
        )
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        sqlx::query("DELETE FROM booking_seats WHERE booking_id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn ledger_contains(&self, event_id: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM processed_events WHERE event_id = $1)")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn ledger_record(&self, event_id: &str) -> Result<bool, StoreError> {
        let inserted = sqlx::query(
            "INSERT INTO processed_events (event_id) VALUES ($1) ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(inserted.rows_affected() > 0)
    }
}
