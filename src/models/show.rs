use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::seatmap::SeatMap;

// Catalog entry for one screening. Written by catalog management, read-only here.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: Uuid,
    pub movie_title: String,
    pub starts_at: DateTime<Utc>,
    /// Per-seat price in the smallest currency unit.
    pub price_minor: i64,
    pub seat_rows: i32,
    pub seats_per_row: i32,
}

impl Show {
    pub fn seat_map(&self) -> SeatMap {
        SeatMap::new(self.seat_rows as u8, self.seats_per_row as u8)
    }
}
