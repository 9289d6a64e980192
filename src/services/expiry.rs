//! Releases seat holds that never reached payment.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::store::{BookingStore, StoreError};

pub struct ExpirySweeper {
    store: Arc<dyn BookingStore>,
    hold: Duration,
}

impl ExpirySweeper {
    pub fn new(store: Arc<dyn BookingStore>, hold_minutes: i64) -> Self {
        ExpirySweeper {
            store,
            hold: Duration::minutes(hold_minutes),
        }
    }

    /// Cancels every Pending booking older than the hold window, freeing its
    /// seats. Returns how many were released.
    pub async fn run_once(&self) -> Result<usize, StoreError> {
        let cutoff = Utc::now() - self.hold;
        let released = self.store.expire_pending_before(cutoff).await?;
        for booking in &released {
            tracing::info!(
                "expired booking {} for show {} ({} seats released)",
                booking.id,
                booking.show_id,
                booking.seats.len()
            );
        }
        Ok(released.len())
    }
}
