use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use encore_core::lock::{SeatLockKey, SeatLockService};
use encore_core::repository::{SeatRepository, StoreError};

/// Periodic job returning lapsed reservations to the open pool.
///
/// The lock's own TTL expires independently; the sweeper still drops the
/// lock key for every seat it releases so the lock store never claims a
/// seat the seat store calls Available.
pub struct ExpirySweeper {
    seats: Arc<dyn SeatRepository>,
    locks: Arc<dyn SeatLockService>,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(
        seats: Arc<dyn SeatRepository>,
        locks: Arc<dyn SeatLockService>,
        interval: Duration,
    ) -> Self {
        Self {
            seats,
            locks,
            interval,
        }
    }

    /// Long-running sweep loop. Errors are logged and the loop continues.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.release_expired(Utc::now()).await {
                error!(%err, "expiry sweep failed");
            }
        }
    }

    /// Release every Reserved seat whose hold lapsed at `now`. Returns the
    /// number of seats released.
    pub async fn release_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut seats = self.seats.get_expired(now).await?;
        if seats.is_empty() {
            return Ok(0);
        }

        let keys: Vec<SeatLockKey> = seats
            .iter()
            .map(|seat| SeatLockKey::new(seat.event_id, seat.id))
            .collect();

        for seat in &mut seats {
            seat.release();
        }
        // A version conflict here means someone raced the sweep; the next
        // tick picks up whatever is still expired.
        self.seats.update(&seats).await?;

        for key in &keys {
            if let Err(err) = self.locks.confirm_and_drop(key).await {
                warn!(key = %key.cache_key(), %err, "failed to drop stale lock for expired reservation");
            }
        }

        info!(released = seats.len(), "released expired reservations");
        Ok(seats.len())
    }
}
