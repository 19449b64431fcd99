use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::booking::{Booking, Seat};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("stale version rejected by the store")]
    VersionConflict,

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Repository trait for seat data access.
///
/// Reads are snapshot reads; `update` compares each seat's `version` against
/// the stored row and must fail the whole batch with
/// [`StoreError::VersionConflict`] when any row is stale.
#[async_trait]
pub trait SeatRepository: Send + Sync {
    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Seat>, StoreError>;

    async fn update(&self, seats: &[Seat]) -> Result<(), StoreError>;

    /// Reserved seats whose hold has lapsed at `now`.
    async fn get_expired(&self, now: DateTime<Utc>) -> Result<Vec<Seat>, StoreError>;
}

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn add(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn update(&self, booking: &Booking) -> Result<(), StoreError>;
}

/// Shared failed-attempt counters, keyed by user.
///
/// `increment` must bump the counter and re-arm its expiry `window` in one
/// atomic step, so a stale count never outlives its tracking period.
#[async_trait]
pub trait FraudStore: Send + Sync {
    async fn increment(&self, user_id: Uuid, window: Duration) -> Result<i64, StoreError>;

    async fn get(&self, user_id: Uuid) -> Result<i64, StoreError>;

    async fn delete(&self, user_id: Uuid) -> Result<(), StoreError>;
}
