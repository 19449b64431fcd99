use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

/// Key of a distributed per-seat reservation lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeatLockKey {
    pub event_id: Uuid,
    pub seat_id: Uuid,
}

impl SeatLockKey {
    pub fn new(event_id: Uuid, seat_id: Uuid) -> Self {
        Self { event_id, seat_id }
    }

    pub fn cache_key(&self) -> String {
        format!("reservation:{}:seat:{}", self.event_id, self.seat_id)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("lock store error: {0}")]
pub struct LockError(pub String);

/// Per-seat mutual exclusion, first line of reservation contention control.
///
/// Every acquired lock carries a TTL; a lock that cannot be released falls to
/// its TTL, so callers treat `release` as best-effort.
#[async_trait]
pub trait SeatLockService: Send + Sync {
    /// Atomically take the lock for `owner`. Returns false when another
    /// owner currently holds it.
    async fn try_acquire(
        &self,
        key: &SeatLockKey,
        owner: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError>;

    /// Drop the lock if `owner` still holds it. Returns whether the lock
    /// was held by `owner` at release time.
    async fn release(&self, key: &SeatLockKey, owner: Uuid) -> Result<bool, LockError>;

    /// Unconditionally drop the lock key. Used once a reservation becomes
    /// permanent (paid) or when the seat store has already reclaimed the seat.
    async fn confirm_and_drop(&self, key: &SeatLockKey) -> Result<(), LockError>;
}
