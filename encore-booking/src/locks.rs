use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use encore_core::lock::{LockError, SeatLockKey, SeatLockService};

/// Acquire every key for `owner`, all-or-nothing.
///
/// The first refusal (or lock-store error) releases everything taken so far;
/// a multi-seat request never leaves a partial claim behind.
pub async fn acquire_all(
    locks: &dyn SeatLockService,
    keys: &[SeatLockKey],
    owner: Uuid,
    ttl: Duration,
) -> Result<bool, LockError> {
    for (taken, key) in keys.iter().enumerate() {
        match locks.try_acquire(key, owner, ttl).await {
            Ok(true) => {}
            Ok(false) => {
                release_all(locks, &keys[..taken], owner).await;
                return Ok(false);
            }
            Err(err) => {
                release_all(locks, &keys[..taken], owner).await;
                return Err(err);
            }
        }
    }
    Ok(true)
}

/// Best-effort release. A lock that cannot be released falls to its TTL.
pub async fn release_all(locks: &dyn SeatLockService, keys: &[SeatLockKey], owner: Uuid) {
    for key in keys {
        match locks.release(key, owner).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(key = %key.cache_key(), %owner, "seat lock was not held at release time");
            }
            Err(err) => {
                warn!(key = %key.cache_key(), %owner, %err, "failed to release seat lock, TTL will reclaim it");
            }
        }
    }
}

/// Drop lock keys after payment confirmation. No owner check, the
/// reservation is permanent.
pub async fn confirm_all(locks: &dyn SeatLockService, keys: &[SeatLockKey]) {
    for key in keys {
        if let Err(err) = locks.confirm_and_drop(key).await {
            warn!(key = %key.cache_key(), %err, "failed to drop confirmed seat lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Lock store that refuses one designated key.
    struct RefusingLocks {
        held: Mutex<HashMap<String, Uuid>>,
        refuse: String,
    }

    impl RefusingLocks {
        fn new(refuse: &SeatLockKey) -> Self {
            Self {
                held: Mutex::new(HashMap::new()),
                refuse: refuse.cache_key(),
            }
        }
    }

    #[async_trait]
    impl SeatLockService for RefusingLocks {
        async fn try_acquire(
            &self,
            key: &SeatLockKey,
            owner: Uuid,
            _ttl: Duration,
        ) -> Result<bool, LockError> {
            if key.cache_key() == self.refuse {
                return Ok(false);
            }
            self.held.lock().unwrap().insert(key.cache_key(), owner);
            Ok(true)
        }

        async fn release(&self, key: &SeatLockKey, owner: Uuid) -> Result<bool, LockError> {
            let mut held = self.held.lock().unwrap();
            match held.get(&key.cache_key()) {
                Some(holder) if *holder == owner => {
                    held.remove(&key.cache_key());
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn confirm_and_drop(&self, key: &SeatLockKey) -> Result<(), LockError> {
            self.held.lock().unwrap().remove(&key.cache_key());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_partial_acquisition_rolls_back() {
        let event_id = Uuid::new_v4();
        let keys: Vec<SeatLockKey> = (0..3)
            .map(|_| SeatLockKey::new(event_id, Uuid::new_v4()))
            .collect();
        let locks = RefusingLocks::new(&keys[2]);
        let owner = Uuid::new_v4();

        let acquired = acquire_all(&locks, &keys, owner, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!acquired);
        // The two successful acquisitions were rolled back.
        assert!(locks.held.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_acquire_all_holds_every_key() {
        let event_id = Uuid::new_v4();
        let keys: Vec<SeatLockKey> = (0..3)
            .map(|_| SeatLockKey::new(event_id, Uuid::new_v4()))
            .collect();
        // Refusal key not part of the request.
        let locks = RefusingLocks::new(&SeatLockKey::new(event_id, Uuid::new_v4()));
        let owner = Uuid::new_v4();

        let acquired = acquire_all(&locks, &keys, owner, Duration::from_secs(60))
            .await
            .unwrap();
        assert!(acquired);
        assert_eq!(locks.held.lock().unwrap().len(), 3);

        release_all(&locks, &keys, owner).await;
        assert!(locks.held.lock().unwrap().is_empty());
    }
}
