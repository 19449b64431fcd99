use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use encore_core::repository::{FraudStore, StoreError};

/// Per-user failed-attempt gate over the shared counter store.
///
/// Counter and window move together: every failure re-arms the expiry, and a
/// blocked user unblocks automatically once the window lapses with no
/// further failures.
pub struct FraudGate {
    store: Arc<dyn FraudStore>,
    max_failed_attempts: i64,
    tracking_window: Duration,
}

impl FraudGate {
    pub fn new(store: Arc<dyn FraudStore>, max_failed_attempts: i64, tracking_window: Duration) -> Self {
        Self {
            store,
            max_failed_attempts,
            tracking_window,
        }
    }

    pub async fn is_blocked(&self, user_id: Uuid) -> Result<bool, StoreError> {
        let count = self.store.get(user_id).await?;
        if count >= self.max_failed_attempts {
            warn!(%user_id, count, "user is blocked by the fraud gate");
            return Ok(true);
        }
        Ok(false)
    }

    /// Best-effort: recording a failure must never mask the failure that
    /// triggered it.
    pub async fn record_failure(&self, user_id: Uuid) {
        match self.store.increment(user_id, self.tracking_window).await {
            Ok(count) => info!(%user_id, count, "recorded failed attempt"),
            Err(err) => warn!(%user_id, %err, "failed to record fraud attempt"),
        }
    }

    /// Best-effort: clearing runs on success paths and must not fail them.
    pub async fn clear(&self, user_id: Uuid) {
        if let Err(err) = self.store.delete(user_id).await {
            warn!(%user_id, %err, "failed to clear fraud counter");
        }
    }
}
