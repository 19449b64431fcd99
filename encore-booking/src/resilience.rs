use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,   // Normal operation
    Open,     // Failure detected, failing fast
    HalfOpen, // Testing if the dependency is back
}

/// Failure-counting breaker wrapped around a downstream dependency.
///
/// Composes with the engine's bounded conflict retry: the retry absorbs
/// version conflicts, the breaker opens on consecutive backend failures and
/// half-opens after the cooldown.
pub struct CircuitBreaker {
    pub name: &'static str,
    state: RwLock<CircuitState>,
    failure_count: AtomicUsize,
    failure_threshold: usize,
    reset_timeout: Duration,
    last_failure: RwLock<Option<Instant>>,
    // In half-open, true means the probe slot is free.
    probe_free: AtomicBool,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, threshold: usize, timeout: Duration) -> Self {
        Self {
            name,
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            failure_threshold: threshold,
            reset_timeout: timeout,
            last_failure: RwLock::new(None),
            probe_free: AtomicBool::new(false),
        }
    }

    /// Whether a call may proceed right now. Half-open admits exactly one
    /// in-flight probe; everyone else keeps failing fast until the probe's
    /// outcome is recorded.
    pub async fn check(&self) -> bool {
        match *self.state.read().await {
            CircuitState::Closed => return true,
            CircuitState::HalfOpen => return self.probe_free.swap(false, Ordering::SeqCst),
            CircuitState::Open => {}
        }

        let last_fail = *self.last_failure.read().await;
        let cooled_down = matches!(last_fail, Some(at) if at.elapsed() > self.reset_timeout);
        if !cooled_down {
            return false;
        }

        let mut state = self.state.write().await;
        if *state == CircuitState::Open {
            // This caller becomes the probe.
            *state = CircuitState::HalfOpen;
            self.probe_free.store(false, Ordering::SeqCst);
            tracing::info!("circuit breaker [{}] moving to half-open", self.name);
            return true;
        }
        // Lost the race to transition: contend for the probe slot instead.
        drop(state);
        self.probe_free.swap(false, Ordering::SeqCst)
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        match *state {
            CircuitState::HalfOpen => {
                *state = CircuitState::Closed;
                self.failure_count.store(0, Ordering::SeqCst);
                tracing::info!("circuit breaker [{}] recovered to closed", self.name);
            }
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::SeqCst);
            }
            CircuitState::Open => {}
        }
    }

    pub async fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.state.write().await;

        if count >= self.failure_threshold || *state == CircuitState::HalfOpen {
            if *state != CircuitState::Open {
                tracing::error!(
                    "circuit breaker [{}] tripped open after {} failures",
                    self.name,
                    count
                );
            }
            *state = CircuitState::Open;
            let mut last = self.last_failure.write().await;
            *last = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trips_at_threshold() {
        let cb = CircuitBreaker::new("test", 3, Duration::from_secs(30));
        assert!(cb.check().await);

        cb.record_failure().await;
        cb.record_failure().await;
        assert!(cb.check().await);

        cb.record_failure().await;
        assert!(!cb.check().await);
    }

    #[tokio::test]
    async fn test_half_open_after_cooldown() {
        let cb = CircuitBreaker::new("test", 1, Duration::from_millis(20));
        cb.record_failure().await;
        assert!(!cb.check().await);

        tokio::time::sleep(Duration::from_millis(40)).await;
        // Cooldown elapsed: one probe is allowed through.
        assert!(cb.check().await);

        cb.record_success().await;
        assert!(cb.check().await);
    }

    #[tokio::test]
    async fn test_half_open_admits_one_probe() {
        let cb = CircuitBreaker::new("test", 1, Duration::from_millis(20));
        cb.record_failure().await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cb.check().await);
        // Probe in flight: everyone else keeps failing fast.
        assert!(!cb.check().await);
        assert!(!cb.check().await);

        cb.record_failure().await;
        assert!(!cb.check().await);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = CircuitBreaker::new("test", 1, Duration::from_millis(20));
        cb.record_failure().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cb.check().await);

        cb.record_failure().await;
        assert!(!cb.check().await);
    }

    #[tokio::test]
    async fn test_success_resets_count() {
        let cb = CircuitBreaker::new("test", 2, Duration::from_secs(30));
        cb.record_failure().await;
        cb.record_success().await;
        cb.record_failure().await;
        // Never two consecutive failures: still closed.
        assert!(cb.check().await);
    }
}
