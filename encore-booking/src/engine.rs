use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use encore_core::booking::{Booking, SeatStatus};
use encore_core::lock::{LockError, SeatLockKey, SeatLockService};
use encore_core::payment::{PaymentGateway, PaymentRequest, RefundRequest, STATUS_SUCCEEDED};
use encore_core::repository::{BookingRepository, FraudStore, SeatRepository, StoreError};

use crate::fraud::FraudGate;
use crate::locks;
use crate::refund::{RefundPolicy, RefundWindow};
use crate::resilience::CircuitBreaker;

/// Total attempts against the store when a write is rejected for carrying a
/// stale version. Conflicts beyond this budget surface as `ConcurrentUpdate`.
const MAX_STORE_ATTEMPTS: u32 = 3;

const BREAKER_THRESHOLD: usize = 5;
const BREAKER_COOLDOWN: Duration = Duration::from_secs(30);

/// Tunables consumed by the engine. Defaults match the original deployment:
/// 10-minute holds, 5 failed attempts over a 30-minute window.
#[derive(Debug, Clone)]
pub struct ReservationRules {
    pub reservation_ttl: Duration,
    pub max_failed_attempts: i64,
    pub fraud_window: Duration,
    pub refund_window_days: i64,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self {
            reservation_ttl: Duration::from_secs(10 * 60),
            max_failed_attempts: 5,
            fraud_window: Duration::from_secs(30 * 60),
            refund_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationOutcome {
    pub booking_id: Uuid,
    pub reservation_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub booking_id: Uuid,
    pub payment_intent_id: String,
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("user is temporarily blocked")]
    Blocked,

    #[error("payment blocked")]
    PaymentBlocked,

    #[error("seats no longer available")]
    LockUnavailable,

    #[error("one or more seats are no longer available")]
    SeatsUnavailable,

    #[error("booking failed due to concurrent updates")]
    ConcurrentUpdate,

    #[error("seats are no longer reserved")]
    NotReserved,

    #[error("booking not found: {0}")]
    NotFound(Uuid),

    #[error("booking is not eligible for refund")]
    NotRefundable,

    #[error("booking is outside the refund window")]
    RefundWindowClosed,

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("refund declined: {0}")]
    RefundDeclined(String),

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("{0} circuit is open")]
    CircuitOpen(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Orchestrates the reservation protocol: per-seat distributed locks, the
/// verify-and-persist window against the seat store, payment confirmation
/// and refunds. Sole writer of seat-status and payment-status transitions.
pub struct ReservationEngine {
    seats: Arc<dyn SeatRepository>,
    bookings: Arc<dyn BookingRepository>,
    locks: Arc<dyn SeatLockService>,
    fraud: FraudGate,
    gateway: Arc<dyn PaymentGateway>,
    refund_policy: Arc<dyn RefundPolicy>,
    rules: ReservationRules,
    store_breaker: CircuitBreaker,
    gateway_breaker: CircuitBreaker,
}

impl ReservationEngine {
    pub fn new(
        seats: Arc<dyn SeatRepository>,
        bookings: Arc<dyn BookingRepository>,
        locks: Arc<dyn SeatLockService>,
        fraud_store: Arc<dyn FraudStore>,
        gateway: Arc<dyn PaymentGateway>,
        rules: ReservationRules,
    ) -> Self {
        let fraud = FraudGate::new(fraud_store, rules.max_failed_attempts, rules.fraud_window);
        let refund_policy = Arc::new(RefundWindow {
            days: rules.refund_window_days,
        });
        Self {
            seats,
            bookings,
            locks,
            fraud,
            gateway,
            refund_policy,
            rules,
            store_breaker: CircuitBreaker::new("store", BREAKER_THRESHOLD, BREAKER_COOLDOWN),
            gateway_breaker: CircuitBreaker::new("gateway", BREAKER_THRESHOLD, BREAKER_COOLDOWN),
        }
    }

    /// Override the self-refund eligibility policy.
    pub fn with_refund_policy(mut self, policy: Arc<dyn RefundPolicy>) -> Self {
        self.refund_policy = policy;
        self
    }

    /// Reserve `seat_ids` for `user_id` on event `event_id`.
    ///
    /// Lock acquisition is all-or-nothing; on success the locks stay held
    /// until payment confirmation drops them or their TTL lapses. Every
    /// failure path after partial acquisition releases all locks taken here.
    pub async fn reserve_seats(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        seat_ids: &[Uuid],
    ) -> Result<ReservationOutcome, BookingError> {
        if seat_ids.is_empty() {
            return Err(BookingError::InvalidRequest("no seats requested".into()));
        }
        let mut seen = HashSet::with_capacity(seat_ids.len());
        if !seat_ids.iter().all(|id| seen.insert(*id)) {
            return Err(BookingError::InvalidRequest("duplicate seat ids".into()));
        }

        if self.fraud.is_blocked(user_id).await? {
            return Err(BookingError::Blocked);
        }

        let keys: Vec<SeatLockKey> = seat_ids
            .iter()
            .map(|seat_id| SeatLockKey::new(event_id, *seat_id))
            .collect();

        if !locks::acquire_all(
            self.locks.as_ref(),
            &keys,
            user_id,
            self.rules.reservation_ttl,
        )
        .await?
        {
            return Err(BookingError::LockUnavailable);
        }

        match self.reserve_with_retry(event_id, user_id, seat_ids).await {
            Ok(outcome) => {
                self.fraud.clear(user_id).await;
                info!(
                    booking_id = %outcome.booking_id,
                    %event_id,
                    %user_id,
                    expires_at = %outcome.reservation_expires_at,
                    "seats reserved"
                );
                Ok(outcome)
            }
            Err(err) => {
                locks::release_all(self.locks.as_ref(), &keys, user_id).await;
                if matches!(err, BookingError::SeatsUnavailable) {
                    self.fraud.record_failure(user_id).await;
                }
                Err(err)
            }
        }
    }

    async fn reserve_with_retry(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        seat_ids: &[Uuid],
    ) -> Result<ReservationOutcome, BookingError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_reserve(event_id, user_id, seat_ids).await {
                Err(BookingError::Store(StoreError::VersionConflict))
                    if attempt < MAX_STORE_ATTEMPTS =>
                {
                    warn!(attempt, %event_id, "seat update hit a version conflict, retrying");
                }
                Err(BookingError::Store(StoreError::VersionConflict)) => {
                    return Err(BookingError::ConcurrentUpdate);
                }
                other => return other,
            }
        }
    }

    async fn try_reserve(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        seat_ids: &[Uuid],
    ) -> Result<ReservationOutcome, BookingError> {
        // Snapshot read behind the locks: at most one caller is inside this
        // window per seat key.
        let mut seats = self.seats.get_by_ids(seat_ids).await?;
        if seats.len() != seat_ids.len()
            || seats
                .iter()
                .any(|s| s.event_id != event_id || s.status != SeatStatus::Available)
        {
            return Err(BookingError::SeatsUnavailable);
        }

        let expires_at =
            Utc::now() + ChronoDuration::seconds(self.rules.reservation_ttl.as_secs() as i64);
        for seat in &mut seats {
            seat.reserve(expires_at);
        }
        let booking = Booking::new(event_id, Some(user_id), seat_ids.to_vec());

        if !self.store_breaker.check().await {
            return Err(BookingError::CircuitOpen("seat store"));
        }
        self.guarded_store(self.bookings.add(&booking).await).await?;
        self.guarded_store(self.seats.update(&seats).await).await?;

        Ok(ReservationOutcome {
            booking_id: booking.id,
            reservation_expires_at: expires_at,
        })
    }

    /// Charge the booking and finalize its seats.
    ///
    /// On a successful charge the per-seat lock keys are dropped outright;
    /// the reservation is permanent and no owner check is needed.
    pub async fn confirm_payment(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        request: &PaymentRequest,
    ) -> Result<PaymentOutcome, BookingError> {
        if self.fraud.is_blocked(user_id).await? {
            return Err(BookingError::PaymentBlocked);
        }

        let Some(mut booking) = self.bookings.get_by_id(booking_id).await? else {
            self.fraud.record_failure(user_id).await;
            return Err(BookingError::NotReserved);
        };
        if booking.user_id != Some(user_id) {
            self.fraud.record_failure(user_id).await;
            return Err(BookingError::NotReserved);
        }
        let seats = self.seats.get_by_ids(&booking.seat_ids).await?;
        if seats.len() != booking.seat_ids.len()
            || seats.iter().any(|s| s.status != SeatStatus::Reserved)
        {
            self.fraud.record_failure(user_id).await;
            return Err(BookingError::NotReserved);
        }

        let keys: Vec<SeatLockKey> = booking
            .seat_ids
            .iter()
            .map(|seat_id| SeatLockKey::new(booking.event_id, *seat_id))
            .collect();

        if !self.gateway_breaker.check().await {
            return Err(BookingError::CircuitOpen("payment gateway"));
        }
        let outcome = match self.gateway.charge(request).await {
            Ok(outcome) => {
                self.gateway_breaker.record_success().await;
                outcome
            }
            Err(err) => {
                self.gateway_breaker.record_failure().await;
                self.fraud.record_failure(user_id).await;
                locks::release_all(self.locks.as_ref(), &keys, user_id).await;
                return Err(BookingError::Gateway(err.to_string()));
            }
        };
        if !outcome.is_succeeded() {
            self.fraud.record_failure(user_id).await;
            booking.mark_failed();
            // Best-effort: the decline is the answer, not the store write.
            if let Err(err) = self.bookings.update(&booking).await {
                warn!(%booking_id, %err, "failed to persist declined payment status");
            }
            locks::release_all(self.locks.as_ref(), &keys, user_id).await;
            return Err(BookingError::PaymentDeclined(outcome.status));
        }

        self.fraud.clear(user_id).await;
        booking.mark_paid(outcome.intent_id.clone(), Utc::now());
        self.persist_confirmation(&booking).await?;
        locks::confirm_all(self.locks.as_ref(), &keys).await;

        info!(
            %booking_id,
            intent_id = %outcome.intent_id,
            "payment confirmed, seats booked"
        );

        Ok(PaymentOutcome {
            booking_id,
            payment_intent_id: outcome.intent_id,
            status: outcome.status,
        })
    }

    async fn persist_confirmation(&self, booking: &Booking) -> Result<(), BookingError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_persist_confirmation(booking).await {
                Err(BookingError::Store(StoreError::VersionConflict))
                    if attempt < MAX_STORE_ATTEMPTS =>
                {
                    warn!(attempt, booking_id = %booking.id, "confirmation hit a version conflict, retrying");
                }
                Err(BookingError::Store(StoreError::VersionConflict)) => {
                    return Err(BookingError::ConcurrentUpdate);
                }
                other => return other,
            }
        }
    }

    async fn try_persist_confirmation(&self, booking: &Booking) -> Result<(), BookingError> {
        if !self.store_breaker.check().await {
            return Err(BookingError::CircuitOpen("seat store"));
        }
        // Fresh read per attempt, the version token moves on every write.
        let mut seats = self
            .guarded_store(self.seats.get_by_ids(&booking.seat_ids).await)
            .await?;
        for seat in &mut seats {
            seat.book();
        }
        self.guarded_store(self.bookings.update(booking).await)
            .await?;
        self.guarded_store(self.seats.update(&seats).await).await?;
        Ok(())
    }

    /// Operator-initiated refund. Seats stay Booked, the refund is a
    /// financial reversal only.
    pub async fn request_refund(
        &self,
        booking_id: Uuid,
        request: &RefundRequest,
    ) -> Result<(), BookingError> {
        self.refund(booking_id, request, None).await
    }

    /// Customer-initiated refund; additionally applies the refund-window
    /// policy.
    pub async fn self_request_refund(&self, booking_id: Uuid) -> Result<(), BookingError> {
        self.refund(
            booking_id,
            &RefundRequest::default(),
            Some(self.refund_policy.as_ref()),
        )
        .await
    }

    async fn refund(
        &self,
        booking_id: Uuid,
        request: &RefundRequest,
        policy: Option<&dyn RefundPolicy>,
    ) -> Result<(), BookingError> {
        let Some(mut booking) = self.bookings.get_by_id(booking_id).await? else {
            return Err(BookingError::NotFound(booking_id));
        };
        if !booking.is_paid() {
            return Err(BookingError::NotRefundable);
        }
        let Some(intent_id) = booking.payment_intent_id.clone() else {
            return Err(BookingError::NotRefundable);
        };
        if let Some(policy) = policy {
            if !policy.is_refund_eligible(&booking, Utc::now()) {
                return Err(BookingError::RefundWindowClosed);
            }
        }

        if !self.gateway_breaker.check().await {
            return Err(BookingError::CircuitOpen("payment gateway"));
        }
        let status = match self.gateway.refund(&intent_id, request).await {
            Ok(status) => {
                self.gateway_breaker.record_success().await;
                status
            }
            Err(err) => {
                self.gateway_breaker.record_failure().await;
                return Err(BookingError::Gateway(err.to_string()));
            }
        };
        if status != STATUS_SUCCEEDED {
            return Err(BookingError::RefundDeclined(status));
        }

        booking.mark_refunded();
        if !self.store_breaker.check().await {
            return Err(BookingError::CircuitOpen("seat store"));
        }
        self.guarded_store(self.bookings.update(&booking).await)
            .await?;

        info!(%booking_id, %intent_id, "booking refunded");
        Ok(())
    }

    /// Breaker bookkeeping for a store call. A version conflict means the
    /// store answered and is healthy; only backend errors count against it.
    async fn guarded_store<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        match &result {
            Err(StoreError::Backend(_)) => self.store_breaker.record_failure().await,
            _ => self.store_breaker.record_success().await,
        }
        result
    }
}
