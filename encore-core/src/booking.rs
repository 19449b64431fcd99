use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seat lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Reserved,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Reserved => "RESERVED",
            SeatStatus::Booked => "BOOKED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AVAILABLE" => Some(SeatStatus::Available),
            "RESERVED" => Some(SeatStatus::Reserved),
            "BOOKED" => Some(SeatStatus::Booked),
            _ => None,
        }
    }
}

/// Booking payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "FAILED" => Some(PaymentStatus::Failed),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// A single seat of an event.
///
/// `version` is the optimistic-concurrency token: the store increments it on
/// every successful write and rejects writes that carry a stale value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub event_id: Uuid,
    pub seat_number: String,
    pub status: SeatStatus,
    pub reservation_expires_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Seat {
    pub fn new(event_id: Uuid, seat_number: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            seat_number,
            status: SeatStatus::Available,
            reservation_expires_at: None,
            version: 0,
        }
    }

    /// Place a time-boxed hold on the seat.
    pub fn reserve(&mut self, expires_at: DateTime<Utc>) {
        self.status = SeatStatus::Reserved;
        self.reservation_expires_at = Some(expires_at);
    }

    /// Finalize the seat after payment. The hold expiry no longer applies.
    pub fn book(&mut self) {
        self.status = SeatStatus::Booked;
        self.reservation_expires_at = None;
    }

    /// Return the seat to the open pool.
    pub fn release(&mut self) {
        self.status = SeatStatus::Available;
        self.reservation_expires_at = None;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SeatStatus::Reserved
            && self
                .reservation_expires_at
                .map(|at| at <= now)
                .unwrap_or(false)
    }
}

/// A customer's booking over one or more seats of a single event.
///
/// Bookings are never deleted; a refund is a financial reversal and leaves
/// the linked seats Booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
    pub payment_status: PaymentStatus,
    pub booking_date: DateTime<Utc>,
    pub charged_at: Option<DateTime<Utc>>,
    pub payment_intent_id: Option<String>,
    pub seat_ids: Vec<Uuid>,
}

impl Booking {
    pub fn new(event_id: Uuid, user_id: Option<Uuid>, seat_ids: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            payment_status: PaymentStatus::Pending,
            booking_date: Utc::now(),
            charged_at: None,
            payment_intent_id: None,
            seat_ids,
        }
    }

    /// Record a successful charge.
    pub fn mark_paid(&mut self, intent_id: String, charged_at: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Paid;
        self.payment_intent_id = Some(intent_id);
        self.charged_at = Some(charged_at);
    }

    pub fn mark_failed(&mut self) {
        self.payment_status = PaymentStatus::Failed;
    }

    pub fn mark_refunded(&mut self) {
        self.payment_status = PaymentStatus::Refunded;
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}
