use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking lifecycle events published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    Reserved {
        booking_id: Uuid,
        event_id: Uuid,
        seat_ids: Vec<Uuid>,
        reservation_expires_at: DateTime<Utc>,
    },
    Confirmed {
        booking_id: Uuid,
        payment_intent_id: String,
    },
    Refunded {
        booking_id: Uuid,
    },
}

impl BookingEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            BookingEvent::Reserved { .. } => "bookings.reserved",
            BookingEvent::Confirmed { .. } => "bookings.confirmed",
            BookingEvent::Refunded { .. } => "bookings.refunded",
        }
    }

    pub fn booking_id(&self) -> Uuid {
        match self {
            BookingEvent::Reserved { booking_id, .. }
            | BookingEvent::Confirmed { booking_id, .. }
            | BookingEvent::Refunded { booking_id } => *booking_id,
        }
    }
}
