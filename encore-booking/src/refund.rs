use chrono::{DateTime, Duration, Utc};

use encore_core::booking::Booking;

/// Self-refund eligibility hook.
pub trait RefundPolicy: Send + Sync {
    fn is_refund_eligible(&self, booking: &Booking, now: DateTime<Utc>) -> bool;
}

/// Refundable within `days` of the charge.
pub struct RefundWindow {
    pub days: i64,
}

impl RefundPolicy for RefundWindow {
    fn is_refund_eligible(&self, booking: &Booking, now: DateTime<Utc>) -> bool {
        match booking.charged_at {
            Some(charged_at) => now - charged_at <= Duration::days(self.days),
            None => false,
        }
    }
}

/// No window: any paid booking is eligible.
pub struct AlwaysRefundable;

impl RefundPolicy for AlwaysRefundable {
    fn is_refund_eligible(&self, _booking: &Booking, _now: DateTime<Utc>) -> bool {
        true
    }
}
