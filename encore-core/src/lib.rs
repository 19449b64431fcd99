pub mod booking;
pub mod events;
pub mod lock;
pub mod payment;
pub mod repository;

pub use booking::{Booking, PaymentStatus, Seat, SeatStatus};
pub use events::BookingEvent;
pub use lock::{LockError, SeatLockKey, SeatLockService};
pub use payment::{ChargeOutcome, PaymentGateway, PaymentRequest, RefundRequest};
pub use repository::{BookingRepository, FraudStore, SeatRepository, StoreError};
