pub mod engine;
pub mod fraud;
pub mod gateway;
pub mod locks;
pub mod refund;
pub mod resilience;
pub mod sweeper;

pub use engine::{
    BookingError, PaymentOutcome, ReservationEngine, ReservationOutcome, ReservationRules,
};
pub use fraud::FraudGate;
pub use gateway::MockPaymentGateway;
pub use refund::{AlwaysRefundable, RefundPolicy, RefundWindow};
pub use resilience::CircuitBreaker;
pub use sweeper::ExpirySweeper;
