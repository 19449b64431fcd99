use std::sync::Arc;

use encore_booking::ReservationEngine;
use encore_core::repository::BookingRepository;
use encore_store::EventProducer;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub bookings: Arc<dyn BookingRepository>,
    pub kafka: Arc<EventProducer>,
}
