use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use encore_booking::{BookingError, PaymentOutcome, ReservationOutcome};
use encore_core::booking::Booking;
use encore_core::events::BookingEvent;
use encore_core::payment::{PaymentRequest, RefundRequest};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReserveSeatsRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub seat_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub payment: PaymentRequest,
}

#[derive(Debug, Serialize)]
struct RefundResponse {
    booking_id: Uuid,
    status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/reserve", post(reserve_seats))
        .route("/v1/bookings/confirm-payment", post(confirm_payment))
        .route("/v1/bookings/{id}/refund", post(request_refund))
        .route("/v1/bookings/{id}/self-refund", post(self_request_refund))
        .route("/v1/bookings/{id}", get(get_booking))
}

async fn reserve_seats(
    State(state): State<AppState>,
    Json(req): Json<ReserveSeatsRequest>,
) -> Result<(StatusCode, Json<ReservationOutcome>), ApiError> {
    let outcome = state
        .engine
        .reserve_seats(req.event_id, req.user_id, &req.seat_ids)
        .await?;

    // Publishing is best-effort; the reservation already holds.
    let _ = state
        .kafka
        .publish(&BookingEvent::Reserved {
            booking_id: outcome.booking_id,
            event_id: req.event_id,
            seat_ids: req.seat_ids,
            reservation_expires_at: outcome.reservation_expires_at,
        })
        .await;

    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn confirm_payment(
    State(state): State<AppState>,
    Json(req): Json<ConfirmPaymentRequest>,
) -> Result<Json<PaymentOutcome>, ApiError> {
    let outcome = state
        .engine
        .confirm_payment(req.booking_id, req.user_id, &req.payment)
        .await?;

    let _ = state
        .kafka
        .publish(&BookingEvent::Confirmed {
            booking_id: outcome.booking_id,
            payment_intent_id: outcome.payment_intent_id.clone(),
        })
        .await;

    info!("Payment confirmed for booking {}", req.booking_id);
    Ok(Json(outcome))
}

async fn request_refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<RefundRequest>>,
) -> Result<Json<RefundResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    state.engine.request_refund(id, &request).await?;

    let _ = state
        .kafka
        .publish(&BookingEvent::Refunded { booking_id: id })
        .await;

    Ok(Json(RefundResponse {
        booking_id: id,
        status: "REFUNDED".to_string(),
    }))
}

async fn self_request_refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    state.engine.self_request_refund(id).await?;

    let _ = state
        .kafka
        .publish(&BookingEvent::Refunded { booking_id: id })
        .await;

    Ok(Json(RefundResponse {
        booking_id: id,
        status: "REFUNDED".to_string(),
    }))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .bookings
        .get_by_id(id)
        .await
        .map_err(BookingError::from)?
        .ok_or(BookingError::NotFound(id))?;

    Ok(Json(booking))
}
