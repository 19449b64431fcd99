use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use encore_booking::BookingError;

#[derive(Debug)]
pub enum ApiError {
    Booking(BookingError),
    Anyhow(anyhow::Error),
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        Self::Booking(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Booking(err) => {
                let status = match &err {
                    BookingError::Blocked | BookingError::PaymentBlocked => {
                        StatusCode::TOO_MANY_REQUESTS
                    }
                    BookingError::LockUnavailable
                    | BookingError::SeatsUnavailable
                    | BookingError::ConcurrentUpdate
                    | BookingError::NotReserved => StatusCode::CONFLICT,
                    BookingError::InvalidRequest(_)
                    | BookingError::PaymentDeclined(_)
                    | BookingError::RefundDeclined(_)
                    | BookingError::NotRefundable
                    | BookingError::RefundWindowClosed => StatusCode::BAD_REQUEST,
                    BookingError::NotFound(_) => StatusCode::NOT_FOUND,
                    BookingError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
                    BookingError::Gateway(_)
                    | BookingError::Store(_)
                    | BookingError::Lock(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    // Backend details stay in the logs, not on the wire.
                    tracing::error!("Internal Server Error: {}", err);
                    (status, "Internal Server Error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
            ApiError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
