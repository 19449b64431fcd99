use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use encore_core::booking::{Booking, PaymentStatus};
use encore_core::repository::{BookingRepository, StoreError};

use crate::seat_repo::db_err;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Option<Uuid>,
    payment_status: String,
    booking_date: DateTime<Utc>,
    charged_at: Option<DateTime<Utc>>,
    payment_intent_id: Option<String>,
}

impl BookingRow {
    fn into_booking(self, seat_ids: Vec<Uuid>) -> Result<Booking, StoreError> {
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            StoreError::Backend(format!("unknown payment status: {}", self.payment_status))
        })?;
        Ok(Booking {
            id: self.id,
            event_id: self.event_id,
            user_id: self.user_id,
            payment_status,
            booking_date: self.booking_date,
            charged_at: self.charged_at,
            payment_intent_id: self.payment_intent_id,
            seat_ids,
        })
    }
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn add(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO bookings \
             (id, event_id, user_id, payment_status, booking_date, charged_at, payment_intent_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(booking.id)
        .bind(booking.event_id)
        .bind(booking.user_id)
        .bind(booking.payment_status.as_str())
        .bind(booking.booking_date)
        .bind(booking.charged_at)
        .bind(booking.payment_intent_id.as_deref())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        for (ordinal, seat_id) in booking.seat_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO booking_seats (booking_id, seat_id, ordinal) VALUES ($1, $2, $3)",
            )
            .bind(booking.id)
            .bind(seat_id)
            .bind(ordinal as i32)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, event_id, user_id, payment_status, booking_date, charged_at, payment_intent_id \
             FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let seat_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT seat_id FROM booking_seats WHERE booking_id = $1 ORDER BY ordinal",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        row.into_booking(seat_ids).map(Some)
    }

    async fn update(&self, booking: &Booking) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE bookings \
             SET payment_status = $1, charged_at = $2, payment_intent_id = $3 \
             WHERE id = $4",
        )
        .bind(booking.payment_status.as_str())
        .bind(booking.charged_at)
        .bind(booking.payment_intent_id.as_deref())
        .bind(booking.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(booking.id.to_string()));
        }
        Ok(())
    }
}
