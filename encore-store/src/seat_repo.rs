use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use encore_core::booking::{Seat, SeatStatus};
use encore_core::repository::{SeatRepository, StoreError};

pub(crate) fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub struct StoreSeatRepository {
    pool: PgPool,
}

impl StoreSeatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    event_id: Uuid,
    seat_number: String,
    status: String,
    reservation_expires_at: Option<DateTime<Utc>>,
    version: i64,
}

impl SeatRow {
    fn into_seat(self) -> Result<Seat, StoreError> {
        let status = SeatStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Backend(format!("unknown seat status: {}", self.status)))?;
        Ok(Seat {
            id: self.id,
            event_id: self.event_id,
            seat_number: self.seat_number,
            status,
            reservation_expires_at: self.reservation_expires_at,
            version: self.version,
        })
    }
}

#[async_trait]
impl SeatRepository for StoreSeatRepository {
    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Seat>, StoreError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, event_id, seat_number, status, reservation_expires_at, version \
             FROM seats WHERE id = ANY($1)",
        )
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(SeatRow::into_seat).collect()
    }

    async fn update(&self, seats: &[Seat]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        for seat in seats {
            // Compare-and-swap on the version token; a stale row aborts the
            // whole batch (the dropped transaction rolls back).
            let result = sqlx::query(
                "UPDATE seats \
                 SET status = $1, reservation_expires_at = $2, version = version + 1 \
                 WHERE id = $3 AND version = $4",
            )
            .bind(seat.status.as_str())
            .bind(seat.reservation_expires_at)
            .bind(seat.id)
            .bind(seat.version)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::VersionConflict);
            }
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_expired(&self, now: DateTime<Utc>) -> Result<Vec<Seat>, StoreError> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, event_id, seat_number, status, reservation_expires_at, version \
             FROM seats WHERE status = 'RESERVED' AND reservation_expires_at <= $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(SeatRow::into_seat).collect()
    }
}
