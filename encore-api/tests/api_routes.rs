use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use encore_api::{app, AppState};
use encore_booking::{MockPaymentGateway, ReservationEngine, ReservationRules};
use encore_core::booking::{Booking, Seat, SeatStatus};
use encore_core::lock::{LockError, SeatLockKey, SeatLockService};
use encore_core::repository::{BookingRepository, FraudStore, SeatRepository, StoreError};
use encore_store::EventProducer;

#[derive(Default)]
struct MemSeats {
    seats: Mutex<HashMap<Uuid, Seat>>,
}

#[async_trait]
impl SeatRepository for MemSeats {
    async fn get_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Seat>, StoreError> {
        let seats = self.seats.lock().unwrap();
        Ok(ids.iter().filter_map(|id| seats.get(id).cloned()).collect())
    }

    async fn update(&self, updated: &[Seat]) -> Result<(), StoreError> {
        let mut seats = self.seats.lock().unwrap();
        for seat in updated {
            let current = seats
                .get(&seat.id)
                .ok_or_else(|| StoreError::NotFound(seat.id.to_string()))?;
            if current.version != seat.version {
                return Err(StoreError::VersionConflict);
            }
        }
        for seat in updated {
            let mut next = seat.clone();
            next.version += 1;
            seats.insert(next.id, next);
        }
        Ok(())
    }

    async fn get_expired(&self, now: DateTime<Utc>) -> Result<Vec<Seat>, StoreError> {
        let seats = self.seats.lock().unwrap();
        Ok(seats
            .values()
            .filter(|s| s.status == SeatStatus::Reserved && s.is_expired(now))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct MemBookings {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

#[async_trait]
impl BookingRepository for MemBookings {
    async fn add(&self, booking: &Booking) -> Result<(), StoreError> {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, booking: &Booking) -> Result<(), StoreError> {
        self.bookings
            .lock()
            .unwrap()
            .insert(booking.id, booking.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemLocks {
    held: Mutex<HashMap<String, Uuid>>,
}

#[async_trait]
impl SeatLockService for MemLocks {
    async fn try_acquire(
        &self,
        key: &SeatLockKey,
        owner: Uuid,
        _ttl: Duration,
    ) -> Result<bool, LockError> {
        let mut held = self.held.lock().unwrap();
        if held.contains_key(&key.cache_key()) {
            return Ok(false);
        }
        held.insert(key.cache_key(), owner);
        Ok(true)
    }

    async fn release(&self, key: &SeatLockKey, owner: Uuid) -> Result<bool, LockError> {
        let mut held = self.held.lock().unwrap();
        if held.get(&key.cache_key()) == Some(&owner) {
            held.remove(&key.cache_key());
            return Ok(true);
        }
        Ok(false)
    }

    async fn confirm_and_drop(&self, key: &SeatLockKey) -> Result<(), LockError> {
        self.held.lock().unwrap().remove(&key.cache_key());
        Ok(())
    }
}

#[derive(Default)]
struct MemFraud {
    counts: Mutex<HashMap<Uuid, i64>>,
}

#[async_trait]
impl FraudStore for MemFraud {
    async fn increment(&self, user_id: Uuid, _window: Duration) -> Result<i64, StoreError> {
        let mut counts = self.counts.lock().unwrap();
        let count = counts.entry(user_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn get(&self, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(*self.counts.lock().unwrap().get(&user_id).unwrap_or(&0))
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.counts.lock().unwrap().remove(&user_id);
        Ok(())
    }
}

struct Harness {
    state: AppState,
    seats: Arc<MemSeats>,
    locks: Arc<MemLocks>,
    fraud: Arc<MemFraud>,
}

fn harness() -> Harness {
    let seats = Arc::new(MemSeats::default());
    let bookings = Arc::new(MemBookings::default());
    let locks = Arc::new(MemLocks::default());
    let fraud = Arc::new(MemFraud::default());

    let engine = ReservationEngine::new(
        seats.clone(),
        bookings.clone(),
        locks.clone(),
        fraud.clone(),
        Arc::new(MockPaymentGateway),
        ReservationRules::default(),
    );

    // No broker is reachable in tests; publishes fail and are ignored by
    // the handlers.
    let kafka = EventProducer::new("localhost:9092").unwrap();

    let state = AppState {
        engine: Arc::new(engine),
        bookings,
        kafka: Arc::new(kafka),
    };
    Harness {
        state,
        seats,
        locks,
        fraud,
    }
}

fn seed_seats(harness: &Harness, event_id: Uuid, count: usize) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(count);
    let mut seats = harness.seats.seats.lock().unwrap();
    for n in 0..count {
        let id = Uuid::new_v4();
        seats.insert(
            id,
            Seat {
                id,
                event_id,
                seat_number: format!("A{}", n + 1),
                status: SeatStatus::Available,
                reservation_expires_at: None,
                version: 1,
            },
        );
        ids.push(id);
    }
    ids
}

async fn send(harness: &Harness, request: Request<Body>) -> (StatusCode, Value) {
    let response = app(harness.state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn reserve_then_fetch_booking() {
    let h = harness();
    let event_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let seat_ids = seed_seats(&h, event_id, 2);

    let (status, body) = send(
        &h,
        post_json(
            "/v1/bookings/reserve",
            json!({ "event_id": event_id, "user_id": user_id, "seat_ids": seat_ids }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let booking_id = body["booking_id"].as_str().unwrap().to_string();
    assert!(body["reservation_expires_at"].is_string());

    let (status, body) = send(&h, get(&format!("/v1/bookings/{}", booking_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], "PENDING");
    assert_eq!(body["seat_ids"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_booking_is_not_found() {
    let h = harness();
    let (status, body) = send(&h, get(&format!("/v1/bookings/{}", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn empty_seat_list_is_bad_request() {
    let h = harness();
    let (status, _) = send(
        &h,
        post_json(
            "/v1/bookings/reserve",
            json!({
                "event_id": Uuid::new_v4(),
                "user_id": Uuid::new_v4(),
                "seat_ids": []
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn contended_seat_is_conflict() {
    let h = harness();
    let event_id = Uuid::new_v4();
    let seat_ids = seed_seats(&h, event_id, 1);

    // Another reservation already holds the seat lock.
    let key = SeatLockKey::new(event_id, seat_ids[0]);
    h.locks
        .held
        .lock()
        .unwrap()
        .insert(key.cache_key(), Uuid::new_v4());

    let (status, _) = send(
        &h,
        post_json(
            "/v1/bookings/reserve",
            json!({ "event_id": event_id, "user_id": Uuid::new_v4(), "seat_ids": seat_ids }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn declined_payment_is_bad_request() {
    let h = harness();
    let event_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let seat_ids = seed_seats(&h, event_id, 1);

    let (status, body) = send(
        &h,
        post_json(
            "/v1/bookings/reserve",
            json!({ "event_id": event_id, "user_id": user_id, "seat_ids": seat_ids }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let booking_id = body["booking_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &h,
        post_json(
            "/v1/bookings/confirm-payment",
            json!({
                "booking_id": booking_id,
                "user_id": user_id,
                "payment": {
                    "amount": 4200,
                    "currency": "usd",
                    "payment_method_id": "pm_declined_visa"
                }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("card_declined"));
}

#[tokio::test]
async fn blocked_user_is_too_many_requests() {
    let h = harness();
    let event_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let seat_ids = seed_seats(&h, event_id, 1);

    h.fraud.counts.lock().unwrap().insert(user_id, 5);

    let (status, _) = send(
        &h,
        post_json(
            "/v1/bookings/reserve",
            json!({ "event_id": event_id, "user_id": user_id, "seat_ids": seat_ids }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
