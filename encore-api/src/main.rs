use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use encore_api::{app, AppState};
use encore_booking::{ExpirySweeper, MockPaymentGateway, ReservationEngine, ReservationRules};
use encore_store::{
    Config, DbClient, EventProducer, RedisClient, StoreBookingRepository, StoreSeatRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Encore API on port {}", config.server.port);

    // Postgres Connection
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    let seats = Arc::new(StoreSeatRepository::new(db.pool.clone()));
    let bookings = Arc::new(StoreBookingRepository::new(db.pool.clone()));

    // Redis Connection: seat locks and fraud counters
    let redis_client =
        Arc::new(RedisClient::new(&config.redis.url).expect("Failed to connect to Redis"));

    // Kafka Connection
    let kafka_producer =
        EventProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer");
    let kafka_arc = Arc::new(kafka_producer);

    let rules = ReservationRules {
        reservation_ttl: Duration::from_secs(config.booking.reservation_ttl_minutes * 60),
        max_failed_attempts: config.booking.max_failed_attempts,
        fraud_window: Duration::from_secs(config.booking.fraud_tracking_minutes * 60),
        refund_window_days: config.booking.refund_window_days,
    };

    let engine = ReservationEngine::new(
        seats.clone(),
        bookings.clone(),
        redis_client.clone(),
        redis_client.clone(),
        Arc::new(MockPaymentGateway),
        rules,
    );

    let sweeper = ExpirySweeper::new(
        seats,
        redis_client,
        Duration::from_secs(config.booking.sweep_interval_seconds),
    );
    tokio::spawn(sweeper.run());

    let app_state = AppState {
        engine: Arc::new(engine),
        bookings,
        kafka: kafka_arc,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
