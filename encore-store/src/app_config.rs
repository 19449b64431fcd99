use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub booking: BookingRules,
}

/// Core tunables. Defaults mirror the original deployment: 10-minute seat
/// holds, 5 failed attempts tracked over 30 minutes.
#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_reservation_ttl_minutes")]
    pub reservation_ttl_minutes: u64,
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: i64,
    #[serde(default = "default_fraud_tracking_minutes")]
    pub fraud_tracking_minutes: u64,
    #[serde(default = "default_refund_window_days")]
    pub refund_window_days: i64,
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_reservation_ttl_minutes() -> u64 {
    10
}
fn default_max_failed_attempts() -> i64 {
    5
}
fn default_fraud_tracking_minutes() -> u64 {
    30
}
fn default_refund_window_days() -> i64 {
    30
}
fn default_sweep_interval_seconds() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Base configuration file
            .add_source(config::File::with_name("config/default"))
            // Environment-specific overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment variables, e.g. ENCORE__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("ENCORE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
