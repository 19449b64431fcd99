use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use encore_core::lock::{LockError, SeatLockKey, SeatLockService};
use encore_core::repository::{FraudStore, StoreError};

fn lock_err(err: redis::RedisError) -> LockError {
    LockError(err.to_string())
}

fn store_err(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn fraud_key(user_id: Uuid) -> String {
    format!("fraud:failed_attempts:{}", user_id)
}

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SeatLockService for RedisClient {
    async fn try_acquire(
        &self,
        key: &SeatLockKey,
        owner: Uuid,
        ttl: Duration,
    ) -> Result<bool, LockError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(lock_err)?;

        // SET NX: Only set if key does not exist
        let result: Option<String> = redis::cmd("SET")
            .arg(key.cache_key())
            .arg(owner.to_string())
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await
            .map_err(lock_err)?;

        Ok(result.is_some())
    }

    async fn release(&self, key: &SeatLockKey, owner: Uuid) -> Result<bool, LockError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(lock_err)?;

        // Compare-and-delete so we never drop a lock re-acquired by another
        // reservation after ours lapsed.
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );

        let deleted: i64 = script
            .key(key.cache_key())
            .arg(owner.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(lock_err)?;

        Ok(deleted == 1)
    }

    async fn confirm_and_drop(&self, key: &SeatLockKey) -> Result<(), LockError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(lock_err)?;

        let _: () = redis::cmd("DEL")
            .arg(key.cache_key())
            .query_async(&mut conn)
            .await
            .map_err(lock_err)?;

        Ok(())
    }
}

#[async_trait]
impl FraudStore for RedisClient {
    async fn increment(&self, user_id: Uuid, window: Duration) -> Result<i64, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let key = fraud_key(user_id);

        // INCR and EXPIRE in one round trip; every failure re-arms the window.
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(&key, 1)
            .expire(&key, window.as_secs() as i64)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(count)
    }

    async fn get(&self, user_id: Uuid) -> Result<i64, StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let count: Option<i64> = redis::cmd("GET")
            .arg(fraud_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(count.unwrap_or(0))
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(store_err)?;

        let _: () = redis::cmd("DEL")
            .arg(fraud_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(store_err)?;

        Ok(())
    }
}
