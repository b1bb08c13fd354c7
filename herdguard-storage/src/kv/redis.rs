//! Redis-backed key-value store.
//!
//! Connections come from a `deadpool-redis` pool. Conditional set maps to
//! `SET key value NX PX ttl`, and compare-and-delete runs as a Lua script so
//! the value check and the delete execute as one server-side step.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Connection, Pool, Runtime};
use herdguard_core::{HerdguardResult, StoreError};

use super::KeyValueStore;

/// Deletes KEYS[1] only when its value equals ARGV[1]. Returns 1 on delete.
const COMPARE_AND_DELETE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
    return redis.call("del", KEYS[1])
else
    return 0
end
"#;

/// Key-value store on a shared Redis server.
pub struct RedisKeyValueStore {
    pool: Pool,
    compare_and_delete: redis::Script,
}

impl RedisKeyValueStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            compare_and_delete: redis::Script::new(COMPARE_AND_DELETE_SCRIPT),
        }
    }

    /// Build a pooled store from a `redis://` URL.
    pub fn from_url(url: &str) -> HerdguardResult<Self> {
        let pool = PoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StoreError::Unavailable {
                reason: format!("failed to create redis pool: {}", e),
            })?;
        Ok(Self::new(pool))
    }

    async fn connection(&self) -> HerdguardResult<Connection> {
        self.pool.get().await.map_err(|e| {
            StoreError::Unavailable {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

fn command_failed(command: &'static str) -> impl FnOnce(redis::RedisError) -> StoreError {
    move |e| StoreError::CommandFailed {
        command: command.to_string(),
        reason: e.to_string(),
    }
}

/// Millisecond TTL for `PX`; Redis rejects zero.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl KeyValueStore for RedisKeyValueStore {
    async fn get(&self, key: &str) -> HerdguardResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("GET"))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> HerdguardResult<()> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }
        let _: () = cmd
            .query_async(&mut conn)
            .await
            .map_err(command_failed("SET"))?;
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> HerdguardResult<bool> {
        let mut conn = self.connection().await?;
        // Reply is "OK" when created and nil when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(command_failed("SET NX"))?;
        Ok(reply.is_some())
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> HerdguardResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = self
            .compare_and_delete
            .key(key)
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(command_failed("EVALSHA compare-and-delete"))?;
        Ok(removed == 1)
    }

    async fn delete(&self, key: &str) -> HerdguardResult<bool> {
        let mut conn = self.connection().await?;
        let removed: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_failed("DEL"))?;
        Ok(removed > 0)
    }
}
