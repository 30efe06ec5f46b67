//! Redis 会话存储
//!
//! 多实例部署时共享缓存。使用 `SET key value EX ttl` 写入，过期由 Redis 负责。

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use std::time::Duration;

use super::SessionStore;
use crate::error::{BridgeError, BridgeResult};

#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    pub fn new(url: &str, pool_max: usize) -> BridgeResult<Self> {
        let mut cfg = Config::from_url(url);
        cfg.pool = Some(deadpool_redis::PoolConfig::new(pool_max.max(1)));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| BridgeError::Store(e.to_string()))?;
        Ok(Self { pool })
    }

    async fn connection(&self) -> BridgeResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| BridgeError::Store(format!("获取 Redis 连接失败: {e}")))
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| BridgeError::Store(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BridgeResult<()> {
        let mut conn = self.connection().await?;
        // Redis 的 EX 不接受 0
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(|e| BridgeError::Store(e.to_string()))
    }

    fn kind(&self) -> &'static str {
        "redis"
    }
}
