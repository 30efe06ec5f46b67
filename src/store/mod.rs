//! 会话存储层
//!
//! 缓存防伪令牌、路由标识和会话句柄。存储只是缓存，不是数据源：
//! 所有条目都可以通过重新请求后端再次获得。
//!
//! # 模块结构
//!
//! - `keys`: 缓存键命名空间
//! - `memory`: 进程内存储（DashMap + 过期时间）
//! - `redis`: Redis 存储（deadpool-redis 连接池）

pub mod keys;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{StoreConfig, StoreKind};
use crate::error::{BridgeError, BridgeResult};

pub use self::keys::{CacheKey, KeyKind};
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// 带过期时间的键值存储
///
/// 写入总是无条件覆盖；读取允许键不存在。
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> BridgeResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BridgeResult<()>;

    /// 存储类型名称，用于日志
    fn kind(&self) -> &'static str;
}

pub type SharedStore = Arc<dyn SessionStore>;

/// 根据配置创建存储
///
/// 内存存储会启动后台清理任务，必须在 tokio 运行时内调用。
pub fn build_store(config: &StoreConfig) -> BridgeResult<SharedStore> {
    match config.kind {
        StoreKind::Memory => {
            let store = Arc::new(MemoryStore::new());
            store.spawn_sweeper(config.sweep_interval());
            Ok(store)
        }
        StoreKind::Redis => {
            let url = config
                .redis_url
                .clone()
                .ok_or_else(|| BridgeError::Store("未配置 redis_url".to_string()))?;
            Ok(Arc::new(RedisStore::new(&url, config.redis_pool_max)?))
        }
    }
}

/// 读取缓存，存储故障按未命中处理
pub async fn cached_get(store: &dyn SessionStore, key: &CacheKey) -> Option<String> {
    match store.get(key.as_str()).await {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            tracing::warn!(
                store = store.kind(),
                kind = key.kind().prefix(),
                "[STORE] read failed, treating as miss: {}",
                e
            );
            None
        }
    }
}

/// 写入缓存，失败只记录日志
pub async fn cached_set(store: &dyn SessionStore, key: &CacheKey, value: &str, ttl: Duration) {
    if let Err(e) = store.set(key.as_str(), value, ttl).await {
        tracing::warn!(
            store = store.kind(),
            kind = key.kind().prefix(),
            "[STORE] write failed: {}",
            e
        );
    }
}
