//! 进程内会话存储
//!
//! 单实例部署使用；进程重启后缓存丢失，只会导致重新握手和开启新会话。

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::SessionStore;
use crate::error::BridgeResult;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清理所有已过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// 启动后台清理任务
    ///
    /// 过期条目只有在同一个键再次被读取时才会移除，不再访问的凭证和伙伴
    /// 留下的条目需要靠定期清理释放。存储被释放后任务自行退出。
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即完成
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                let removed = store.purge_expired();
                if removed > 0 {
                    tracing::debug!(
                        removed,
                        remaining = store.len(),
                        "[STORE] purged expired entries"
                    );
                }
            }
        })
    }

    /// 当前条目数（包含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 条目剩余存活时间
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let entry = self.entries.get(key)?;
        entry.expires_at.checked_duration_since(Instant::now())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        // 过期条目在读取时移除
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> BridgeResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
