//! 会话连续性管理
//!
//! 每个 (凭证, 伙伴) 对应一个长期会话句柄 (history id)，缓存 7 天，
//! 每次成功发送后刷新过期时间。句柄过期或被淘汰后会静默开启新会话。
//!
//! 缓存命中时不做有效性校验；句柄失效只会在发送时暴露，并作为错误返回给调用方，
//! 不会在同一请求内自动重建。
//!
//! 同一对的并发首次请求可能各自创建句柄，后写入者覆盖前者。

use std::sync::Arc;

use crate::backend::{BackendAuth, ChatBackend};
use crate::error::{BridgeError, BridgeResult};
use crate::models::session::{BearerCredential, PartnerId};
use crate::store::{cached_get, cached_set, CacheKey, SessionStore};

pub struct ContinuityManager {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn ChatBackend>,
}

impl ContinuityManager {
    pub fn new(store: Arc<dyn SessionStore>, backend: Arc<dyn ChatBackend>) -> Self {
        Self { store, backend }
    }

    /// 获取会话句柄，不存在时创建
    pub async fn resolve(&self, auth: &BackendAuth, partner: &PartnerId) -> BridgeResult<String> {
        let key = CacheKey::conversation(&auth.credential, partner);
        if let Some(history_id) = cached_get(self.store.as_ref(), &key).await {
            tracing::debug!(partner = %partner, "[HISTORY] reusing conversation");
            return Ok(history_id);
        }

        let history_id = self
            .backend
            .create_history(auth, partner)
            .await?
            .external_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                BridgeError::MalformedResponse("history create 响应缺少 external_id".to_string())
            })?;
        tracing::info!(partner = %partner, "[HISTORY] started new conversation");

        cached_set(self.store.as_ref(), &key, &history_id, key.kind().ttl()).await;
        Ok(history_id)
    }

    /// 发送成功后刷新句柄的过期时间
    pub async fn refresh(
        &self,
        credential: &BearerCredential,
        partner: &PartnerId,
        history_id: &str,
    ) {
        let key = CacheKey::conversation(credential, partner);
        cached_set(self.store.as_ref(), &key, history_id, key.kind().ttl()).await;
    }
}
