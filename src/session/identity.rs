//! 路由标识解析
//!
//! 发送消息前需要会话伙伴的内部路由标识 (tgt)，按 (凭证, 伙伴) 缓存一小时。

use std::sync::Arc;

use crate::backend::{BackendAuth, ChatBackend};
use crate::error::{BridgeError, BridgeResult};
use crate::models::session::PartnerId;
use crate::store::{cached_get, cached_set, CacheKey, SessionStore};

pub struct IdentityResolver {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn ChatBackend>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn SessionStore>, backend: Arc<dyn ChatBackend>) -> Self {
        Self { store, backend }
    }

    pub async fn resolve(&self, auth: &BackendAuth, partner: &PartnerId) -> BridgeResult<String> {
        let key = CacheKey::routing(&auth.credential, partner);
        if let Some(tgt) = cached_get(self.store.as_ref(), &key).await {
            tracing::debug!(partner = %partner, "[IDENTITY] cache hit");
            return Ok(tgt);
        }

        tracing::debug!(partner = %partner, "[IDENTITY] cache miss, querying character info");
        let tgt = self
            .backend
            .character_info(auth, partner)
            .await?
            .routing_id()
            .ok_or_else(|| {
                BridgeError::MalformedResponse("character info 响应缺少 identifier".to_string())
            })?;

        cached_set(self.store.as_ref(), &key, &tgt, key.kind().ttl()).await;
        Ok(tgt)
    }
}
