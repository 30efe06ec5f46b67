//! 防伪令牌解析
//!
//! 后端要求认证请求同时携带 CSRF Cookie 和请求头。令牌通过访问根路径获得，
//! 按凭证缓存一小时。

use crate::backend::ChatBackend;
use crate::error::{BridgeError, BridgeResult};
use crate::models::session::BearerCredential;
use crate::store::{cached_get, cached_set, CacheKey, SessionStore};
use std::sync::Arc;

pub struct CsrfResolver {
    store: Arc<dyn SessionStore>,
    backend: Arc<dyn ChatBackend>,
    cookie_name: String,
}

impl CsrfResolver {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn ChatBackend>,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            cookie_name: cookie_name.into(),
        }
    }

    /// 获取凭证对应的防伪令牌，未命中缓存时访问后端根路径
    pub async fn resolve(&self, credential: &BearerCredential) -> BridgeResult<String> {
        let key = CacheKey::anti_forgery(credential);
        if let Some(token) = cached_get(self.store.as_ref(), &key).await {
            tracing::debug!("[CSRF] cache hit");
            return Ok(token);
        }

        tracing::debug!("[CSRF] cache miss, priming session");
        let cookies = self.backend.prime_session(credential).await?;
        let token = extract_cookie(&cookies, &self.cookie_name).ok_or_else(|| {
            BridgeError::MissingToken {
                cookie: self.cookie_name.clone(),
            }
        })?;

        cached_set(self.store.as_ref(), &key, &token, key.kind().ttl()).await;
        Ok(token)
    }
}

/// 从 `Set-Cookie` 头中按名称提取 Cookie 值
///
/// 每个头按 `;` 拆分，合并在同一行的多个 Cookie 再按 `,` 拆分。
/// `Expires` 里的逗号只会产生不含 `=` 的片段，不影响匹配。
pub fn extract_cookie<S: AsRef<str>>(set_cookie_headers: &[S], name: &str) -> Option<String> {
    set_cookie_headers
        .iter()
        .flat_map(|header| header.as_ref().split([';', ',']))
        .filter_map(|segment| segment.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
