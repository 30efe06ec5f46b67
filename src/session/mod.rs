//! 会话状态解析
//!
//! 发送消息前按顺序完成三步握手，每一步都先查缓存：
//!
//! ```text
//! 防伪令牌 (csrf, 可选) ──> 路由标识 (tgt) ──> 会话句柄 (history id)
//! ```

pub mod continuity;
pub mod csrf;
pub mod identity;

use std::sync::Arc;

use crate::backend::{BackendAuth, ChatBackend};
use crate::error::BridgeResult;
use crate::models::session::{BearerCredential, PartnerId, SessionContext};
use crate::store::SessionStore;

pub use continuity::ContinuityManager;
pub use csrf::{extract_cookie, CsrfResolver};
pub use identity::IdentityResolver;

/// 组合三个解析器
pub struct SessionResolver {
    csrf: Option<CsrfResolver>,
    identity: IdentityResolver,
    continuity: ContinuityManager,
}

impl SessionResolver {
    /// `csrf_cookie` 为 None 时跳过防伪令牌步骤
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn ChatBackend>,
        csrf_cookie: Option<String>,
    ) -> Self {
        Self {
            csrf: csrf_cookie
                .map(|cookie| CsrfResolver::new(store.clone(), backend.clone(), cookie)),
            identity: IdentityResolver::new(store.clone(), backend.clone()),
            continuity: ContinuityManager::new(store, backend),
        }
    }

    /// 解析发送所需的全部会话状态，返回后续调用使用的认证信息
    pub async fn prepare(
        &self,
        credential: &BearerCredential,
        partner: &PartnerId,
    ) -> BridgeResult<(BackendAuth, SessionContext)> {
        let csrf_token = match &self.csrf {
            Some(resolver) => Some(resolver.resolve(credential).await?),
            None => None,
        };
        let auth = BackendAuth::new(credential.clone(), csrf_token);

        let routing_id = self.identity.resolve(&auth, partner).await?;
        let history_id = self.continuity.resolve(&auth, partner).await?;

        Ok((
            auth,
            SessionContext {
                routing_id,
                history_id,
            },
        ))
    }

    pub fn continuity(&self) -> &ContinuityManager {
        &self.continuity
    }
}
