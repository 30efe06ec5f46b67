//! 消息发送
//!
//! 组装固定结构的发送请求体并调用后端发送接口。

use std::sync::Arc;

use crate::backend::{BackendAuth, BackendReply, ChatBackend};
use crate::error::BridgeResult;
use crate::models::backend::SendMessagePayload;
use crate::models::session::{PartnerId, SessionContext};

pub const RANKING_METHOD: &str = "random";
pub const NUM_CANDIDATES: u32 = 1;
/// 流式请求的输出粒度（后端提示，不影响正确性）
pub const STREAM_STEPS_STREAMING: u32 = 16;
/// 非流式请求的输出粒度
pub const STREAM_STEPS_BUFFERED: u32 = 256;

/// 构建发送请求体
pub fn build_payload(
    partner: &PartnerId,
    session: &SessionContext,
    text: &str,
    stream: bool,
) -> SendMessagePayload {
    SendMessagePayload {
        history_external_id: session.history_id.clone(),
        character_external_id: partner.as_str().to_string(),
        text: text.to_string(),
        tgt: session.routing_id.clone(),
        ranking_method: RANKING_METHOD,
        staging: false,
        num_candidates: NUM_CANDIDATES,
        stream_every_n_steps: if stream {
            STREAM_STEPS_STREAMING
        } else {
            STREAM_STEPS_BUFFERED
        },
    }
}

pub struct MessageDispatcher {
    backend: Arc<dyn ChatBackend>,
}

impl MessageDispatcher {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub async fn dispatch(
        &self,
        auth: &BackendAuth,
        partner: &PartnerId,
        session: &SessionContext,
        text: &str,
        stream: bool,
    ) -> BridgeResult<BackendReply> {
        let payload = build_payload(partner, session, text, stream);
        tracing::debug!(
            partner = %partner,
            stream,
            chars = text.chars().count(),
            "[DISPATCH] sending message"
        );
        self.backend.send_message(auth, &payload, stream).await
    }
}
