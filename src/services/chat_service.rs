//! 聊天请求处理流程
//!
//! 会话握手 → 发送消息 → 刷新会话句柄 → 转换响应

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;

use crate::backend::{BackendReply, ChatBackend};
use crate::converter::{build_completion, parse_complete_reply};
use crate::dispatcher::MessageDispatcher;
use crate::error::{BridgeError, BridgeResult};
use crate::models::openai::{ChatCompletionResponse, ChatTurn};
use crate::models::session::BearerCredential;
use crate::session::SessionResolver;
use crate::store::SessionStore;
use crate::stream::{create_sse_stream, OpenAiSseGenerator};

/// 输出给调用方的 SSE 帧流
pub type SseStream = Pin<Box<dyn Stream<Item = Result<String, BridgeError>> + Send>>;

pub enum ChatOutcome {
    Completion(ChatCompletionResponse),
    Stream(SseStream),
}

impl std::fmt::Debug for ChatOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatOutcome::Completion(resp) => f.debug_tuple("Completion").field(resp).finish(),
            ChatOutcome::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

pub struct ChatService {
    sessions: SessionResolver,
    dispatcher: MessageDispatcher,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn ChatBackend>,
        csrf_cookie: Option<String>,
    ) -> Self {
        Self {
            sessions: SessionResolver::new(store, backend.clone(), csrf_cookie),
            dispatcher: MessageDispatcher::new(backend),
        }
    }

    /// 处理一轮对话
    ///
    /// 握手任何一步失败都会直接返回错误，后续步骤不会执行。
    /// 流式响应在返回时尚未开始读取后端数据。
    pub async fn handle(
        &self,
        credential: &BearerCredential,
        turn: ChatTurn,
        request_id: &str,
    ) -> BridgeResult<ChatOutcome> {
        let partner = &turn.partner;
        let (auth, session) = self.sessions.prepare(credential, partner).await?;

        let reply = self
            .dispatcher
            .dispatch(&auth, partner, &session, &turn.text, turn.stream)
            .await?;

        self.sessions
            .continuity()
            .refresh(credential, partner, &session.history_id)
            .await;

        let model = partner.as_str();
        match reply {
            BackendReply::Stream(byte_stream) if turn.stream => {
                tracing::debug!(request_id = %request_id, partner = %partner, "[STREAM] relaying backend stream");
                let generator = OpenAiSseGenerator::new(model);
                Ok(ChatOutcome::Stream(Box::pin(create_sse_stream(
                    byte_stream,
                    generator,
                ))))
            }
            BackendReply::Complete(body) if !turn.stream => {
                let candidate = parse_complete_reply(&body)?;
                Ok(ChatOutcome::Completion(build_completion(model, &candidate)))
            }
            other => Err(BridgeError::Internal(format!(
                "后端响应类型与请求不符: stream={} reply={:?}",
                turn.stream, other
            ))),
        }
    }
}
