//! 后端传输层
//!
//! `ChatBackend` 描述与会话式后端交互所需的四个调用。
//! 生产环境使用基于 reqwest 的 `HttpBackend`，测试使用 `testing::MockBackend`。

pub mod client;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

use crate::error::BridgeResult;
use crate::models::backend::{CharacterInfoResponse, HistoryCreateResponse, SendMessagePayload};
use crate::models::session::{BearerCredential, PartnerId};

pub use client::HttpBackend;

/// 后端字节流
pub type ByteStream = Pin<Box<dyn Stream<Item = BridgeResult<Bytes>> + Send>>;

/// 认证后端调用所需的凭证
#[derive(Debug, Clone)]
pub struct BackendAuth {
    pub credential: BearerCredential,
    pub csrf_token: Option<String>,
}

impl BackendAuth {
    pub fn new(credential: BearerCredential, csrf_token: Option<String>) -> Self {
        Self {
            credential,
            csrf_token,
        }
    }
}

/// 发送消息的响应体
pub enum BackendReply {
    /// 完整响应体（非流式）
    Complete(Bytes),
    /// 增量字节流（流式）
    Stream(ByteStream),
}

impl std::fmt::Debug for BackendReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendReply::Complete(body) => f
                .debug_tuple("Complete")
                .field(&format_args!("{} bytes", body.len()))
                .finish(),
            BackendReply::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 访问后端根路径，返回响应中的全部 `Set-Cookie` 头
    async fn prime_session(&self, credential: &BearerCredential) -> BridgeResult<Vec<String>>;

    /// 查询会话伙伴信息
    async fn character_info(
        &self,
        auth: &BackendAuth,
        partner: &PartnerId,
    ) -> BridgeResult<CharacterInfoResponse>;

    /// 创建新的会话
    async fn create_history(
        &self,
        auth: &BackendAuth,
        partner: &PartnerId,
    ) -> BridgeResult<HistoryCreateResponse>;

    /// 发送消息
    async fn send_message(
        &self,
        auth: &BackendAuth,
        payload: &SendMessagePayload,
        stream: bool,
    ) -> BridgeResult<BackendReply>;
}
