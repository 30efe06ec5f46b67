//! OpenAI SSE 生成器
//!
//! 将文本增量转换为 OpenAI Chat Completions SSE 帧。
//!
//! # 格式说明
//!
//! ```text
//! data: {"id":"chatcmpl-xxx","object":"chat.completion.chunk","created":1234567890,"model":"xxx","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}
//!
//! data: [DONE]
//! ```
//!
//! 结束时只发送 `[DONE]`，不额外发送带 `finish_reason` 的块。

use crate::converter::{completion_id, unix_now};
use crate::models::openai::{ChatCompletionChunk, StreamChoice, StreamDelta};

/// 流结束标记帧
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

#[derive(Debug, Clone)]
pub struct OpenAiSseGenerator {
    /// 同一个响应内所有帧共享的 ID
    response_id: String,
    model: String,
    created: u64,
}

impl OpenAiSseGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_id(completion_id(), model)
    }

    pub fn with_id(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            response_id: id.into(),
            model: model.into(),
            created: unix_now(),
        }
    }

    /// 生成一个文本增量帧，空文本不产生输出
    pub fn delta(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let chunk = ChatCompletionChunk {
            id: &self.response_id,
            object: "chat.completion.chunk",
            created: self.created,
            model: &self.model,
            choices: vec![StreamChoice {
                index: 0,
                delta: StreamDelta { content: text },
                finish_reason: None,
            }],
        };
        Some(format!("data: {}\n\n", serde_json::to_string(&chunk).ok()?))
    }

    pub fn done(&self) -> &'static str {
        DONE_FRAME
    }

    pub fn response_id(&self) -> &str {
        &self.response_id
    }
}
