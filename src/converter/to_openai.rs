//! 后端非流式响应转换为 OpenAI 格式

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{BridgeError, BridgeResult};
use crate::models::backend::{CandidateReply, ReplyFrame};
use crate::models::openai::{ChatCompletionResponse, Choice, ResponseMessage, Usage};

/// 当前 Unix 时间戳（秒）
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// 生成响应 ID
pub fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

/// 解析非流式响应体
///
/// 优先按单个 JSON 文档解析；失败时按行解析，取最后一个带文本的片段。
pub fn parse_complete_reply(body: &[u8]) -> BridgeResult<CandidateReply> {
    if let Ok(frame) = serde_json::from_slice::<ReplyFrame>(body) {
        return Ok(frame.first_candidate());
    }

    let text = String::from_utf8_lossy(body);
    let mut fallback = None;
    for line in text.lines().rev().map(str::trim).filter(|l| !l.is_empty()) {
        let Ok(frame) = serde_json::from_str::<ReplyFrame>(line) else {
            continue;
        };
        let reply = frame.first_candidate();
        if reply.non_empty().is_some() {
            return Ok(reply);
        }
        fallback.get_or_insert(reply);
    }

    fallback.ok_or_else(|| {
        BridgeError::MalformedResponse(format!(
            "发送接口响应无法解析: {}",
            crate::server_utils::safe_truncate(text.trim(), crate::error::ERROR_PREVIEW_CHARS)
        ))
    })
}

/// 构建一次性 completion 响应
pub fn build_completion(model: &str, reply: &CandidateReply) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: unix_now(),
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ResponseMessage {
                role: "assistant".to_string(),
                content: reply.text_or_placeholder(),
            },
            finish_reason: "stop".to_string(),
        }],
        usage: Usage::default(),
    }
}
