//! OpenAI Chat Completions 数据模型
//!
//! 入站请求只解析本代理需要的字段；响应结构与 OpenAI 保持一致。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::models::session::{PartnerId, MIN_PARTNER_ID_LEN};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    /// 只有最后一条消息的 content 会被解析，其余消息不做校验
    #[serde(default)]
    pub content: Option<Value>,
}

/// 校验后的入站请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub partner: PartnerId,
    /// 最后一条消息的文本
    pub text: String,
    pub stream: bool,
}

impl ChatCompletionRequest {
    /// 从原始请求体解析并校验
    pub fn parse(body: &[u8]) -> BridgeResult<ChatTurn> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(BridgeError::InvalidRequest("请求体为空".to_string()));
        }
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| BridgeError::InvalidRequest(format!("请求体不是合法 JSON: {e}")))?;
        if !value.is_object() {
            return Err(BridgeError::InvalidRequest(
                "请求体必须是 JSON 对象".to_string(),
            ));
        }
        let request: ChatCompletionRequest = serde_json::from_value(value)
            .map_err(|e| BridgeError::InvalidRequest(format!("请求字段无效: {e}")))?;
        request.into_turn()
    }

    pub fn into_turn(self) -> BridgeResult<ChatTurn> {
        let partner = PartnerId::new(self.model.clone()).ok_or_else(|| {
            BridgeError::InvalidRequest(format!(
                "model 长度至少为 {MIN_PARTNER_ID_LEN} 个字符"
            ))
        })?;

        let last = self
            .messages
            .last()
            .ok_or_else(|| BridgeError::InvalidRequest("messages 不能为空".to_string()))?;

        let text = last
            .content
            .as_ref()
            .and_then(content_text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                BridgeError::InvalidRequest("最后一条消息的 content 不能为空".to_string())
            })?;

        Ok(ChatTurn {
            partner,
            text,
            stream: self.stream.unwrap_or(false),
        })
    }
}

/// 提取消息文本
///
/// 支持字符串和内容块数组两种格式，数组中只保留 `text` 块。
pub fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter(|p| p.get("type").and_then(Value::as_str).unwrap_or("text") == "text")
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub index: u32,
    pub message: ResponseMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

/// 后端不提供 token 统计，三个字段恒为 0
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk<'a> {
    pub id: &'a str,
    pub object: &'static str,
    pub created: u64,
    pub model: &'a str,
    pub choices: Vec<StreamChoice<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamChoice<'a> {
    pub index: u32,
    pub delta: StreamDelta<'a>,
    pub finish_reason: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamDelta<'a> {
    pub content: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const PARTNER: &str = "abcdefghijklmnopqrstuvwxyz012345";

    fn parse(value: Value) -> BridgeResult<ChatTurn> {
        ChatCompletionRequest::parse(value.to_string().as_bytes())
    }

    #[test]
    fn test_uses_only_last_message() {
        let turn = parse(json!({
            "model": PARTNER,
            "messages": [
                {"role": "system", "content": null},
                {"role": "user", "content": "first"},
                {"role": "user", "content": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(turn.text, "second");
        assert_eq!(turn.partner.as_str(), PARTNER);
        assert!(!turn.stream);
    }

    #[test]
    fn test_role_is_not_inspected() {
        let turn = parse(json!({
            "model": PARTNER,
            "messages": [{"role": 7, "content": "hi"}, {"content": "there"}]
        }))
        .unwrap();
        assert_eq!(turn.text, "there");
    }

    #[test]
    fn test_content_parts_are_joined() {
        let turn = parse(json!({
            "model": PARTNER,
            "messages": [{"role": "user", "content": [
                {"type": "text", "text": "hello"},
                {"type": "image_url", "image_url": {"url": "http://x"}},
                {"type": "text", "text": "world"}
            ]}],
            "stream": true
        }))
        .unwrap();
        assert_eq!(turn.text, "hello\nworld");
        assert!(turn.stream);
    }

    #[test]
    fn test_rejects_invalid_bodies() {
        assert!(ChatCompletionRequest::parse(b"").is_err());
        assert!(ChatCompletionRequest::parse(b"not json").is_err());
        assert!(ChatCompletionRequest::parse(b"[1,2]").is_err());
        assert!(parse(json!({"messages": [{"content": "hi"}]})).is_err());
        assert!(parse(json!({"model": PARTNER, "messages": []})).is_err());
        assert!(parse(json!({"model": PARTNER, "messages": [{"content": ""}]})).is_err());
        assert!(parse(json!({"model": PARTNER, "messages": [{"content": 42}]})).is_err());
        assert!(parse(json!({
            "model": PARTNER,
            "messages": [{"content": "hi"}],
            "stream": "yes"
        }))
        .is_err());
    }

    #[test]
    fn test_null_stream_is_false() {
        let turn = parse(json!({
            "model": PARTNER,
            "messages": [{"content": "hi"}],
            "stream": null
        }))
        .unwrap();
        assert!(!turn.stream);
    }

    proptest! {
        /// 任意短于 20 个字符的 model 都返回 InvalidRequest
        #[test]
        fn prop_short_partner_id_rejected(
            model in "[a-zA-Z0-9_-]{0,19}",
            stream in proptest::option::of(any::<bool>()),
            text in "[a-z ]{1,30}"
        ) {
            let result = parse(json!({
                "model": model,
                "messages": [{"role": "user", "content": text}],
                "stream": stream
            }));
            prop_assert!(matches!(result, Err(BridgeError::InvalidRequest(_))));
        }

        /// 省略 stream 与 stream=false 等价
        #[test]
        fn prop_omitted_stream_equals_false(
            model in "[a-zA-Z0-9]{20,40}",
            text in "[a-z]{1,30}"
        ) {
            let omitted = parse(json!({"model": model, "messages": [{"content": text}]})).unwrap();
            let explicit = parse(json!({
                "model": model,
                "messages": [{"content": text}],
                "stream": false
            }))
            .unwrap();
            prop_assert_eq!(omitted, explicit);
        }
    }
}
