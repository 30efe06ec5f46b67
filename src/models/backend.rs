//! 后端响应数据模型
//!
//! 后端响应结构并不稳定，所有字段都按可选字段提取，缺失时使用明确的默认值。

use serde::{Deserialize, Serialize};

/// 非流式响应中没有候选文本时返回的占位内容
pub const EMPTY_REPLY_PLACEHOLDER: &str = "(no reply)";

/// 单个回复片段（非流式响应体或流式响应中的一行）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplyFrame {
    #[serde(default, alias = "replies")]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub text: Option<String>,
}

/// 从回复中提取的文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateReply {
    pub text: Option<String>,
}

impl ReplyFrame {
    /// 第一个候选的文本
    pub fn first_candidate(&self) -> CandidateReply {
        CandidateReply {
            text: self.candidates.first().and_then(|c| c.text.clone()),
        }
    }
}

impl CandidateReply {
    /// 非空文本
    pub fn non_empty(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// 文本或占位内容
    pub fn text_or_placeholder(&self) -> String {
        self.non_empty()
            .unwrap_or(EMPTY_REPLY_PLACEHOLDER)
            .to_string()
    }
}

/// character info 响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterInfoResponse {
    #[serde(default)]
    pub character: Option<CharacterInfo>,
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterInfo {
    #[serde(default)]
    pub identifier: Option<String>,
}

impl CharacterInfoResponse {
    pub fn routing_id(self) -> Option<String> {
        self.character
            .and_then(|c| c.identifier)
            .or(self.identifier)
            .filter(|id| !id.is_empty())
    }
}

/// history create 响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryCreateResponse {
    #[serde(default)]
    pub external_id: Option<String>,
}

/// 发送消息的请求体
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SendMessagePayload {
    pub history_external_id: String,
    pub character_external_id: String,
    pub text: String,
    pub tgt: String,
    pub ranking_method: &'static str,
    pub staging: bool,
    pub num_candidates: u32,
    pub stream_every_n_steps: u32,
}
