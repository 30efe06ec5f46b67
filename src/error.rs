//! 错误类型
//!
//! 定义请求处理过程中可能发生的错误，以及它们到 HTTP 响应的映射

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// 上游错误正文预览的最大字符数
pub const ERROR_PREVIEW_CHARS: usize = 200;

pub type BridgeResult<T> = Result<T, BridgeError>;

/// 处理错误
#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    /// 请求体缺失或格式错误
    #[error("请求无效: {0}")]
    InvalidRequest(String),

    /// 缺少或无效的 Bearer 凭证
    #[error("认证失败: {0}")]
    Unauthorized(String),

    /// 不支持的请求方法
    #[error("不支持的请求方法: {0}")]
    MethodNotAllowed(String),

    /// 上游返回非成功状态码
    #[error("上游不可用: HTTP {status} - {preview}")]
    UpstreamUnavailable { status: u16, preview: String },

    /// 上游响应中没有防伪 Cookie
    #[error("上游响应缺少防伪令牌 Cookie: {cookie}")]
    MissingToken { cookie: String },

    /// 上游返回成功状态，但响应体无法解析或缺少字段
    #[error("上游响应格式错误: {0}")]
    MalformedResponse(String),

    /// 与上游的连接中断
    #[error("上游连接中断: {0}")]
    TransportInterrupted(String),

    /// 会话存储错误
    #[error("会话存储错误: {0}")]
    Store(String),

    /// 配置无法用于构建服务
    #[error("配置错误: {0}")]
    Config(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl BridgeError {
    /// 根据上游状态码和原始响应体构建错误，响应体会被截断
    pub fn upstream(status: u16, body: &str) -> Self {
        BridgeError::UpstreamUnavailable {
            status,
            preview: crate::server_utils::safe_truncate(body.trim(), ERROR_PREVIEW_CHARS),
        }
    }

    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            BridgeError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BridgeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            BridgeError::UpstreamUnavailable { .. }
            | BridgeError::MissingToken { .. }
            | BridgeError::MalformedResponse(_)
            | BridgeError::TransportInterrupted(_)
            | BridgeError::Store(_)
            | BridgeError::Config(_)
            | BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 获取错误类型字符串
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::InvalidRequest(_) => "invalid_request",
            BridgeError::Unauthorized(_) => "unauthorized",
            BridgeError::MethodNotAllowed(_) => "method_not_allowed",
            BridgeError::UpstreamUnavailable { .. } => "upstream_unavailable",
            BridgeError::MissingToken { .. } => "missing_token",
            BridgeError::MalformedResponse(_) => "malformed_response",
            BridgeError::TransportInterrupted(_) => "transport_interrupted",
            BridgeError::Store(_) => "store_error",
            BridgeError::Config(_) => "config_error",
            BridgeError::Internal(_) => "internal_error",
        }
    }

    /// 转换为 JSON 错误响应体
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }

    /// 记录带上下文的错误日志
    pub fn log_with_context(&self, request_id: &str, partner: &str) {
        let message = crate::logger::sanitize_log_message(&self.to_string());
        if self.status_code().is_server_error() {
            tracing::error!(
                request_id = %request_id,
                partner = %partner,
                error_type = %self.error_type(),
                error_message = %message,
                "Request processing failed"
            );
        } else {
            tracing::info!(
                request_id = %request_id,
                error_type = %self.error_type(),
                error_message = %message,
                "Request rejected"
            );
        }
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BridgeError::MalformedResponse(err.to_string())
        } else {
            BridgeError::TransportInterrupted(err.to_string())
        }
    }
}

impl From<crate::config::ConfigError> for BridgeError {
    fn from(err: crate::config::ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
