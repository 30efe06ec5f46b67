//! 服务器工具函数
//!
//! 包含字符串处理、响应构建等公共工具函数。

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;

use crate::error::BridgeError;
use crate::services::SseStream;

/// 安全截断字符串到指定字符数，避免 UTF-8 边界问题
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// 构建流式响应
///
/// 帧按后端到达顺序逐个写出；流产出错误时 hyper 会中断连接，调用方收不到 `[DONE]`。
pub fn build_stream_response(stream: SseStream) -> Response {
    let body_stream = stream.map(|frame| frame.map(Bytes::from));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| {
            BridgeError::Internal("Failed to build stream response".to_string()).into_response()
        })
}

/// 健康检查端点响应
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
