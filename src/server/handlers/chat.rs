//! Chat Completions 处理器

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{BridgeError, BridgeResult};
use crate::models::openai::ChatCompletionRequest;
use crate::models::session::BearerCredential;
use crate::server::AppState;
use crate::server_utils::build_stream_response;
use crate::services::ChatOutcome;

/// POST /v1/chat/completions
///
/// 先校验请求体再校验凭证，无效的伙伴 ID 总是返回 400。
pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let turn = match ChatCompletionRequest::parse(&body) {
        Ok(turn) => turn,
        Err(e) => {
            e.log_with_context(&request_id, "-");
            return e.into_response();
        }
    };

    let credential = match bearer_credential(&headers) {
        Ok(credential) => credential,
        Err(e) => {
            e.log_with_context(&request_id, turn.partner.as_str());
            return e.into_response();
        }
    };

    let partner = turn.partner.clone();
    tracing::info!(
        request_id = %request_id,
        partner = %partner,
        stream = turn.stream,
        "Chat completion request"
    );

    match state.chat.handle(&credential, turn, &request_id).await {
        Ok(ChatOutcome::Completion(resp)) => Json(resp).into_response(),
        Ok(ChatOutcome::Stream(stream)) => build_stream_response(stream),
        Err(e) => {
            e.log_with_context(&request_id, partner.as_str());
            e.into_response()
        }
    }
}

/// 补全路由上的其他方法
pub async fn method_not_allowed(method: Method) -> Response {
    BridgeError::MethodNotAllowed(method.to_string()).into_response()
}

/// 从 `Authorization: Bearer <token>` 中提取凭证，scheme 不区分大小写
pub fn bearer_credential(headers: &HeaderMap) -> BridgeResult<BearerCredential> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| BridgeError::Unauthorized("缺少 Authorization 头".to_string()))?
        .to_str()
        .map_err(|_| BridgeError::Unauthorized("Authorization 头包含非法字符".to_string()))?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| BridgeError::Unauthorized("Authorization 头格式错误".to_string()))?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(BridgeError::Unauthorized("仅支持 Bearer 认证".to_string()));
    }

    BearerCredential::new(token)
        .ok_or_else(|| BridgeError::Unauthorized("Bearer 凭证为空".to_string()))
}
