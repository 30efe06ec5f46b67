//! 基于 reqwest 的后端客户端

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{BackendAuth, BackendReply, ChatBackend};
use crate::config::UpstreamConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::logger::sanitize_log_message;
use crate::models::backend::{CharacterInfoResponse, HistoryCreateResponse, SendMessagePayload};
use crate::models::session::{BearerCredential, PartnerId};

/// 出站代理协议
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyProtocol {
    Http,
    Https,
}

impl ProxyProtocol {
    /// 从 URL 解析代理协议，只接受 `http://` 和 `https://`
    pub fn from_url(url: &str) -> Option<Self> {
        let url_lower = url.trim().to_lowercase();
        if url_lower.starts_with("http://") {
            Some(ProxyProtocol::Http)
        } else if url_lower.starts_with("https://") {
            Some(ProxyProtocol::Https)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
        }
    }
}

/// 构建上游 HTTP 客户端
///
/// 连接超时和总超时都来自配置，后端挂起时请求会失败而不是一直等待。
pub fn build_http_client(config: &UpstreamConfig) -> BridgeResult<Client> {
    let mut builder = Client::builder()
        .connect_timeout(config.connect_timeout())
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.as_str());

    // 出站代理只来自配置，不读取系统代理环境变量
    match config.proxy_url.as_deref() {
        Some(url) => {
            let protocol = ProxyProtocol::from_url(url)
                .ok_or_else(|| BridgeError::Internal(format!("不支持的代理协议: {url}")))?;
            let proxy = Proxy::all(url).map_err(|e| BridgeError::Internal(e.to_string()))?;
            tracing::info!(protocol = protocol.as_str(), "[UPSTREAM] using outbound proxy");
            builder = builder.proxy(proxy);
        }
        None => builder = builder.no_proxy(),
    }

    builder
        .build()
        .map_err(|e| BridgeError::Internal(format!("创建 HTTP 客户端失败: {e}")))
}

pub struct HttpBackend {
    client: Client,
    config: UpstreamConfig,
}

impl HttpBackend {
    pub fn new(config: UpstreamConfig) -> BridgeResult<Self> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    fn auth_headers(&self, auth: &BackendAuth) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&format!("Token {}", auth.credential.expose())) {
            headers.insert(header::AUTHORIZATION, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.config.base_url) {
            headers.insert(header::REFERER, value.clone());
            headers.insert(header::ORIGIN, value);
        }
        if let Some(token) = auth.csrf_token.as_deref() {
            if let Ok(value) = HeaderValue::from_str(token) {
                headers.insert("x-csrftoken", value);
            }
            if let Ok(value) =
                HeaderValue::from_str(&format!("{}={}", self.config.csrf_cookie, token))
            {
                headers.insert(header::COOKIE, value);
            }
        }
        headers
    }

    fn post(&self, path: &str, auth: &BackendAuth) -> RequestBuilder {
        self.client
            .post(self.config.endpoint(path))
            .headers(self.auth_headers(auth))
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        auth: &BackendAuth,
        body: serde_json::Value,
    ) -> BridgeResult<T> {
        let resp = self.post(path, auth).json(&body).send().await?;
        let resp = ensure_success(resp, path).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            BridgeError::MalformedResponse(format!("{path} 响应不是合法 JSON: {e}"))
        })
    }
}

/// 非成功状态码转换为 `UpstreamUnavailable`，错误正文截断
async fn ensure_success(resp: Response, path: &str) -> BridgeResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let err = BridgeError::upstream(status.as_u16(), &body);
    tracing::warn!(
        "[UPSTREAM] {} returned {}: {}",
        path,
        status,
        sanitize_log_message(&err.to_string())
    );
    Err(err)
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn prime_session(&self, credential: &BearerCredential) -> BridgeResult<Vec<String>> {
        let auth = BackendAuth::new(credential.clone(), None);
        let resp = self
            .client
            .get(self.config.endpoint("/"))
            .headers(self.auth_headers(&auth))
            .send()
            .await?;
        let resp = ensure_success(resp, "/").await?;
        Ok(resp
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect())
    }

    async fn character_info(
        &self,
        auth: &BackendAuth,
        partner: &PartnerId,
    ) -> BridgeResult<CharacterInfoResponse> {
        self.post_json(
            &self.config.character_info_path,
            auth,
            serde_json::json!({ "external_id": partner.as_str() }),
        )
        .await
    }

    async fn create_history(
        &self,
        auth: &BackendAuth,
        partner: &PartnerId,
    ) -> BridgeResult<HistoryCreateResponse> {
        self.post_json(
            &self.config.history_create_path,
            auth,
            serde_json::json!({ "character_external_id": partner.as_str() }),
        )
        .await
    }

    async fn send_message(
        &self,
        auth: &BackendAuth,
        payload: &SendMessagePayload,
        stream: bool,
    ) -> BridgeResult<BackendReply> {
        let path = &self.config.send_message_path;
        let resp = self.post(path, auth).json(payload).send().await?;
        let resp = ensure_success(resp, path).await?;

        if stream {
            let byte_stream = resp
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| BridgeError::TransportInterrupted(e.to_string())));
            Ok(BackendReply::Stream(Box::pin(byte_stream)))
        } else {
            Ok(BackendReply::Complete(resp.bytes().await?))
        }
    }
}
