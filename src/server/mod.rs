//! HTTP 服务器
//!
//! 对外提供 OpenAI 兼容的 Chat Completions 接口。

pub mod handlers;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::backend::HttpBackend;
use crate::config::Config;
use crate::error::{BridgeError, BridgeResult};
use crate::server_utils::health;
use crate::services::ChatService;
use crate::store::build_store;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
}

impl AppState {
    pub fn new(chat: ChatService) -> Self {
        Self {
            chat: Arc::new(chat),
        }
    }
}

pub fn build_router(state: AppState, body_limit: usize) -> Router {
    let completions = || {
        post(handlers::chat_completions).fallback(handlers::method_not_allowed)
    };

    Router::new()
        .route("/v1/chat/completions", completions())
        .route("/chat/completions", completions())
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 按配置组装存储、后端和服务
pub fn build_state(config: &Config) -> BridgeResult<AppState> {
    let store = build_store(&config.store)?;
    let backend = Arc::new(HttpBackend::new(config.upstream.clone())?);
    let csrf_cookie = config
        .upstream
        .csrf_enabled
        .then(|| config.upstream.csrf_cookie.clone());

    tracing::info!(
        store = store.kind(),
        upstream = %config.upstream.base_url,
        csrf = config.upstream.csrf_enabled,
        "Session store ready"
    );
    Ok(AppState::new(ChatService::new(store, backend, csrf_cookie)))
}

pub async fn run_server(config: Config) -> BridgeResult<()> {
    let state = build_state(&config)?;
    let app = build_router(state, config.server.body_limit_bytes);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| BridgeError::Config(format!("监听地址无效: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BridgeError::Internal(format!("无法绑定 {addr}: {e}")))?;
    tracing::info!(addr = %addr, "chatbridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| BridgeError::Internal(e.to_string()))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
