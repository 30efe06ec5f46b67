//! 路由测试

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use proptest::prelude::*;
use tower::ServiceExt;

use super::{build_router, AppState};
use crate::services::ChatService;
use crate::store::MemoryStore;
use crate::testing::{MockBackend, MockReply, PARTNER};

const BODY_LIMIT: usize = 64 * 1024;

fn app(backend: Arc<MockBackend>) -> Router {
    let service = ChatService::new(
        Arc::new(MemoryStore::new()),
        backend,
        Some("csrftoken".to_string()),
    );
    build_router(AppState::new(service), BODY_LIMIT)
}

fn completion_request(body: serde_json::Value, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn valid_body(stream: bool) -> serde_json::Value {
    serde_json::json!({
        "model": PARTNER,
        "messages": [{"role": "user", "content": "hi"}],
        "stream": stream
    })
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let resp = app(Arc::new(MockBackend::new()))
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "healthy");
}

#[tokio::test]
async fn test_get_on_completions_is_405() {
    for uri in ["/v1/chat/completions", "/chat/completions"] {
        let resp = app(Arc::new(MockBackend::new()))
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(body_json(resp).await["error"].is_string());
    }
}

#[tokio::test]
async fn test_missing_or_wrong_auth_is_401() {
    for auth in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer ")] {
        let backend = Arc::new(MockBackend::new());
        let resp = app(backend.clone())
            .oneshot(completion_request(valid_body(false), auth))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "auth: {auth:?}");
        assert_eq!(backend.setup_calls(), 0);
    }
}

#[tokio::test]
async fn test_validation_runs_before_auth() {
    let body = serde_json::json!({"model": "short", "messages": [{"content": "hi"}]});
    let resp = app(Arc::new(MockBackend::new()))
        .oneshot(completion_request(body, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());
}

#[tokio::test]
async fn test_invalid_bodies_are_400() {
    let bodies = [
        serde_json::json!([1, 2, 3]),
        serde_json::json!({"model": PARTNER, "messages": []}),
        serde_json::json!({"model": PARTNER, "messages": [{"role": "user", "content": ""}]}),
        serde_json::json!({"model": PARTNER, "messages": [{"role": "user"}]}),
        serde_json::json!({"model": PARTNER, "messages": "hi"}),
        serde_json::json!({"model": PARTNER, "messages": [{"content": "hi"}], "stream": "yes"}),
    ];
    for body in bodies {
        let backend = Arc::new(MockBackend::new());
        let resp = app(backend.clone())
            .oneshot(completion_request(body.clone(), Some("Bearer tok")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(backend.setup_calls(), 0);
    }
}

#[tokio::test]
async fn test_non_streaming_completion() {
    let backend = Arc::new(MockBackend::new());
    let resp = app(backend.clone())
        .oneshot(completion_request(valid_body(false), Some("Bearer tok")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["object"], "chat.completion");
    assert_eq!(json["model"], PARTNER);
    assert!(json["id"].as_str().unwrap().starts_with("chatcmpl-"));
    assert_eq!(json["choices"][0]["index"], 0);
    assert_eq!(json["choices"][0]["message"]["role"], "assistant");
    assert_eq!(json["choices"][0]["message"]["content"], "hello there");
    assert_eq!(json["choices"][0]["finish_reason"], "stop");
    assert_eq!(json["usage"]["total_tokens"], 0);

    let auth = backend.last_auth.lock().unwrap().clone().unwrap();
    assert_eq!(auth.credential.expose(), "tok");
}

#[tokio::test]
async fn test_streaming_completion() {
    let backend = Arc::new(MockBackend::new().with_reply(MockReply::Chunks(vec![
        b"{\"candidates\":[{\"text\":\"Hel\"}]}\n".to_vec(),
        b"{\"candidates\":[{\"text\":\"lo\"}]}\n".to_vec(),
    ])));
    let resp = app(backend)
        .oneshot(completion_request(valid_body(true), Some("bearer tok")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );

    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let frames: Vec<&str> = text.split_terminator("\n\n").collect();
    assert_eq!(frames.len(), 3);
    assert!(frames[0].contains("\"content\":\"Hel\""));
    assert!(frames[1].contains("\"content\":\"lo\""));
    assert_eq!(frames[2], "data: [DONE]");
}

#[tokio::test]
async fn test_upstream_failure_is_500() {
    let backend = Arc::new(MockBackend::new().fail_info(403, "<html>forbidden</html>"));
    let resp = app(backend)
        .oneshot(completion_request(valid_body(false), Some("Bearer tok")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let message = body_json(resp).await["error"].as_str().unwrap().to_string();
    assert!(message.contains("403"));
}

#[tokio::test]
async fn test_missing_csrf_cookie_is_500() {
    let backend = Arc::new(MockBackend::new().with_cookies(vec!["__cf_bm=x; Path=/"]));
    let resp = app(backend.clone())
        .oneshot(completion_request(valid_body(false), Some("Bearer tok")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        backend
            .info_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        0
    );
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let body = serde_json::json!({
        "model": PARTNER,
        "messages": [{"content": "x".repeat(BODY_LIMIT)}]
    });
    let resp = app(Arc::new(MockBackend::new()))
        .oneshot(completion_request(body, Some("Bearer tok")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// 短于最小长度的伙伴 ID 一律返回 400，且不触发任何后端调用
    #[test]
    fn prop_short_partner_rejected(model in "[a-z0-9]{0,19}") {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let backend = Arc::new(MockBackend::new());
        let status = rt.block_on(async {
            let body = serde_json::json!({
                "model": model,
                "messages": [{"role": "user", "content": "hi"}]
            });
            app(backend.clone())
                .oneshot(completion_request(body, Some("Bearer tok")))
                .await
                .unwrap()
                .status()
        });
        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(backend.setup_calls(), 0);
    }
}
