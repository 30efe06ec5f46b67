//! 测试辅助：可编排的后端模拟

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::backend::{BackendAuth, BackendReply, ChatBackend};
use crate::error::{BridgeError, BridgeResult};
use crate::models::backend::{
    CharacterInfo, CharacterInfoResponse, HistoryCreateResponse, SendMessagePayload,
};
use crate::models::session::{BearerCredential, PartnerId};

/// 满足最小长度的伙伴 ID
pub const PARTNER: &str = "abcdefghijklmnopqrstuvwxyz012345";

/// 发送消息时的模拟响应
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 非流式响应体
    Body(String),
    /// 按块返回的字节流
    Chunks(Vec<Vec<u8>>),
    /// 返回若干块后传输中断
    ChunksThenError(Vec<Vec<u8>>),
}

pub struct MockBackend {
    pub prime_calls: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
    cookies: Vec<String>,
    prime_error: Option<u16>,
    info_error: Option<(u16, String)>,
    send_error: Option<(u16, String)>,
    routing_id: Option<String>,
    history_ids: bool,
    reply: MockReply,
    pub last_payload: Mutex<Option<SendMessagePayload>>,
    pub last_stream_flag: Mutex<Option<bool>>,
    pub last_auth: Mutex<Option<BackendAuth>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            prime_calls: AtomicUsize::new(0),
            info_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            cookies: vec![
                "__cf_bm=cf; Path=/; HttpOnly".to_string(),
                "csrftoken=mock-csrf; Max-Age=31449600; Path=/; SameSite=Lax".to_string(),
            ],
            prime_error: None,
            info_error: None,
            send_error: None,
            routing_id: Some("internal_id:mock".to_string()),
            history_ids: true,
            reply: MockReply::Body(r#"{"candidates":[{"text":"hello there"}]}"#.to_string()),
            last_payload: Mutex::new(None),
            last_stream_flag: Mutex::new(None),
            last_auth: Mutex::new(None),
        }
    }

    pub fn with_cookies(mut self, cookies: Vec<&str>) -> Self {
        self.cookies = cookies.into_iter().map(str::to_string).collect();
        self
    }

    pub fn with_reply(mut self, reply: MockReply) -> Self {
        self.reply = reply;
        self
    }

    pub fn fail_prime(mut self, status: u16) -> Self {
        self.prime_error = Some(status);
        self
    }

    pub fn fail_info(mut self, status: u16, body: &str) -> Self {
        self.info_error = Some((status, body.to_string()));
        self
    }

    pub fn fail_send(mut self, status: u16, body: &str) -> Self {
        self.send_error = Some((status, body.to_string()));
        self
    }

    pub fn without_routing_id(mut self) -> Self {
        self.routing_id = None;
        self
    }

    pub fn without_history_id(mut self) -> Self {
        self.history_ids = false;
        self
    }

    /// 握手阶段（csrf + identity + history）的后端调用总数
    pub fn setup_calls(&self) -> usize {
        self.prime_calls.load(Ordering::SeqCst)
            + self.info_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<SendMessagePayload> {
        self.last_payload.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn prime_session(&self, _credential: &BearerCredential) -> BridgeResult<Vec<String>> {
        self.prime_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.prime_error {
            return Err(BridgeError::upstream(status, "priming failed"));
        }
        Ok(self.cookies.clone())
    }

    async fn character_info(
        &self,
        _auth: &BackendAuth,
        _partner: &PartnerId,
    ) -> BridgeResult<CharacterInfoResponse> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((status, body)) = &self.info_error {
            return Err(BridgeError::upstream(*status, body));
        }
        Ok(CharacterInfoResponse {
            character: Some(CharacterInfo {
                identifier: self.routing_id.clone(),
            }),
            identifier: None,
        })
    }

    async fn create_history(
        &self,
        _auth: &BackendAuth,
        _partner: &PartnerId,
    ) -> BridgeResult<HistoryCreateResponse> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(HistoryCreateResponse {
            external_id: self.history_ids.then(|| format!("history-{n}")),
        })
    }

    async fn send_message(
        &self,
        auth: &BackendAuth,
        payload: &SendMessagePayload,
        stream: bool,
    ) -> BridgeResult<BackendReply> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some(payload.clone());
        *self.last_stream_flag.lock().unwrap() = Some(stream);
        *self.last_auth.lock().unwrap() = Some(auth.clone());
        if let Some((status, body)) = &self.send_error {
            return Err(BridgeError::upstream(*status, body));
        }

        match &self.reply {
            MockReply::Body(body) => Ok(BackendReply::Complete(Bytes::from(body.clone()))),
            MockReply::Chunks(chunks) => {
                let items: Vec<BridgeResult<Bytes>> = chunks
                    .iter()
                    .map(|c| Ok(Bytes::from(c.clone())))
                    .collect();
                Ok(BackendReply::Stream(Box::pin(futures::stream::iter(items))))
            }
            MockReply::ChunksThenError(chunks) => {
                let mut items: Vec<BridgeResult<Bytes>> = chunks
                    .iter()
                    .map(|c| Ok(Bytes::from(c.clone())))
                    .collect();
                items.push(Err(BridgeError::TransportInterrupted(
                    "connection reset".to_string(),
                )));
                Ok(BackendReply::Stream(Box::pin(futures::stream::iter(items))))
            }
        }
    }
}
