//! 缓存键命名空间
//!
//! 键格式为冒号分隔的字符串：`<prefix>:<credential-fingerprint>[:<partner>]`。
//! 凭证以 SHA-256 指纹形式出现，原始令牌不会写入存储。
//! 每种实体使用不同的前缀，不同种类的键不可能相同。

use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::models::session::{BearerCredential, PartnerId};

/// 缓存实体种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// 防伪令牌
    AntiForgery,
    /// 路由标识 (tgt)
    Routing,
    /// 会话句柄 (history id)
    Conversation,
}

impl KeyKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyKind::AntiForgery => "csrf",
            KeyKind::Routing => "tgt",
            KeyKind::Conversation => "history",
        }
    }

    /// 该种类条目的过期时间
    pub fn ttl(&self) -> Duration {
        match self {
            KeyKind::AntiForgery => Duration::from_secs(3600),
            KeyKind::Routing => Duration::from_secs(3600),
            KeyKind::Conversation => Duration::from_secs(604_800),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: KeyKind,
    key: String,
}

impl CacheKey {
    pub fn anti_forgery(credential: &BearerCredential) -> Self {
        Self::build(KeyKind::AntiForgery, credential, None)
    }

    pub fn routing(credential: &BearerCredential, partner: &PartnerId) -> Self {
        Self::build(KeyKind::Routing, credential, Some(partner))
    }

    pub fn conversation(credential: &BearerCredential, partner: &PartnerId) -> Self {
        Self::build(KeyKind::Conversation, credential, Some(partner))
    }

    fn build(kind: KeyKind, credential: &BearerCredential, partner: Option<&PartnerId>) -> Self {
        let fingerprint = credential_fingerprint(credential);
        let key = match partner {
            Some(partner) => format!("{}:{}:{}", kind.prefix(), fingerprint, partner.as_str()),
            None => format!("{}:{}", kind.prefix(), fingerprint),
        };
        Self { kind, key }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// 凭证指纹（十六进制 SHA-256）
pub fn credential_fingerprint(credential: &BearerCredential) -> String {
    format!("{:x}", Sha256::digest(credential.expose().as_bytes()))
}
