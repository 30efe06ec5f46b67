//! 会话相关的领域类型

use std::fmt;

/// 会话伙伴 ID 的最小长度
pub const MIN_PARTNER_ID_LEN: usize = 20;

/// 调用方提供的不透明 Bearer 凭证
///
/// `Debug` 输出经过脱敏，避免凭证出现在日志中。
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BearerCredential(String);

impl BearerCredential {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// 原始凭证，仅用于上游请求头和指纹计算
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerCredential(***)")
    }
}

/// 会话伙伴 ID（对应请求中的 `model` 字段）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartnerId(String);

impl PartnerId {
    /// 校验最小长度后创建
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.chars().count() < MIN_PARTNER_ID_LEN {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次发送所需的全部会话状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// 路由标识 (tgt)
    pub routing_id: String,
    /// 会话句柄 (history id)
    pub history_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = BearerCredential::new("super-secret").unwrap();
        assert_eq!(format!("{cred:?}"), "BearerCredential(***)");
        assert_eq!(cred.expose(), "super-secret");
    }

    #[test]
    fn test_empty_credential_rejected() {
        assert!(BearerCredential::new("   ").is_none());
    }

    #[test]
    fn test_partner_id_min_length() {
        assert!(PartnerId::new("a".repeat(19)).is_none());
        assert!(PartnerId::new("a".repeat(20)).is_some());
    }
}
