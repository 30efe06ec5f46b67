//! 日志模块
//!
//! 负责初始化 tracing 订阅者，并提供日志脱敏工具。
//! 上游返回的错误正文可能回显请求头或令牌，写入日志前必须先经过 `sanitize_log_message`。

use once_cell::sync::Lazy;
use regex::Regex;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 初始化全局 tracing 订阅者
///
/// `RUST_LOG` 优先于配置文件中的 `logging.level`。
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // 重复初始化（例如测试中）时忽略错误
    let _ = if logging.compact {
        builder.compact().try_init()
    } else {
        builder.try_init()
    };
}

static SANITIZE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // Bearer / Token 认证头
        (r"Bearer\s+[A-Za-z0-9._-]+", "Bearer ***"),
        (r"Token\s+[A-Za-z0-9._-]{8,}", "Token ***"),
        // 防伪 Cookie
        (r"csrftoken=[A-Za-z0-9._-]+", "csrftoken=***"),
        (
            r#"[Xx]-CSRF[Tt]oken["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "x-csrftoken: ***",
        ),
        (
            r#"access[_-]?token["']?\s*[:=]\s*["']?[A-Za-z0-9._-]+"#,
            "access_token: ***",
        ),
        (
            r#"[Aa]uthorization["']?\s*[:=]\s*["']?[A-Za-z0-9._\s-]+"#,
            "authorization: ***",
        ),
        (r#"password["']?\s*[:=]\s*["']?[^\s"',}]+"#, "password: ***"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// 日志脱敏
pub fn sanitize_log_message(message: &str) -> String {
    let mut sanitized = message.to_string();
    for (re, replacement) in SANITIZE_PATTERNS.iter() {
        sanitized = re.replace_all(&sanitized, *replacement).to_string();
    }
    sanitized
}
