//! 配置模块
//!
//! 配置来源（优先级从低到高）：
//! 1. 内置默认值
//! 2. YAML 配置文件（`$CHATBRIDGE_CONFIG` 或 `~/.chatbridge/config.yaml`）
//! 3. `CHATBRIDGE_*` 环境变量

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_DIR: &str = ".chatbridge";
const CONFIG_FILE: &str = "config.yaml";
const CONFIG_PATH_ENV: &str = "CHATBRIDGE_CONFIG";

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("解析配置文件失败 {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("环境变量 {name} 的值无效: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("配置无效: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// 监听配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体大小上限（字节）
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// 上游后端配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// 是否需要先获取防伪令牌
    pub csrf_enabled: bool,
    /// 防伪令牌所在的 Cookie 名称
    pub csrf_cookie: String,
    pub character_info_path: String,
    pub history_create_path: String,
    pub send_message_path: String,
    pub user_agent: String,
    /// 出站代理，仅支持 http/https
    pub proxy_url: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://beta.character.ai".to_string(),
            csrf_enabled: true,
            csrf_cookie: "csrftoken".to_string(),
            character_info_path: "/chat/character/info/".to_string(),
            history_create_path: "/chat/history/create/".to_string(),
            send_message_path: "/chat/streaming/".to_string(),
            user_agent: format!("chatbridge/{}", env!("CARGO_PKG_VERSION")),
            proxy_url: None,
            connect_timeout_secs: 30,
            request_timeout_secs: 300,
        }
    }
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 拼接完整的端点 URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// 会话存储后端
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub redis_url: Option<String>,
    pub redis_pool_max: usize,
    /// 内存存储清理过期条目的间隔（秒）
    pub sweep_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            redis_url: None,
            redis_pool_max: 16,
            sweep_interval_secs: 300,
        }
    }
}

impl StoreConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter 语法，例如 `info,chatbridge=debug`
    pub level: String,
    pub compact: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            compact: false,
        }
    }
}

impl Config {
    /// 默认配置文件路径: ~/.chatbridge/config.yaml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// 加载配置文件并应用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 应用环境变量覆盖
    ///
    /// `lookup` 用于读取变量，测试中可以注入固定值
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("CHATBRIDGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CHATBRIDGE_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "CHATBRIDGE_PORT",
                value: port,
            })?;
        }
        if let Some(url) = lookup("CHATBRIDGE_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }
        if let Some(flag) = lookup("CHATBRIDGE_CSRF_ENABLED") {
            self.upstream.csrf_enabled = parse_bool(&flag).ok_or(ConfigError::InvalidEnv {
                name: "CHATBRIDGE_CSRF_ENABLED",
                value: flag,
            })?;
        }
        if let Some(proxy) = lookup("CHATBRIDGE_PROXY_URL") {
            self.upstream.proxy_url = Some(proxy).filter(|p| !p.trim().is_empty());
        }
        if let Some(url) = lookup("CHATBRIDGE_REDIS_URL") {
            self.store.kind = StoreKind::Redis;
            self.store.redis_url = Some(url);
        }
        if let Some(level) = lookup("CHATBRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port 不能为 0".to_string()));
        }
        if self.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "upstream.base_url 不能为空".to_string(),
            ));
        }
        if self.store.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "store.sweep_interval_secs 不能为 0".to_string(),
            ));
        }
        if self.store.kind == StoreKind::Redis
            && self
                .store
                .redis_url
                .as_deref()
                .map_or(true, |u| u.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "store.kind 为 redis 时必须设置 store.redis_url".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
