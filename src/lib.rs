//! chatbridge
//!
//! 将会话式聊天后端包装为 OpenAI 兼容的 Chat Completions 接口。

pub mod backend;
pub mod config;
pub mod converter;
pub mod dispatcher;
pub mod error;
pub mod logger;
pub mod models;
pub mod server;
pub mod server_utils;
pub mod services;
pub mod session;
pub mod store;
pub mod stream;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use server::{build_router, run_server, AppState};
