//! 业务服务模块

pub mod chat_service;

pub use chat_service::{ChatOutcome, ChatService, SseStream};
