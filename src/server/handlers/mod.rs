//! 请求处理器

pub mod chat;

pub use chat::{bearer_credential, chat_completions, method_not_allowed};
