//! 协议转换模块

pub mod to_openai;

pub use to_openai::{build_completion, completion_id, parse_complete_reply, unix_now};
