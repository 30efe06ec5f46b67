//! 数据模型

pub mod backend;
pub mod openai;
pub mod session;
