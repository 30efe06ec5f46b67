//! 流式处理层
//!
//! # 架构设计
//!
//! ```text
//! 后端字节流 ──> [LineBuffer] ──> JSON 片段 ──> [OpenAiSseGenerator] ──> OpenAI SSE
//! ```
//!
//! # 模块结构
//!
//! - `line_buffer`: 跨读取的换行分隔缓冲
//! - `generators`: 前端流格式生成器
//! - `pipeline`: 组合以上两步的异步流

pub mod generators;
pub mod line_buffer;
pub mod pipeline;

pub use generators::{OpenAiSseGenerator, DONE_FRAME};
pub use line_buffer::LineBuffer;
pub use pipeline::{create_sse_stream, StreamPipeline};
