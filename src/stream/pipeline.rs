//! 流处理管道
//!
//! 后端字节流 → 行缓冲 → JSON 片段 → OpenAI SSE 帧
//!
//! 每个非空增量立即产出一帧，顺序与后端片段顺序一致，不合并也不重排。
//! 输出流由 HTTP 响应体按需拉取：调用方断开后响应体被丢弃，
//! 后端字节流随之释放，上游连接不会继续被读取。

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::{BridgeError, BridgeResult};
use crate::models::backend::ReplyFrame;
use crate::stream::generators::OpenAiSseGenerator;
use crate::stream::line_buffer::LineBuffer;

pub struct StreamPipeline {
    buffer: LineBuffer,
    generator: OpenAiSseGenerator,
    /// 已解析但被跳过的片段数
    skipped: usize,
}

impl StreamPipeline {
    pub fn new(generator: OpenAiSseGenerator) -> Self {
        Self {
            buffer: LineBuffer::new(),
            generator,
            skipped: 0,
        }
    }

    /// 处理一次网络读取，返回本次产生的 SSE 帧
    pub fn process_chunk(&mut self, bytes: &[u8]) -> BridgeResult<Vec<String>> {
        let lines = self.buffer.push(bytes)?;
        Ok(lines
            .iter()
            .filter_map(|line| self.translate_line(line))
            .collect())
    }

    /// 后端流结束：处理剩余片段并追加结束标记
    pub fn finish(&mut self) -> Vec<String> {
        let mut frames: Vec<String> = self
            .buffer
            .finish()
            .and_then(|line| self.translate_line(&line))
            .into_iter()
            .collect();
        frames.push(self.generator.done().to_string());
        frames
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn translate_line(&mut self, line: &str) -> Option<String> {
        match serde_json::from_str::<ReplyFrame>(line) {
            Ok(frame) => {
                let reply = frame.first_candidate();
                self.generator.delta(reply.non_empty()?)
            }
            Err(e) => {
                // 后端可能夹杂非 JSON 的保活内容
                self.skipped += 1;
                tracing::debug!(
                    "[STREAM] skipping unparseable fragment ({} bytes): {}",
                    line.len(),
                    e
                );
                None
            }
        }
    }
}

/// 调用方提前断开时记录日志
struct DisconnectGuard {
    response_id: String,
    completed: bool,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        if !self.completed {
            tracing::info!(
                response_id = %self.response_id,
                "[STREAM] stream dropped before completion, releasing upstream"
            );
        }
    }
}

/// 将后端字节流转换为 SSE 帧流
///
/// 后端传输中断时产出一个错误并结束，不发送 `[DONE]`；
/// 此时响应头已发出，只能通过中断连接通知调用方。
pub fn create_sse_stream<S>(
    byte_stream: S,
    generator: OpenAiSseGenerator,
) -> impl Stream<Item = Result<String, BridgeError>>
where
    S: Stream<Item = BridgeResult<Bytes>> + Send + 'static,
{
    async_stream::stream! {
        let mut guard = DisconnectGuard {
            response_id: generator.response_id().to_string(),
            completed: false,
        };
        let mut pipeline = StreamPipeline::new(generator);
        let mut byte_stream = std::pin::pin!(byte_stream);

        while let Some(result) = byte_stream.next().await {
            let frames = match result.and_then(|bytes| pipeline.process_chunk(&bytes)) {
                Ok(frames) => frames,
                Err(e) => {
                    guard.completed = true;
                    tracing::warn!(
                        response_id = %guard.response_id,
                        "[STREAM] upstream stream failed, closing connection: {}",
                        e
                    );
                    yield Err(e);
                    return;
                }
            };
            for frame in frames {
                yield Ok(frame);
            }
        }

        for frame in pipeline.finish() {
            yield Ok(frame);
        }
        guard.completed = true;
        if pipeline.skipped() > 0 {
            tracing::debug!(
                response_id = %guard.response_id,
                skipped = pipeline.skipped(),
                "[STREAM] completed with skipped fragments"
            );
        }
    }
}
