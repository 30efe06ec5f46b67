//! 换行分隔的 JSON 片段缓冲
//!
//! 网络读取的边界与片段边界无关：一次读取可能包含多个片段，也可能在片段中间甚至
//! 多字节字符中间截断。缓冲按字节保存尚未遇到换行的部分，直到下一次读取补齐。

use crate::error::{BridgeError, BridgeResult};

/// 无换行时允许缓冲的最大字节数
pub const MAX_LINE_BUFFER: usize = 10 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct LineBuffer {
    carry: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一次读取的数据，返回所有完整片段（去掉 `\r`，忽略空行）
    pub fn push(&mut self, bytes: &[u8]) -> BridgeResult<Vec<String>> {
        // carry 中不含换行，只需扫描本次追加的部分
        let start = self.carry.len();
        self.carry.extend_from_slice(bytes);

        let Some(last_newline) = bytes.iter().rposition(|b| *b == b'\n').map(|i| start + i) else {
            if self.carry.len() > MAX_LINE_BUFFER {
                return Err(BridgeError::TransportInterrupted(format!(
                    "片段超过 {MAX_LINE_BUFFER} 字节仍未结束"
                )));
            }
            return Ok(Vec::new());
        };

        let rest = self.carry.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.carry, rest);

        Ok(complete
            .split(|b| *b == b'\n')
            .filter_map(decode_line)
            .collect())
    }

    /// 流结束时取出剩余的未终止片段
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.carry);
        decode_line(&rest)
    }

    pub fn pending(&self) -> usize {
        self.carry.len()
    }
}

fn decode_line(line: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim_end_matches('\r');
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
