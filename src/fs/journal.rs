use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use crate::{
    disk::Record,
    error::Result,
    fs::config::{JOURNAL_CONTENT_LEN, JOURNAL_PATH_LEN, JOURNAL_SIZE, OPERATION_LEN, SUPER_BLOCK_SIZE},
    utils::{current_timestamp_f32, file_offset, from_fixed, to_fixed},
};

/// 一次操作的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Information {
    pub operation: [u8; OPERATION_LEN],
    #[serde(with = "BigArray")]
    pub path: [u8; JOURNAL_PATH_LEN],
    #[serde(with = "BigArray")]
    pub content: [u8; JOURNAL_CONTENT_LEN],
    pub date: f32,
}

/// 日志记录，只追加不修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub next: i32,
    pub content: Information,
}

impl Record for Journal {
    const SIZE: usize = JOURNAL_SIZE;
}

impl Journal {
    /// 时间戳取调用时刻；过长的字段按宽度截断
    pub fn new(operation: &str, path: &str, content: &str) -> Self {
        Self {
            next: -1,
            content: Information {
                operation: to_fixed(operation),
                path: to_fixed(path),
                content: to_fixed(content),
                date: current_timestamp_f32(),
            },
        }
    }

    pub fn operation(&self) -> String {
        from_fixed(&self.content.operation)
    }

    pub fn path(&self) -> String {
        from_fixed(&self.content.path)
    }

    pub fn content(&self) -> String {
        from_fixed(&self.content.content)
    }

    /// 日志区第一个槽位：分区起点 + 超级块
    pub fn head_offset(partition_start: i32) -> i32 {
        partition_start + SUPER_BLOCK_SIZE as i32
    }

    /// 单槽日志：每次都覆盖日志区的第一个槽位，next 固定为 -1
    pub fn append(&mut self, path: &Path, partition_start: i32) -> Result<()> {
        self.next = -1;
        self.encode(path, file_offset(Self::head_offset(partition_start))?)
    }

    pub fn read_head(path: &Path, partition_start: i32) -> Result<Self> {
        Self::decode(path, file_offset(Self::head_offset(partition_start))?)
    }
}
