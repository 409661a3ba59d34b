use crate::error::{DiskError, Result};

/// 分区表项宽度：status(1) + type(1) + fit(1) + start(4) + size(4) + name(16) + correlative(4) + id(8)
pub const PARTITION_SIZE: usize = 39;

/// MBR 宽度：size(4) + created_at(8) + signature(4) + fit(1) + 4 个分区表项
pub const MBR_SIZE: usize = 17 + 4 * PARTITION_SIZE;

/// EBR 宽度：mount(1) + fit(1) + start(4) + size(4) + next(4) + name(16)
pub const EBR_SIZE: usize = 30;

pub const NAME_LEN: usize = 16;
pub const MOUNT_ID_LEN: usize = 8;

/// 链表结束 / 占位 EBR 的标记
pub const END_OF_CHAIN: i32 = -1;

// 状态字节
pub const STATUS_FREE: u8 = b'N';
pub const STATUS_UNMOUNTED: u8 = b'0';
pub const STATUS_MOUNTED: u8 = b'1';

/// 分区类型；逻辑分区只存在于 EBR 链中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionKind {
    Primary,
    Extended,
    Logical,
}

impl PartitionKind {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Primary => b'P',
            Self::Extended => b'E',
            Self::Logical => b'L',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'P' => Some(Self::Primary),
            b'E' => Some(Self::Extended),
            b'L' => Some(Self::Logical),
            _ => None,
        }
    }

    /// 解析命令参数：P / E / L
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "P" => Ok(Self::Primary),
            "E" => Ok(Self::Extended),
            "L" => Ok(Self::Logical),
            other => Err(DiskError::Validation(format!(
                "partition type must be P, E or L, got '{}'",
                other
            ))),
        }
    }
}

/// 分配策略，只记录不参与分区槽位选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Best,
    First,
    Worst,
}

impl Fit {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Best => b'B',
            Self::First => b'F',
            Self::Worst => b'W',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Self::Best),
            b'F' => Some(Self::First),
            b'W' => Some(Self::Worst),
            _ => None,
        }
    }

    /// 解析命令参数：BF / FF / WF
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_uppercase().as_str() {
            "BF" => Ok(Self::Best),
            "FF" => Ok(Self::First),
            "WF" => Ok(Self::Worst),
            other => Err(DiskError::Validation(format!(
                "fit must be BF, FF or WF, got '{}'",
                other
            ))),
        }
    }
}
