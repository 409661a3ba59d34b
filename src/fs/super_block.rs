use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    disk::Record,
    error::{DiskError, Result},
    fs::config::{
        BLOCKS_PER_INODE, BLOCK_SIZE, FS_MAGIC, INODE_SIZE, JOURNAL_SIZE, RESERVED_INODES,
        SUPER_BLOCK_SIZE,
    },
    utils::{current_timestamp_f32, file_offset},
};

/// 文件系统类型：2fs 无日志，3fs 带日志
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsType {
    Ext2,
    Ext3,
}

impl FsType {
    pub fn code(self) -> i32 {
        match self {
            Self::Ext2 => 2,
            Self::Ext3 => 3,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "2fs" => Ok(Self::Ext2),
            "3fs" => Ok(Self::Ext3),
            other => Err(DiskError::Validation(format!(
                "filesystem must be 2fs or 3fs, got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperBlock {
    pub filesystem_type: i32, // 2 或 3
    /** inode / 块计数 */
    pub inodes_count: i32,
    pub blocks_count: i32,
    pub free_inodes_count: i32,
    pub free_blocks_count: i32,
    /** 时间与挂载信息 */
    pub mtime: f32,
    pub umtime: f32,
    pub mnt_count: i32,
    pub magic: i32,
    /** 布局 */
    pub inode_size: i32,
    pub block_size: i32,
    pub first_ino: i32, // 第一个空闲 inode
    pub first_blo: i32, // 第一个空闲块
    pub bm_inode_start: i32,
    pub bm_block_start: i32,
    pub inode_start: i32,
    pub block_start: i32,
    pub journal_start: i32, // 无日志时为 -1
}

impl Record for SuperBlock {
    const SIZE: usize = SUPER_BLOCK_SIZE;
}

impl SuperBlock {
    /// 按分区大小计算布局
    ///
    /// n = (size - 超级块) / (4 + [日志] + inode + 3 * 块)，
    /// 依次排列：超级块 | 日志区(3fs) | inode 位图(n) | 块位图(3n) | inode 表 | 数据块
    pub fn layout(fs_type: FsType, start: i32, size: i32) -> Result<Self> {
        let journal = match fs_type {
            FsType::Ext3 => JOURNAL_SIZE as i32,
            FsType::Ext2 => 0,
        };
        let per_inode = 1 + BLOCKS_PER_INODE + journal + INODE_SIZE + BLOCKS_PER_INODE * BLOCK_SIZE;
        let n = (size - SUPER_BLOCK_SIZE as i32) / per_inode;
        if n <= RESERVED_INODES {
            return Err(DiskError::PartitionTooSmall(size));
        }

        let journal_start = start + SUPER_BLOCK_SIZE as i32;
        let bm_inode_start = journal_start + n * journal;
        let bm_block_start = bm_inode_start + n;
        let inode_start = bm_block_start + BLOCKS_PER_INODE * n;
        let block_start = inode_start + n * INODE_SIZE;
        let now = current_timestamp_f32();

        Ok(Self {
            filesystem_type: fs_type.code(),
            inodes_count: n,
            blocks_count: BLOCKS_PER_INODE * n,
            free_inodes_count: n,
            free_blocks_count: BLOCKS_PER_INODE * n,
            mtime: now,
            umtime: now,
            mnt_count: 1,
            magic: FS_MAGIC,
            inode_size: INODE_SIZE,
            block_size: BLOCK_SIZE,
            first_ino: 0,
            first_blo: 0,
            bm_inode_start,
            bm_block_start,
            inode_start,
            block_start,
            journal_start: match fs_type {
                FsType::Ext3 => journal_start,
                FsType::Ext2 => -1,
            },
        })
    }

    pub fn is_journaled(&self) -> bool {
        self.filesystem_type == FsType::Ext3.code()
    }

    pub fn is_formatted(&self) -> bool {
        self.magic == FS_MAGIC
    }

    /// 日志区容量（条数），2fs 为 0
    pub fn journal_capacity(&self) -> i32 {
        if !self.is_journaled() {
            return 0;
        }
        (self.bm_inode_start - self.journal_start) / JOURNAL_SIZE as i32
    }

    /// 数据区总字节数
    pub fn data_capacity(&self) -> i64 {
        self.blocks_count as i64 * self.block_size as i64
    }

    pub fn touch(&mut self) {
        self.mtime = current_timestamp_f32();
    }

    pub fn load(path: &Path, partition_start: i32) -> Result<Self> {
        Self::decode(path, file_offset(partition_start)?)
    }

    /// 修改任何字段后都要整体写回分区起点
    pub fn persist(&self, path: &Path, partition_start: i32) -> Result<()> {
        self.encode(path, file_offset(partition_start)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_is_fixed() {
        let sb = SuperBlock::layout(FsType::Ext2, 0, 100_000).unwrap();
        assert_eq!(sb.to_bytes().unwrap().len(), SUPER_BLOCK_SIZE);
    }

    #[test]
    fn ext3_reserves_journal_area() {
        let start = 1000;
        let plain = SuperBlock::layout(FsType::Ext2, start, 200_000).unwrap();
        let journaled = SuperBlock::layout(FsType::Ext3, start, 200_000).unwrap();

        assert!(!plain.is_journaled());
        assert_eq!(plain.journal_start, -1);
        assert_eq!(plain.bm_inode_start, start + SUPER_BLOCK_SIZE as i32);

        assert!(journaled.is_journaled());
        assert_eq!(journaled.journal_start, start + SUPER_BLOCK_SIZE as i32);
        assert_eq!(
            journaled.bm_inode_start,
            journaled.journal_start + journaled.inodes_count * JOURNAL_SIZE as i32
        );
        assert!(journaled.inodes_count < plain.inodes_count);
    }

    #[test]
    fn layout_fits_inside_partition() {
        let (start, size) = (173, 50_000);
        let sb = SuperBlock::layout(FsType::Ext3, start, size).unwrap();
        let end = sb.block_start as i64 + sb.data_capacity();
        assert!(end <= start as i64 + size as i64);
        assert_eq!(sb.blocks_count, 3 * sb.inodes_count);
    }

    #[test]
    fn tiny_partition_cannot_be_formatted() {
        assert!(matches!(
            SuperBlock::layout(FsType::Ext2, 0, 500),
            Err(DiskError::PartitionTooSmall(500))
        ));
    }

    #[test]
    fn persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let sb = SuperBlock::layout(FsType::Ext3, 512, 100_000).unwrap();
        sb.persist(&path, 512).unwrap();
        assert_eq!(SuperBlock::load(&path, 512).unwrap(), sb);
    }

    #[test]
    fn fs_type_parsing() {
        assert_eq!(FsType::parse("3FS").unwrap(), FsType::Ext3);
        assert!(FsType::parse("4fs").is_err());
    }
}
