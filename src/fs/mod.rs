use std::path::{Path, PathBuf};

use log::info;

use crate::{
    disk::codec::write_at,
    error::{DiskError, Result},
    fs::{
        accounts::AccountTable,
        config::{BITMAP_FREE, BITMAP_USED, FORMAT_CHUNK, RESERVED_INODES, SUPER_BLOCK_SIZE},
        journal::Journal,
        super_block::{FsType, SuperBlock},
    },
    mount::{MountRegistry, MountedPartition},
    utils::file_offset,
};

pub mod accounts;
pub mod config;
pub mod journal;
pub mod super_block;
pub mod users;

/// 通过挂载 ID 读取分区起点处的超级块
pub fn load_superblock(
    registry: &MountRegistry,
    id: &str,
) -> Result<(SuperBlock, MountedPartition, PathBuf)> {
    let (partition, path) = registry.resolve(id)?;
    let sb = SuperBlock::load(&path, partition.start)?;
    Ok((sb, partition, path))
}

/// 按固定大小分块写入同一个字节，避免一次性分配整个元数据区
fn fill_region(path: &Path, start: i32, len: i64, byte: u8) -> Result<()> {
    let chunk = vec![byte; FORMAT_CHUNK];
    let mut offset = file_offset(start)?;
    let mut remaining = len.max(0) as u64;
    while remaining > 0 {
        let step = remaining.min(FORMAT_CHUNK as u64) as usize;
        write_at(path, offset, &chunk[..step])?;
        offset += step as u64;
        remaining -= step as u64;
    }
    Ok(())
}

/// 已挂载并格式化的分区
#[derive(Debug)]
pub struct FileSystem {
    pub path: PathBuf,                // 磁盘文件
    pub partition: MountedPartition,  // 分区位置
    pub super_block: SuperBlock,      // 文件系统总体信息
}

impl FileSystem {
    pub fn load(registry: &MountRegistry, id: &str) -> Result<Self> {
        let (super_block, partition, path) = load_superblock(registry, id)?;
        if !super_block.is_formatted() {
            return Err(DiskError::NotFormatted(id.to_string()));
        }
        Ok(Self {
            path,
            partition,
            super_block,
        })
    }

    /// mkfs：计算布局，清空元数据区，写入账户文件，3fs 先记日志，最后写超级块
    pub fn format(registry: &MountRegistry, id: &str, fs_type: FsType) -> Result<Self> {
        let (partition, path) = registry.resolve(id)?;
        let mut super_block = SuperBlock::layout(fs_type, partition.start, partition.size)?;

        let sb = &super_block;
        let meta_start = partition.start + SUPER_BLOCK_SIZE as i32;
        fill_region(&path, meta_start, (sb.bm_inode_start - meta_start) as i64, 0)?;
        fill_region(&path, sb.bm_inode_start, RESERVED_INODES as i64, BITMAP_USED)?;
        fill_region(
            &path,
            sb.bm_inode_start + RESERVED_INODES,
            (sb.inodes_count - RESERVED_INODES) as i64,
            BITMAP_FREE,
        )?;
        fill_region(&path, sb.bm_block_start, sb.blocks_count as i64, BITMAP_FREE)?;
        fill_region(&path, sb.inode_start, (sb.block_start - sb.inode_start) as i64, 0)?;

        super_block.first_ino = RESERVED_INODES;
        super_block.free_inodes_count = super_block.inodes_count - RESERVED_INODES;

        let mut fs = Self {
            path,
            partition,
            super_block,
        };
        AccountTable::initial().store(&fs.path, &mut fs.super_block)?;
        if fs.super_block.is_journaled() {
            let fs_name = match fs_type {
                FsType::Ext2 => "2fs",
                FsType::Ext3 => "3fs",
            };
            fs.record(Journal::new("mkfs", "/", fs_name))?;
        }
        fs.sync()?;

        info!(
            "{} formatted as {:?}: {} inodes, {} blocks",
            id, fs_type, fs.super_block.inodes_count, fs.super_block.blocks_count
        );
        Ok(fs)
    }

    pub fn accounts(&self) -> Result<AccountTable> {
        AccountTable::load(&self.path, &self.super_block)
    }

    /// 日志区紧跟在超级块之后，非日志模式下什么都不写
    pub fn record(&self, mut entry: Journal) -> Result<()> {
        if self.super_block.is_journaled() {
            entry.append(&self.path, self.partition.start)?;
        }
        Ok(())
    }

    /// 写回超级块
    pub fn sync(&self) -> Result<()> {
        self.super_block.persist(&self.path, self.partition.start)
    }

    /// 账户文件变更的提交顺序：账户文件 -> 日志 -> 超级块
    pub fn commit(
        &mut self,
        table: &AccountTable,
        operation: &str,
        path: &str,
        content: &str,
    ) -> Result<()> {
        table.store(&self.path, &mut self.super_block)?;
        self.record(Journal::new(operation, path, content))?;
        self.super_block.touch();
        self.sync()
    }

    pub fn last_journal(&self) -> Result<Option<Journal>> {
        if !self.super_block.is_journaled() {
            return Ok(None);
        }
        Journal::read_head(&self.path, self.partition.start).map(Some)
    }
}
