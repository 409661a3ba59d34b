use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    disk::{
        codec::Record,
        mbr::Mbr,
        types::{Fit, EBR_SIZE, END_OF_CHAIN, NAME_LEN, STATUS_FREE, STATUS_MOUNTED, STATUS_UNMOUNTED},
    },
    error::{DiskError, Result},
    utils::{file_offset, from_fixed, to_fixed},
};

/// 扩展分区中的一个逻辑分区描述符（EBR 链表节点）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ebr {
    pub mount: u8,            // 挂载标记
    pub fit: u8,              // 分配策略
    pub start: i32,           // 数据区起点，紧跟在本 EBR 之后；占位节点为 -1
    pub size: i32,            // 数据区大小
    pub next: i32,            // 下一个 EBR 的偏移，-1 表示链尾
    pub name: [u8; NAME_LEN], // 分区名
}

impl Record for Ebr {
    const SIZE: usize = EBR_SIZE;
}

impl Ebr {
    /// 链尾占位节点，下一个逻辑分区会写在这里
    pub fn placeholder() -> Self {
        Self {
            mount: STATUS_FREE,
            fit: STATUS_FREE,
            start: END_OF_CHAIN,
            size: END_OF_CHAIN,
            next: END_OF_CHAIN,
            name: [0; NAME_LEN],
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.start == END_OF_CHAIN
    }

    pub fn is_mounted(&self) -> bool {
        self.mount == STATUS_MOUNTED
    }

    pub fn name(&self) -> String {
        from_fixed(&self.name)
    }

    pub fn fit(&self) -> Option<Fit> {
        Fit::from_byte(self.fit)
    }

    /// 把位于 `offset` 的占位节点变成逻辑分区，next 指向数据区末尾
    fn populate(&mut self, offset: i32, fit: Fit, size: i32, name: &str) {
        self.mount = STATUS_UNMOUNTED;
        self.fit = fit.as_byte();
        self.start = offset + EBR_SIZE as i32;
        self.size = size;
        self.next = self.start + size;
        self.name = to_fixed(name);
    }

    pub fn set_mounted(&mut self, mounted: bool) {
        self.mount = if mounted { STATUS_MOUNTED } else { STATUS_UNMOUNTED };
    }
}

/// EBR 链表中的节点及其所在偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainNode {
    pub offset: i32,
    pub ebr: Ebr,
}

impl ChainNode {
    pub fn save(&self, path: &Path) -> Result<()> {
        self.ebr.encode(path, file_offset(self.offset)?)
    }
}

/// 扩展分区内的 EBR 链
#[derive(Debug, Clone)]
pub struct EbrChain {
    path: PathBuf,
    start: i32,
    size: i32,
}

impl EbrChain {
    /// 在扩展分区起点写入占位 EBR
    pub fn init(path: &Path, start: i32) -> Result<()> {
        Ebr::placeholder().encode(path, file_offset(start)?)
    }

    /// 根据 MBR 定位扩展分区
    pub fn of(path: &Path, mbr: &Mbr) -> Result<Self> {
        let extended = mbr.extended().ok_or(DiskError::NoExtendedPartition)?;
        Ok(Self {
            path: path.to_path_buf(),
            start: extended.start,
            size: extended.size,
        })
    }

    fn end(&self) -> i64 {
        self.start as i64 + self.size as i64
    }

    /// 从链头循环遍历到链尾，包含最后的占位节点
    ///
    /// 偏移必须严格递增并落在扩展分区内，遍历次数以 size / EBR_SIZE 为上限，
    /// 损坏或成环的链会返回 `Corrupted` 而不是死循环。
    pub fn nodes(&self) -> Result<Vec<ChainNode>> {
        let max_nodes = self.size as usize / EBR_SIZE + 1;
        let mut nodes = Vec::new();
        let mut offset = self.start;

        for _ in 0..max_nodes {
            if (offset as i64) < self.start as i64 || offset as i64 + EBR_SIZE as i64 > self.end() {
                return Err(DiskError::Corrupted(format!(
                    "EBR at {} lies outside the extended partition",
                    offset
                )));
            }

            let ebr = Ebr::decode(&self.path, file_offset(offset)?)?;
            nodes.push(ChainNode { offset, ebr });

            if ebr.next == END_OF_CHAIN {
                debug!("EBR chain of {:?}: {} nodes", self.path, nodes.len());
                return Ok(nodes);
            }
            if ebr.next <= offset {
                return Err(DiskError::Corrupted(format!(
                    "EBR chain goes backwards at {} -> {}",
                    offset, ebr.next
                )));
            }
            offset = ebr.next;
        }

        Err(DiskError::Corrupted(format!(
            "EBR chain of {:?} does not terminate",
            self.path
        )))
    }

    /// 链尾节点（next == -1），即下一个逻辑分区的位置
    pub fn available(&self) -> Result<ChainNode> {
        self.nodes()?
            .pop()
            .ok_or_else(|| DiskError::Corrupted("empty EBR chain".to_string()))
    }

    /// 已填充的逻辑分区
    pub fn logical(&self) -> Result<Vec<ChainNode>> {
        Ok(self
            .nodes()?
            .into_iter()
            .filter(|node| !node.ebr.is_placeholder())
            .collect())
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<ChainNode>> {
        Ok(self
            .logical()?
            .into_iter()
            .find(|node| node.ebr.name() == name))
    }

    /// 在链尾追加逻辑分区：先写回填充后的链尾，再在 next 处写新的占位节点
    ///
    /// 剩余空间放不下下一个 EBR 时不再写占位节点，填充后的链尾 next = -1，链已满。
    pub fn append(&self, fit: Fit, size: i32, name: &str) -> Result<ChainNode> {
        let mut tail = self.available()?;
        let data_start = tail.offset as i64 + EBR_SIZE as i64;
        let data_end = data_start + size as i64;

        if !tail.ebr.is_placeholder() || self.end() < data_end {
            warn!(
                "logical partition {} ({} bytes) overflows extended partition at {}",
                name, size, self.start
            );
            return Err(DiskError::ExtendedOverflow {
                requested: size as i64,
            });
        }

        tail.ebr.populate(tail.offset, fit, size, name);
        if data_end + EBR_SIZE as i64 > self.end() {
            tail.ebr.next = END_OF_CHAIN;
            tail.save(&self.path)?;
            debug!("extended partition at {} is full", self.start);
        } else {
            tail.save(&self.path)?;
            EbrChain::init(&self.path, tail.ebr.next)?;
        }

        info!(
            "logical partition {} created at {} ({} bytes)",
            name, tail.ebr.start, size
        );
        Ok(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{mbr::Mbr, types::PartitionKind};

    fn disk_with_extended(size: i32) -> (tempfile::TempDir, PathBuf, Mbr) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let mut mbr = Mbr::new(100_000, Fit::First);
        let slot = mbr.first_available_slot().unwrap();
        mbr.partitions[slot.index].create(slot.start, size, PartitionKind::Extended, Fit::First, "Ext1");
        mbr.save(&path).unwrap();
        EbrChain::init(&path, slot.start).unwrap();
        (dir, path, mbr)
    }

    #[test]
    fn ebr_width_and_placeholder() {
        let placeholder = Ebr::placeholder();
        assert_eq!(placeholder.to_bytes().unwrap().len(), EBR_SIZE);
        assert!(placeholder.is_placeholder());
        assert_eq!(Ebr::from_bytes(&placeholder.to_bytes().unwrap()).unwrap(), placeholder);
    }

    #[test]
    fn fresh_extended_has_single_placeholder() {
        let (_dir, path, mbr) = disk_with_extended(3000);
        let chain = EbrChain::of(&path, &mbr).unwrap();
        let nodes = chain.nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].ebr.is_placeholder());
        assert!(chain.logical().unwrap().is_empty());
    }

    #[test]
    fn appended_nodes_stay_inside_extended() {
        let (_dir, path, mbr) = disk_with_extended(3000);
        let ext = *mbr.extended().unwrap();
        let chain = EbrChain::of(&path, &mbr).unwrap();

        chain.append(Fit::Worst, 500, "Log1").unwrap();
        chain.append(Fit::Best, 700, "Log2").unwrap();

        let nodes = chain.nodes().unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes[2].ebr.is_placeholder());
        assert_eq!(nodes[2].ebr.next, END_OF_CHAIN);

        let logical = chain.logical().unwrap();
        assert_eq!(logical.len(), 2);
        for node in &logical {
            assert_eq!(node.ebr.start, node.offset + EBR_SIZE as i32);
            assert!(node.ebr.start > ext.start);
            assert!(node.ebr.start as i64 + node.ebr.size as i64 <= ext.end());
            assert_eq!(node.ebr.next, node.ebr.start + node.ebr.size);
        }
        assert_eq!(logical[0].ebr.name(), "Log1");
        assert_eq!(logical[1].offset, logical[0].ebr.next);
        assert_eq!(chain.find_by_name("Log2").unwrap().unwrap().ebr.size, 700);
    }

    #[test]
    fn overflow_leaves_chain_untouched() {
        let (_dir, path, mbr) = disk_with_extended(3000);
        let chain = EbrChain::of(&path, &mbr).unwrap();
        chain.append(Fit::Worst, 500, "Log1").unwrap();

        let before = chain.nodes().unwrap();
        let err = chain.append(Fit::Worst, 3000, "Big").unwrap_err();
        assert!(matches!(err, DiskError::ExtendedOverflow { .. }));
        assert_eq!(chain.nodes().unwrap(), before);
    }

    #[test]
    fn exact_fit_fills_the_chain() {
        let (_dir, path, mbr) = disk_with_extended(3000);
        let ext = *mbr.extended().unwrap();
        let chain = EbrChain::of(&path, &mbr).unwrap();

        let node = chain.append(Fit::Worst, 3000 - EBR_SIZE as i32, "Log1").unwrap();
        assert_eq!(node.ebr.start as i64 + node.ebr.size as i64, ext.end());
        assert_eq!(node.ebr.next, END_OF_CHAIN);

        let nodes = chain.nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(!nodes[0].ebr.is_placeholder());

        let err = chain.append(Fit::Worst, 1, "Log2").unwrap_err();
        assert!(matches!(err, DiskError::ExtendedOverflow { .. }));
        assert_eq!(chain.nodes().unwrap(), nodes);
    }

    #[test]
    fn leftover_smaller_than_an_ebr_closes_the_chain() {
        let (_dir, path, mbr) = disk_with_extended(3000);
        let chain = EbrChain::of(&path, &mbr).unwrap();

        chain.append(Fit::Worst, 3000 - EBR_SIZE as i32 - 10, "Log1").unwrap();
        assert_eq!(chain.nodes().unwrap().len(), 1);
        assert_eq!(chain.logical().unwrap()[0].ebr.next, END_OF_CHAIN);
        assert!(chain.append(Fit::Worst, 5, "Log2").is_err());
    }

    #[test]
    fn backwards_chain_is_corrupted() {
        let (_dir, path, mbr) = disk_with_extended(3000);
        let ext = *mbr.extended().unwrap();
        let mut looping = Ebr::placeholder();
        looping.next = ext.start;
        looping.encode(&path, ext.start as u64).unwrap();

        let chain = EbrChain::of(&path, &mbr).unwrap();
        assert!(matches!(chain.nodes(), Err(DiskError::Corrupted(_))));
    }

    #[test]
    fn no_extended_partition() {
        let mbr = Mbr::new(10_000, Fit::First);
        let err = EbrChain::of(Path::new("unused.img"), &mbr).unwrap_err();
        assert!(matches!(err, DiskError::NoExtendedPartition));
    }
}
