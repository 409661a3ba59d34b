use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    disk::{
        codec::Record,
        types::{
            Fit, PartitionKind, MBR_SIZE, MOUNT_ID_LEN, NAME_LEN, PARTITION_SIZE, STATUS_FREE,
            STATUS_MOUNTED, STATUS_UNMOUNTED,
        },
    },
    error::Result,
    utils::{current_timestamp, from_fixed, generate_signature, to_fixed},
};

pub const PARTITION_SLOTS: usize = 4;

/// MBR 中的一个分区槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub status: u8,               // N = 空闲, 0 = 未挂载, 1 = 已挂载
    pub kind: u8,                 // P / E，空闲时为 N
    pub fit: u8,                  // B / F / W
    pub start: i32,               // 起始字节偏移
    pub size: i32,                // 大小（字节）
    pub name: [u8; NAME_LEN],     // 分区名
    pub correlative: i32,         // 挂载序号，未挂载为 -1
    pub id: [u8; MOUNT_ID_LEN],   // 挂载 ID
}

impl Record for Partition {
    const SIZE: usize = PARTITION_SIZE;
}

impl Default for Partition {
    fn default() -> Self {
        Self::free()
    }
}

impl Partition {
    /// 空闲槽位：哨兵状态且大小为 0
    pub fn free() -> Self {
        Self {
            status: STATUS_FREE,
            kind: b'N',
            fit: b'N',
            start: -1,
            size: 0,
            name: [0; NAME_LEN],
            correlative: -1,
            id: [0; MOUNT_ID_LEN],
        }
    }

    /// 原地填充槽位，不写盘，由调用方整体回写 MBR
    pub fn create(&mut self, start: i32, size: i32, kind: PartitionKind, fit: Fit, name: &str) {
        self.status = STATUS_UNMOUNTED;
        self.kind = kind.as_byte();
        self.fit = fit.as_byte();
        self.start = start;
        self.size = size;
        self.name = to_fixed(name);
        self.correlative = -1;
        self.id = [0; MOUNT_ID_LEN];
    }

    pub fn mount(&mut self, correlative: i32, id: &str) {
        self.status = STATUS_MOUNTED;
        self.correlative = correlative;
        self.id = to_fixed(id);
    }

    pub fn unmount(&mut self) {
        self.status = STATUS_UNMOUNTED;
        self.correlative = -1;
        self.id = [0; MOUNT_ID_LEN];
    }

    pub fn is_free(&self) -> bool {
        self.status == STATUS_FREE
    }

    pub fn is_mounted(&self) -> bool {
        self.status == STATUS_MOUNTED
    }

    pub fn kind(&self) -> Option<PartitionKind> {
        PartitionKind::from_byte(self.kind)
    }

    pub fn fit(&self) -> Option<Fit> {
        Fit::from_byte(self.fit)
    }

    pub fn name(&self) -> String {
        from_fixed(&self.name)
    }

    pub fn mount_id(&self) -> String {
        from_fixed(&self.id)
    }

    /// 分区结束位置（不含）
    pub fn end(&self) -> i64 {
        self.start as i64 + self.size as i64
    }
}

/// 可用槽位：下标与新分区的起始偏移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSlot {
    pub index: usize,
    pub start: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mbr {
    pub size: i32,        // 磁盘总大小
    pub created_at: i64,  // 创建时间
    pub signature: i32,   // 磁盘签名
    pub fit: u8,          // 磁盘默认分配策略
    pub partitions: [Partition; PARTITION_SLOTS],
}

impl Record for Mbr {
    const SIZE: usize = MBR_SIZE;
}

impl Mbr {
    pub fn new(size: i32, fit: Fit) -> Self {
        Self {
            size,
            created_at: current_timestamp(),
            signature: generate_signature(),
            fit: fit.as_byte(),
            partitions: [Partition::free(); PARTITION_SLOTS],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::decode(path, 0)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.encode(path, 0)
    }

    pub fn fit(&self) -> Option<Fit> {
        Fit::from_byte(self.fit)
    }

    pub fn occupied(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(|p| !p.is_free())
    }

    /// 已占用空间 + 请求大小 不超过磁盘大小
    pub fn can_fit_another_partition(&self, requested: i64) -> bool {
        let used: i64 = self.occupied().map(|p| p.size as i64).sum();
        used + requested <= self.size as i64
    }

    /// 按顺序找第一个空闲槽位；起点为上一个已占用分区的末尾，第一个槽位从 MBR 之后开始
    pub fn first_available_slot(&self) -> Option<FreeSlot> {
        let mut start = MBR_SIZE as i64;
        for (index, partition) in self.partitions.iter().enumerate() {
            if partition.is_free() {
                return Some(FreeSlot {
                    index,
                    start: start as i32,
                });
            }
            start = partition.end();
        }
        None
    }

    pub fn is_extended_present(&self) -> bool {
        self.extended().is_some()
    }

    pub fn extended(&self) -> Option<&Partition> {
        self.occupied()
            .find(|p| p.kind() == Some(PartitionKind::Extended))
    }

    pub fn find_by_name(&self, name: &str) -> Option<(usize, &Partition)> {
        self.partitions
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_free() && p.name() == name)
    }

    pub fn find_by_id(&self, id: &str) -> Option<(usize, &Partition)> {
        self.partitions
            .iter()
            .enumerate()
            .find(|(_, p)| p.is_mounted() && p.mount_id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mbr() -> Mbr {
        let mut mbr = Mbr::new(10_000, Fit::First);
        mbr.partitions[0].create(MBR_SIZE as i32, 2000, PartitionKind::Primary, Fit::Worst, "Part1");
        mbr
    }

    #[test]
    fn record_widths() {
        assert_eq!(Partition::free().to_bytes().unwrap().len(), PARTITION_SIZE);
        assert_eq!(sample_mbr().to_bytes().unwrap().len(), MBR_SIZE);
    }

    #[test]
    fn mbr_survives_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let mut mbr = sample_mbr();
        mbr.partitions[1].create(2173, i32::MAX - 2173, PartitionKind::Extended, Fit::Best, "");
        mbr.partitions[0].mount(1, "051a");

        mbr.save(&path).unwrap();
        let loaded = Mbr::load(&path).unwrap();
        assert_eq!(loaded, mbr);
        assert_eq!(loaded.partitions[1].name(), "");
        assert_eq!(loaded.partitions[0].mount_id(), "051a");
    }

    #[test]
    fn slots_are_taken_in_order() {
        let mbr = sample_mbr();
        let slot = mbr.first_available_slot().unwrap();
        assert_eq!(slot.index, 1);
        assert_eq!(slot.start, MBR_SIZE as i32 + 2000);

        let empty = Mbr::new(10_000, Fit::First);
        assert_eq!(
            empty.first_available_slot(),
            Some(FreeSlot {
                index: 0,
                start: MBR_SIZE as i32
            })
        );
    }

    #[test]
    fn full_table_has_no_slot() {
        let mut mbr = Mbr::new(10_000, Fit::First);
        for i in 0..PARTITION_SLOTS {
            let start = MBR_SIZE as i32 + (i as i32) * 100;
            mbr.partitions[i].create(start, 100, PartitionKind::Primary, Fit::First, &format!("p{}", i));
        }
        assert!(mbr.first_available_slot().is_none());
    }

    #[test]
    fn capacity_counts_occupied_slots() {
        let mbr = sample_mbr();
        assert!(mbr.can_fit_another_partition(8000));
        assert!(!mbr.can_fit_another_partition(8001));
    }

    #[test]
    fn lookups() {
        let mut mbr = sample_mbr();
        assert!(!mbr.is_extended_present());
        assert_eq!(mbr.find_by_name("Part1").map(|(i, _)| i), Some(0));
        assert!(mbr.find_by_name("Nope").is_none());
        assert!(mbr.find_by_id("051a").is_none());

        mbr.partitions[0].mount(1, "051a");
        assert_eq!(mbr.find_by_id("051a").map(|(i, _)| i), Some(0));

        mbr.partitions[0].unmount();
        assert!(mbr.find_by_id("051a").is_none());
        assert!(!mbr.partitions[0].is_mounted());
    }
}
