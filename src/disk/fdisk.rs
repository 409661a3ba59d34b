use log::{info, warn};

use crate::{
    disk::{
        ebr::EbrChain,
        file_disk::FileDisk,
        mbr::Mbr,
        types::{Fit, PartitionKind, NAME_LEN},
    },
    error::{DiskError, Result},
};

/// 一次分区创建请求（大小已换算为字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRequest {
    pub size: i64,
    pub kind: PartitionKind,
    pub fit: Fit,
    pub name: String,
}

impl PartitionRequest {
    pub fn new(size: i64, kind: PartitionKind, fit: Fit, name: &str) -> Self {
        Self {
            size,
            kind,
            fit,
            name: name.to_string(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.size <= 0 || self.size > i32::MAX as i64 {
            return Err(DiskError::Validation(format!(
                "partition size must be positive, got {}",
                self.size
            )));
        }
        if self.name.is_empty() || self.name.len() > NAME_LEN {
            return Err(DiskError::Validation(format!(
                "partition name must be 1 to {} bytes long",
                NAME_LEN
            )));
        }
        Ok(())
    }
}

impl FileDisk {
    /// fdisk：所有检查都在写盘之前完成
    pub fn create_partition(&self, request: &PartitionRequest) -> Result<()> {
        request.validate()?;
        let mut mbr = self.mbr()?;
        self.ensure_unique_name(&mbr, &request.name)?;

        match request.kind {
            PartitionKind::Primary => self.create_primary(&mut mbr, request),
            PartitionKind::Extended => self.create_extended(&mut mbr, request),
            PartitionKind::Logical => self.create_logical(&mbr, request),
        }
    }

    fn ensure_unique_name(&self, mbr: &Mbr, name: &str) -> Result<()> {
        let mut taken = mbr.find_by_name(name).is_some();
        if !taken && mbr.is_extended_present() {
            taken = EbrChain::of(self.path(), mbr)?.find_by_name(name)?.is_some();
        }
        if taken {
            return Err(DiskError::NameTaken(name.to_string()));
        }
        Ok(())
    }

    /// 在第一个空闲槽位放置分区，返回起始偏移
    fn place_in_slot(&self, mbr: &mut Mbr, request: &PartitionRequest) -> Result<i32> {
        if !mbr.can_fit_another_partition(request.size) {
            warn!(
                "{:?}: {} bytes requested, disk is full",
                self.path(),
                request.size
            );
            return Err(DiskError::DiskFull {
                requested: request.size,
            });
        }

        let slot = mbr.first_available_slot().ok_or(DiskError::NoFreeSlot)?;
        if slot.start as i64 + request.size > mbr.size as i64 {
            return Err(DiskError::DiskFull {
                requested: request.size,
            });
        }

        mbr.partitions[slot.index].create(
            slot.start,
            request.size as i32,
            request.kind,
            request.fit,
            &request.name,
        );
        Ok(slot.start)
    }

    fn create_primary(&self, mbr: &mut Mbr, request: &PartitionRequest) -> Result<()> {
        let start = self.place_in_slot(mbr, request)?;
        self.save_mbr(mbr)?;
        info!(
            "primary partition {} created at {} ({} bytes)",
            request.name, start, request.size
        );
        Ok(())
    }

    fn create_extended(&self, mbr: &mut Mbr, request: &PartitionRequest) -> Result<()> {
        if mbr.is_extended_present() {
            return Err(DiskError::ExtendedAlreadyExists);
        }
        let start = self.place_in_slot(mbr, request)?;
        self.save_mbr(mbr)?;
        EbrChain::init(self.path(), start)?;
        info!(
            "extended partition {} created at {} ({} bytes)",
            request.name, start, request.size
        );
        Ok(())
    }

    fn create_logical(&self, mbr: &Mbr, request: &PartitionRequest) -> Result<()> {
        let chain = EbrChain::of(self.path(), mbr)?;
        chain.append(request.fit, request.size as i32, &request.name)?;
        Ok(())
    }
}
