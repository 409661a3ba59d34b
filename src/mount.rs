use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    disk::{
        disk_name,
        types::{Fit, PartitionKind, MOUNT_ID_LEN},
        EbrChain, FileDisk, Mbr,
    },
    error::{DiskError, Result},
    utils::canonical_path,
};

/// 挂载表中的一项：磁盘路径和分区名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub path: PathBuf,
    pub partition: String,
}

/// 从磁盘上重新解析出的已挂载分区（主分区或逻辑分区）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedPartition {
    pub id: String,
    pub name: String,
    pub kind: PartitionKind,
    pub fit: Option<Fit>,
    pub start: i32,
    pub size: i32,
}

/// 新挂载 ID 的组成部分，写盘成功后才记入挂载表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountId {
    pub id: String,
    pub correlative: i32,
    pub letter: char,
}

/// 进程内的挂载表
///
/// 挂载 ID 的格式为 `<所有者标记><磁盘内序号><磁盘字母>`，例如 `051a`。
/// 字母在第一次见到某个磁盘路径时分配，之后重复挂载保持不变；
/// 序号按磁盘递增，卸载不会回收。
#[derive(Debug, Clone)]
pub struct MountRegistry {
    owner_tag: String,
    mounted: BTreeMap<String, MountEntry>,
    disks: BTreeMap<String, PathBuf>,
    letters: HashMap<PathBuf, char>,
    correlatives: HashMap<PathBuf, i32>,
}

impl MountRegistry {
    pub fn new(owner_tag: &str) -> Self {
        Self {
            owner_tag: owner_tag.to_string(),
            mounted: BTreeMap::new(),
            disks: BTreeMap::new(),
            letters: HashMap::new(),
            correlatives: HashMap::new(),
        }
    }

    /// 记录 磁盘名 -> 路径
    pub fn register_disk(&mut self, path: &Path) {
        let key = canonical_path(path);
        self.disks.insert(disk_name(&key), key);
    }

    #[cfg(test)]
    pub(crate) fn disk_path(&self, name: &str) -> Option<&Path> {
        self.disks.get(name).map(PathBuf::as_path)
    }

    pub fn mounted(&self) -> impl Iterator<Item = (&String, &MountEntry)> {
        self.mounted.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    /// 计算下一个挂载 ID，不修改挂载表
    pub fn generate_mount_id(&self, path: &Path) -> Result<MountId> {
        let key = canonical_path(path);
        let path = key.as_path();
        let letter = match self.letters.get(path) {
            Some(letter) => *letter,
            None => ('a'..='z')
                .find(|c| !self.letters.values().any(|used| used == c))
                .ok_or(DiskError::LettersExhausted)?,
        };
        let correlative = self.correlatives.get(path).copied().unwrap_or(0) + 1;
        self.build_id(correlative, letter)
    }

    fn build_id(&self, correlative: i32, letter: char) -> Result<MountId> {
        let id = format!("{}{}{}", self.owner_tag, correlative, letter);
        if id.len() > MOUNT_ID_LEN {
            return Err(DiskError::Validation(format!(
                "mount id {} is longer than {} bytes",
                id, MOUNT_ID_LEN
            )));
        }
        Ok(MountId {
            id,
            correlative,
            letter,
        })
    }

    /// 跳过 MBR 中仍被占用的 ID（之前的进程挂载后未卸载）
    fn available_mount_id(&self, path: &Path, mbr: &Mbr) -> Result<MountId> {
        let mut mount_id = self.generate_mount_id(path)?;
        while mbr.find_by_id(&mount_id.id).is_some() {
            debug!("mount id {} is still recorded on {:?}", mount_id.id, path);
            mount_id = self.build_id(mount_id.correlative + 1, mount_id.letter)?;
        }
        Ok(mount_id)
    }

    fn commit(&mut self, path: &Path, mount_id: &MountId, partition: &str) {
        self.letters.insert(path.to_path_buf(), mount_id.letter);
        self.correlatives
            .insert(path.to_path_buf(), mount_id.correlative);
        self.mounted.insert(
            mount_id.id.clone(),
            MountEntry {
                path: path.to_path_buf(),
                partition: partition.to_string(),
            },
        );
        self.register_disk(path);
    }

    /// 挂载主分区或逻辑分区，返回挂载 ID
    pub fn mount(&mut self, path: &Path, name: &str) -> Result<String> {
        let key = canonical_path(path);
        let path = key.as_path();
        let disk = FileDisk::open(path)?;
        let mut mbr = disk.mbr()?;

        if let Some((index, partition)) = mbr.find_by_name(name) {
            if partition.is_mounted() {
                return Err(DiskError::AlreadyMounted(name.to_string()));
            }
            if partition.kind() == Some(PartitionKind::Extended) {
                return Err(DiskError::CannotMountExtended(name.to_string()));
            }
            let mount_id = self.available_mount_id(path, &mbr)?;
            mbr.partitions[index].mount(mount_id.correlative, &mount_id.id);
            disk.save_mbr(&mbr)?;
            self.commit(path, &mount_id, name);
            info!("partition {} of {:?} mounted as {}", name, path, mount_id.id);
            return Ok(mount_id.id);
        }

        if !mbr.is_extended_present() {
            return Err(DiskError::PartitionNotFound(name.to_string()));
        }
        let mut node = EbrChain::of(path, &mbr)?
            .find_by_name(name)?
            .ok_or_else(|| DiskError::PartitionNotFound(name.to_string()))?;
        if node.ebr.is_mounted() {
            return Err(DiskError::AlreadyMounted(name.to_string()));
        }
        let mount_id = self.available_mount_id(path, &mbr)?;
        node.ebr.set_mounted(true);
        node.save(path)?;
        self.commit(path, &mount_id, name);
        info!(
            "logical partition {} of {:?} mounted as {}",
            name, path, mount_id.id
        );
        Ok(mount_id.id)
    }

    /// 每次都重新读取 MBR（以及 EBR 链）确认分区仍处于挂载状态
    pub fn resolve(&self, id: &str) -> Result<(MountedPartition, PathBuf)> {
        let entry = self
            .mounted
            .get(id)
            .ok_or_else(|| DiskError::NotMounted(id.to_string()))?;
        let mbr = Mbr::load(&entry.path)?;
        debug!("resolving {} on {:?}", id, entry.path);

        let primary = mbr
            .find_by_id(id)
            .filter(|(_, partition)| partition.name() == entry.partition);
        if let Some((_, partition)) = primary {
            let kind = partition.kind().unwrap_or(PartitionKind::Primary);
            let mounted = MountedPartition {
                id: id.to_string(),
                name: partition.name(),
                kind,
                fit: partition.fit(),
                start: partition.start,
                size: partition.size,
            };
            return Ok((mounted, entry.path.clone()));
        }

        if mbr.is_extended_present() {
            let node = EbrChain::of(&entry.path, &mbr)?
                .find_by_name(&entry.partition)?
                .filter(|node| node.ebr.is_mounted());
            if let Some(node) = node {
                let mounted = MountedPartition {
                    id: id.to_string(),
                    name: node.ebr.name(),
                    kind: PartitionKind::Logical,
                    fit: node.ebr.fit(),
                    start: node.ebr.start,
                    size: node.ebr.size,
                };
                return Ok((mounted, entry.path.clone()));
            }
        }

        Err(DiskError::PartitionNotFound(id.to_string()))
    }

    /// 卸载单个分区：清除磁盘上的挂载状态并移出挂载表
    pub fn unmount(&mut self, id: &str) -> Result<()> {
        let (partition, path) = self.resolve(id)?;
        let disk = FileDisk::open(&path)?;
        let mut mbr = disk.mbr()?;

        match partition.kind {
            PartitionKind::Logical => {
                let mut node = EbrChain::of(&path, &mbr)?
                    .find_by_name(&partition.name)?
                    .ok_or_else(|| DiskError::PartitionNotFound(partition.name.clone()))?;
                node.ebr.set_mounted(false);
                node.save(&path)?;
            }
            _ => {
                let (index, _) = mbr
                    .find_by_name(&partition.name)
                    .ok_or_else(|| DiskError::PartitionNotFound(partition.name.clone()))?;
                mbr.partitions[index].unmount();
                disk.save_mbr(&mbr)?;
            }
        }

        self.mounted.remove(id);
        info!("{} unmounted", id);
        Ok(())
    }

    /// 磁盘被删除时清理，传入的路径应在删除文件前取得规范形式：挂载项、磁盘名、字母和序号
    pub fn unmount_all(&mut self, path: &Path) {
        let key = canonical_path(path);
        let path = key.as_path();
        self.mounted.retain(|_, entry| entry.path != path);
        self.disks.retain(|_, disk| disk != path);
        self.letters.remove(path);
        self.correlatives.remove(path);
        debug!("registry cleared for {:?}", path);
    }
}
