use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use log::info;

use crate::{
    disk::{mbr::Mbr, types::{Fit, MBR_SIZE}},
    error::{DiskError, Result},
};

/// 以单个文件模拟的磁盘
///
/// 只记录路径，每次读写都重新打开文件，不缓存任何磁盘内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDisk {
    path: PathBuf,
}

impl FileDisk {
    /// 创建新磁盘：预分配空间（全 0），在偏移 0 写入 MBR
    pub fn create(path: impl AsRef<Path>, size: i64, fit: Fit) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if size < MBR_SIZE as i64 || size > i32::MAX as i64 {
            return Err(DiskError::Validation(format!(
                "disk size must be between {} and {} bytes",
                MBR_SIZE,
                i32::MAX
            )));
        }
        if path.exists() {
            return Err(DiskError::DiskExists(path.display().to_string()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.set_len(size as u64)?;
        drop(file);

        let mbr = Mbr::new(size as i32, fit);
        mbr.save(&path)?;

        info!("disk {:?} created ({} bytes)", path, size);
        Ok(Self { path })
    }

    /// 打开已存在的磁盘
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(DiskError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("disk not found: {}", path.display()),
            )));
        }
        Ok(Self { path })
    }

    /// 删除磁盘文件，挂载表的清理由调用方负责
    pub fn remove(self) -> Result<()> {
        fs::remove_file(&self.path)?;
        info!("disk {:?} removed", self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 磁盘名：文件名去掉扩展名
    pub fn name(&self) -> String {
        disk_name(&self.path)
    }

    pub fn mbr(&self) -> Result<Mbr> {
        Mbr::load(&self.path)
    }

    pub fn save_mbr(&self, mbr: &Mbr) -> Result<()> {
        mbr.save(&self.path)
    }
}

pub fn disk_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_writes_mbr_and_allocates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/Disk1.mia");

        let disk = FileDisk::create(&path, 5 * 1024 * 1024, Fit::First).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 5 * 1024 * 1024);
        assert_eq!(disk.name(), "Disk1");

        let mbr = disk.mbr().unwrap();
        assert_eq!(mbr.size, 5 * 1024 * 1024);
        assert_eq!(mbr.fit(), Some(Fit::First));
        assert!(mbr.partitions.iter().all(|p| p.is_free() && p.size == 0));
    }

    #[test]
    fn existing_disk_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        FileDisk::create(&path, 4096, Fit::First).unwrap();
        assert!(matches!(
            FileDisk::create(&path, 4096, Fit::First),
            Err(DiskError::DiskExists(_))
        ));
    }

    #[test]
    fn open_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        assert!(matches!(FileDisk::open(&path), Err(DiskError::Io(_))));

        FileDisk::create(&path, 4096, Fit::Best).unwrap();
        FileDisk::open(&path).unwrap().remove().unwrap();
        assert!(!path.exists());
    }
}
