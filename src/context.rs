use std::path::Path;

use log::info;

use crate::{
    config::Config,
    disk::{FileDisk, Fit, PartitionRequest},
    error::{DiskError, Result},
    fs::{
        config::ROOT_NAME,
        super_block::{FsType, SuperBlock},
        FileSystem,
    },
    mount::MountRegistry,
    utils::canonical_path,
};

/// 当前登录的会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    pub partition_id: String,
    pub uid: i32,
    pub gid: i32,
}

impl Session {
    pub fn is_root(&self) -> bool {
        self.user == ROOT_NAME
    }
}

/// 命令执行上下文：挂载表与会话，由 shell 持有并逐条命令传入
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    pub mounts: MountRegistry,
    pub session: Option<Session>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Context {
    pub fn new(config: Config) -> Self {
        let mounts = MountRegistry::new(&config.owner_tag);
        Self {
            config,
            mounts,
            session: None,
        }
    }

    pub fn require_session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(DiskError::NoSession)
    }

    pub fn require_root(&self) -> Result<&Session> {
        let session = self.require_session()?;
        if !session.is_root() {
            return Err(DiskError::NotRoot);
        }
        Ok(session)
    }

    /// mkdisk
    pub fn make_disk(&mut self, path: &Path, size: i64, fit: Fit) -> Result<FileDisk> {
        let disk = FileDisk::create(path, size, fit)?;
        self.mounts.register_disk(path);
        Ok(disk)
    }

    /// rmdisk：删除文件并清理挂载表，会话所在磁盘被删除时一并登出
    pub fn remove_disk(&mut self, path: &Path) -> Result<()> {
        // 文件删除后无法再规范化，先取得挂载表使用的键
        let key = canonical_path(path);
        FileDisk::open(path)?.remove()?;

        let session_lost = self.session.as_ref().is_some_and(|session| {
            self.mounts
                .mounted()
                .any(|(id, entry)| *id == session.partition_id && entry.path == key)
        });
        self.mounts.unmount_all(&key);
        if session_lost {
            info!("session closed because its disk was removed");
            self.session = None;
        }
        Ok(())
    }

    /// fdisk
    pub fn create_partition(&self, path: &Path, request: &PartitionRequest) -> Result<()> {
        FileDisk::open(path)?.create_partition(request)
    }

    pub fn mount(&mut self, path: &Path, name: &str) -> Result<String> {
        self.mounts.mount(path, name)
    }

    pub fn unmount(&mut self, id: &str) -> Result<()> {
        self.mounts.unmount(id)?;
        if self.session.as_ref().is_some_and(|s| s.partition_id == id) {
            self.session = None;
        }
        Ok(())
    }

    /// mkfs
    pub fn format(&mut self, id: &str, fs_type: FsType) -> Result<SuperBlock> {
        let fs = FileSystem::format(&self.mounts, id, fs_type)?;
        Ok(fs.super_block)
    }
}
