use std::path::PathBuf;

/// 挂载 ID 的前缀（所有者标记）
pub const OWNER_TAG: &str = "05";

/// mkdisk 默认单位与分配策略
pub const MKDISK_DEFAULT_UNIT: &str = "M";
pub const MKDISK_DEFAULT_FIT: &str = "FF";

/// fdisk 默认单位、分配策略与分区类型
pub const FDISK_DEFAULT_UNIT: &str = "M";
pub const FDISK_DEFAULT_FIT: &str = "WF";
pub const FDISK_DEFAULT_TYPE: &str = "P";

pub const HISTORY_FILE: &str = ".minidisk_history";
pub const HISTORY_SIZE: usize = 100;

const OWNER_TAG_ENV: &str = "MINIDISK_OWNER_TAG";

#[derive(Debug, Clone)]
pub struct Config {
    pub owner_tag: String,
    pub history_path: PathBuf,
    pub history_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            owner_tag: OWNER_TAG.to_string(),
            history_path: PathBuf::from(HISTORY_FILE),
            history_size: HISTORY_SIZE,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，缺省时回落到常量
    pub fn from_env() -> Self {
        let owner_tag = std::env::var(OWNER_TAG_ENV)
            .ok()
            .filter(|tag| !tag.trim().is_empty())
            .unwrap_or_else(|| OWNER_TAG.to_string());

        let history_path = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(HISTORY_FILE);

        Self {
            owner_tag,
            history_path,
            history_size: HISTORY_SIZE,
        }
    }
}
