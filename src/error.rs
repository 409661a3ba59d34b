use thiserror::Error;

/// 错误大类，命令层据此决定如何展示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Capacity,
    Structural,
    Io,
    Session,
}

/// 虚拟磁盘与文件系统的统一错误类型
#[derive(Debug, Error)]
pub enum DiskError {
    /// 底层 I/O 错误（文件不存在、读不满一条记录等）
    #[error("Disk I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record encoding error: {0}")]
    Serialization(#[from] bincode::Error),

    // 参数校验
    #[error("Invalid parameter: {0}")]
    Validation(String),

    // 容量
    #[error("Not enough space on disk for {requested} bytes")]
    DiskFull { requested: i64 },
    #[error("No free partition slot left in the MBR")]
    NoFreeSlot,
    #[error("Logical partition of {requested} bytes exceeds the extended partition")]
    ExtendedOverflow { requested: i64 },
    #[error("Partition is too small to be formatted: {0} bytes")]
    PartitionTooSmall(i32),
    #[error("Accounts file does not fit in the data area")]
    AccountsFull,

    // 结构
    #[error("An extended partition must exist before creating a logical one")]
    NoExtendedPartition,
    #[error("Only one extended partition is allowed per disk")]
    ExtendedAlreadyExists,
    #[error("Partition not found: {0}")]
    PartitionNotFound(String),
    #[error("Partition name already in use: {0}")]
    NameTaken(String),
    #[error("Partition is already mounted: {0}")]
    AlreadyMounted(String),
    #[error("Extended partitions cannot be mounted: {0}")]
    CannotMountExtended(String),
    #[error("Partition is not mounted: {0}")]
    NotMounted(String),
    #[error("Disk already exists: {0}")]
    DiskExists(String),
    #[error("No more disk letters available")]
    LettersExhausted,
    #[error("Partition {0} is not formatted")]
    NotFormatted(String),
    #[error("User or group error: {0}")]
    Account(String),
    #[error("On-disk structure corrupted: {0}")]
    Corrupted(String),

    // 会话
    #[error("No active session")]
    NoSession,
    #[error("A session is already active for {0}")]
    SessionActive(String),
    #[error("Only root can run this command")]
    NotRoot,
    #[error("Authentication failed")]
    BadCredentials,
}

impl DiskError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Validation(_) => ErrorKind::Validation,
            Self::DiskFull { .. }
            | Self::NoFreeSlot
            | Self::ExtendedOverflow { .. }
            | Self::PartitionTooSmall(_)
            | Self::AccountsFull => ErrorKind::Capacity,
            Self::NoSession | Self::SessionActive(_) | Self::NotRoot | Self::BadCredentials => {
                ErrorKind::Session
            }
            _ => ErrorKind::Structural,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiskError>;
