/// 超级块宽度：18 个 4 字节字段
pub const SUPER_BLOCK_SIZE: usize = 72;

/// 日志记录宽度：next(4) + operation(10) + path(74) + content(64) + date(4)
pub const JOURNAL_SIZE: usize = 156;

pub const OPERATION_LEN: usize = 10;
pub const JOURNAL_PATH_LEN: usize = 74;
pub const JOURNAL_CONTENT_LEN: usize = 64;

pub const FS_MAGIC: i32 = 0xEF53;

// 内容层使用的 inode / 块大小，这里只用于计算布局
pub const INODE_SIZE: i32 = 88;
pub const BLOCK_SIZE: i32 = 64;

/// 每个 inode 对应 3 个数据块
pub const BLOCKS_PER_INODE: i32 = 3;

/// 账户文件占用的 inode 数
pub const RESERVED_INODES: i32 = 1;

pub const BITMAP_FREE: u8 = b'0';
pub const BITMAP_USED: u8 = b'1';

pub const ROOT_NAME: &str = "root";
pub const ROOT_PASSWORD: &str = "123";
pub const ACCOUNTS_PATH: &str = "/users.txt";

/// 用户名、组名、密码的最大长度
pub const ACCOUNT_FIELD_LEN: usize = 10;

/// mkfs 清空元数据区时每次写入的字节数
pub const FORMAT_CHUNK: usize = 64 * 1024;
