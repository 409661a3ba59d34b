use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{DiskError, Result};

pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// 把秒级时间戳格式化为本地时间，用于命令输出
pub fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => secs.to_string(),
    }
}

/// 日志记录用的浮点时间戳（秒）
pub fn current_timestamp_f32() -> f32 {
    current_timestamp() as f32
}

/// 由随机 UUID 的前 4 个字节生成磁盘签名
pub fn generate_signature() -> i32 {
    let bytes = Uuid::new_v4().into_bytes();
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// 把字符串写入定长缓冲区：超出截断，不足补 0
pub fn to_fixed<const N: usize>(value: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    let bytes = value.as_bytes();
    let len = bytes.len().min(N);
    buf[..len].copy_from_slice(&bytes[..len]);
    buf
}

/// 读取定长缓冲区中的字符串，遇到第一个 0 截止
pub fn from_fixed(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// 单位换算：B / K / M
pub fn to_bytes(size: i64, unit: &str) -> Result<i64> {
    let factor = match unit.to_ascii_uppercase().as_str() {
        "B" => 1,
        "K" => 1024,
        "M" => 1024 * 1024,
        other => return Err(DiskError::Validation(format!("unknown unit '{}'", other))),
    };
    let bytes = size
        .checked_mul(factor)
        .filter(|b| *b <= i32::MAX as i64)
        .ok_or_else(|| DiskError::Validation(format!("size {}{} is too large", size, unit)))?;
    Ok(bytes)
}

/// 挂载表使用的磁盘路径键；文件不存在时保持原样
pub fn canonical_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// 磁盘上的 i32 偏移转换为文件偏移
pub fn file_offset(offset: i32) -> Result<u64> {
    u64::try_from(offset).map_err(|_| DiskError::Corrupted(format!("negative offset {}", offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_pads_and_truncates() {
        let short: [u8; 4] = to_fixed("ab");
        assert_eq!(short, [b'a', b'b', 0, 0]);
        let long: [u8; 4] = to_fixed("abcdef");
        assert_eq!(&long, b"abcd");
        assert_eq!(from_fixed(&long), "abcd");
        assert_eq!(from_fixed(&[0u8; 16]), "");
    }

    #[test]
    fn unit_conversion() {
        assert_eq!(to_bytes(5, "m").unwrap(), 5 * 1024 * 1024);
        assert_eq!(to_bytes(3, "K").unwrap(), 3072);
        assert_eq!(to_bytes(2000, "B").unwrap(), 2000);
        assert!(to_bytes(1, "G").is_err());
        assert!(to_bytes(4096, "M").is_err());
    }

    #[test]
    fn timestamps_format_as_dates() {
        assert!(current_timestamp() > 1_600_000_000);
        let text = format_timestamp(current_timestamp());
        assert_eq!(text.len(), "2024-01-01 00:00:00".len());
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }

    #[test]
    fn canonical_path_resolves_dot_segments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("d.mia");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(
            canonical_path(&dir.path().join(".").join("d.mia")),
            canonical_path(&file)
        );
        let missing = dir.path().join("missing.mia");
        assert_eq!(canonical_path(&missing), missing);
    }

    #[test]
    fn negative_offsets_are_rejected() {
        assert_eq!(file_offset(153).unwrap(), 153);
        assert!(matches!(file_offset(-1), Err(DiskError::Corrupted(_))));
    }
}
