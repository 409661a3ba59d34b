use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{DiskError, Result};

/// 定长磁盘记录
///
/// 所有记录都用 bincode（小端、定长整数）编码，编码长度与内容无关，
/// 所以读取时总是读 `SIZE` 个字节。写入先在内存中编码好，再一次性写出。
pub trait Record: Serialize + DeserializeOwned + Sized {
    const SIZE: usize;

    fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = bincode::serialize(self)?;
        if bytes.len() != Self::SIZE {
            return Err(DiskError::Corrupted(format!(
                "record encoded to {} bytes, expected {}",
                bytes.len(),
                Self::SIZE
            )));
        }
        Ok(bytes)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }

    /// 在 `offset` 处写入整条记录，文件不存在时创建
    fn encode(&self, path: &Path, offset: u64) -> Result<()> {
        let bytes = self.to_bytes()?;
        write_at(path, offset, &bytes)
    }

    /// 从 `offset` 处读取整条记录，不足 `SIZE` 字节即报错
    fn decode(path: &Path, offset: u64) -> Result<Self> {
        let mut buf = vec![0u8; Self::SIZE];
        read_at(path, offset, &mut buf)?;
        Self::from_bytes(&buf)
    }
}

/// 打开、定位、写入、关闭：句柄不跨操作保留
pub fn write_at(path: &Path, offset: u64, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create(true).open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(bytes)?;
    Ok(())
}

pub fn read_at(path: &Path, offset: u64, buf: &mut [u8]) -> Result<()> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Probe {
        tag: u8,
        value: i32,
    }

    impl Record for Probe {
        const SIZE: usize = 5;
    }

    #[test]
    fn encode_at_offset_then_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.img");
        let probe = Probe { tag: b'P', value: -1 };

        probe.encode(&path, 100).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 105);
        assert_eq!(Probe::decode(&path, 100).unwrap(), probe);
    }

    #[test]
    fn short_read_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.img");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let err = Probe::decode(&path, 0).unwrap_err();
        assert!(matches!(err, DiskError::Io(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Probe::decode(&dir.path().join("absent.img"), 0).unwrap_err();
        assert!(matches!(err, DiskError::Io(_)));
    }
}
