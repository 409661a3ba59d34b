use std::{fmt, path::Path};

use crate::{
    disk::codec::{read_at, write_at},
    error::{DiskError, Result},
    fs::{
        config::{ACCOUNT_FIELD_LEN, BITMAP_FREE, BITMAP_USED, ROOT_NAME, ROOT_PASSWORD},
        super_block::SuperBlock,
    },
    utils::file_offset,
};

/// 账户文件中的一行；id 为 0 表示已删除
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountRow {
    Group {
        id: i32,
        name: String,
    },
    User {
        id: i32,
        group: String,
        name: String,
        password: String,
    },
}

impl AccountRow {
    fn is_active(&self) -> bool {
        match self {
            Self::Group { id, .. } | Self::User { id, .. } => *id != 0,
        }
    }
}

/// 纯文本账户表：`GID,G,组名` 与 `UID,U,组名,用户名,密码`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountTable {
    rows: Vec<AccountRow>,
}

fn check_field(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.len() > ACCOUNT_FIELD_LEN {
        return Err(DiskError::Validation(format!(
            "{} must be 1 to {} characters",
            kind, ACCOUNT_FIELD_LEN
        )));
    }
    if value.contains(|c: char| c == ',' || c == '\n') {
        return Err(DiskError::Validation(format!(
            "{} cannot contain ',' or line breaks",
            kind
        )));
    }
    Ok(())
}

impl AccountTable {
    /// 格式化后的初始内容：root 组和 root 用户
    pub fn initial() -> Self {
        Self {
            rows: vec![
                AccountRow::Group {
                    id: 1,
                    name: ROOT_NAME.to_string(),
                },
                AccountRow::User {
                    id: 1,
                    group: ROOT_NAME.to_string(),
                    name: ROOT_NAME.to_string(),
                    password: ROOT_PASSWORD.to_string(),
                },
            ],
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let id = fields[0]
                .parse::<i32>()
                .map_err(|_| DiskError::Corrupted(format!("bad account id in '{}'", line)))?;
            let row = match (fields.get(1), fields.len()) {
                (Some(&"G"), 3) => AccountRow::Group {
                    id,
                    name: fields[2].to_string(),
                },
                (Some(&"U"), 5) => AccountRow::User {
                    id,
                    group: fields[2].to_string(),
                    name: fields[3].to_string(),
                    password: fields[4].to_string(),
                },
                _ => return Err(DiskError::Corrupted(format!("bad account line '{}'", line))),
            };
            rows.push(row);
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[AccountRow] {
        &self.rows
    }

    /// 有效组的 id
    pub fn group_id(&self, name: &str) -> Option<i32> {
        self.rows.iter().find_map(|row| match row {
            AccountRow::Group { id, name: n } if *id != 0 && n == name => Some(*id),
            _ => None,
        })
    }

    fn user_mut(&mut self, name: &str) -> Option<&mut AccountRow> {
        self.rows.iter_mut().find(|row| {
            row.is_active() && matches!(row, AccountRow::User { name: n, .. } if n == name)
        })
    }

    pub fn has_user(&self, name: &str) -> bool {
        self.rows.iter().any(|row| {
            row.is_active() && matches!(row, AccountRow::User { name: n, .. } if n == name)
        })
    }

    /// 校验密码，成功返回 (uid, gid)
    pub fn authenticate(&self, user: &str, password: &str) -> Option<(i32, i32)> {
        self.rows.iter().find_map(|row| match row {
            AccountRow::User {
                id,
                group,
                name,
                password: p,
            } if *id != 0 && name == user && p == password => {
                Some((*id, self.group_id(group).unwrap_or(0)))
            }
            _ => None,
        })
    }

    fn next_id(&self, users: bool) -> i32 {
        let count = self
            .rows
            .iter()
            .filter(|row| matches!(row, AccountRow::User { .. }) == users)
            .count();
        count as i32 + 1
    }

    pub fn add_group(&mut self, name: &str) -> Result<i32> {
        check_field("group", name)?;
        if self.group_id(name).is_some() {
            return Err(DiskError::Account(format!("group {} already exists", name)));
        }
        let id = self.next_id(false);
        self.rows.push(AccountRow::Group {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    pub fn remove_group(&mut self, name: &str) -> Result<()> {
        if name == ROOT_NAME {
            return Err(DiskError::Account("the root group cannot be removed".to_string()));
        }
        let row = self
            .rows
            .iter_mut()
            .find(|row| matches!(row, AccountRow::Group { id, name: n } if *id != 0 && n == name))
            .ok_or_else(|| DiskError::Account(format!("group {} does not exist", name)))?;
        if let AccountRow::Group { id, .. } = row {
            *id = 0;
        }
        Ok(())
    }

    pub fn add_user(&mut self, name: &str, password: &str, group: &str) -> Result<i32> {
        check_field("user", name)?;
        check_field("password", password)?;
        check_field("group", group)?;
        if self.has_user(name) {
            return Err(DiskError::Account(format!("user {} already exists", name)));
        }
        if self.group_id(group).is_none() {
            return Err(DiskError::Account(format!("group {} does not exist", group)));
        }
        let id = self.next_id(true);
        self.rows.push(AccountRow::User {
            id,
            group: group.to_string(),
            name: name.to_string(),
            password: password.to_string(),
        });
        Ok(id)
    }

    pub fn remove_user(&mut self, name: &str) -> Result<()> {
        if name == ROOT_NAME {
            return Err(DiskError::Account("the root user cannot be removed".to_string()));
        }
        match self.user_mut(name) {
            Some(AccountRow::User { id, .. }) => {
                *id = 0;
                Ok(())
            }
            _ => Err(DiskError::Account(format!("user {} does not exist", name))),
        }
    }

    pub fn change_group(&mut self, user: &str, group: &str) -> Result<()> {
        if self.group_id(group).is_none() {
            return Err(DiskError::Account(format!("group {} does not exist", group)));
        }
        match self.user_mut(user) {
            Some(AccountRow::User { group: g, .. }) => {
                *g = group.to_string();
                Ok(())
            }
            _ => Err(DiskError::Account(format!("user {} does not exist", user))),
        }
    }

    /// 从数据区起点读取（8 字节长度前缀 + 文本）
    pub fn load(path: &Path, sb: &SuperBlock) -> Result<Self> {
        let offset = file_offset(sb.block_start)?;
        let mut len_bytes = [0u8; 8];
        read_at(path, offset, &mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);
        if len as i64 + 8 > sb.data_capacity() {
            return Err(DiskError::Corrupted(format!("accounts file length {}", len)));
        }

        let mut bytes = vec![0u8; len as usize];
        read_at(path, offset + 8, &mut bytes)?;
        let text = String::from_utf8(bytes)
            .map_err(|_| DiskError::Corrupted("accounts file is not UTF-8".to_string()))?;
        Self::parse(&text)
    }

    /// 写回数据区并更新块位图与超级块计数；超级块本身由调用方写回
    pub fn store(&self, path: &Path, sb: &mut SuperBlock) -> Result<()> {
        let bytes = bincode::serialize(&self.to_string())?;
        if bytes.len() as i64 > sb.data_capacity() {
            return Err(DiskError::AccountsFull);
        }
        let used = (bytes.len() as i32 + sb.block_size - 1) / sb.block_size;

        let mut bitmap = vec![BITMAP_USED; used as usize];
        bitmap.resize(sb.blocks_count as usize, BITMAP_FREE);

        write_at(path, file_offset(sb.block_start)?, &bytes)?;
        write_at(path, file_offset(sb.bm_block_start)?, &bitmap)?;

        sb.first_blo = used;
        sb.free_blocks_count = sb.blocks_count - used;
        Ok(())
    }
}

impl fmt::Display for AccountTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            match row {
                AccountRow::Group { id, name } => writeln!(f, "{},G,{}", id, name)?,
                AccountRow::User {
                    id,
                    group,
                    name,
                    password,
                } => writeln!(f, "{},U,{},{},{}", id, group, name, password)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::super_block::FsType;

    #[test]
    fn initial_table_text() {
        assert_eq!(
            AccountTable::initial().to_string(),
            "1,G,root\n1,U,root,root,123\n"
        );
    }

    #[test]
    fn parse_reads_back_rows() {
        let text = "1,G,root\n1,U,root,root,123\n2,G,devs\n0,U,devs,bob,pw\n";
        let table = AccountTable::parse(text).unwrap();
        assert_eq!(table.rows().len(), 4);
        assert_eq!(table.to_string(), text);
        assert!(!table.has_user("bob"));
        assert_eq!(table.group_id("devs"), Some(2));
        assert!(AccountTable::parse("x,G,root").is_err());
        assert!(AccountTable::parse("1,Q,root").is_err());
    }

    #[test]
    fn groups_and_users() {
        let mut table = AccountTable::initial();
        assert_eq!(table.add_group("devs").unwrap(), 2);
        assert!(table.add_group("devs").is_err());
        assert_eq!(table.add_user("alice", "pw", "devs").unwrap(), 2);
        assert!(table.add_user("bob", "pw", "ghosts").is_err());
        assert_eq!(table.authenticate("alice", "pw"), Some((2, 2)));
        assert_eq!(table.authenticate("alice", "nope"), None);

        table.change_group("alice", "root").unwrap();
        assert_eq!(table.authenticate("alice", "pw"), Some((2, 1)));

        table.remove_user("alice").unwrap();
        assert!(table.authenticate("alice", "pw").is_none());
        table.remove_group("devs").unwrap();
        assert!(table.group_id("devs").is_none());
        assert!(table.remove_group("root").is_err());
        assert!(table.remove_user("root").is_err());
    }

    #[test]
    fn fields_are_validated() {
        let mut table = AccountTable::initial();
        assert!(matches!(
            table.add_group("a-very-long-group"),
            Err(DiskError::Validation(_))
        ));
        assert!(matches!(table.add_group("a,b"), Err(DiskError::Validation(_))));
    }

    #[test]
    fn store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.img");
        let mut sb = SuperBlock::layout(FsType::Ext2, 0, 20_000).unwrap();
        let mut table = AccountTable::initial();
        table.add_group("devs").unwrap();

        table.store(&path, &mut sb).unwrap();
        assert_eq!(sb.first_blo, 1);
        assert_eq!(sb.free_blocks_count, sb.blocks_count - 1);
        assert_eq!(AccountTable::load(&path, &sb).unwrap(), table);
    }
}
