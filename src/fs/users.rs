use log::info;

use crate::{
    context::{Context, Session},
    error::{DiskError, Result},
    fs::{accounts::AccountTable, config::ACCOUNTS_PATH, FileSystem},
};

impl Context {
    pub fn login(&mut self, user: &str, password: &str, id: &str) -> Result<()> {
        if let Some(session) = &self.session {
            return Err(DiskError::SessionActive(session.user.clone()));
        }
        let fs = FileSystem::load(&self.mounts, id)?;
        let (uid, gid) = fs
            .accounts()?
            .authenticate(user, password)
            .ok_or(DiskError::BadCredentials)?;

        self.session = Some(Session {
            user: user.to_string(),
            partition_id: id.to_string(),
            uid,
            gid,
        });
        info!("{} logged in on {}", user, id);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(DiskError::NoSession)?;
        info!("{} logged out", session.user);
        Ok(())
    }

    /// 以 root 身份读取当前分区的账户表，修改后按 账户文件 -> 日志 -> 超级块 提交
    fn with_accounts<F>(&mut self, operation: &str, path: &str, content: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut AccountTable) -> Result<()>,
    {
        let id = self.require_root()?.partition_id.clone();
        let mut fs = FileSystem::load(&self.mounts, &id)?;
        let mut table = fs.accounts()?;
        change(&mut table)?;
        fs.commit(&table, operation, path, content)?;
        info!("{} on {}: {}", operation, id, content);
        Ok(())
    }

    pub fn mkgrp(&mut self, name: &str) -> Result<()> {
        self.with_accounts("mkgrp", ACCOUNTS_PATH, name, |table| {
            table.add_group(name).map(|_| ())
        })
    }

    pub fn rmgrp(&mut self, name: &str) -> Result<()> {
        self.with_accounts("rmgrp", ACCOUNTS_PATH, name, |table| table.remove_group(name))
    }

    pub fn mkusr(&mut self, user: &str, password: &str, group: &str) -> Result<()> {
        let content = format!("{}/{}", user, group);
        self.with_accounts("mkusr", ACCOUNTS_PATH, &content, |table| {
            table.add_user(user, password, group).map(|_| ())
        })
    }

    pub fn rmusr(&mut self, user: &str) -> Result<()> {
        self.with_accounts("rmusr", ACCOUNTS_PATH, user, |table| table.remove_user(user))
    }

    /// 修改用户所属组，日志内容为 `用户/组`
    pub fn chgrp(&mut self, user: &str, group: &str) -> Result<()> {
        let content = format!("{}/{}", user, group);
        self.with_accounts("chgrp", "", &content, |table| table.change_group(user, group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::{Fit, PartitionKind, PartitionRequest},
        fs::super_block::FsType,
    };

    fn formatted(fs_type: FsType) -> (tempfile::TempDir, Context, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Disk1.mia");
        let mut ctx = Context::default();
        ctx.make_disk(&path, 1024 * 1024, Fit::First).unwrap();
        ctx.create_partition(
            &path,
            &PartitionRequest::new(200_000, PartitionKind::Primary, Fit::Worst, "Part1"),
        )
        .unwrap();
        let id = ctx.mount(&path, "Part1").unwrap();
        ctx.format(&id, fs_type).unwrap();
        (dir, ctx, id)
    }

    #[test]
    fn login_checks_credentials_and_single_session() {
        let (_dir, mut ctx, id) = formatted(FsType::Ext2);
        assert!(matches!(
            ctx.login("root", "bad", &id),
            Err(DiskError::BadCredentials)
        ));
        ctx.login("root", "123", &id).unwrap();
        assert_eq!(ctx.session.as_ref().unwrap().uid, 1);
        assert!(matches!(
            ctx.login("root", "123", &id),
            Err(DiskError::SessionActive(_))
        ));

        ctx.logout().unwrap();
        assert!(matches!(ctx.logout(), Err(DiskError::NoSession)));
    }

    #[test]
    fn account_commands_need_root() {
        let (_dir, mut ctx, id) = formatted(FsType::Ext2);
        assert!(matches!(ctx.mkgrp("devs"), Err(DiskError::NoSession)));

        ctx.login("root", "123", &id).unwrap();
        ctx.mkgrp("devs").unwrap();
        ctx.mkusr("alice", "pw", "devs").unwrap();
        ctx.logout().unwrap();

        ctx.login("alice", "pw", &id).unwrap();
        assert_eq!(ctx.session.as_ref().unwrap().gid, 2);
        assert!(matches!(ctx.mkgrp("ops"), Err(DiskError::NotRoot)));
    }

    #[test]
    fn failed_change_writes_nothing() {
        let (_dir, mut ctx, id) = formatted(FsType::Ext3);
        ctx.login("root", "123", &id).unwrap();
        let before = FileSystem::load(&ctx.mounts, &id).unwrap().super_block;

        assert!(ctx.chgrp("ghost", "root").is_err());
        assert!(ctx.chgrp("root", "ghosts").is_err());

        let fs = FileSystem::load(&ctx.mounts, &id).unwrap();
        assert_eq!(fs.super_block, before);
        assert_eq!(fs.last_journal().unwrap().unwrap().operation(), "mkfs");
    }

    #[test]
    fn every_account_change_is_journaled() {
        let (_dir, mut ctx, id) = formatted(FsType::Ext3);
        ctx.login("root", "123", &id).unwrap();

        let head = |ctx: &Context| {
            FileSystem::load(&ctx.mounts, &id)
                .unwrap()
                .last_journal()
                .unwrap()
                .unwrap()
        };

        ctx.mkgrp("devs").unwrap();
        assert_eq!(head(&ctx).operation(), "mkgrp");
        ctx.mkusr("bob", "pw", "devs").unwrap();
        assert_eq!(head(&ctx).content(), "bob/devs");
        ctx.rmusr("bob").unwrap();
        assert_eq!(head(&ctx).operation(), "rmusr");
        ctx.rmgrp("devs").unwrap();
        let last = head(&ctx);
        assert_eq!(last.operation(), "rmgrp");
        assert_eq!(last.path(), ACCOUNTS_PATH);
    }
}
