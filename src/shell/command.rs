use colored::*;
use std::path::PathBuf;

use crate::{
    context::Context,
    disk::{disk_name, Fit, PartitionRequest},
    error::Result,
    fs::super_block::FsType,
    utils::format_timestamp,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Exit,
    Mkdisk { size: i64, fit: Fit, path: PathBuf },
    Rmdisk { path: PathBuf },
    Fdisk { request: PartitionRequest, path: PathBuf },
    Mount { path: PathBuf, name: String },
    Unmount { id: String },
    Mounted,
    Mkfs { id: String, fs: FsType },
    Login { user: String, pass: String, id: String },
    Logout,
    Mkgrp { name: String },
    Rmgrp { name: String },
    Mkusr { user: String, pass: String, grp: String },
    Rmusr { user: String },
    Chgrp { user: String, grp: String },
}

/// 执行一条命令，成功返回提示信息
pub fn execute_command(cmd: &Command, ctx: &mut Context) -> Result<String> {
    let message = match cmd {
        Command::Help => help_text(),
        Command::Exit => "👋 Exiting MiniDisk shell...".to_string(),
        Command::Mkdisk { size, fit, path } => {
            let mbr = ctx.make_disk(path, *size, *fit)?.mbr()?;
            format!(
                "💾 MKDISK: {} created ({} bytes, {})",
                path.display(),
                size,
                format_timestamp(mbr.created_at)
            )
        }
        Command::Rmdisk { path } => {
            ctx.remove_disk(path)?;
            format!("🗑️ RMDISK: {} removed", path.display())
        }
        Command::Fdisk { request, path } => {
            ctx.create_partition(path, request)?;
            format!("📦 FDISK: {} created", request.name)
        }
        Command::Mount { path, name } => {
            let id = ctx.mount(path, name)?;
            format!("🔗 MOUNT: {} mounted as {}", name, id)
        }
        Command::Unmount { id } => {
            ctx.unmount(id)?;
            format!("⏏️ UNMOUNT: {} unmounted", id)
        }
        Command::Mounted => mounted_text(ctx),
        Command::Mkfs { id, fs } => {
            let sb = ctx.format(id, *fs)?;
            format!(
                "🔧 MKFS: {} formatted ({} inodes, {} blocks, {} journal entries)",
                id,
                sb.inodes_count,
                sb.blocks_count,
                sb.journal_capacity()
            )
        }
        Command::Login { user, pass, id } => {
            ctx.login(user, pass, id)?;
            format!("🔑 LOGIN: welcome {}", user)
        }
        Command::Logout => {
            ctx.logout()?;
            "LOGOUT".to_string()
        }
        Command::Mkgrp { name } => {
            ctx.mkgrp(name)?;
            format!("👥 MKGRP: group {} created", name)
        }
        Command::Rmgrp { name } => {
            ctx.rmgrp(name)?;
            format!("👥 RMGRP: group {} removed", name)
        }
        Command::Mkusr { user, pass, grp } => {
            ctx.mkusr(user, pass, grp)?;
            format!("👤 MKUSR: user {} created in {}", user, grp)
        }
        Command::Rmusr { user } => {
            ctx.rmusr(user)?;
            format!("👤 RMUSR: user {} removed", user)
        }
        Command::Chgrp { user, grp } => {
            ctx.chgrp(user, grp)?;
            format!("👥 CHGRP: user {} moved to group {}", user, grp)
        }
    };
    Ok(message)
}

fn mounted_text(ctx: &Context) -> String {
    if ctx.mounts.is_empty() {
        return "No mounted partitions".to_string();
    }
    let mut out = "📋 Mounted partitions".bright_yellow().bold().to_string();
    for (id, entry) in ctx.mounts.mounted() {
        out.push_str(&format!(
            "\n  {}  {}/{}",
            id.cyan(),
            disk_name(&entry.path),
            entry.partition
        ));
    }
    out
}

fn help_text() -> String {
    format!(
        "{}{}",
        "📘 MiniDisk Commands".bright_cyan().bold(),
        "
  mkdisk  -size -path [-unit=K|M] [-fit=BF|FF|WF]     Create a virtual disk
  rmdisk  -path                                       Remove a virtual disk
  fdisk   -size -path -name [-unit=B|K|M] [-type=P|E|L] [-fit]
                                                      Create a partition
  mount   -path -name                                 Mount a partition
  unmount -id                                         Unmount a partition
  mounted                                             List mounted partitions
  mkfs    -id [-type=full] [-fs=2fs|3fs]              Format a mounted partition
  login   -user -pass -id                             Start a session
  logout                                              End the session
  mkgrp   -name / rmgrp -name                         Create / remove a group
  mkusr   -user -pass -grp / rmusr -user              Create / remove a user
  chgrp   -user -grp                                  Change a user's group
  help                                                Show this help message
  exit                                                Quit the shell
"
        .bright_black()
    )
}
