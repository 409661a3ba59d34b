use std::{collections::HashMap, path::PathBuf};

use crate::{
    config::{
        FDISK_DEFAULT_FIT, FDISK_DEFAULT_TYPE, FDISK_DEFAULT_UNIT, MKDISK_DEFAULT_FIT,
        MKDISK_DEFAULT_UNIT,
    },
    disk::{Fit, PartitionKind, PartitionRequest},
    error::{DiskError, Result},
    fs::super_block::FsType,
    shell::command::Command,
    utils::to_bytes,
};

/// 按空白切分，双引号内的空白保留
fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in input.chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if quoted {
        return Err(DiskError::Validation("unterminated quote".to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

/// `-key=value` 形式的参数，key 不区分大小写
struct Flags {
    command: String,
    values: HashMap<String, String>,
}

impl Flags {
    fn parse(command: &str, args: &[String], allowed: &[&str]) -> Result<Self> {
        let mut values = HashMap::new();
        for arg in args {
            let (key, value) = arg
                .strip_prefix('-')
                .and_then(|flag| flag.split_once('='))
                .ok_or_else(|| {
                    DiskError::Validation(format!("{}: malformed parameter '{}'", command, arg))
                })?;
            let key = key.to_ascii_lowercase();
            if !allowed.contains(&key.as_str()) {
                return Err(DiskError::Validation(format!(
                    "{}: unknown parameter -{}",
                    command, key
                )));
            }
            if value.is_empty() {
                return Err(DiskError::Validation(format!(
                    "{}: -{} cannot be empty",
                    command, key
                )));
            }
            if values.insert(key.clone(), value.to_string()).is_some() {
                return Err(DiskError::Validation(format!(
                    "{}: duplicated parameter -{}",
                    command, key
                )));
            }
        }
        Ok(Self {
            command: command.to_string(),
            values,
        })
    }

    fn required(&self, key: &str) -> Result<String> {
        self.values.get(key).cloned().ok_or_else(|| {
            DiskError::Validation(format!("{}: missing required parameter -{}", self.command, key))
        })
    }

    fn optional(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn size(&self) -> Result<i64> {
        let raw = self.required("size")?;
        match raw.parse::<i64>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(DiskError::Validation(format!(
                "{}: size must be a positive integer, got '{}'",
                self.command, raw
            ))),
        }
    }
}

fn no_args(command: &str, args: &[String], cmd: Command) -> Result<Command> {
    if !args.is_empty() {
        return Err(DiskError::Validation(format!("{} takes no parameters", command)));
    }
    Ok(cmd)
}

/// 解析一行命令；空行和 `#` 注释返回 `None`
pub fn parse_command(input: &str) -> Result<Option<Command>> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let tokens = tokenize(trimmed)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let cmd = tokens[0].to_ascii_lowercase();
    let args = &tokens[1..];

    let command = match cmd.as_str() {
        "help" => no_args(&cmd, args, Command::Help)?,
        "exit" => no_args(&cmd, args, Command::Exit)?,
        "mounted" => no_args(&cmd, args, Command::Mounted)?,
        "logout" => no_args(&cmd, args, Command::Logout)?,
        "mkdisk" => {
            let flags = Flags::parse(&cmd, args, &["size", "unit", "fit", "path"])?;
            let unit = flags.optional("unit", MKDISK_DEFAULT_UNIT).to_ascii_uppercase();
            if unit != "K" && unit != "M" {
                return Err(DiskError::Validation("mkdisk: unit must be K or M".to_string()));
            }
            Command::Mkdisk {
                size: to_bytes(flags.size()?, &unit)?,
                fit: Fit::parse(&flags.optional("fit", MKDISK_DEFAULT_FIT))?,
                path: PathBuf::from(flags.required("path")?),
            }
        }
        "rmdisk" => {
            let flags = Flags::parse(&cmd, args, &["path"])?;
            Command::Rmdisk {
                path: PathBuf::from(flags.required("path")?),
            }
        }
        "fdisk" => {
            let flags = Flags::parse(&cmd, args, &["size", "unit", "fit", "path", "type", "name"])?;
            let size = to_bytes(flags.size()?, &flags.optional("unit", FDISK_DEFAULT_UNIT))?;
            let kind = PartitionKind::parse(&flags.optional("type", FDISK_DEFAULT_TYPE))?;
            let fit = Fit::parse(&flags.optional("fit", FDISK_DEFAULT_FIT))?;
            Command::Fdisk {
                request: PartitionRequest::new(size, kind, fit, &flags.required("name")?),
                path: PathBuf::from(flags.required("path")?),
            }
        }
        "mount" => {
            let flags = Flags::parse(&cmd, args, &["path", "name"])?;
            Command::Mount {
                path: PathBuf::from(flags.required("path")?),
                name: flags.required("name")?,
            }
        }
        "unmount" => {
            let flags = Flags::parse(&cmd, args, &["id"])?;
            Command::Unmount {
                id: flags.required("id")?,
            }
        }
        "mkfs" => {
            let flags = Flags::parse(&cmd, args, &["id", "type", "fs"])?;
            if !flags.optional("type", "full").eq_ignore_ascii_case("full") {
                return Err(DiskError::Validation("mkfs: type must be full".to_string()));
            }
            Command::Mkfs {
                id: flags.required("id")?,
                fs: FsType::parse(&flags.optional("fs", "2fs"))?,
            }
        }
        "login" => {
            let flags = Flags::parse(&cmd, args, &["user", "pass", "id"])?;
            Command::Login {
                user: flags.required("user")?,
                pass: flags.required("pass")?,
                id: flags.required("id")?,
            }
        }
        "mkgrp" | "rmgrp" => {
            let flags = Flags::parse(&cmd, args, &["name"])?;
            let name = flags.required("name")?;
            if cmd == "mkgrp" {
                Command::Mkgrp { name }
            } else {
                Command::Rmgrp { name }
            }
        }
        "mkusr" => {
            let flags = Flags::parse(&cmd, args, &["user", "pass", "grp"])?;
            Command::Mkusr {
                user: flags.required("user")?,
                pass: flags.required("pass")?,
                grp: flags.required("grp")?,
            }
        }
        "rmusr" => {
            let flags = Flags::parse(&cmd, args, &["user"])?;
            Command::Rmusr {
                user: flags.required("user")?,
            }
        }
        "chgrp" => {
            let flags = Flags::parse(&cmd, args, &["user", "grp"])?;
            Command::Chgrp {
                user: flags.required("user")?,
                grp: flags.required("grp")?,
            }
        }
        other => {
            return Err(DiskError::Validation(format!("unknown command: {}", other)));
        }
    };
    Ok(Some(command))
}
