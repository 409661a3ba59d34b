pub mod command;
pub mod parse;

use crate::{
    config::Config,
    context::Context,
    error::DiskError,
    shell::{
        command::{execute_command, Command},
        parse::parse_command,
    },
};
use colored::*;
use crossterm::{
    cursor, execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use reedline::{DefaultPrompt, DefaultPromptSegment, FileBackedHistory, Reedline, Signal};
use std::{io::stdout, thread, time::Duration};

const COMMANDS: [&str; 16] = [
    "help", "exit", "mkdisk", "rmdisk", "fdisk", "mount", "unmount", "mounted", "mkfs", "login",
    "logout", "mkgrp", "rmgrp", "mkusr", "rmusr", "chgrp",
];

pub fn start_shell() {
    boot_animation();

    let config = Config::from_env();
    let username = whoami::username();
    let hostname = whoami::hostname();
    let mut ctx = Context::new(config.clone());

    println!(
        "{}",
        "Type 'help' for available commands. Use ↑↓ for history, Tab for auto-completion.\n"
            .bright_black()
    );

    // 初始化 reedline，历史记录不可用时退回无历史模式
    let mut line_editor = match FileBackedHistory::with_file(config.history_size, config.history_path.clone()) {
        Ok(history) => Reedline::create().with_history(Box::new(history)),
        Err(e) => {
            log::warn!("history disabled: {}", e);
            Reedline::create()
        }
    };

    // 命令补全
    let words = COMMANDS.iter().map(|c| c.to_string()).collect();
    let completer = reedline::DefaultCompleter::new_with_wordlen(words, 2);
    line_editor = line_editor.with_completer(Box::new(completer));

    loop {
        let left = match &ctx.session {
            Some(session) => format!("{}@{}", session.user, session.partition_id),
            None => format!("{}@{}", username, hostname),
        };
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic(left.green().bold().to_string()),
            DefaultPromptSegment::Basic("MiniDisk".bright_blue().bold().to_string()),
        );

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(buffer)) => {
                if !run_line(&buffer, &mut ctx, true) {
                    break;
                }
            }
            Ok(Signal::CtrlC) => {
                println!();
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("{}", "Exiting MiniDisk...".yellow());
                break;
            }
            Err(e) => {
                println!("Error reading line: {}", e);
                break;
            }
        }
    }

    println!("{}", "GoodBye!".bright_yellow());
}

/// 按行执行脚本文件
pub fn run_script(path: &str) {
    let script = match std::fs::read_to_string(path) {
        Ok(script) => script,
        Err(e) => {
            println!("{} {}", "❌ Error:".red().bold(), DiskError::from(e));
            return;
        }
    };

    let mut ctx = Context::new(Config::from_env());
    for line in script.lines() {
        if !line.trim().is_empty() {
            println!("{} {}", ">>>".bright_black(), line);
        }
        if !run_line(line, &mut ctx, false) {
            break;
        }
    }
}

/// 执行一行输入，返回是否继续
fn run_line(line: &str, ctx: &mut Context, interactive: bool) -> bool {
    let cmd = match parse_command(line) {
        Ok(Some(cmd)) => cmd,
        Ok(None) => return true,
        Err(e) => {
            print_error(&e);
            return true;
        }
    };

    if interactive {
        if let Command::Rmdisk { path } = &cmd {
            let confirmed = Confirm::new()
                .with_prompt(format!("Remove disk {}?", path.display()))
                .default(false)
                .interact()
                .unwrap_or(false);
            if !confirmed {
                println!("{}", "RMDISK cancelled".yellow());
                return true;
            }
        }
    }

    match execute_command(&cmd, ctx) {
        Ok(message) => println!("{}", message.green()),
        Err(e) => print_error(&e),
    }
    !matches!(cmd, Command::Exit)
}

fn print_error(e: &DiskError) {
    println!(
        "{} {}",
        format!("❌ {:?} error:", e.kind()).red().bold(),
        e
    );
}

/// 启动动画
fn boot_animation() {
    let mut stdout = stdout();

    let _ = execute!(stdout, Clear(ClearType::All), cursor::MoveTo(0, 0));
    println!("{}", "[MiniDisk Booting...]".bright_yellow().bold());

    let pb = ProgressBar::new(100);
    if let Ok(style) = ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos:>3}% {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }
    for i in 0..100 {
        pb.set_position(i);
        thread::sleep(Duration::from_millis(5));
    }
    pb.finish_with_message("✅ Ready!");

    let _ = execute!(
        stdout,
        Clear(ClearType::All),
        cursor::MoveTo(0, 0),
        SetForegroundColor(Color::Cyan),
        Print(format!("Welcome to MiniDisk v{}\n", env!("CARGO_PKG_VERSION"))),
        ResetColor
    );
}
