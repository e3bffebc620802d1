//! # 终端输出
//!
//! 面向用户的结果行带彩色前缀写到标准输出，错误写到标准错误。
//! 逐材料的诊断信息走 `log`，由 `RUST_LOG` 控制。
//!
//! ## 依赖关系
//! - 被 `commands/`, `batch/runner.rs` 使用
//! - 使用 `colored` crate

use colored::{ColoredString, Colorize};

const RULE_WIDTH: usize = 60;

fn rule() -> ColoredString {
    "─".repeat(RULE_WIDTH).dimmed()
}

fn line(tag: ColoredString, msg: &str) {
    println!("{} {}", tag, msg);
}

pub fn print_success(msg: &str) {
    line("[OK]".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    line("[WARN]".yellow().bold(), msg);
}

pub fn print_info(msg: &str) {
    line("[*]".blue().bold(), msg);
}

/// 已存在或无需处理
pub fn print_skip(msg: &str) {
    line("[SKIP]".dimmed(), msg);
}

/// 一批处理的汇总
pub fn print_done(msg: &str) {
    line("[DONE]".green().bold(), msg);
}

/// 子命令标题
pub fn print_header(title: &str) {
    println!("\n{}", rule());
    println!("  {}", title.bold());
    println!("{}\n", rule());
}

pub fn print_separator() {
    println!("{}", rule());
}
