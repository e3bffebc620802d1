//! # Cryskit - CRYSTAL 计算辅助工具箱
//!
//! 将 CRYSTAL 计算前后处理的零散脚本用 Rust 重构，统一成单一可执行文件。
//!
//! ## 子命令
//! - `convert` - 结构与输入文件转换
//!   - `cif2d12` - CIF → `.d12`
//!   - `out2cif` - 日志 → CIF
//!   - `optimized` - 日志最终几何 → `.d12`
//! - `deck` - properties 输入 (`_BAND.d3`, `_TRANSPORT.d3`) 与 SHRINK 修正
//! - `scrape` - 带隙、功函数、平板/体相性质 → CSV
//! - `plot` - 能带、态密度、电荷密度图
//! - `jobs` - 日志分类与 Slurm 作业队列
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/     (逐材料批处理)
//!   │     ├── parsers/   (日志与输入文件解析)
//!   │     ├── models/    (数据模型)
//!   │     ├── plot/      (绘图)
//!   │     └── queue/     (作业跟踪)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod plot;
mod queue;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
