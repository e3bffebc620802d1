//! # scrape 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/scrape/`

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    #[command(subcommand)]
    pub command: ScrapeCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScrapeCommands {
    /// Band gaps and band edges per spin channel -> CBM_VBM.csv
    Gaps(ScrapeCommon),

    /// Work function from POTC data -> WF.csv
    Wf(ScrapeCommon),

    /// Slab/bulk property comparison -> PROPERTIES.csv
    Props(ScrapeCommon),
}

#[derive(Args, Debug)]
pub struct ScrapeCommon {
    /// Directory containing the CRYSTAL output files
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Output CSV path (default: the standard file name inside --dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Print the resulting table to the terminal
    #[arg(long, default_value_t = false)]
    pub show: bool,
}
