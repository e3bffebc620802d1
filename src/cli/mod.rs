//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `convert`: 几何 / 输入文件转换 (cif2d12, out2cif, optimized)
//! - `deck`: 辅助 .d3 生成与 .d12 维护 (band, transport, fix-shrink)
//! - `scrape`: 日志提取写 CSV (gaps, wf, props)
//! - `plot`: 绘图 (bands, dos, charge, overview)
//! - `jobs`: 日志分类与作业队列 (categorize, move, queue)
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: convert, deck, scrape, plot, jobs

pub mod convert;
pub mod deck;
pub mod jobs;
pub mod plot;
pub mod scrape;

use clap::{Parser, Subcommand};

/// Cryskit - CRYSTAL 计算辅助工具箱
#[derive(Parser)]
#[command(name = "cryskit")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "A unified toolkit for CRYSTAL input generation, log scraping, plotting and job tracking", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Convert between CIF, CRYSTAL logs and .d12 input decks
    Convert(convert::ConvertArgs),

    /// Generate band/transport .d3 decks and fix existing .d12 decks
    Deck(deck::DeckArgs),

    /// Scrape CRYSTAL logs into CSV tables
    Scrape(scrape::ScrapeArgs),

    /// Plot bands, DOS and charge density
    Plot(plot::PlotArgs),

    /// Categorize logs and manage the Slurm job queue
    Jobs(jobs::JobsArgs),
}
