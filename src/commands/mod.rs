//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `models/`, `plot/`, `queue/`, `utils/`
//! - 子模块: convert, deck, scrape, plot, jobs

pub mod convert;
pub mod deck;
pub mod jobs;
pub mod plot;
pub mod scrape;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Convert(args) => convert::execute(args),
        Commands::Deck(args) => deck::execute(args),
        Commands::Scrape(args) => scrape::execute(args),
        Commands::Plot(args) => plot::execute(args),
        Commands::Jobs(args) => jobs::execute(args),
    }
}
