//! # deck 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/deck.rs`

use super::convert::LogBatchArgs;

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct DeckArgs {
    #[command(subcommand)]
    pub command: DeckCommands,
}

#[derive(Subcommand, Debug)]
pub enum DeckCommands {
    /// Write {name}_BAND.d3 band-structure decks from SCF logs
    Band(BandArgs),

    /// Write {name}_TRANSPORT.d3 BOLTZTRA decks from SCF logs
    Transport(LogBatchArgs),

    /// Replace anisotropic SHRINK lines in .d12 decks with the smallest k
    FixShrink(FixShrinkArgs),
}

#[derive(Args, Debug)]
pub struct BandArgs {
    #[command(flatten)]
    pub batch: LogBatchArgs,

    /// Directory with band path templates ({System}-{Centering}.d3) overriding the built-in paths
    #[arg(long)]
    pub template_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FixShrinkArgs {
    /// Directory searched recursively for .d12 decks
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Only report the decks that would change
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}
