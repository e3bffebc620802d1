//! # plot 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/plot.rs`

use crate::plot::ImageFormat;

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct PlotArgs {
    #[command(subcommand)]
    pub command: PlotCommands,
}

#[derive(Subcommand, Debug)]
pub enum PlotCommands {
    /// Band structure from {name}_BAND.BAND.dat
    Bands(EnergyPlotArgs),

    /// Total and projected DOS from {name}_DOSS.DOSS.dat
    Dos(DosArgs),

    /// Charge density heat map from {name}.f25
    Charge(PlotCommon),

    /// Bands and DOS side by side
    Overview(EnergyPlotArgs),
}

#[derive(Args, Debug)]
pub struct PlotCommon {
    /// Directory containing the data files
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Image format
    #[arg(short, long, value_enum, default_value = "png")]
    pub format: ImageFormat,

    /// Figure width in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 1000)]
    pub width: u32,

    /// Figure height in pixels (for PNG) or points (for SVG)
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Overwrite existing images
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

#[derive(Args, Debug)]
pub struct EnergyPlotArgs {
    #[command(flatten)]
    pub common: PlotCommon,

    /// Lower energy bound relative to the Fermi level (eV)
    #[arg(long, default_value_t = -5.0, allow_hyphen_values = true)]
    pub emin: f64,

    /// Upper energy bound relative to the Fermi level (eV)
    #[arg(long, default_value_t = 5.0, allow_hyphen_values = true)]
    pub emax: f64,

    /// Ignore POTC files and keep energies relative to the Fermi level
    #[arg(long, default_value_t = false)]
    pub no_vacuum: bool,
}

#[derive(Args, Debug)]
pub struct DosArgs {
    #[command(flatten)]
    pub energy: EnergyPlotArgs,

    /// Plot only the total DOS
    #[arg(long, default_value_t = false)]
    pub total_only: bool,
}
