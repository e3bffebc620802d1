//! # convert 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/convert.rs`

use crate::models::options::{CalculationType, OptimizationType, ScfMethod};
use crate::models::Dimensionality;

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(subcommand)]
    pub command: ConvertCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConvertCommands {
    /// Generate .d12 input decks from CIF files
    Cif2d12(Cif2d12Args),

    /// Write P1 CIF files from the last geometry of CRYSTAL logs
    Out2cif(LogBatchArgs),

    /// Write {name}_optimized.d12 from finished optimisation logs
    Optimized(LogBatchArgs),
}

/// 维度（命令行形式）
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DimArg {
    Crystal,
    Slab,
    Polymer,
    Molecule,
}

impl From<DimArg> for Dimensionality {
    fn from(d: DimArg) -> Self {
        match d {
            DimArg::Crystal => Dimensionality::Crystal,
            DimArg::Slab => Dimensionality::Slab,
            DimArg::Polymer => Dimensionality::Polymer,
            DimArg::Molecule => Dimensionality::Molecule,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum CalcArg {
    Sp,
    Opt,
    Freq,
}

impl From<CalcArg> for CalculationType {
    fn from(c: CalcArg) -> Self {
        match c {
            CalcArg::Sp => CalculationType::Sp,
            CalcArg::Opt => CalculationType::Opt,
            CalcArg::Freq => CalculationType::Freq,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OptArg {
    Fulloptg,
    Cvolopt,
    Cellonly,
    Atomonly,
}

impl From<OptArg> for OptimizationType {
    fn from(o: OptArg) -> Self {
        match o {
            OptArg::Fulloptg => OptimizationType::Fulloptg,
            OptArg::Cvolopt => OptimizationType::Cvolopt,
            OptArg::Cellonly => OptimizationType::Cellonly,
            OptArg::Atomonly => OptimizationType::Atomonly,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ScfArg {
    Diis,
    Anderson,
    Broyden,
}

impl From<ScfArg> for ScfMethod {
    fn from(s: ScfArg) -> Self {
        match s {
            ScfArg::Diis => ScfMethod::Diis,
            ScfArg::Anderson => ScfMethod::Anderson,
            ScfArg::Broyden => ScfMethod::Broyden,
        }
    }
}

/// cif2d12 参数；命令行选项覆盖 `--options` 文件中的同名字段
#[derive(Args, Debug)]
pub struct Cif2d12Args {
    /// Directory containing CIF files
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Glob pattern for input files (comma-separated)
    #[arg(long, default_value = "*.cif")]
    pub pattern: String,

    /// Output directory (default: next to each CIF)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Load deck options from a JSON file
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Save the effective deck options to a JSON file
    #[arg(long)]
    pub save_options: Option<PathBuf>,

    /// Dimensionality of the system
    #[arg(long, value_enum)]
    pub dimensionality: Option<DimArg>,

    /// Calculation type
    #[arg(long, value_enum)]
    pub calculation: Option<CalcArg>,

    /// Optimisation type (OPT only)
    #[arg(long, value_enum)]
    pub optimization: Option<OptArg>,

    /// Exchange-correlation functional (e.g. B3LYP, PBE0, HSE06)
    #[arg(long)]
    pub functional: Option<String>,

    /// Add Grimme -D3 dispersion where available
    #[arg(long, default_value_t = false)]
    pub dispersion: bool,

    /// Spin-polarised calculation
    #[arg(long, default_value_t = false)]
    pub spin: bool,

    /// Directory with per-element external basis files (named by atomic number)
    #[arg(long, conflicts_with = "basis_set")]
    pub basis_dir: Option<PathBuf>,

    /// Internal basis set name (e.g. POB-TZVP-REV2)
    #[arg(long)]
    pub basis_set: Option<String>,

    /// DFT integration grid (DEFAULT writes no grid keyword)
    #[arg(long)]
    pub grid: Option<String>,

    /// SCF convergence method
    #[arg(long, value_enum)]
    pub scf: Option<ScfArg>,

    /// Fermi smearing width in Hartree
    #[arg(long)]
    pub smear: Option<f64>,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}

/// 以日志为对象的批量命令参数
#[derive(Args, Debug)]
pub struct LogBatchArgs {
    /// Directory containing CRYSTAL .out logs
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
