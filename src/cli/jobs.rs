//! # jobs 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/jobs.rs`

use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct JobsArgs {
    #[command(subcommand)]
    pub command: JobsCommands,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommands {
    /// Sort .out logs into {category}_list.csv files by error pattern and completion
    Categorize(CategorizeArgs),

    /// Move the .sh/.out/.d12/.f9 files of one category into another directory
    Move(MoveArgs),

    /// Scan for .d12 decks, reconcile finished jobs and submit up to capacity.
    /// Only one invocation may run against a status file at a time.
    Queue(QueueArgs),
}

#[derive(Args, Debug)]
pub struct CategorizeArgs {
    /// Directory containing CRYSTAL .out logs
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Directory for the *_list.csv files (default: --dir)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Recurse into subdirectories
    #[arg(long, default_value_t = false)]
    pub recursive: bool,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Category name (e.g. complete, too_many_scf, memory)
    pub category: String,

    /// Destination directory (created if missing)
    pub dest: PathBuf,

    /// Directory containing the job files and the *_list.csv files
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct QueueArgs {
    /// Directory searched recursively for .d12 decks
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Maximum number of jobs in the queue
    #[arg(long, env = "CRYSKIT_MAX_JOBS", default_value_t = 250)]
    pub max_jobs: usize,

    /// Queue slots kept free for other work
    #[arg(long, env = "CRYSKIT_RESERVE", default_value_t = 30)]
    pub reserve: usize,

    /// Upper bound on submissions per invocation
    #[arg(long, env = "CRYSKIT_MAX_SUBMIT")]
    pub max_submit: Option<usize>,

    /// Status file (default: crystal_job_status.json inside --dir)
    #[arg(long, env = "CRYSKIT_STATUS_FILE")]
    pub status_file: Option<PathBuf>,

    /// Submit script called as `<script> <name>` from the job directory
    #[arg(long, env = "CRYSKIT_SUBMIT_SCRIPT")]
    pub submit_script: Option<PathBuf>,

    /// Slurm user whose jobs are counted (default: $USER)
    #[arg(long, env = "CRYSKIT_USER")]
    pub user: Option<String>,

    /// Only print the current status, do not scan or submit
    #[arg(long, default_value_t = false)]
    pub status: bool,

    // ─────────────────────────────────────────────────────────────
    // 生成的 sbatch 脚本（未指定 --submit-script 时）
    // ─────────────────────────────────────────────────────────────
    /// Slurm partition
    #[arg(long)]
    pub partition: Option<String>,

    /// Number of tasks
    #[arg(long, default_value_t = 32)]
    pub ntasks: u32,

    /// Memory per CPU
    #[arg(long, default_value = "5G")]
    pub mem_per_cpu: String,

    /// Time limit
    #[arg(long, default_value = "7-00:00:00")]
    pub time: String,

    /// Modules to load (comma-separated)
    #[arg(long, default_value = "CRYSTAL/23")]
    pub modules: String,

    /// CRYSTAL executable
    #[arg(long, default_value = "Pcrystal")]
    pub executable: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct JobsCli {
        #[command(subcommand)]
        command: JobsCommands,
    }

    #[test]
    fn test_move_takes_positional_category_and_dest() {
        let cli = JobsCli::try_parse_from(["jobs", "move", "complete", "done"]).unwrap();
        match cli.command {
            JobsCommands::Move(args) => {
                assert_eq!(args.category, "complete");
                assert_eq!(args.dest, PathBuf::from("done"));
                assert_eq!(args.dir, PathBuf::from("."));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(JobsCli::try_parse_from(["jobs", "move", "--category", "complete"]).is_err());
    }
}
