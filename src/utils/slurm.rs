//! # Slurm 工具
//!
//! 生成 CRYSTAL 作业的 sbatch 脚本，封装 `squeue`/`sbatch` 等外部命令调用。
//!
//! ## 依赖关系
//! - 被 `queue/scheduler.rs` 使用
//! - 使用 `regex` 解析提交输出

use crate::error::{CryskitError, Result};

use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

/// Slurm 作业配置
#[derive(Debug, Clone)]
pub struct SlurmConfig {
    pub partition: Option<String>,
    pub nodes: u32,
    pub ntasks: u32,
    pub mem_per_cpu: String,
    pub time_limit: String,
    pub modules: Vec<String>,
    /// 并行版 CRYSTAL 可执行文件
    pub executable: String,
}

impl Default for SlurmConfig {
    fn default() -> Self {
        SlurmConfig {
            partition: None,
            nodes: 1,
            ntasks: 32,
            mem_per_cpu: "5G".to_string(),
            time_limit: "7-00:00:00".to_string(),
            modules: vec!["CRYSTAL/23".to_string()],
            executable: "Pcrystal".to_string(),
        }
    }
}

/// 生成 CRYSTAL 作业 sbatch 脚本
///
/// 在临时目录中以 INPUT 运行，结束后取回 `.out` 与 `fort.9`（重命名为 `.f9`）。
pub fn generate_crystal_script(config: &SlurmConfig, workdir: &Path, name: &str) -> String {
    let module_loads = config
        .modules
        .iter()
        .map(|m| format!("module load {}", m))
        .collect::<Vec<_>>()
        .join("\n");
    let partition = config
        .partition
        .as_ref()
        .map(|p| format!("#SBATCH --partition {}\n", p))
        .unwrap_or_default();

    format!(
        r#"#!/bin/bash
{partition}#SBATCH --nodes={nodes}
#SBATCH --ntasks={ntasks}
#SBATCH --mem-per-cpu {mem}
#SBATCH --time {time}
#SBATCH -J {name}
#SBATCH -o {name}.o%j

set -euo pipefail

module purge 2>&1
{modules}

WORKDIR="{workdir}"
SCRATCH="${{TMPDIR:-/tmp}}/{name}_$SLURM_JOB_ID"
mkdir -p "$SCRATCH"
cp "$WORKDIR/{name}.d12" "$SCRATCH/INPUT"
if [ -f "$WORKDIR/{name}.f9" ]; then cp "$WORKDIR/{name}.f9" "$SCRATCH/fort.20"; fi

cd "$SCRATCH"
srun {exe} > "$WORKDIR/{name}.out" 2>&1 || true

if [ -f fort.9 ]; then cp fort.9 "$WORKDIR/{name}.f9"; fi
rm -rf "$SCRATCH"
"#,
        partition = partition,
        nodes = config.nodes,
        ntasks = config.ntasks,
        mem = config.mem_per_cpu,
        time = config.time_limit,
        name = name,
        modules = module_loads,
        workdir = workdir.display(),
        exe = config.executable,
    )
}

/// 运行外部命令并返回标准输出
pub fn run_command(program: &str, args: &[&str], dir: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }
    log::debug!("running {} {}", program, args.join(" "));

    let out = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CryskitError::CommandNotFound {
                command: program.to_string(),
            }
        } else {
            CryskitError::CommandFailed {
                command: program.to_string(),
                stderr: e.to_string(),
            }
        }
    })?;

    if !out.status.success() {
        return Err(CryskitError::CommandFailed {
            command: format!("{} {}", program, args.join(" ")),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// 从 `Submitted batch job 12345` 提取作业号
pub fn parse_job_id(output: &str) -> Option<String> {
    static SUBMITTED: OnceLock<Option<Regex>> = OnceLock::new();
    let re = SUBMITTED
        .get_or_init(|| Regex::new(r"Submitted batch job\s+(\S+)").ok())
        .as_ref()?;
    re.captures_iter(output)
        .last()
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// squeue 输出中的作业号，每行一个
pub fn parse_job_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| l.split_whitespace().next().unwrap_or(l).to_string())
        .collect()
}
