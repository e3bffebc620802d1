//! # 调度器接口
//!
//! 跟踪器只需要两件事：当前排队/运行中的作业号集合，以及提交一个作业并拿到作业号。

use crate::error::{CryskitError, Result};
use crate::utils::slurm::{self, SlurmConfig};

use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub trait Scheduler {
    /// 当前用户所有排队或运行中的作业号
    fn live_jobs(&self) -> Result<HashSet<String>>;

    /// 提交 `dir` 中名为 `name` 的作业，返回作业号
    fn submit(&self, dir: &Path, name: &str) -> Result<String>;
}

/// Slurm 调度器
#[derive(Debug, Clone)]
pub struct SlurmScheduler {
    user: String,
    /// 提交脚本，以 `<script> <name>` 调用；缺省时生成 sbatch 脚本
    script: Option<PathBuf>,
    config: SlurmConfig,
}

impl SlurmScheduler {
    pub fn new(user: impl Into<String>, script: Option<PathBuf>, config: SlurmConfig) -> Self {
        Self {
            user: user.into(),
            script,
            config,
        }
    }

    /// 从 `$USER` (或 `$LOGNAME`) 取用户名
    pub fn current_user() -> Result<String> {
        std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .map_err(|_| CryskitError::InvalidArgument("neither USER nor LOGNAME is set".to_string()))
    }

    fn job_id(output: &str) -> Result<String> {
        slurm::parse_job_id(output).ok_or_else(|| CryskitError::CommandFailed {
            command: "submit".to_string(),
            stderr: format!("unexpected submit output: {}", output.trim()),
        })
    }
}

impl Scheduler for SlurmScheduler {
    fn live_jobs(&self) -> Result<HashSet<String>> {
        let out = slurm::run_command("squeue", &["-u", &self.user, "-h", "--format=%i"], None)?;
        Ok(slurm::parse_job_ids(&out).into_iter().collect())
    }

    fn submit(&self, dir: &Path, name: &str) -> Result<String> {
        let out = match &self.script {
            Some(script) => {
                // 相对路径的脚本位于作业目录
                let script = if script.is_absolute() {
                    script.clone()
                } else {
                    dir.join(script)
                };
                let program = script.display().to_string();
                slurm::run_command(&program, &[name], Some(dir))?
            }
            None => {
                let script = dir.join(format!("{}.sbatch", name));
                let body = slurm::generate_crystal_script(&self.config, dir, name);
                crate::error::write_string(&script, &body)?;
                let script = script.display().to_string();
                slurm::run_command("sbatch", &[&script], Some(dir))?
            }
        };
        Self::job_id(&out)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_output_is_error() {
        assert!(SlurmScheduler::job_id("nothing here").is_err());
        assert_eq!(SlurmScheduler::job_id("Submitted batch job 9").unwrap(), "9");
    }
}
