//! # 工具函数模块
//!
//! 提供美化输出、进度条、Slurm 脚本生成与外部命令调用等工具。
//!
//! ## 依赖关系
//! - 被 `commands/`, `queue/` 使用
//! - 子模块: output, progress, slurm

pub mod output;
pub mod progress;
pub mod slurm;
