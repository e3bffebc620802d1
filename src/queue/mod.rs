//! # 作业队列跟踪模块
//!
//! 扫描目录中的 `.d12`，按集群容量分批提交，并持久化每个作业的状态。
//!
//! ## 功能
//! - `store`: JSON 状态文件的加载与原子保存（含备用位置）
//! - `scheduler`: 调度器接口与 Slurm 实现
//! - `tracker`: scan / reconcile / submit / summary
//!
//! 同一状态文件只允许一个进程写入，不支持并发调用。
//!
//! ## 依赖关系
//! - 被 `commands/jobs.rs` 使用
//! - 使用 `models/jobs.rs`, `utils/slurm.rs`, `batch/collector.rs`

pub mod scheduler;
pub mod store;
pub mod tracker;

pub use scheduler::{Scheduler, SlurmScheduler};
pub use store::StatusStore;
pub use tracker::{available_slots, JobTracker, QueueConfig, QueueSummary};
