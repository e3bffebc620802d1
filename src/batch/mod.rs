//! # 批量处理模块
//!
//! 提供统一的逐材料批量处理能力。
//!
//! ## 功能
//! - 收集匹配文件列表，按文件名约定归组材料
//! - 并行处理，单个材料失败不中断整批
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被各命令模块使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::{FileCollector, MaterialCollector};
pub use runner::{BatchResult, BatchRunner, ProcessResult};
