//! # 批量执行器
//!
//! 并行执行逐材料任务，单个材料失败不影响其余材料。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，结果保持输入顺序
//! - 进度条显示
//! - 错误收集与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::utils::{output, progress};

use rayon::prelude::*;

/// 单个任务处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 处理成功
    Success(String),
    /// 跳过（如输出已存在、缺少可选文件）
    Skipped(String),
    /// 处理失败
    Failed(String, String), // (材料/文件, 错误信息)
}

impl ProcessResult {
    pub fn failed(item: &str, err: impl std::fmt::Display) -> Self {
        ProcessResult::Failed(item.to_string(), err.to_string())
    }
}

/// 批量处理结果统计
#[derive(Debug, Default)]
pub struct BatchResult {
    /// 成功数量
    pub success: usize,
    /// 跳过数量
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 失败详情
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    /// 合并处理结果
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(_) => self.success += 1,
            ProcessResult::Skipped(_) => self.skipped += 1,
            ProcessResult::Failed(item, err) => {
                self.failed += 1;
                self.failures.push((item, err));
            }
        }
    }

    /// 总处理数量
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }

    /// 打印失败详情与汇总
    pub fn report(&self, what: &str) {
        for (item, err) in &self.failures {
            output::print_error(&format!("{}: {}", item, err));
        }
        output::print_done(&format!(
            "{} {} processed: {} ok, {} skipped, {} failed",
            self.total(),
            what,
            self.success,
            self.skipped,
            self.failed
        ));
    }
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    message: String,
}

impl BatchRunner {
    /// 创建批量执行器，`jobs == 0` 时使用全部 CPU
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            message: "Processing".to_string(),
        }
    }

    pub fn with_message(mut self, message: &str) -> Self {
        self.message = message.to_string();
        self
    }

    /// 并行处理，只统计结果
    pub fn run<T, F>(&self, items: &[T], processor: F) -> BatchResult
    where
        T: Sync,
        F: Fn(&T) -> ProcessResult + Sync + Send,
    {
        let (_, result) = self.collect::<T, (), _>(items, |item| (processor(item), None));
        result
    }

    /// 并行处理并收集每项的产出（按输入顺序）
    ///
    /// 处理函数可以在失败时仍返回部分产出，例如缺列的 CSV 行。
    pub fn collect<T, R, F>(&self, items: &[T], processor: F) -> (Vec<R>, BatchResult)
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> (ProcessResult, Option<R>) + Sync + Send,
    {
        let pb = progress::create_progress_bar(items.len() as u64, &self.message);

        let work = || -> Vec<(ProcessResult, Option<R>)> {
            items
                .par_iter()
                .map(|item| {
                    let outcome = processor(item);
                    pb.inc(1);
                    outcome
                })
                .collect()
        };

        let outcomes = match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!("thread pool unavailable ({}), using global pool", e);
                work()
            }
        };

        pb.finish_and_clear();

        let mut batch_result = BatchResult::default();
        let mut products = Vec::new();
        for (result, product) in outcomes {
            batch_result.merge(result);
            products.extend(product);
        }
        (products, batch_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_isolated_and_order_kept() {
        let items: Vec<u32> = (0..20).collect();
        let runner = BatchRunner::new(4);
        let (squares, result) = runner.collect(&items, |&n| {
            if n % 5 == 0 {
                (ProcessResult::failed(&n.to_string(), "boom"), None)
            } else {
                (ProcessResult::Success(n.to_string()), Some(n * n))
            }
        });
        assert_eq!(result.failed, 4);
        assert_eq!(result.success, 16);
        assert_eq!(result.total(), 20);
        assert_eq!(squares[0], 1);
        assert!(squares.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_run_counts_skips() {
        let items = vec!["a", "b", "c"];
        let result = BatchRunner::new(1).run(&items, |s| {
            if *s == "b" {
                ProcessResult::Skipped(s.to_string())
            } else {
                ProcessResult::Success(s.to_string())
            }
        });
        assert_eq!((result.success, result.skipped, result.failed), (2, 1, 0));
    }
}
