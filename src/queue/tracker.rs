//! # 作业跟踪器
//!
//! 一个作业名任一时刻只属于 pending / submitted / completed 之一。
//! 每次改变状态后立即保存，进程中断最多丢失最后一次提交的记录。

use crate::batch::FileCollector;
use crate::error::Result;
use crate::models::jobs::JobStatus;
use crate::queue::scheduler::Scheduler;
use crate::queue::store::StatusStore;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 队列参数
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// 扫描 `.d12` 的根目录（递归）
    pub dir: PathBuf,
    /// 队列中允许的作业总数
    pub max_jobs: usize,
    /// 为其他作业保留的槽位
    pub reserve: usize,
    /// 本次最多提交数
    pub max_submit: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            max_jobs: 250,
            reserve: 30,
            max_submit: None,
        }
    }
}

/// 可提交数：空闲槽位不超过保留数时为 0，否则扣除保留数并受 `max_submit` 限制
pub fn available_slots(max_jobs: usize, live: usize, reserve: usize, max_submit: Option<usize>) -> usize {
    let free = max_jobs.saturating_sub(live);
    if free <= reserve {
        return 0;
    }
    let slots = free - reserve;
    match max_submit {
        Some(cap) => slots.min(cap),
        None => slots,
    }
}

/// 状态汇总
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSummary {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub total: usize,
    pub status_file: PathBuf,
}

/// 作业跟踪器
pub struct JobTracker<S: Scheduler> {
    config: QueueConfig,
    store: StatusStore,
    status: JobStatus,
    scheduler: S,
    /// 最近一次扫描找到的输入文件：作业名 → 所在目录
    decks: BTreeMap<String, PathBuf>,
}

impl<S: Scheduler> JobTracker<S> {
    /// 加载状态文件并创建跟踪器
    pub fn open(config: QueueConfig, mut store: StatusStore, scheduler: S) -> Self {
        let status = store.load();
        Self {
            config,
            store,
            status,
            scheduler,
            decks: BTreeMap::new(),
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// 扫描目录，把未记录的 `.d12` 加入 pending，返回新增数量
    pub fn scan(&mut self) -> Result<usize> {
        let files = FileCollector::new(&self.config.dir, "*.d12")?
            .recursive(true)
            .collect()?;

        self.decks.clear();
        for path in files {
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
            if let Some(previous) = self.decks.insert(name.clone(), dir) {
                log::warn!("duplicate job name '{}' (also in {})", name, previous.display());
            }
        }

        let mut added = 0;
        for name in self.decks.keys() {
            if !self.status.knows(name) {
                self.status.pending.push(name.clone());
                added += 1;
            }
        }
        if added > 0 {
            self.store.save(&self.status)?;
        }
        Ok(added)
    }

    /// 已提交但不在调度器中的作业移入 completed，返回这些作业名
    pub fn reconcile(&mut self) -> Result<Vec<String>> {
        if self.status.submitted.is_empty() {
            return Ok(Vec::new());
        }
        let live = self.scheduler.live_jobs()?;

        let finished: Vec<String> = self
            .status
            .submitted
            .iter()
            .filter(|(_, id)| !live.contains(*id))
            .map(|(name, _)| name.clone())
            .collect();

        for name in &finished {
            self.status.submitted.remove(name);
            if !self.status.completed.contains(name) {
                self.status.completed.push(name.clone());
            }
        }
        if !finished.is_empty() {
            self.store.save(&self.status)?;
        }
        Ok(finished)
    }

    /// 按容量提交 pending 作业，返回成功提交的作业名
    ///
    /// 提交失败的作业留在 pending，下次重试。
    pub fn submit(&mut self) -> Result<Vec<String>> {
        let live = self.scheduler.live_jobs()?.len();
        let capacity = available_slots(
            self.config.max_jobs,
            live,
            self.config.reserve,
            self.config.max_submit,
        );
        log::info!("{} live jobs, {} slots available", live, capacity);
        if capacity == 0 {
            return Ok(Vec::new());
        }

        // 仅提交输入文件仍存在的作业
        let candidates: Vec<(String, PathBuf)> = self
            .status
            .pending
            .iter()
            .filter_map(|name| self.decks.get(name).map(|dir| (name.clone(), dir.clone())))
            .take(capacity)
            .collect();

        let mut submitted = Vec::new();
        for (name, dir) in candidates {
            match self.scheduler.submit(&dir, &name) {
                Ok(id) => {
                    self.status.pending.retain(|n| n != &name);
                    self.status.submitted.insert(name.clone(), id);
                    self.store.save(&self.status)?;
                    submitted.push(name);
                }
                Err(e) => log::warn!("failed to submit {}: {}", name, e),
            }
        }
        Ok(submitted)
    }

    pub fn summary(&self) -> QueueSummary {
        QueueSummary {
            pending: self.status.pending.len(),
            running: self.status.submitted.len(),
            completed: self.status.completed.len(),
            total: self.status.total(),
            status_file: self.store.path().to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::scheduler::fake::FakeScheduler;
    use std::fs;

    fn setup(names: &[&str]) -> (tempfile::TempDir, QueueConfig, StatusStore) {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(format!("{}.d12", name)), "").unwrap();
        }
        let config = QueueConfig {
            dir: dir.path().to_path_buf(),
            max_jobs: 10,
            reserve: 2,
            max_submit: None,
        };
        let store = StatusStore::with_locations(&dir.path().join("status.json"), vec![]);
        (dir, config, store)
    }

    #[test]
    fn test_available_slots() {
        assert_eq!(available_slots(250, 100, 30, None), 120);
        assert_eq!(available_slots(250, 220, 30, None), 0);
        assert_eq!(available_slots(250, 300, 30, None), 0);
        assert_eq!(available_slots(250, 100, 30, Some(5)), 5);
        assert_eq!(available_slots(10, 7, 2, None), 1);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let (_dir, config, store) = setup(&["a", "b"]);
        let mut tracker = JobTracker::open(config, store, FakeScheduler::default());
        assert_eq!(tracker.scan().unwrap(), 2);
        assert_eq!(tracker.scan().unwrap(), 0);
        assert_eq!(tracker.status().pending, vec!["a", "b"]);
    }

    #[test]
    fn test_submit_respects_capacity_and_persists() {
        let (dir, config, store) = setup(&["a", "b", "c", "d", "e"]);
        let fake = FakeScheduler::default();
        fake.occupy(5);
        let mut tracker = JobTracker::open(config.clone(), store, fake);
        tracker.scan().unwrap();

        // 10 - 5 = 5 空闲，扣除保留 2 → 3
        let submitted = tracker.submit().unwrap();
        assert_eq!(submitted, vec!["a", "b", "c"]);
        assert_eq!(tracker.status().pending, vec!["d", "e"]);

        let reopened = JobTracker::open(
            config,
            StatusStore::with_locations(&dir.path().join("status.json"), vec![]),
            FakeScheduler::default(),
        );
        assert_eq!(reopened.status().submitted.len(), 3);
        assert!(!reopened.status().knows("f"));
    }

    #[test]
    fn test_reconcile_moves_finished_jobs() {
        let (_dir, config, store) = setup(&["a", "b"]);
        let mut tracker = JobTracker::open(config, store, FakeScheduler::default());
        tracker.scan().unwrap();
        tracker.submit().unwrap();
        let id_a = tracker.status().submitted["a"].clone();

        tracker.scheduler.finish(&id_a);
        assert_eq!(tracker.reconcile().unwrap(), vec!["a"]);
        assert_eq!(tracker.status().completed, vec!["a"]);
        assert!(tracker.status().submitted.contains_key("b"));

        // 已完成的作业不会因重新扫描回到 pending
        assert_eq!(tracker.scan().unwrap(), 0);
        let summary = tracker.summary();
        assert_eq!((summary.pending, summary.running, summary.completed, summary.total), (0, 1, 1, 2));
    }

    #[test]
    fn test_scheduler_outage_keeps_submitted() {
        let (_dir, config, store) = setup(&["a"]);
        let mut tracker = JobTracker::open(config, store, FakeScheduler::default());
        tracker.scan().unwrap();
        tracker.submit().unwrap();

        tracker.scheduler.offline.set(true);
        assert!(tracker.reconcile().is_err());
        assert_eq!(tracker.status().submitted.len(), 1);
        assert!(tracker.status().completed.is_empty());
    }

    #[test]
    fn test_rejected_submission_stays_pending() {
        let (_dir, config, store) = setup(&["a", "b"]);
        let mut fake = FakeScheduler::default();
        fake.rejects.insert("a".to_string());
        let mut tracker = JobTracker::open(config, store, fake);
        tracker.scan().unwrap();
        assert_eq!(tracker.submit().unwrap(), vec!["b"]);
        assert_eq!(tracker.status().pending, vec!["a"]);
    }

    #[test]
    fn test_pending_without_deck_is_not_submitted() {
        let (dir, config, store) = setup(&["a"]);
        let mut tracker = JobTracker::open(config, store, FakeScheduler::default());
        tracker.scan().unwrap();
        fs::remove_file(dir.path().join("a.d12")).unwrap();
        tracker.scan().unwrap();
        assert!(tracker.submit().unwrap().is_empty());
        assert_eq!(tracker.status().pending, vec!["a"]);
    }
}
