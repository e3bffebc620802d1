//! # jobs 命令实现
//!
//! ## 功能
//! - `categorize`: 按错误关键字与结束标记把 `.out` 日志分类，写出 `{category}_list.csv`
//! - `move`: 把某一类的作业文件移到其他目录
//! - `queue`: 扫描、回收、按容量提交 Slurm 作业
//!
//! ## 依赖关系
//! - 使用 `cli/jobs.rs` 定义的参数
//! - 使用 `parsers/status.rs`, `queue/`, `utils/slurm.rs`

use crate::batch::FileCollector;
use crate::cli::jobs::{CategorizeArgs, JobsArgs, JobsCommands, MoveArgs, QueueArgs};
use crate::error::{create_dir, read_lossy, write_error, CryskitError, Result};
use crate::parsers::status::{categorize, Category};
use crate::queue::store::DEFAULT_STATUS_FILE;
use crate::queue::{JobTracker, QueueConfig, QueueSummary, Scheduler, SlurmScheduler, StatusStore};
use crate::utils::output;
use crate::utils::progress;
use crate::utils::slurm::SlurmConfig;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 列表文件的列名
const LIST_COLUMN: &str = "data_files";

/// 随作业移动的文件后缀
const JOB_EXTENSIONS: [&str; 4] = ["sh", "out", "d12", "f9"];

/// 执行 jobs 命令
pub fn execute(args: JobsArgs) -> Result<()> {
    match args.command {
        JobsCommands::Categorize(args) => categorize_logs(&args),
        JobsCommands::Move(args) => move_category(&args),
        JobsCommands::Queue(args) => queue(&args),
    }
}

fn list_path(dir: &Path, category: Category) -> PathBuf {
    dir.join(format!("{}_list.csv", category.name()))
}

// ─────────────────────────────────────────────────────────────
// categorize
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Tabled)]
struct CategoryRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Jobs")]
    count: usize,
}

/// 把日志按类别分组；值为相对 `dir` 去掉扩展名的路径
pub fn group_logs(dir: &Path, recursive: bool) -> Result<BTreeMap<Category, Vec<String>>> {
    let files = FileCollector::new(dir, "*.out")?.recursive(recursive).collect()?;
    let mut groups: BTreeMap<Category, Vec<String>> = BTreeMap::new();
    for path in files {
        let text = match read_lossy(&path) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("{}", e);
                continue;
            }
        };
        let stem = path.with_extension("");
        let stem = stem.strip_prefix(dir).unwrap_or(&stem);
        groups
            .entry(categorize(&text))
            .or_default()
            .push(stem.display().to_string());
    }
    Ok(groups)
}

/// 每个类别写一个单列 CSV，空类别只有表头
pub fn write_lists(out_dir: &Path, groups: &BTreeMap<Category, Vec<String>>) -> Result<()> {
    for category in Category::ALL {
        let mut wtr = csv::Writer::from_path(list_path(out_dir, category))?;
        wtr.write_record([LIST_COLUMN])?;
        for stem in groups.get(&category).into_iter().flatten() {
            wtr.write_record([stem])?;
        }
        wtr.flush().map_err(|e| write_error(&list_path(out_dir, category), e))?;
    }
    Ok(())
}

fn categorize_logs(args: &CategorizeArgs) -> Result<()> {
    output::print_header("Categorizing CRYSTAL logs");
    let groups = group_logs(&args.dir, args.recursive)?;
    if groups.is_empty() {
        output::print_warning(&format!("No .out logs found under {}", args.dir.display()));
        return Ok(());
    }

    let out_dir = args.output.as_deref().unwrap_or(args.dir.as_path());
    create_dir(out_dir)?;
    write_lists(out_dir, &groups)?;

    let rows: Vec<CategoryRow> = groups
        .iter()
        .map(|(c, stems)| CategoryRow {
            category: c.name().to_string(),
            count: stems.len(),
        })
        .collect();
    println!("{}", Table::new(&rows));
    let failed: usize = groups
        .iter()
        .filter(|(c, _)| c.is_error())
        .map(|(_, stems)| stems.len())
        .sum();
    if failed > 0 {
        output::print_warning(&format!("{} jobs ended with errors", failed));
    }
    output::print_success(&format!("Lists written to '{}'", out_dir.display()));
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// move
// ─────────────────────────────────────────────────────────────

/// 读取 `{category}_list.csv` 中的作业路径
pub fn read_list(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(CryskitError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut stems = Vec::new();
    for record in rdr.records() {
        if let Some(stem) = record?.get(0).filter(|s| !s.is_empty()) {
            stems.push(stem.to_string());
        }
    }
    Ok(stems)
}

/// 移动一个作业的全部文件，返回 (已移动, 不存在) 数量
fn move_job(dir: &Path, stem: &str, dest: &Path) -> Result<(usize, usize)> {
    let (mut moved, mut missing) = (0, 0);
    for ext in JOB_EXTENSIONS {
        let source = dir.join(format!("{}.{}", stem, ext));
        if !source.is_file() {
            missing += 1;
            continue;
        }
        let target = match source.file_name() {
            Some(name) => dest.join(name),
            None => continue,
        };
        std::fs::rename(&source, &target).map_err(|e| write_error(&target, e))?;
        moved += 1;
    }
    Ok((moved, missing))
}

fn move_category(args: &MoveArgs) -> Result<()> {
    let category = Category::from_name(&args.category).ok_or_else(|| {
        let names: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
        CryskitError::InvalidArgument(format!(
            "unknown category '{}' (expected one of: {})",
            args.category,
            names.join(", ")
        ))
    })?;
    output::print_header(&format!("Moving '{}' jobs", category));

    let stems = read_list(&list_path(&args.dir, category))?;
    create_dir(&args.dest)?;

    let mut total = 0;
    for stem in &stems {
        let (moved, missing) = move_job(&args.dir, stem, &args.dest)?;
        if moved == 0 {
            output::print_skip(&format!("{}: no job files found", stem));
            continue;
        }
        if missing > 0 {
            log::info!("{}: {} of {} job files absent", stem, missing, JOB_EXTENSIONS.len());
        }
        total += moved;
    }
    output::print_done(&format!(
        "{} files of {} jobs moved to '{}'",
        total,
        stems.len(),
        args.dest.display()
    ));
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// queue
// ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Pending")]
    pending: usize,
    #[tabled(rename = "Submitted")]
    running: usize,
    #[tabled(rename = "Completed")]
    completed: usize,
    #[tabled(rename = "Total")]
    total: usize,
}

fn slurm_config(args: &QueueArgs) -> SlurmConfig {
    SlurmConfig {
        partition: args.partition.clone(),
        ntasks: args.ntasks,
        mem_per_cpu: args.mem_per_cpu.clone(),
        time_limit: args.time.clone(),
        modules: args
            .modules
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .collect(),
        executable: args.executable.clone(),
        ..SlurmConfig::default()
    }
}

/// 一轮 scan → reconcile → submit
pub fn queue_round<S: Scheduler>(tracker: &mut JobTracker<S>) -> Result<QueueSummary> {
    let spinner = progress::create_spinner("Scanning for .d12 decks...");
    let added = tracker.scan()?;
    spinner.set_message("Checking the Slurm queue...");
    let finished = tracker.reconcile()?;
    spinner.set_message("Submitting jobs...");
    let submitted = tracker.submit()?;
    spinner.finish_and_clear();

    if added > 0 {
        output::print_info(&format!("{} new decks queued", added));
    }
    for name in &finished {
        output::print_done(name);
    }
    for name in &submitted {
        output::print_success(&format!("Submitted {}", name));
    }
    Ok(tracker.summary())
}

fn print_summary(summary: &QueueSummary) {
    let row = SummaryRow {
        pending: summary.pending,
        running: summary.running,
        completed: summary.completed,
        total: summary.total,
    };
    output::print_separator();
    println!("{}", Table::new([row]));
    output::print_info(&format!("Status file: {}", summary.status_file.display()));
}

fn queue(args: &QueueArgs) -> Result<()> {
    output::print_header("CRYSTAL job queue");
    let status_file = args
        .status_file
        .clone()
        .unwrap_or_else(|| args.dir.join(DEFAULT_STATUS_FILE));
    let user = match (&args.user, args.status) {
        (Some(user), _) => user.clone(),
        (None, true) => String::new(),
        (None, false) => SlurmScheduler::current_user()?,
    };
    let config = QueueConfig {
        dir: args.dir.clone(),
        max_jobs: args.max_jobs,
        reserve: args.reserve,
        max_submit: args.max_submit,
    };
    let scheduler = SlurmScheduler::new(user, args.submit_script.clone(), slurm_config(args));
    let mut tracker = JobTracker::open(config, StatusStore::new(&status_file), scheduler);

    let summary = if args.status {
        tracker.summary()
    } else {
        queue_round(&mut tracker)?
    };
    print_summary(&summary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::scheduler::fake::FakeScheduler;
    use std::fs;

    #[test]
    fn test_categorize_and_move() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        fs::write(p.join("MgO.out"), " * OPT END - CONVERGED\n").unwrap();
        fs::write(p.join("MgO.d12"), "deck").unwrap();
        fs::write(p.join("MgO.f9"), "wf").unwrap();
        fs::write(p.join("CaO.out"), " TOO MANY CYCLES\n").unwrap();
        fs::write(p.join("SrO.out"), " CYC 3\n").unwrap();

        let groups = group_logs(p, false).unwrap();
        assert_eq!(groups[&Category::Complete], vec!["MgO".to_string()]);
        assert_eq!(groups[&Category::TooManyScf], vec!["CaO".to_string()]);
        assert_eq!(groups[&Category::Ongoing], vec!["SrO".to_string()]);

        write_lists(p, &groups).unwrap();
        assert_eq!(fs::read_to_string(p.join("complete_list.csv")).unwrap(), "data_files\nMgO\n");
        assert_eq!(read_list(&p.join("memory_list.csv")).unwrap(), Vec::<String>::new());

        let dest = p.join("done");
        move_category(&MoveArgs {
            category: "complete".to_string(),
            dest: dest.clone(),
            dir: p.to_path_buf(),
        })
        .unwrap();
        assert!(dest.join("MgO.out").exists() && dest.join("MgO.d12").exists() && dest.join("MgO.f9").exists());
        assert!(!p.join("MgO.out").exists());
        assert!(p.join("CaO.out").exists());
    }

    #[test]
    fn test_invalid_utf8_log_is_categorized() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.out"), b"\xff\xfe junk\n TOO MANY CYCLES\n").unwrap();

        let groups = group_logs(dir.path(), false).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&Category::TooManyScf], vec!["bad".to_string()]);
    }

    #[test]
    fn test_move_rejects_unknown_category() {
        let dir = tempfile::tempdir().unwrap();
        let err = move_category(&MoveArgs {
            category: "finished".to_string(),
            dest: dir.path().join("x"),
            dir: dir.path().to_path_buf(),
        })
        .unwrap_err();
        assert!(matches!(err, CryskitError::InvalidArgument(_)));
    }

    #[test]
    fn test_slurm_config_modules() {
        let args = QueueArgs {
            dir: PathBuf::from("."),
            max_jobs: 250,
            reserve: 30,
            max_submit: None,
            status_file: None,
            submit_script: None,
            user: None,
            status: true,
            partition: Some("short".to_string()),
            ntasks: 16,
            mem_per_cpu: "4G".to_string(),
            time: "1:00:00".to_string(),
            modules: "CRYSTAL/23, intel/2023,".to_string(),
            executable: "Pcrystal".to_string(),
        };
        let config = slurm_config(&args);
        assert_eq!(config.modules, vec!["CRYSTAL/23".to_string(), "intel/2023".to_string()]);
        assert_eq!(config.nodes, 1);
        assert_eq!(config.ntasks, 16);
    }

    #[test]
    fn test_queue_round_submits_pending() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            fs::write(dir.path().join(format!("{}.d12", name)), "").unwrap();
        }
        let config = QueueConfig {
            dir: dir.path().to_path_buf(),
            max_jobs: 4,
            reserve: 2,
            max_submit: None,
        };
        let store = StatusStore::with_locations(&dir.path().join("status.json"), vec![]);
        let mut tracker = JobTracker::open(config, store, FakeScheduler::default());

        let summary = queue_round(&mut tracker).unwrap();
        assert_eq!((summary.pending, summary.running, summary.total), (1, 2, 3));
        assert!(dir.path().join("status.json").exists());
    }
}
