//! # scrape 命令实现
//!
//! 从 CRYSTAL 日志提取物理量，每个材料一行写入 CSV。
//!
//! ## 子模块
//! - `gaps`: 带隙与带边 → `CBM_VBM.csv`
//! - `wf`: 功函数 → `WF.csv`
//! - `props`: 平板/体相性质对比 → `PROPERTIES.csv`
//!
//! 行按材料名排序；缺失的量写为空单元格。
//!
//! ## 依赖关系
//! - 使用 `cli/scrape.rs` 定义的参数
//! - 使用 `batch/`, `parsers/crystal_out.rs`, `csv`, `tabled`

pub mod gaps;
pub mod props;
pub mod wf;

use crate::batch::{BatchRunner, MaterialCollector, ProcessResult};
use crate::cli::scrape::{ScrapeArgs, ScrapeCommands, ScrapeCommon};
use crate::error::{write_error, Result};
use crate::models::{FileRole, MaterialFiles};
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 执行 scrape 命令
pub fn execute(args: ScrapeArgs) -> Result<()> {
    match args.command {
        ScrapeCommands::Gaps(args) => run_scraper(&args, &gaps::SCRAPER),
        ScrapeCommands::Wf(args) => run_scraper(&args, &wf::SCRAPER),
        ScrapeCommands::Props(args) => run_scraper(&args, &props::SCRAPER),
    }
}

/// 一种 CSV 提取任务
pub struct Scraper {
    pub title: &'static str,
    pub file_name: &'static str,
    pub header: &'static [&'static str],
    /// 以哪类文件为材料锚点
    pub anchor: FileRole,
    /// 单个材料 → (处理结果, 可能不完整的一行)
    pub row: fn(&MaterialFiles) -> (ProcessResult, Option<Vec<String>>),
}

/// 收集材料、并行提取、排序后写出 CSV，返回写出的行
pub fn scrape(dir: &Path, recursive: bool, jobs: usize, scraper: &Scraper, out: &Path) -> Result<Vec<Vec<String>>> {
    let materials = MaterialCollector::new(dir, scraper.anchor)
        .recursive(recursive)
        .collect()?;
    if materials.is_empty() {
        output::print_warning(&format!("No {} files found under {}", scraper.anchor, dir.display()));
        return Ok(Vec::new());
    }
    output::print_info(&format!("Found {} materials", materials.len()));

    let runner = BatchRunner::new(jobs).with_message("Scraping");
    let (mut rows, result) = runner.collect(&materials, scraper.row);
    rows.sort_by(|a, b| a.first().cmp(&b.first()));

    write_csv(out, scraper.header, &rows)?;
    result.report("materials");
    Ok(rows)
}

fn run_scraper(args: &ScrapeCommon, scraper: &Scraper) -> Result<()> {
    output::print_header(scraper.title);
    let out = output_path(args, scraper.file_name);
    let rows = scrape(&args.dir, args.recursive, args.jobs, scraper, &out)?;
    if rows.is_empty() {
        return Ok(());
    }
    if args.show {
        print_table(scraper.header, &rows);
    }
    output::print_success(&format!("{} rows written to '{}'", rows.len(), out.display()));
    Ok(())
}

fn output_path(args: &ScrapeCommon, default_name: &str) -> PathBuf {
    args.output
        .clone()
        .unwrap_or_else(|| args.dir.join(default_name))
}

/// 写出带表头的 CSV
pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush().map_err(|e| write_error(&path, e))
}

fn print_table(header: &[&str], rows: &[Vec<String>]) {
    let mut builder = tabled::builder::Builder::default();
    builder.push_record(header.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    println!("{}", builder.build());
}
