//! # 带隙提取
//!
//! 每个 `.out` 日志一行：α/β 通道带隙、类型、带边，以及总体带边与类型。

use super::Scraper;
use crate::batch::ProcessResult;
use crate::models::results::{cell, cell_display, GapReport};
use crate::models::{FileRole, MaterialFiles};
use crate::parsers::{crystal_out, LogFile};

pub const HEADER: &[&str] = &[
    "Material",
    "Eg_alpha (eV)",
    "Type",
    "Eg_beta (eV)",
    "Type",
    "VBM_alpha (eV)",
    "CBM_alpha (eV)",
    "VBM_beta (eV)",
    "CBM_beta (eV)",
    "Total VBM (eV)",
    "Total CBM (eV)",
    "Total Type",
];

pub const SCRAPER: Scraper = Scraper {
    title: "Scraping band gaps",
    file_name: "CBM_VBM.csv",
    header: HEADER,
    anchor: FileRole::Log,
    row: material_row,
};

/// 带隙报告 → CSV 行
pub fn gap_row(name: &str, report: &GapReport) -> Vec<String> {
    let beta = report.beta.unwrap_or_default();
    vec![
        name.to_string(),
        cell(report.alpha.gap),
        cell_display(report.alpha.kind),
        cell(beta.gap),
        cell_display(beta.kind),
        cell(report.alpha.vbm),
        cell(report.alpha.cbm),
        cell(beta.vbm),
        cell(beta.cbm),
        cell(report.total.vbm),
        cell(report.total.cbm),
        cell_display(report.total.kind),
    ]
}

fn material_row(m: &MaterialFiles) -> (ProcessResult, Option<Vec<String>>) {
    let log = match m.path(FileRole::Log).and_then(LogFile::read) {
        Ok(log) => log,
        Err(e) => return (ProcessResult::failed(&m.name, e), None),
    };
    let report = crystal_out::gap_report(&log.lines);
    let row = gap_row(&m.name, &report);
    if report.alpha.is_empty() {
        log::warn!("{}: no band gap reported", m.name);
        return (ProcessResult::Skipped(format!("{}: no band gap", m.name)), Some(row));
    }
    (ProcessResult::Success(m.name.clone()), Some(row))
}
