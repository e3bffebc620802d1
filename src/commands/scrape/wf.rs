//! # 功函数提取
//!
//! `{name}_POTC.POTC.dat` 两端为真空区静电势，费米能取自 `{name}_POTC.out`。
//! 没有费米能时仍写出静电势列，功函数列留空。

use super::Scraper;
use crate::batch::ProcessResult;
use crate::error::Result;
use crate::models::results::{cell, WorkFunction};
use crate::models::{FileRole, MaterialFiles};
use crate::parsers::dat::PotentialProfile;
use crate::parsers::{crystal_out, LogFile};

pub const HEADER: &[&str] = &[
    "Material",
    "EPOT top (eV)",
    "EPOT bot (eV)",
    "WF top (eV)",
    "WF bot (eV)",
    "WFmax (eV)",
    "WFmin (eV)",
    "EPOTmax (eV)",
    "EPOTmin (eV)",
    "EPOTavg (eV)",
    "EFermi (eV)",
];

pub const SCRAPER: Scraper = Scraper {
    title: "Scraping work functions",
    file_name: "WF.csv",
    header: HEADER,
    anchor: FileRole::PotentialData,
    row: material_row,
};

pub fn wf_row(name: &str, wf: &WorkFunction) -> Vec<String> {
    vec![
        name.to_string(),
        cell(wf.potential_top),
        cell(wf.potential_bottom),
        cell(wf.wf_top),
        cell(wf.wf_bottom),
        cell(wf.wf_max),
        cell(wf.wf_min),
        cell(wf.potential_max),
        cell(wf.potential_min),
        cell(wf.potential_avg),
        cell(wf.fermi),
    ]
}

/// 费米能 (Hartree)；缺少日志或关键字时为 None
fn fermi_hartree(m: &MaterialFiles) -> Result<Option<f64>> {
    let path = match m.get(FileRole::PotentialLog) {
        Some(p) => p,
        None => {
            log::warn!("{}: no {} log, work function left empty", m.name, FileRole::PotentialLog);
            return Ok(None);
        }
    };
    let fermi = crystal_out::fermi_energy(&LogFile::read(path)?);
    if fermi.is_none() {
        log::warn!("{}: no FERMI ENERGY in {}, work function left empty", m.name, path.display());
    }
    Ok(fermi)
}

fn work_function(m: &MaterialFiles) -> Result<WorkFunction> {
    let profile = PotentialProfile::read(m.path(FileRole::PotentialData)?)?;
    let fermi = fermi_hartree(m)?;
    // read 已保证非空
    let (top, bottom) = profile.ends().unwrap_or_default();
    Ok(WorkFunction::from_potential(top, bottom, fermi))
}

fn material_row(m: &MaterialFiles) -> (ProcessResult, Option<Vec<String>>) {
    match work_function(m) {
        Ok(wf) => (ProcessResult::Success(m.name.clone()), Some(wf_row(&m.name, &wf))),
        Err(e) => (ProcessResult::failed(&m.name, e), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POTC: &str = "# z (bohr)  V (hartree)\n@ TITLE\n   0.0   0.10\n   5.0  -0.50\n  10.0   0.05\n";

    #[test]
    fn test_missing_fermi_keeps_potential() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Pt_POTC.POTC.dat"), POTC).unwrap();
        std::fs::write(dir.path().join("Pt_POTC.out"), " NO FERMI LINE\n").unwrap();
        let m = MaterialFiles::discover(dir.path(), "Pt");

        let row = wf_row("Pt", &work_function(&m).unwrap());
        assert_eq!(row[1], "2.721140");
        assert!(row[3].is_empty() && row[5].is_empty() && row[10].is_empty());
        assert_eq!(row[9], cell(Some(0.075 * 27.2114)));
    }

    #[test]
    fn test_batch_with_fermi_and_broken_profile() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Pt_POTC.POTC.dat"), POTC).unwrap();
        std::fs::write(
            dir.path().join("Pt_POTC.out"),
            " N. OF SCF CYCLES  12  FERMI ENERGY    -0.100E+00\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("Au_POTC.POTC.dat"), "# empty\n").unwrap();
        let out = dir.path().join("WF.csv");

        let rows = super::super::scrape(dir.path(), false, 1, &SCRAPER, &out).unwrap();
        // Au 失败，只剩 Pt 一行
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][3], cell(Some(0.2 * 27.2114)));
        assert_eq!(rows[0][6], cell(Some(0.15 * 27.2114)));
        assert_eq!(rows[0][10], cell(Some(-0.1 * 27.2114)));
    }
}
