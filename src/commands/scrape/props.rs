//! # 平板/体相性质对比
//!
//! 以 `{name}_slab.out` 为锚点，要求同名 `{name}_bulk.out`。
//!
//! ## 列
//! - 两个日志各自的带隙、总能量、平均原子间距与导电性分类
//! - `Eb` = E(bulk) − E(slab)
//! - 体相的总质量、原子数、密度，以及 z 方向最大空隙（真空层）

use super::Scraper;
use crate::batch::ProcessResult;
use crate::error::Result;
use crate::models::element::atomic_mass;
use crate::models::results::{cell, cell_display, ElectronicState, LogProperties};
use crate::models::{FileRole, MaterialFiles};
use crate::parsers::{crystal_out, LogFile};

pub const HEADER: &[&str] = &[
    "Material",
    "Eg (slab)",
    "Type",
    "Eg (bulk)",
    "Type",
    "E (slab)",
    "E (bulk)",
    "Eb",
    "IAD (slab)",
    "IAD (bulk)",
    "State (slab)",
    "State (bulk)",
    "Dens (bulk)",
    "Mass",
    "Atoms",
    "Vacuum",
];

pub const SCRAPER: Scraper = Scraper {
    title: "Scraping slab and bulk properties",
    file_name: "PROPERTIES.csv",
    header: HEADER,
    anchor: FileRole::SlabLog,
    row: material_row,
};

/// 体相晶胞的组成与几何
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkCell {
    /// 总质量 (amu)
    pub mass: Option<f64>,
    pub atoms: usize,
    /// amu/Å³
    pub density: Option<f64>,
    /// Å
    pub vacuum: Option<f64>,
}

/// 原子两两距离的平均值
pub fn mean_pairwise_distance(positions: &[[f64; 3]]) -> Option<f64> {
    let n = positions.len();
    if n < 2 {
        return None;
    }
    let mut sum = 0.0;
    for i in 0..n {
        for j in i + 1..n {
            let d: f64 = (0..3)
                .map(|k| (positions[i][k] - positions[j][k]).powi(2))
                .sum();
            sum += d.sqrt();
        }
    }
    Some(sum / (n * (n - 1) / 2) as f64)
}

/// 分数坐标在 [0, 1) 周期上的最大间隔
pub fn largest_cyclic_gap(fractions: &[f64]) -> Option<f64> {
    let mut z: Vec<f64> = fractions
        .iter()
        .filter(|v| v.is_finite())
        .map(|v| v.rem_euclid(1.0))
        .collect();
    if z.is_empty() {
        return None;
    }
    z.sort_by(|a, b| a.total_cmp(b));
    let wrap = z[0] + 1.0 - z[z.len() - 1];
    Some(z.windows(2).map(|w| w[1] - w[0]).fold(wrap, f64::max))
}

/// 单个日志的性质摘要
pub fn summarize(log: &LogFile) -> LogProperties {
    let total = crystal_out::gap_report(&log.lines).total;
    let positions: Vec<[f64; 3]> = crystal_out::cartesian_primitive_atoms(log)
        .into_iter()
        .map(|(_, p)| p)
        .collect();
    LogProperties {
        gap: total.gap,
        kind: total.kind,
        energy: crystal_out::total_energy(log),
        mean_distance: mean_pairwise_distance(&positions),
        state: total.gap.map(ElectronicState::classify),
    }
}

pub fn bulk_cell(log: &LogFile) -> BulkCell {
    let atoms = crystal_out::cartesian_primitive_atoms(log);
    let mass: Option<f64> = if atoms.is_empty() {
        None
    } else {
        atoms.iter().map(|(z, _)| atomic_mass(*z)).sum()
    };
    let cell = crystal_out::primitive_cell(&log.lines);
    let density = match (mass, cell) {
        (Some(m), Some(c)) if c.volume() > 0.0 => Some(m / c.volume()),
        _ => None,
    };
    let z: Vec<f64> = crystal_out::asymmetric_atoms(log)
        .iter()
        .map(|a| a.position[2])
        .collect();
    let vacuum = match (largest_cyclic_gap(&z), cell) {
        (Some(gap), Some(c)) => Some(gap * c.height()),
        _ => None,
    };
    BulkCell {
        mass,
        atoms: atoms.len(),
        density,
        vacuum,
    }
}

pub fn props_row(name: &str, slab: &LogProperties, bulk: &LogProperties, cell_info: &BulkCell) -> Vec<String> {
    let binding = match (bulk.energy, slab.energy) {
        (Some(b), Some(s)) => Some(b - s),
        _ => None,
    };
    vec![
        name.to_string(),
        cell(slab.gap),
        cell_display(slab.kind),
        cell(bulk.gap),
        cell_display(bulk.kind),
        cell(slab.energy),
        cell(bulk.energy),
        cell(binding),
        cell(slab.mean_distance),
        cell(bulk.mean_distance),
        cell_display(slab.state),
        cell_display(bulk.state),
        cell(cell_info.density),
        cell(cell_info.mass),
        cell_info.atoms.to_string(),
        cell(cell_info.vacuum),
    ]
}

fn material_props(m: &MaterialFiles) -> Result<Vec<String>> {
    m.require(&[FileRole::SlabLog, FileRole::BulkLog])?;
    let slab = LogFile::read(m.path(FileRole::SlabLog)?)?;
    let bulk = LogFile::read(m.path(FileRole::BulkLog)?)?;
    Ok(props_row(&m.name, &summarize(&slab), &summarize(&bulk), &bulk_cell(&bulk)))
}

fn material_row(m: &MaterialFiles) -> (ProcessResult, Option<Vec<String>>) {
    match material_props(m) {
        Ok(row) => (ProcessResult::Success(m.name.clone()), Some(row)),
        Err(e) => (ProcessResult::failed(&m.name, e), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BULK: &str = r#"
 PRIMITIVE CELL - CENTRING CODE 1/0 VOLUME=    64.000000 - DENSITY  1.000 g/cm^3
         A              B              C           ALPHA      BETA       GAMMA
     4.00000000     4.00000000     4.00000000    90.000000  90.000000  90.000000
 *******************************************************************************
 ATOMS IN THE ASYMMETRIC UNIT    2 - ATOMS IN THE UNIT CELL:    2
     ATOM                 X/A                 Y/B                 Z/C
 *******************************************************************************
      1 T  12 MG    0.000000000000E+00  0.000000000000E+00  0.000000000000E+00
      2 T   8 O     5.000000000000E-01  5.000000000000E-01  2.500000000000E-01

 CARTESIAN COORDINATES - PRIMITIVE CELL
 *******************************************************************************
 *      ATOM          X(ANGSTROM)         Y(ANGSTROM)         Z(ANGSTROM)
 *******************************************************************************
      1    12 MG    0.000000000000E+00  0.000000000000E+00  0.000000000000E+00
      2     8 O     2.000000000000E+00  2.000000000000E+00  1.000000000000E+00

 CYC   9 ETOT(AU) -2.0000000000000E+02 DETOT -1.20E-08 tst  2.06E-14 PX  1.89E-05
 DIRECT ENERGY BAND GAP:   7.0000 eV
"#;

    const SLAB: &str = r#"
 CYC  11 ETOT(AU) -1.9990000000000E+02 DETOT -1.20E-08 tst  2.06E-14 PX  1.89E-05
 POSSIBLY CONDUCTING STATE - EFERMI(AU) -1.0000000E-01
"#;

    #[test]
    fn test_mean_pairwise_distance() {
        let p = [[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 4.0, 0.0]];
        // (3 + 4 + 5) / 3
        assert!((mean_pairwise_distance(&p).unwrap() - 4.0).abs() < 1e-12);
        assert!(mean_pairwise_distance(&p[..1]).is_none());
    }

    #[test]
    fn test_largest_cyclic_gap_wraps() {
        assert!((largest_cyclic_gap(&[0.1, 0.2, 0.9]).unwrap() - 0.7).abs() < 1e-12);
        assert!((largest_cyclic_gap(&[0.45, 0.55]).unwrap() - 0.9).abs() < 1e-12);
        assert!((largest_cyclic_gap(&[-0.25]).unwrap() - 1.0).abs() < 1e-12);
        assert!(largest_cyclic_gap(&[]).is_none());
    }

    #[test]
    fn test_bulk_cell() {
        let info = bulk_cell(&LogFile::parse(BULK));
        let mass = atomic_mass(12).unwrap() + atomic_mass(8).unwrap();
        assert_eq!(info.atoms, 2);
        assert!((info.mass.unwrap() - mass).abs() < 1e-9);
        assert!((info.density.unwrap() - mass / 64.0).abs() < 1e-9);
        // z = 0 与 0.25，最大空隙 0.75 × 4 Å
        assert!((info.vacuum.unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_props_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MgO_slab.out"), SLAB).unwrap();
        std::fs::write(dir.path().join("MgO_bulk.out"), BULK).unwrap();
        // 缺少体相日志
        std::fs::write(dir.path().join("CaO_slab.out"), SLAB).unwrap();
        let out = dir.path().join("PROPERTIES.csv");

        let rows = super::super::scrape(dir.path(), false, 1, &SCRAPER, &out).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[0], "MgO");
        assert_eq!(row[1], "0.000000");
        assert_eq!(row[2], "COND");
        assert_eq!(row[4], "DIRECT");
        assert_eq!(row[7], cell(Some(-0.1 * 27.2114)));
        assert_eq!(row[9], cell(Some(3.0)));
        assert_eq!(row[10], "COND");
        assert_eq!(row[11], "SEMI");
        assert_eq!(row[14], "2");
    }
}
