//! # plot 命令实现
//!
//! ## 功能
//! - `bands`: `{name}_BAND.BAND.dat` → `{name}_BAND.{png,svg}`
//! - `dos`: `{name}_DOSS.DOSS.dat` → `{name}_DOSS.{png,svg}`
//! - `charge`: `{name}.f25` → `{name}_ECHG.{png,svg}` 与 `{name}_matrix.txt`
//! - `overview`: 能带与态密度并排 → `{name}_overview.{png,svg}`
//!
//! 同目录存在 `_POTC.POTC.dat` 与 `_POTC.out` 时，能量改为相对真空能级。
//!
//! ## 依赖关系
//! - 使用 `cli/plot.rs` 定义的参数
//! - 使用 `plot/`, `parsers/dat.rs`, `parsers/d3.rs`

use crate::batch::{BatchRunner, MaterialCollector, ProcessResult};
use crate::cli::plot::{DosArgs, EnergyPlotArgs, PlotArgs, PlotCommands, PlotCommon};
use crate::error::{read_to_string, write_string, CryskitError, Result};
use crate::models::{FileRole, MaterialFiles};
use crate::parsers::dat::{self, BandData, ChargeDensity, DosData, PotentialProfile};
use crate::parsers::{crystal_out, d3, LogFile};
use crate::plot::bands::{generate_band_plot, BandPlot};
use crate::plot::charge::generate_charge_plot;
use crate::plot::dos::{generate_dos_plot, DosPlot};
use crate::plot::overview::generate_overview_plot;
use crate::plot::EnergyAxis;
use crate::utils::output;

use std::path::{Path, PathBuf};

/// 执行 plot 命令
pub fn execute(args: PlotArgs) -> Result<()> {
    match args.command {
        PlotCommands::Bands(args) => plot_bands(&args),
        PlotCommands::Dos(args) => plot_dos(&args),
        PlotCommands::Charge(args) => plot_charge(&args),
        PlotCommands::Overview(args) => plot_overview(&args),
    }
}

/// 对每个材料调用 `draw(材料, 输出路径)`，已存在的图片默认跳过
fn plot_batch<F>(common: &PlotCommon, anchor: FileRole, kind: &str, draw: F) -> Result<()>
where
    F: Fn(&MaterialFiles, &Path) -> Result<()> + Sync + Send,
{
    let materials = MaterialCollector::new(&common.dir, anchor).collect()?;
    if materials.is_empty() {
        output::print_warning(&format!("No {} files found under {}", anchor, common.dir.display()));
        return Ok(());
    }
    output::print_info(&format!("Found {} materials", materials.len()));

    let runner = BatchRunner::new(common.jobs).with_message(&format!("Plotting {}", kind));
    let result = runner.run(&materials, |m| {
        let target = image_path(m, kind, common);
        if target.exists() && !common.overwrite {
            return ProcessResult::Skipped(format!("{} exists", target.display()));
        }
        match draw(m, &target) {
            Ok(()) => ProcessResult::Success(target.display().to_string()),
            Err(e) => ProcessResult::failed(&m.name, e),
        }
    });
    result.report("materials");
    Ok(())
}

fn image_path(m: &MaterialFiles, kind: &str, common: &PlotCommon) -> PathBuf {
    m.sibling(&format!("_{}.{}", kind, common.format.extension()))
}

fn size(common: &PlotCommon) -> (u32, u32) {
    (common.width, common.height)
}

fn check_window(args: &EnergyPlotArgs) -> Result<()> {
    if args.emin >= args.emax {
        return Err(CryskitError::InvalidRange(format!(
            "--emin {} must be below --emax {}",
            args.emin, args.emax
        )));
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────
// 能量参考
// ─────────────────────────────────────────────────────────────

/// 真空对齐的能量平移 (eV)；缺少静电势文件或费米能时为 None
pub fn vacuum_shift(m: &MaterialFiles) -> Result<Option<f64>> {
    let (data, log) = match (m.get(FileRole::PotentialData), m.get(FileRole::PotentialLog)) {
        (Some(d), Some(l)) => (d, l),
        _ => return Ok(None),
    };
    let fermi = match crystal_out::fermi_energy(&LogFile::read(log)?) {
        Some(ef) => ef,
        None => {
            log::warn!("{}: no FERMI ENERGY in {}, keeping Fermi reference", m.name, log.display());
            return Ok(None);
        }
    };
    Ok(PotentialProfile::read(data)?.vacuum_shift(fermi))
}

fn energy_axis(m: &MaterialFiles, args: &EnergyPlotArgs) -> Result<EnergyAxis> {
    let shift = if args.no_vacuum { None } else { vacuum_shift(m)? };
    if let Some(s) = shift {
        log::info!("{}: aligning energies to vacuum (shift {:.3} eV)", m.name, s);
    }
    Ok(EnergyAxis {
        emin: args.emin,
        emax: args.emax,
        reference: shift.unwrap_or(0.0),
        vacuum: shift.is_some(),
    })
}

// ─────────────────────────────────────────────────────────────
// 数据加载
// ─────────────────────────────────────────────────────────────

/// 能带数据与高对称点标签（取自 `{name}_BAND.d3`，缺失时为空）
fn load_bands(m: &MaterialFiles, axis: &EnergyAxis) -> Result<(BandData, Vec<String>)> {
    let data = BandData::read(m.path(FileRole::BandData)?)?.shifted(axis.reference);
    let deck = m.sibling("_BAND.d3");
    let labels = if deck.is_file() {
        d3::path_labels(&read_to_string(&deck)?)
    } else {
        log::debug!("{}: no _BAND.d3, ticks left unlabeled", m.name);
        Vec::new()
    };
    Ok((data, labels))
}

/// 态密度数据与列标签（投影取自 `{name}_DOSS.d3`）
fn load_dos(m: &MaterialFiles, axis: &EnergyAxis) -> Result<(DosData, Vec<String>)> {
    let labels = match m.get(FileRole::DosDeck) {
        Some(deck) => dat::doss_labels(&read_to_string(deck)?),
        None => Vec::new(),
    };
    let columns = if labels.is_empty() { None } else { Some(labels.len()) };
    let data = DosData::read(m.path(FileRole::DosData)?, columns)?.shifted(axis.reference);
    Ok((data, labels))
}

// ─────────────────────────────────────────────────────────────
// 各子命令
// ─────────────────────────────────────────────────────────────

fn plot_bands(args: &EnergyPlotArgs) -> Result<()> {
    output::print_header("Plotting band structures");
    check_window(args)?;
    let common = &args.common;
    plot_batch(common, FileRole::BandData, "BAND", |m, target| {
        let axis = energy_axis(m, args)?;
        let (data, labels) = load_bands(m, &axis)?;
        let plot = BandPlot {
            title: m.name.clone(),
            data: &data,
            labels: &labels,
            axis,
        };
        generate_band_plot(&plot, target, common.format, size(common))
    })
}

fn plot_dos(args: &DosArgs) -> Result<()> {
    output::print_header("Plotting densities of states");
    check_window(&args.energy)?;
    let common = &args.energy.common;
    plot_batch(common, FileRole::DosData, "DOSS", |m, target| {
        let axis = energy_axis(m, &args.energy)?;
        let (data, labels) = load_dos(m, &axis)?;
        let plot = DosPlot {
            title: m.name.clone(),
            data: &data,
            labels: &labels,
            axis,
            total_only: args.total_only,
        };
        generate_dos_plot(&plot, target, common.format, size(common))
    })
}

fn plot_charge(common: &PlotCommon) -> Result<()> {
    output::print_header("Plotting charge densities");
    plot_batch(common, FileRole::ChargeDensity, "ECHG", |m, target| {
        let density = ChargeDensity::read(m.path(FileRole::ChargeDensity)?)?;
        write_string(&m.sibling("_matrix.txt"), &density.matrix_text())?;
        generate_charge_plot(&m.name, &density, target, common.format, size(common))
    })
}

fn plot_overview(args: &EnergyPlotArgs) -> Result<()> {
    output::print_header("Plotting band + DOS overviews");
    check_window(args)?;
    let common = &args.common;
    plot_batch(common, FileRole::BandData, "overview", |m, target| {
        m.require(&[FileRole::BandData, FileRole::DosData])?;
        let axis = energy_axis(m, args)?;
        let (band_data, band_labels) = load_bands(m, &axis)?;
        let (dos_data, dos_labels) = load_dos(m, &axis)?;
        let bands = BandPlot {
            title: m.name.clone(),
            data: &band_data,
            labels: &band_labels,
            axis,
        };
        let dos = DosPlot {
            title: "DOS".to_string(),
            data: &dos_data,
            labels: &dos_labels,
            axis,
            total_only: false,
        };
        generate_overview_plot(&bands, &dos, target, common.format, size(common))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::ImageFormat;

    const BAND_DAT: &str = "# x x 3 x 2\n@ XAXIS TICK SPEC 2\n@ XAXIS TICK MAJOR 0, 0.0\n@ XAXIS TICKLABEL 0, G\n@ XAXIS TICK MAJOR 1, 0.5\n@ XAXIS TICKLABEL 1, X\n0.0 -0.05 0.05\n0.25 -0.04 0.06\n0.5 -0.03 0.07\n";
    const DOSS_DAT: &str = "# DOSS\n-0.10 0.5 1.0\n0.00 0.0 0.0\n0.10 0.4 0.9\n";
    const DOSS_D3: &str = "NEWK\n48 48\n1 0\nDOSS\n1 600 1 30 1 12 0\n-1 -1\n1 2 #O P\nEND\n";

    fn common(dir: &Path) -> PlotCommon {
        PlotCommon {
            dir: dir.to_path_buf(),
            format: ImageFormat::Svg,
            width: 800,
            height: 600,
            jobs: 1,
            overwrite: false,
        }
    }

    fn energy(dir: &Path) -> EnergyPlotArgs {
        EnergyPlotArgs {
            common: common(dir),
            emin: -3.0,
            emax: 3.0,
            no_vacuum: false,
        }
    }

    #[test]
    fn test_vacuum_shift_needs_both_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Pt_POTC.POTC.dat"), "0.0 0.10\n5.0 -0.5\n10.0 0.10\n").unwrap();
        let m = MaterialFiles::discover(dir.path(), "Pt");
        assert_eq!(vacuum_shift(&m).unwrap(), None);

        std::fs::write(dir.path().join("Pt_POTC.out"), " FERMI ENERGY  -0.100E+00\n").unwrap();
        let m = MaterialFiles::discover(dir.path(), "Pt");
        // -(0.1 - (-0.1)) Hartree
        let shift = vacuum_shift(&m).unwrap().unwrap();
        assert!((shift + 0.2 * 27.2114).abs() < 1e-6);

        let mut args = energy(dir.path());
        assert!(energy_axis(&m, &args).unwrap().vacuum);
        args.no_vacuum = true;
        let axis = energy_axis(&m, &args).unwrap();
        assert!(!axis.vacuum);
        assert_eq!(axis.reference, 0.0);
    }

    #[test]
    fn test_dos_labels_from_deck() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MgO_DOSS.DOSS.dat"), DOSS_DAT).unwrap();
        std::fs::write(dir.path().join("MgO_DOSS.d3"), DOSS_D3).unwrap();
        let m = MaterialFiles::discover(dir.path(), "MgO");
        let axis = energy_axis(&m, &energy(dir.path())).unwrap();
        let (data, labels) = load_dos(&m, &axis).unwrap();
        assert_eq!(labels, vec!["O (p)".to_string(), "Total".to_string()]);
        assert_eq!(data.alpha.len(), 2);
    }

    #[test]
    fn test_overview_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("MgO_BAND.BAND.dat"), BAND_DAT).unwrap();
        std::fs::write(dir.path().join("MgO_BAND.d3"), "NEWK\n48 48\n1 0\nBAND\nMgO\n2 0 100 1 10 1 0\nG X\nEND\n").unwrap();
        std::fs::write(dir.path().join("MgO_DOSS.DOSS.dat"), DOSS_DAT).unwrap();
        // 只有能带数据的材料单独失败
        std::fs::write(dir.path().join("CaO_BAND.BAND.dat"), BAND_DAT).unwrap();

        plot_overview(&energy(dir.path())).unwrap();
        assert!(dir.path().join("MgO_overview.svg").exists());
        assert!(!dir.path().join("CaO_overview.svg").exists());
    }

    #[test]
    fn test_charge_writes_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let f25 = "-%-0000-MAPN    3    2  0.10000E+00  0.10000E+00  0.00000E+00\n header\n header\n 1.0 2.0 3.0 4.0 5.0 6.0\n";
        std::fs::write(dir.path().join("MgO.f25"), f25).unwrap();
        plot_charge(&common(dir.path())).unwrap();
        assert!(dir.path().join("MgO_ECHG.svg").exists());
        let matrix = std::fs::read_to_string(dir.path().join("MgO_matrix.txt")).unwrap();
        assert_eq!(matrix.lines().count(), 2);
    }

    #[test]
    fn test_rejects_empty_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = energy(dir.path());
        args.emin = 2.0;
        args.emax = 1.0;
        assert!(matches!(plot_bands(&args), Err(CryskitError::InvalidRange(_))));
    }
}
