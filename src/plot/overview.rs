//! # 能带 + 态密度总览
//!
//! 同一张图左侧为能带、右侧为态密度，共享能量窗口。

use super::bands::{draw_band_chart, BandPlot};
use super::dos::{draw_dos_chart, DosPlot};
use super::{plot_err, ImageFormat};
use crate::error::Result;

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// 能带区域占宽度的比例 (%)
const BAND_WIDTH_PERCENT: u32 = 65;

pub fn generate_overview_plot(
    bands: &BandPlot,
    dos: &DosPlot,
    output_path: &Path,
    format: ImageFormat,
    size: (u32, u32),
) -> Result<()> {
    match format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(output_path, size).into_drawing_area();
            draw_overview(&root, bands, dos)?;
            root.present().map_err(plot_err)?;
        }
        ImageFormat::Png => {
            let root = BitMapBackend::new(output_path, size).into_drawing_area();
            draw_overview(&root, bands, dos)?;
            root.present().map_err(plot_err)?;
        }
    }
    Ok(())
}

fn draw_overview<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    bands: &BandPlot,
    dos: &DosPlot,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;
    let width = root.dim_in_pixel().0;
    let (left, right) = root.split_horizontally((width * BAND_WIDTH_PERCENT / 100) as i32);
    draw_band_chart(&left, bands)?;
    draw_dos_chart(&right, dos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::dat::{BandData, DosData};
    use crate::plot::EnergyAxis;

    #[test]
    fn test_generate_overview_svg() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("overview.svg");
        let axis = EnergyAxis {
            emin: -2.0,
            emax: 2.0,
            reference: 0.0,
            vacuum: false,
        };
        let band_data = BandData {
            kpath: vec![0.0, 1.0],
            alpha: vec![vec![-1.0, -0.5], vec![1.0, 1.2]],
            beta: None,
            ticks: vec![0.0, 1.0],
            fermi: Some(0.0),
        };
        let dos_data = DosData {
            energy: vec![-1.0, 0.0, 1.0],
            alpha: vec![vec![0.5, 0.0, 0.4]],
            beta: None,
            fermi: Some(0.0),
        };
        let labels = vec!["Γ".to_string(), "X".to_string()];
        let total = vec!["Total".to_string()];
        let bands = BandPlot {
            title: "Si".to_string(),
            data: &band_data,
            labels: &labels,
            axis,
        };
        let dos = DosPlot {
            title: "DOS".to_string(),
            data: &dos_data,
            labels: &total,
            axis,
            total_only: false,
        };
        generate_overview_plot(&bands, &dos, &out, ImageFormat::Svg, (1200, 700)).unwrap();
        let svg = std::fs::read_to_string(&out).unwrap();
        assert!(svg.contains("Si") && svg.contains("DOS"));
    }
}
