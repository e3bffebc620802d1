//! # 能带结构图
//!
//! ## 功能
//! - alpha 通道实线，beta 通道虚线
//! - 高对称点竖线与标签，费米能级 (或真空对齐后的费米能级) 水平虚线
//!
//! ## 依赖关系
//! - 被 `commands/plot.rs`, `plot/overview.rs` 使用
//! - 使用 `parsers/dat.rs` 的 `BandData`

use super::{plot_err, EnergyAxis, ImageFormat, SPIN_DOWN, SPIN_UP};
use crate::error::Result;
use crate::parsers::dat::BandData;

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// 一张能带图所需的数据
#[derive(Debug, Clone)]
pub struct BandPlot<'a> {
    pub title: String,
    pub data: &'a BandData,
    /// 与 `data.ticks` 一一对应；可为空
    pub labels: &'a [String],
    pub axis: EnergyAxis,
}

/// 生成能带图 (PNG 或 SVG)
pub fn generate_band_plot(
    plot: &BandPlot,
    output_path: &Path,
    format: ImageFormat,
    size: (u32, u32),
) -> Result<()> {
    match format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(output_path, size).into_drawing_area();
            draw_band_chart(&root, plot)?;
            root.present().map_err(plot_err)?;
        }
        ImageFormat::Png => {
            let root = BitMapBackend::new(output_path, size).into_drawing_area();
            draw_band_chart(&root, plot)?;
            root.present().map_err(plot_err)?;
        }
    }
    Ok(())
}

/// 在给定绘图区域上绘制能带
pub fn draw_band_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plot: &BandPlot,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let data = plot.data;
    let k_min = data.kpath.first().copied().unwrap_or(0.0);
    let mut k_max = data.kpath.last().copied().unwrap_or(1.0);
    if k_max <= k_min {
        k_max = k_min + 1.0;
    }
    let energy = plot.axis.range();

    let mut chart = ChartBuilder::on(root)
        .caption(&plot.title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(k_min..k_max, energy.clone())
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .y_desc(plot.axis.label())
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    // 高对称点
    for &tick in &data.ticks {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(tick, energy.start), (tick, energy.end)],
                BLACK.mix(0.5),
            )))
            .map_err(plot_err)?;
    }
    let label_y = energy.start + 0.03 * (energy.end - energy.start);
    for (tick, label) in data.ticks.iter().zip(plot.labels) {
        chart
            .draw_series(std::iter::once(Text::new(
                label.clone(),
                (*tick, label_y),
                ("sans-serif", 16).into_font(),
            )))
            .map_err(plot_err)?;
    }

    let in_window = |band: &Vec<f64>| {
        band.iter().any(|e| energy.contains(e))
    };

    for band in data.alpha.iter().filter(|b| in_window(b)) {
        chart
            .draw_series(LineSeries::new(
                data.kpath.iter().copied().zip(band.iter().copied()),
                SPIN_UP.stroke_width(2),
            ))
            .map_err(plot_err)?;
    }
    if let Some(beta) = &data.beta {
        for band in beta.iter().filter(|b| in_window(b)) {
            chart
                .draw_series(DashedLineSeries::new(
                    data.kpath.iter().copied().zip(band.iter().copied()),
                    6,
                    4,
                    SPIN_DOWN.stroke_width(2),
                ))
                .map_err(plot_err)?;
        }
    }

    // 费米能级
    chart
        .draw_series(DashedLineSeries::new(
            vec![(k_min, plot.axis.reference), (k_max, plot.axis.reference)],
            8,
            6,
            BLACK.stroke_width(1),
        ))
        .map_err(plot_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> BandData {
        BandData {
            kpath: vec![0.0, 0.5, 1.0],
            alpha: vec![vec![-3.0, -2.5, -3.2], vec![1.0, 1.5, 0.8]],
            beta: Some(vec![vec![-2.9, -2.4, -3.1], vec![1.1, 1.6, 0.9]]),
            ticks: vec![0.0, 1.0],
            fermi: Some(0.0),
        }
    }

    #[test]
    fn test_generate_band_svg() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bands.svg");
        let data = sample();
        let labels = vec!["Γ".to_string(), "X".to_string()];
        let plot = BandPlot {
            title: "MgO".to_string(),
            data: &data,
            labels: &labels,
            axis: EnergyAxis {
                emin: -5.0,
                emax: 5.0,
                reference: 0.0,
                vacuum: false,
            },
        };
        generate_band_plot(&plot, &out, ImageFormat::Svg, (800, 600)).unwrap();
        let svg = std::fs::read_to_string(&out).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("MgO"));
    }
}
