//! # 态密度图
//!
//! 能量为纵轴，与能带图对齐。最后一列为总态密度，以填充区域绘制；
//! 其余列为投影曲线。自旋极化时 beta 通道取负值画在左侧。
//!
//! ## 依赖关系
//! - 被 `commands/plot.rs`, `plot/overview.rs` 使用
//! - 使用 `parsers/dat.rs` 的 `DosData`

use super::{plot_err, EnergyAxis, ImageFormat, PALETTE};
use crate::error::Result;
use crate::parsers::dat::DosData;

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct DosPlot<'a> {
    pub title: String,
    pub data: &'a DosData,
    /// 各列标签，末项为 `Total`
    pub labels: &'a [String],
    pub axis: EnergyAxis,
    /// 只画总态密度
    pub total_only: bool,
}

impl DosPlot<'_> {
    fn label(&self, column: usize) -> String {
        self.labels
            .get(column)
            .cloned()
            .unwrap_or_else(|| format!("PDOS {}", column + 1))
    }

    /// 能量窗口内的最大态密度，决定横轴范围
    fn max_density(&self) -> f64 {
        let range = self.axis.range();
        let channel_max = |columns: &Vec<Vec<f64>>| {
            columns
                .iter()
                .flat_map(|col| {
                    col.iter()
                        .zip(&self.data.energy)
                        .filter(|(_, e)| range.contains(*e))
                        .map(|(v, _)| v.abs())
                })
                .fold(0.0, f64::max)
        };
        let alpha = channel_max(&self.data.alpha);
        let beta = self.data.beta.as_ref().map(channel_max).unwrap_or(0.0);
        let max = alpha.max(beta);
        if max > 0.0 {
            max * 1.1
        } else {
            1.0
        }
    }
}

pub fn generate_dos_plot(
    plot: &DosPlot,
    output_path: &Path,
    format: ImageFormat,
    size: (u32, u32),
) -> Result<()> {
    match format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(output_path, size).into_drawing_area();
            draw_dos_chart(&root, plot)?;
            root.present().map_err(plot_err)?;
        }
        ImageFormat::Png => {
            let root = BitMapBackend::new(output_path, size).into_drawing_area();
            draw_dos_chart(&root, plot)?;
            root.present().map_err(plot_err)?;
        }
    }
    Ok(())
}

pub fn draw_dos_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plot: &DosPlot,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let max = plot.max_density();
    let min = if plot.data.beta.is_some() { -max } else { 0.0 };
    let energy = plot.axis.range();

    let mut chart = ChartBuilder::on(root)
        .caption(&plot.title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(min..max, energy.clone())
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("DOS (states/eV)")
        .y_desc(plot.axis.label())
        .x_label_style(("sans-serif", 14))
        .y_label_style(("sans-serif", 16))
        .draw()
        .map_err(plot_err)?;

    let channels: Vec<(&Vec<Vec<f64>>, f64)> = std::iter::once((&plot.data.alpha, 1.0))
        .chain(plot.data.beta.iter().map(|b| (b, -1.0)))
        .collect();
    let total_column = plot.data.alpha.len().saturating_sub(1);

    for (i, (columns, sign)) in channels.iter().enumerate() {
        for (c, column) in columns.iter().enumerate() {
            let points: Vec<(f64, f64)> = column
                .iter()
                .zip(&plot.data.energy)
                .filter(|(_, e)| energy.contains(*e))
                .map(|(v, e)| (sign * v, *e))
                .collect();
            if points.is_empty() {
                continue;
            }

            if c == total_column {
                let series = chart
                    .draw_series(LineSeries::new(points.clone(), BLACK.stroke_width(2)))
                    .map_err(plot_err)?;
                if i == 0 {
                    let label = plot.label(c);
                    series
                        .label(label)
                        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));
                }
                // 填充至 x = 0
                chart
                    .draw_series(std::iter::once(Polygon::new(
                        std::iter::once((0.0, points[0].1))
                            .chain(points.iter().copied())
                            .chain(std::iter::once((0.0, points[points.len() - 1].1)))
                            .collect::<Vec<_>>(),
                        BLACK.mix(0.1).filled(),
                    )))
                    .map_err(plot_err)?;
                continue;
            }
            if plot.total_only {
                continue;
            }

            let color = PALETTE[c % PALETTE.len()];
            let series = chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))
                .map_err(plot_err)?;
            if i == 0 {
                series
                    .label(plot.label(c))
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }
        }
    }

    // 费米能级
    chart
        .draw_series(DashedLineSeries::new(
            vec![(min, plot.axis.reference), (max, plot.axis.reference)],
            8,
            6,
            BLACK.stroke_width(1),
        ))
        .map_err(plot_err)?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 14))
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}
