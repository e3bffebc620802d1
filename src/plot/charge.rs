//! # 电荷密度热图
//!
//! ECHG 网格按 平均值 ± 标准差 截断后着色，右侧附色标。
//!
//! ## 依赖关系
//! - 被 `commands/plot.rs` 使用
//! - 使用 `parsers/dat.rs` 的 `ChargeDensity`

use super::{plot_err, ImageFormat};
use crate::error::Result;
use crate::parsers::dat::ChargeDensity;

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// viridis 色带锚点
const VIRIDIS: [(u8, u8, u8); 5] = [
    (68, 1, 84),
    (59, 82, 139),
    (33, 145, 140),
    (94, 201, 98),
    (253, 231, 37),
];

/// `t` ∈ [0, 1] 映射为颜色，超出范围截断
pub fn colormap(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let i = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let f = scaled - i as f64;
    let (a, b) = (VIRIDIS[i], VIRIDIS[i + 1]);
    let lerp = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * f).round() as u8;
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

pub fn generate_charge_plot(
    title: &str,
    density: &ChargeDensity,
    output_path: &Path,
    format: ImageFormat,
    size: (u32, u32),
) -> Result<()> {
    match format {
        ImageFormat::Svg => {
            let root = SVGBackend::new(output_path, size).into_drawing_area();
            draw_charge_chart(&root, title, density)?;
            root.present().map_err(plot_err)?;
        }
        ImageFormat::Png => {
            let root = BitMapBackend::new(output_path, size).into_drawing_area();
            draw_charge_chart(&root, title, density)?;
            root.present().map_err(plot_err)?;
        }
    }
    Ok(())
}

pub fn draw_charge_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    density: &ChargeDensity,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let (lo, hi) = density.clip_range();
    let span = if hi > lo { hi - lo } else { 1.0 };
    let width = root.dim_in_pixel().0;
    let (map_area, bar_area) = root.split_horizontally((width * 85 / 100) as i32);

    let mut chart = ChartBuilder::on(&map_area)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..density.nx, 0..density.ny)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("x")
        .y_desc("y")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series((0..density.ny).flat_map(|iy| {
            (0..density.nx).map(move |ix| {
                let t = (density.get(ix, iy) - lo) / span;
                Rectangle::new([(ix, iy), (ix + 1, iy + 1)], colormap(t).filled())
            })
        }))
        .map_err(plot_err)?;

    // 色标
    let steps = 100usize;
    let mut bar = ChartBuilder::on(&bar_area)
        .margin_top(60)
        .margin_bottom(60)
        .margin_right(10)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..1.0, lo..lo + span)
        .map_err(plot_err)?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("Electron/Bohr³")
        .y_label_formatter(&|v| format!("{:.2e}", v))
        .draw()
        .map_err(plot_err)?;

    bar.draw_series((0..steps).map(|i| {
        let y0 = lo + span * i as f64 / steps as f64;
        let y1 = lo + span * (i + 1) as f64 / steps as f64;
        Rectangle::new([(0.0, y0), (1.0, y1)], colormap(i as f64 / steps as f64).filled())
    }))
    .map_err(plot_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colormap_ends() {
        let rgb = |c: RGBColor| (c.0, c.1, c.2);
        assert_eq!(rgb(colormap(0.0)), (68, 1, 84));
        assert_eq!(rgb(colormap(1.0)), (253, 231, 37));
        assert_eq!(rgb(colormap(-3.0)), rgb(colormap(0.0)));
        assert_eq!(rgb(colormap(f64::NAN)), rgb(colormap(0.0)));
        assert_eq!(rgb(colormap(0.5)), (33, 145, 140));
    }

    #[test]
    fn test_generate_charge_svg() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("rho.svg");
        let density = ChargeDensity {
            nx: 3,
            ny: 2,
            values: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        };
        generate_charge_plot("slab", &density, &out, ImageFormat::Svg, (800, 600)).unwrap();
        assert!(std::fs::read_to_string(&out).unwrap().contains("<svg"));
    }
}
