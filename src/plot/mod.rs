//! # 绘图模块
//!
//! 使用 `plotters` 绘制能带、态密度、电荷密度图以及能带+态密度总览图。
//!
//! ## 子模块
//! - `bands`: 能带结构
//! - `dos`: 总态密度与投影态密度
//! - `charge`: ECHG 电荷密度热图
//! - `overview`: 能带与态密度并排
//!
//! ## 依赖关系
//! - 被 `commands/plot.rs` 使用
//! - 使用 `parsers/dat.rs` 的数据结构

pub mod bands;
pub mod charge;
pub mod dos;
pub mod overview;

use crate::error::CryskitError;

use plotters::style::RGBColor;

/// 输出图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// 能量窗口与参考能级 (eV)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyAxis {
    /// 相对参考能级的下限
    pub emin: f64,
    /// 相对参考能级的上限
    pub emax: f64,
    /// 费米能级在图中的位置：0 或真空对齐后的 -(V - E_F)
    pub reference: f64,
    /// 能量是否相对真空能级
    pub vacuum: bool,
}

impl EnergyAxis {
    pub fn range(&self) -> std::ops::Range<f64> {
        (self.emin + self.reference)..(self.emax + self.reference)
    }

    pub fn label(&self) -> &'static str {
        if self.vacuum {
            "Energy w.r.t. Vacuum (eV)"
        } else {
            "E - E_F (eV)"
        }
    }
}

/// 自旋向上
pub const SPIN_UP: RGBColor = RGBColor(250, 38, 160);
/// 自旋向下
pub const SPIN_DOWN: RGBColor = RGBColor(47, 243, 224);

/// 投影曲线配色
pub const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(188, 189, 34),
];

pub(crate) fn plot_err<E: std::fmt::Debug>(e: E) -> CryskitError {
    CryskitError::PlotError(format!("{:?}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_axis_shift() {
        let axis = EnergyAxis {
            emin: -5.0,
            emax: 5.0,
            reference: -4.0,
            vacuum: true,
        };
        assert_eq!(axis.range(), -9.0..1.0);
        assert_eq!(axis.label(), "Energy w.r.t. Vacuum (eV)");
        assert_eq!(ImageFormat::Svg.extension(), "svg");
    }
}
