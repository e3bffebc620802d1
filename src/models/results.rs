//! # 日志提取结果数据模型
//!
//! 每个材料一行的物理量记录。未找到的量一律为 `None`，写 CSV 时为空单元格。
//!
//! ## 依赖关系
//! - 被 `parsers/crystal_out.rs` 填充
//! - 被 `commands/scrape/` 写出

use serde::{Deserialize, Serialize};
use std::fmt;

/// 带隙类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapKind {
    Direct,
    Indirect,
    /// 可能导电态，带隙强制为 0
    Conducting,
}

impl fmt::Display for GapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapKind::Direct => write!(f, "DIRECT"),
            GapKind::Indirect => write!(f, "INDIRECT"),
            GapKind::Conducting => write!(f, "COND"),
        }
    }
}

/// 自旋通道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinChannel {
    Alpha,
    Beta,
}

/// 单个通道的带隙与带边 (eV)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelGap {
    pub gap: Option<f64>,
    pub kind: Option<GapKind>,
    pub vbm: Option<f64>,
    pub cbm: Option<f64>,
}

impl ChannelGap {
    pub fn is_empty(&self) -> bool {
        self.gap.is_none() && self.kind.is_none()
    }
}

/// 带隙报告：α/β 通道与总体
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GapReport {
    pub alpha: ChannelGap,
    /// 仅自旋极化计算存在
    pub beta: Option<ChannelGap>,
    pub total: ChannelGap,
}

/// 导带/价带能量边界 (eV)，用于输运计算
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandEdges {
    pub vbm: f64,
    pub cbm: f64,
}

/// 功函数结果 (eV)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkFunction {
    pub potential_top: Option<f64>,
    pub potential_bottom: Option<f64>,
    pub wf_top: Option<f64>,
    pub wf_bottom: Option<f64>,
    pub wf_max: Option<f64>,
    pub wf_min: Option<f64>,
    pub potential_max: Option<f64>,
    pub potential_min: Option<f64>,
    pub potential_avg: Option<f64>,
    pub fermi: Option<f64>,
}

impl WorkFunction {
    /// 由两端静电势与费米能 (均为 Hartree) 计算；缺少费米能时功函数列为空
    pub fn from_potential(top: f64, bottom: f64, fermi: Option<f64>) -> Self {
        let he = crate::parsers::rules::hartree_to_ev;
        let (v_top, v_bot) = (he(top), he(bottom));
        let wf = fermi.map(|ef| (he(top - ef), he(bottom - ef)));
        Self {
            potential_top: Some(v_top),
            potential_bottom: Some(v_bot),
            wf_top: wf.map(|w| w.0),
            wf_bottom: wf.map(|w| w.1),
            wf_max: wf.map(|w| w.0.max(w.1)),
            wf_min: wf.map(|w| w.0.min(w.1)),
            potential_max: Some(v_top.max(v_bot)),
            potential_min: Some(v_top.min(v_bot)),
            potential_avg: Some((v_top + v_bot) / 2.0),
            fermi: fermi.map(he),
        }
    }
}

/// 导电性分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectronicState {
    Conducting,
    Semiconducting,
    Insulating,
}

impl ElectronicState {
    /// 0 → COND，(0, 9) eV → SEMI，其余 → INSU
    pub fn classify(gap_ev: f64) -> Self {
        if gap_ev <= 0.0 {
            ElectronicState::Conducting
        } else if gap_ev < 9.0 {
            ElectronicState::Semiconducting
        } else {
            ElectronicState::Insulating
        }
    }
}

impl fmt::Display for ElectronicState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectronicState::Conducting => write!(f, "COND"),
            ElectronicState::Semiconducting => write!(f, "SEMI"),
            ElectronicState::Insulating => write!(f, "INSU"),
        }
    }
}

/// 单个日志的性质摘要
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogProperties {
    pub gap: Option<f64>,
    pub kind: Option<GapKind>,
    pub energy: Option<f64>,
    pub mean_distance: Option<f64>,
    pub state: Option<ElectronicState>,
}

/// 可选浮点数的 CSV 单元格
pub fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

/// 可选可显示值的 CSV 单元格
pub fn cell_display<T: fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
