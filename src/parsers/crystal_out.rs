//! # CRYSTAL 日志解析器
//!
//! 基于 `rules.rs` 的声明式规则表，从 CRYSTAL `.out` 日志提取带隙、带边、费米能、
//! 总能量、对称性与几何信息。
//!
//! ## 功能
//! - 带隙判定：可能导电态 > 最后报告的直接/间接带隙，α/β 通道分别判定
//! - 输运计算用的价带顶 / 导带底
//! - 原胞参数、不对称单元原子表、最终优化几何
//!
//! ## 依赖关系
//! - 被 `commands/scrape/`, `commands/deck.rs`, `commands/convert.rs` 使用
//! - 使用 `parsers/rules.rs`, `models/`

use crate::models::results::{BandEdges, ChannelGap, GapKind, GapReport, SpinChannel};
use crate::models::{CellParameters, Centering};
use crate::parsers::rules::{
    self, apply, extract, find_last, Anchor, Kind, LogFile, Rule, Token, Value,
};

// ─────────────────────────────────────────────────────────────
// 锚点
// ─────────────────────────────────────────────────────────────

pub const ALPHA_SECTION: Anchor = Anchor::Contains("ALPHA      ELECTRONS");
pub const BETA_SECTION: Anchor = Anchor::Contains("BETA       ELECTRONS");
pub const CONDUCTING: Anchor = Anchor::Prefix("POSSIBLY CONDUCTING STATE");
pub const INDIRECT_GAP: Anchor = Anchor::Prefix("INDIRECT ENERGY BAND GAP:");
pub const DIRECT_GAP: Anchor = Anchor::Prefix("DIRECT ENERGY BAND GAP:");
pub const TOP_VALENCE: Anchor = Anchor::Prefix("TOP OF VALENCE BANDS");
pub const BOTTOM_VIRTUAL: Anchor = Anchor::Prefix("BOTTOM OF VIRTUAL BANDS");
pub const SCF_ENDED: Anchor = Anchor::Contains("SCF ENDED");
pub const FINAL_GEOMETRY: Anchor = Anchor::Prefix("FINAL OPTIMIZED GEOMETRY");
pub const ASYMMETRIC_UNIT: Anchor = Anchor::Prefix("ATOMS IN THE ASYMMETRIC UNIT");
pub const CRYSTALLOGRAPHIC_COORDS: Anchor =
    Anchor::Contains("COORDINATES IN THE CRYSTALLOGRAPHIC CELL");
pub const CARTESIAN_PRIMITIVE: Anchor = Anchor::Prefix("CARTESIAN COORDINATES - PRIMITIVE CELL");
pub const SLAB_MARKERS: [Anchor; 2] = [
    Anchor::Prefix("SLAB CALCULATION"),
    Anchor::Prefix("* TWO DIMENSIONAL SLAB"),
];

/// 带隙数值在 "... GAP:   7.1234 eV" 的倒数第二个字段
const GAP_TOKEN: Token = Token::FromEnd(2);
/// 本征值在 "... EIG -2.44E-01 AU" 的倒数第二个字段
const EIGEN_TOKEN: Token = Token::FromEnd(2);

/// 标量量规则表
pub const SCALAR_RULES: &[Rule] = &[
    Rule::new("fermi_energy", Anchor::Contains("FERMI ENERGY")).last(),
    Rule::new("total_energy", Anchor::Contains("ETOT(AU)"))
        .token(Token::Index(3))
        .kind(Kind::Hartree)
        .last(),
    Rule::new("orbital_count", Anchor::Prefix("NUMBER OF AO"))
        .token(Token::Index(3))
        .kind(Kind::Int),
    Rule::new("irreducible_atoms", Anchor::Prefix("NUMBER OF IRREDUCIBLE"))
        .kind(Kind::Int)
        .last(),
    Rule::new("space_group_symbol", Anchor::Prefix("SPACE GROUP"))
        .token(Token::Index(4))
        .kind(Kind::Text),
];

/// 原胞参数：优化结束后的表优先，其次是几何输入段的表
const PRIMITIVE_CELL_RULES: &[Rule] = &[
    Rule::new(
        "cell",
        Anchor::Prefix("LATTICE PARAMETERS  (ANGSTROMS AND DEGREES) - PRIMITIVE CELL"),
    )
    .offset(2)
    .token(Token::Range(0, 6))
    .last(),
    Rule::new("cell", Anchor::Prefix("PRIMITIVE CELL"))
        .offset(2)
        .token(Token::Range(0, 6))
        .last(),
];

const CRYSTALLOGRAPHIC_CELL_RULE: Rule = Rule::new("cell", Anchor::Prefix("CRYSTALLOGRAPHIC CELL"))
    .offset(2)
    .token(Token::Range(0, 6))
    .last();

// ─────────────────────────────────────────────────────────────
// 标量
// ─────────────────────────────────────────────────────────────

/// 费米能 (Hartree，日志原值，与 POTC 静电势同单位)
pub fn fermi_energy(log: &LogFile) -> Option<f64> {
    extract(&log.lines, SCALAR_RULES).float("fermi_energy")
}

/// 最后一次 SCF 的总能量 (eV)
pub fn total_energy(log: &LogFile) -> Option<f64> {
    extract(&log.lines, SCALAR_RULES).float("total_energy")
}

/// 基函数（AO）数目
pub fn orbital_count(log: &LogFile) -> Option<u32> {
    extract(&log.lines, SCALAR_RULES)
        .int("orbital_count")
        .and_then(|n| u32::try_from(n).ok())
}

/// 不可约原子数
pub fn irreducible_atom_count(log: &LogFile) -> Option<usize> {
    extract(&log.lines, SCALAR_RULES)
        .int("irreducible_atoms")
        .and_then(|n| usize::try_from(n).ok())
}

/// "SPACE GROUP (CENTROSYMMETRIC) : F M 3 M" 中冒号后的符号
pub fn space_group_symbol(log: &LogFile) -> Option<String> {
    let idx = rules::find_first(&log.lines, Anchor::Prefix("SPACE GROUP"))?;
    let line = &log.lines[idx];
    match line.split_once(':') {
        Some((_, symbol)) if !symbol.trim().is_empty() => Some(symbol.trim().to_string()),
        _ => extract(&log.lines, SCALAR_RULES)
            .text("space_group_symbol")
            .map(|s| s.to_string()),
    }
}

/// 二维平板计算
pub fn is_slab(log: &LogFile) -> bool {
    SLAB_MARKERS
        .iter()
        .any(|anchor| rules::find_first(&log.lines, *anchor).is_some())
}

/// 心型字母
pub fn centering(log: &LogFile) -> Option<Centering> {
    space_group_symbol(log).and_then(|s| Centering::from_symbol(&s))
}

fn as_float(v: Value) -> Option<f64> {
    match v {
        Value::Float(f) => Some(f),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────
// 带隙
// ─────────────────────────────────────────────────────────────

/// 按 ALPHA / BETA 段落拆分日志行；无自旋段落时返回 (全部行, None)
pub fn split_spin_channels<S: AsRef<str>>(lines: &[S]) -> (Vec<&str>, Option<Vec<&str>>) {
    let mut alpha = Vec::new();
    let mut beta = Vec::new();
    let mut current: Option<SpinChannel> = None;
    let mut polarized = false;

    for line in lines {
        let line = line.as_ref();
        if ALPHA_SECTION.matches(line) {
            current = Some(SpinChannel::Alpha);
            polarized = true;
            continue;
        }
        if BETA_SECTION.matches(line) {
            current = Some(SpinChannel::Beta);
            polarized = true;
            continue;
        }
        match current {
            Some(SpinChannel::Beta) => beta.push(line),
            // 首个自旋段落之前的内容也归入 α
            _ => alpha.push(line),
        }
    }

    if polarized {
        (alpha, Some(beta))
    } else {
        (alpha, None)
    }
}

/// 单通道带隙
///
/// 只要出现可能导电态，带隙为 0，带边取该行报告的费米能；
/// 否则取行序上最后一次直接/间接带隙报告。价带顶为通道内所有
/// TOP OF VALENCE 本征值的最大值，导带底 = 价带顶 + 带隙。
pub fn channel_gap(lines: &[&str]) -> ChannelGap {
    if let Some(idx) = find_last(lines, CONDUCTING) {
        let fermi = rules::parse_token(lines[idx], Token::FromEnd(1), Kind::Hartree).and_then(as_float);
        return ChannelGap {
            gap: Some(0.0),
            kind: Some(GapKind::Conducting),
            vbm: fermi,
            cbm: fermi,
        };
    }

    let last_report = lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| {
            if INDIRECT_GAP.matches(l) {
                Some((i, GapKind::Indirect))
            } else if DIRECT_GAP.matches(l) {
                Some((i, GapKind::Direct))
            } else {
                None
            }
        })
        .last();

    let (idx, kind) = match last_report {
        Some(r) => r,
        None => return ChannelGap::default(),
    };

    let gap = rules::parse_token(lines[idx], GAP_TOKEN, Kind::Float).and_then(as_float);
    let vbm = eigen_extremes(lines).0;
    let cbm = match (vbm, gap) {
        (Some(v), Some(g)) => Some(v + g),
        _ => None,
    };

    ChannelGap {
        gap,
        kind: Some(kind),
        vbm,
        cbm,
    }
}

/// 通道内价带顶最大值与导带底最小值，单位 eV
fn eigen_extremes(lines: &[&str]) -> (Option<f64>, Option<f64>) {
    let mut top: Option<f64> = None;
    let mut bottom: Option<f64> = None;
    for line in lines {
        let eigen = || rules::parse_token(line, EIGEN_TOKEN, Kind::Hartree).and_then(as_float);
        if TOP_VALENCE.matches(line) {
            if let Some(v) = eigen() {
                top = Some(top.map_or(v, |cur| cur.max(v)));
            }
        } else if BOTTOM_VIRTUAL.matches(line) {
            if let Some(v) = eigen() {
                bottom = Some(bottom.map_or(v, |cur| cur.min(v)));
            }
        }
    }
    (top, bottom)
}

/// 完整带隙报告；总体取带隙较小的通道，相等时取 α
pub fn gap_report<S: AsRef<str>>(lines: &[S]) -> GapReport {
    let (alpha_lines, beta_lines) = split_spin_channels(lines);
    let alpha = channel_gap(&alpha_lines);
    let beta = beta_lines.map(|b| channel_gap(&b));

    let total = match beta {
        Some(b) => match (alpha.gap, b.gap) {
            (Some(ga), Some(gb)) if gb < ga => b,
            (None, Some(_)) => b,
            _ => alpha,
        },
        None => alpha,
    };

    GapReport { alpha, beta, total }
}

/// 输运计算的能量边界：截至第一个 SCF ENDED，价带顶取各通道最大、导带底取各通道最小
///
/// 导带底来自 BOTTOM OF VIRTUAL 行；导电通道取费米能，缺少该行时退回 VBM + Eg。
pub fn transport_edges(log: &LogFile) -> Option<BandEdges> {
    let (alpha, beta) = split_spin_channels(log.until(SCF_ENDED));
    let mut vbm: Option<f64> = None;
    let mut cbm: Option<f64> = None;

    for lines in std::iter::once(alpha).chain(beta) {
        let channel = channel_gap(&lines);
        let (v, c) = match channel.kind {
            None => continue,
            Some(GapKind::Conducting) => (channel.vbm, channel.cbm),
            Some(_) => (channel.vbm, eigen_extremes(&lines).1.or(channel.cbm)),
        };
        if let Some(v) = v {
            vbm = Some(vbm.map_or(v, |cur| cur.max(v)));
        }
        if let Some(c) = c {
            cbm = Some(cbm.map_or(c, |cur| cur.min(c)));
        }
    }

    Some(BandEdges { vbm: vbm?, cbm: cbm? })
}

// ─────────────────────────────────────────────────────────────
// 几何
// ─────────────────────────────────────────────────────────────

/// 日志原子表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct LogAtom {
    /// 日志中打印的原子序数（赝势原子可能 +200）
    pub label_number: u32,
    pub symbol: String,
    pub position: [f64; 3],
    /// T = 不可约原子
    pub irreducible: bool,
}

impl LogAtom {
    /// 真实原子序数
    pub fn atomic_number(&self) -> u32 {
        if self.label_number > 100 {
            self.label_number % 100
        } else {
            self.label_number
        }
    }
}

/// 最终优化几何
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedGeometry {
    pub cell: CellParameters,
    /// 不可约原子
    pub atoms: Vec<LogAtom>,
    /// 来自惯用晶胞 (CRYSTALLOGRAPHIC CELL) 而非原胞
    pub conventional: bool,
}

/// 解析 "   1 T  12 MG    0.0000E+00  0.0000E+00  0.0000E+00" 形式的行
fn parse_atom_row(line: &str) -> Option<LogAtom> {
    let f: Vec<&str> = line.split_whitespace().collect();
    if f.len() < 7 || (f[1] != "T" && f[1] != "F") {
        return None;
    }
    let label_number = f[2].parse::<u32>().ok()?;
    let position = [
        rules::parse_number(f[4])?,
        rules::parse_number(f[5])?,
        rules::parse_number(f[6])?,
    ];
    Some(LogAtom {
        label_number,
        symbol: crate::models::element::normalize_symbol(f[3]),
        position,
        irreducible: f[1] == "T",
    })
}

/// 锚点之后连续的原子行（跳过表头与分隔线，遇到第一条非原子行停止）
fn atom_table(lines: &[String], anchor_idx: usize) -> Vec<LogAtom> {
    let mut atoms = Vec::new();
    for line in lines.iter().skip(anchor_idx + 1) {
        match parse_atom_row(line) {
            Some(atom) => atoms.push(atom),
            None if atoms.is_empty() => continue,
            None => break,
        }
    }
    atoms
}

/// 原胞参数（优化后的表优先）
pub fn primitive_cell<S: AsRef<str>>(lines: &[S]) -> Option<CellParameters> {
    PRIMITIVE_CELL_RULES
        .iter()
        .find_map(|r| apply(lines, r))
        .and_then(cell_from_value)
}

fn cell_from_value(v: Value) -> Option<CellParameters> {
    match v {
        Value::List(p) if p.len() >= 6 => Some(CellParameters::new(p[0], p[1], p[2], p[3], p[4], p[5])),
        _ => None,
    }
}

/// 最后一张不可约单元原子表（全部原子，含 T/F 标记）
pub fn asymmetric_atoms(log: &LogFile) -> Vec<LogAtom> {
    match find_last(&log.lines, ASYMMETRIC_UNIT) {
        Some(idx) => atom_table(&log.lines, idx),
        None => Vec::new(),
    }
}

/// 最终优化几何：惯用晶胞优先，否则原胞
pub fn final_optimized_geometry(log: &LogFile) -> Option<OptimizedGeometry> {
    let start = find_last(&log.lines, FINAL_GEOMETRY)?;
    let tail = &log.lines[start..];

    if let Some(idx) = rules::find_first(tail, CRYSTALLOGRAPHIC_COORDS) {
        let cell = apply(tail, &CRYSTALLOGRAPHIC_CELL_RULE).and_then(cell_from_value);
        let atoms: Vec<LogAtom> = atom_table(tail, idx)
            .into_iter()
            .filter(|a| a.irreducible)
            .collect();
        if let (Some(cell), false) = (cell, atoms.is_empty()) {
            return Some(OptimizedGeometry {
                cell,
                atoms,
                conventional: true,
            });
        }
    }

    let cell = primitive_cell(tail)?;
    let idx = rules::find_first(tail, ASYMMETRIC_UNIT)?;
    let atoms: Vec<LogAtom> = atom_table(tail, idx)
        .into_iter()
        .filter(|a| a.irreducible)
        .collect();
    if atoms.is_empty() {
        return None;
    }
    Some(OptimizedGeometry {
        cell,
        atoms,
        conventional: false,
    })
}

/// 原胞笛卡尔坐标 (Å)：(原子序数, [x, y, z])
pub fn cartesian_primitive_atoms(log: &LogFile) -> Vec<(u32, [f64; 3])> {
    let idx = match find_last(&log.lines, CARTESIAN_PRIMITIVE) {
        Some(i) => i,
        None => return Vec::new(),
    };
    let mut atoms = Vec::new();
    // 锚点后依次为分隔线、表头、分隔线，第 4 行起为原子
    for line in log.lines.iter().skip(idx + 4) {
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() < 6 {
            break;
        }
        let n = f.len();
        let z = match f[n - 5].parse::<u32>() {
            Ok(z) => if z > 100 { z % 100 } else { z },
            Err(_) => break,
        };
        let pos = match (
            rules::parse_number(f[n - 3]),
            rules::parse_number(f[n - 2]),
            rules::parse_number(f[n - 1]),
        ) {
            (Some(x), Some(y), Some(zz)) => [x, y, zz],
            _ => break,
        };
        atoms.push((z, pos));
    }
    atoms
}
