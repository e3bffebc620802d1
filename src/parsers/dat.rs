//! # CRYSTAL 性质数据文件解析器
//!
//! 读取 properties 程序写出的数据文件，供绘图与功函数计算使用。
//!
//! ## 功能
//! - `_BAND.BAND.dat`: 能带 (k 路径坐标, 各能带能量, 高对称点刻度)
//! - `_DOSS.DOSS.dat`: 态密度及投影；标签取自 `_DOSS.d3` 的注释
//! - `_POTC.POTC.dat`: 平面平均静电势 z–V
//! - `.f25`: ECHG 电荷密度网格
//!
//! 能量统一换算为 eV。
//!
//! ## 依赖关系
//! - 被 `plot/`, `commands/scrape/wf.rs` 使用
//! - 使用 `parsers/rules.rs`

use crate::error::{read_lossy, CryskitError, Result};
use crate::parsers::rules::{hartree_to_ev, parse_number, HARTREE_TO_EV};

use std::path::Path;

fn parse_error(format: &str, path: &Path, reason: impl Into<String>) -> CryskitError {
    CryskitError::ParseError {
        format: format.to_string(),
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

fn numbers(line: &str) -> Vec<f64> {
    line.split_whitespace().filter_map(parse_number).collect()
}

/// 注释或 xmgrace 指令行
fn is_directive(line: &str) -> bool {
    line.starts_with('#') || line.starts_with('@')
}

/// 通道分隔：费米能注释或 `&`
fn is_separator(line: &str) -> bool {
    line.starts_with("# EFERMI") || line.starts_with('&')
}

// ─────────────────────────────────────────────────────────────
// 能带
// ─────────────────────────────────────────────────────────────

/// 能带数据；`alpha[j][i]` 为第 j 条带在第 i 个 k 点的能量 (eV)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BandData {
    pub kpath: Vec<f64>,
    pub alpha: Vec<Vec<f64>>,
    pub beta: Option<Vec<Vec<f64>>>,
    /// 高对称点在 k 路径上的位置
    pub ticks: Vec<f64>,
    pub fermi: Option<f64>,
}

impl BandData {
    pub fn read(path: &Path) -> Result<Self> {
        let text = read_lossy(path)?;
        Self::parse(&text).map_err(|reason| parse_error("BAND.DAT", path, reason))
    }

    /// 首行第 3、5 个字段为 k 点数与能带数；一行数据可能折行
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut lines = text.lines();
        let header: Vec<&str> = lines.next().ok_or("empty file")?.split_whitespace().collect();
        let nk: usize = header
            .get(2)
            .and_then(|t| t.parse().ok())
            .ok_or("header has no k-point count")?;
        let nbands: usize = header
            .get(4)
            .and_then(|t| t.parse().ok())
            .ok_or("header has no band count")?;

        let mut data = BandData {
            alpha: vec![Vec::with_capacity(nk); nbands],
            ..Default::default()
        };
        let mut beta: Vec<Vec<f64>> = vec![Vec::new(); nbands];
        let mut channel = 0;
        let mut pending_ticks = 0;
        let mut row: Vec<f64> = Vec::with_capacity(nbands + 1);

        for line in lines {
            let line = line.trim_start();
            if line.starts_with("@ XAXIS TICK SPEC") {
                pending_ticks = line
                    .split_whitespace()
                    .last()
                    .and_then(|t| t.parse::<usize>().ok())
                    .unwrap_or(0);
                continue;
            }
            if pending_ticks > 0 && line.starts_with("@ XAXIS TICK ") && !line.contains("LABEL") {
                if let Some(pos) = line.split(',').last().and_then(|t| parse_number(t.trim())) {
                    data.ticks.push(pos);
                    pending_ticks -= 1;
                }
                continue;
            }
            if line.starts_with("# EFERMI") {
                data.fermi = line.split_whitespace().last().and_then(parse_number).map(hartree_to_ev);
            }
            if is_separator(line) {
                let current_has_data = if channel == 0 {
                    !data.alpha.first().map(Vec::is_empty).unwrap_or(true)
                } else {
                    !beta.first().map(Vec::is_empty).unwrap_or(true)
                };
                if current_has_data {
                    channel += 1;
                    row.clear();
                }
                if channel >= 2 {
                    break;
                }
                continue;
            }
            if is_directive(line) || line.is_empty() {
                continue;
            }

            row.extend(numbers(line));
            if row.len() < nbands + 1 {
                continue;
            }
            let target = if channel == 0 { &mut data.alpha } else { &mut beta };
            if channel == 0 {
                data.kpath.push(row[0]);
            }
            for (j, band) in target.iter_mut().enumerate() {
                band.push(hartree_to_ev(row[j + 1]));
            }
            row.clear();
        }

        if data.kpath.is_empty() {
            return Err("no band data rows".to_string());
        }
        if beta.first().map(|b| !b.is_empty()).unwrap_or(false) {
            data.beta = Some(beta);
        }
        Ok(data)
    }

    /// 所有能量平移 `shift` eV
    pub fn shifted(mut self, shift: f64) -> Self {
        let apply = |bands: &mut Vec<Vec<f64>>| {
            bands.iter_mut().flatten().for_each(|e| *e += shift);
        };
        apply(&mut self.alpha);
        if let Some(beta) = self.beta.as_mut() {
            apply(beta);
        }
        self.fermi = self.fermi.map(|f| f + shift);
        self
    }
}

// ─────────────────────────────────────────────────────────────
// 态密度
// ─────────────────────────────────────────────────────────────

/// 态密度数据；`alpha[c][i]` 为第 c 列在第 i 个能量点的值 (states/eV)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DosData {
    pub energy: Vec<f64>,
    pub alpha: Vec<Vec<f64>>,
    pub beta: Option<Vec<Vec<f64>>>,
    pub fermi: Option<f64>,
}

impl DosData {
    pub fn read(path: &Path, columns: Option<usize>) -> Result<Self> {
        let text = read_lossy(path)?;
        Self::parse(&text, columns).map_err(|reason| parse_error("DOSS.DAT", path, reason))
    }

    /// `columns` 为投影列数（含总态密度）；未知时按首行推断
    pub fn parse(text: &str, columns: Option<usize>) -> std::result::Result<Self, String> {
        let mut data = DosData::default();
        let mut channels: Vec<Vec<Vec<f64>>> = vec![Vec::new()];
        let mut ncols = columns;
        let mut row: Vec<f64> = Vec::new();

        for line in text.lines().map(str::trim_start) {
            if line.starts_with("# EFERMI") {
                data.fermi = line.split_whitespace().last().and_then(parse_number).map(hartree_to_ev);
                continue;
            }
            if line.starts_with('&') {
                if channels.last().map(|c| !c.is_empty()).unwrap_or(false) {
                    channels.push(Vec::new());
                }
                row.clear();
                continue;
            }
            if is_directive(line) || line.is_empty() {
                continue;
            }

            row.extend(numbers(line));
            let n = *ncols.get_or_insert(row.len().saturating_sub(1));
            if n == 0 || row.len() < n + 1 {
                continue;
            }
            let channel = channels.last_mut().ok_or("no channel")?;
            if channel.is_empty() {
                *channel = vec![Vec::new(); n];
            }
            if channels.len() == 1 {
                data.energy.push(hartree_to_ev(row[0]));
            }
            let channel = channels.last_mut().ok_or("no channel")?;
            for (c, col) in channel.iter_mut().enumerate() {
                col.push(row[c + 1] / HARTREE_TO_EV);
            }
            row.clear();
        }

        if data.energy.is_empty() {
            return Err("no DOS data rows".to_string());
        }
        let mut iter = channels.into_iter().filter(|c| !c.is_empty());
        data.alpha = iter.next().unwrap_or_default();
        data.beta = iter.next();
        Ok(data)
    }

    pub fn shifted(mut self, shift: f64) -> Self {
        self.energy.iter_mut().for_each(|e| *e += shift);
        self.fermi = self.fermi.map(|f| f + shift);
        self
    }
}

/// 从 `_DOSS.d3` 读取投影标签，末尾附加 `Total`
///
/// DOSS 之后一行的首字段为投影数，投影行的 `#` 注释即标签。
pub fn doss_labels(d3: &str) -> Vec<String> {
    let lines: Vec<&str> = d3.lines().collect();
    let start = match lines.iter().position(|l| l.trim_start().starts_with("DOSS")) {
        Some(i) => i,
        None => return vec!["Total".to_string()],
    };
    let count: usize = lines
        .get(start + 1)
        .and_then(|l| l.split_whitespace().next())
        .and_then(|t| t.parse().ok())
        .unwrap_or(0);

    let mut labels: Vec<String> = lines
        .iter()
        .skip(start + 3)
        .take_while(|l| l.trim() != "END")
        .filter_map(|l| l.find('#').map(|i| format_projection_label(&l[i + 1..])))
        .take(count)
        .collect();
    labels.push("Total".to_string());
    labels
}

/// `CU all` → `Cu`，`O P` → `O (p)`
fn format_projection_label(raw: &str) -> String {
    let mut label = format!(" {} ", raw.trim());
    for (from, to) in [(" all ", " "), (" S ", " (s) "), (" P ", " (p) "), (" D ", " (d) "), (" F ", " (f) ")] {
        label = label.replace(from, to);
    }
    let label = label.trim();
    let mut chars: Vec<char> = label.chars().collect();
    if chars.len() > 1 && chars[0].is_ascii_uppercase() && chars[1].is_ascii_uppercase() {
        chars[1] = chars[1].to_ascii_lowercase();
    }
    chars.into_iter().collect()
}

// ─────────────────────────────────────────────────────────────
// 静电势
// ─────────────────────────────────────────────────────────────

/// 平面平均静电势 (z, V)，V 为 Hartree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PotentialProfile {
    pub z: Vec<f64>,
    pub v: Vec<f64>,
}

impl PotentialProfile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = read_lossy(path)?;
        let profile = Self::parse(&text);
        if profile.v.is_empty() {
            return Err(parse_error("POTC.DAT", path, "no potential rows"));
        }
        Ok(profile)
    }

    pub fn parse(text: &str) -> Self {
        let mut profile = PotentialProfile::default();
        for line in text.lines().map(str::trim_start) {
            if is_directive(line) {
                continue;
            }
            let values = numbers(line);
            if values.len() >= 2 {
                profile.z.push(values[0]);
                profile.v.push(values[1]);
            }
        }
        profile
    }

    /// 两端 (真空区) 的静电势
    pub fn ends(&self) -> Option<(f64, f64)> {
        Some((*self.v.first()?, *self.v.last()?))
    }

    /// 以真空能级为零点时的能量平移 (eV)：-(V_top - E_F)
    pub fn vacuum_shift(&self, fermi_hartree: f64) -> Option<f64> {
        self.v.first().map(|v| -hartree_to_ev(v - fermi_hartree))
    }
}

// ─────────────────────────────────────────────────────────────
// 电荷密度
// ─────────────────────────────────────────────────────────────

/// ECHG 二维电荷密度网格 (electron/bohr³)，按行存储
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeDensity {
    pub nx: usize,
    pub ny: usize,
    pub values: Vec<f64>,
}

impl ChargeDensity {
    pub fn read(path: &Path) -> Result<Self> {
        let text = read_lossy(path)?;
        Self::parse(&text).map_err(|reason| parse_error("fort.25", path, reason))
    }

    /// 首行第 2、3 个字段为 nx、ny；跳过 3 行头部后每行 6 个值
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let mut lines = text.lines();
        let header: Vec<&str> = lines.next().ok_or("empty file")?.split_whitespace().collect();
        let nx: usize = header.get(1).and_then(|t| t.parse().ok()).ok_or("missing nx")?;
        let ny: usize = header.get(2).and_then(|t| t.parse().ok()).ok_or("missing ny")?;
        let total = nx * ny;
        let nlines = (total + 5) / 6;

        let values: Vec<f64> = lines
            .skip(2)
            .take(nlines)
            .flat_map(numbers)
            .take(total)
            .collect();
        if values.len() < total {
            return Err(format!("expected {} grid values, found {}", total, values.len()));
        }
        Ok(Self { nx, ny, values })
    }

    pub fn get(&self, ix: usize, iy: usize) -> f64 {
        self.values[iy * self.nx + ix]
    }

    /// 平均值 ± 标准差，作为色标范围
    pub fn clip_range(&self) -> (f64, f64) {
        let n = self.values.len() as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        let var = self.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        (mean - std, mean + std)
    }

    /// 每行 nx 个值的矩阵文本
    pub fn matrix_text(&self) -> String {
        let mut out = String::new();
        for row in self.values.chunks(self.nx) {
            let line: Vec<String> = row.iter().map(|v| format!("{:.10}", v)).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_data() {
        let band = "# x x 3 x 2\n@ XAXIS TICK SPEC 2\n@ XAXIS TICK MAJOR 0, 0.0\n@ XAXIS TICKLABEL 0, G\n@ XAXIS TICK MAJOR 1, 0.5\n@ XAXIS TICKLABEL 1, X\n0.0 -0.30 -0.10\n0.25 -0.29 -0.09\n0.5 -0.28\n -0.08\n# EFERMI (HARTREE)  -0.2000\n0.0 -0.31 -0.05\n0.25 -0.30 -0.04\n0.5 -0.29 -0.03\n";
        let data = BandData::parse(band).unwrap();
        assert_eq!(data.kpath, vec![0.0, 0.25, 0.5]);
        assert_eq!(data.ticks, vec![0.0, 0.5]);
        assert_eq!(data.alpha.len(), 2);
        assert!((data.alpha[1][2] - (-0.08 * 27.2114)).abs() < 1e-9);
        let beta = data.beta.as_ref().unwrap();
        assert!((beta[0][0] - (-0.31 * 27.2114)).abs() < 1e-9);
        assert!((data.fermi.unwrap() - (-0.2 * 27.2114)).abs() < 1e-9);

        let shifted = data.shifted(1.0);
        assert!((shifted.alpha[0][0] - (-0.30 * 27.2114 + 1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_band_without_beta() {
        let band = "# x x 2 x 1\n0.0 -0.1\n1.0 -0.2\n# EFERMI (HARTREE) -0.15\n&\n";
        let data = BandData::parse(band).unwrap();
        assert!(data.beta.is_none());
        assert_eq!(data.alpha[0].len(), 2);
        assert!(BandData::parse("# x x 2 x 1\n").is_err());
    }

    #[test]
    fn test_dos_data_wrapped_rows() {
        let dos = "# EFERMI (HARTREE) -0.1\n-0.5 1.0 2.0\n 3.0\n-0.4 2.0 4.0 6.0\n&\n-0.5 0.5 0.5 1.0\n-0.4 0.5 0.5 1.0\n";
        let data = DosData::parse(dos, Some(3)).unwrap();
        assert_eq!(data.energy.len(), 2);
        assert_eq!(data.alpha.len(), 3);
        assert!((data.alpha[2][0] - 3.0 / 27.2114).abs() < 1e-12);
        assert_eq!(data.beta.as_ref().unwrap()[0].len(), 2);

        let inferred = DosData::parse("-0.5 1.0 2.0\n-0.4 2.0 4.0\n", None).unwrap();
        assert_eq!(inferred.alpha.len(), 2);
    }

    #[test]
    fn test_doss_labels() {
        let d3 = "NEWK\n12 24\n1 0\nDOSS\n3 1000 1 40 1 14 0\n#\n1 1 #MG all\n1 2 #O S\n1 3 #O P\nEND\nEND\n";
        assert_eq!(doss_labels(d3), vec!["Mg", "O (s)", "O (p)", "Total"]);
        assert_eq!(doss_labels("NEWK\nEND\n"), vec!["Total"]);
    }

    #[test]
    fn test_potential_profile() {
        let potc = "# z V\n@ title\n0.0 0.10\n1.0 0.00\n2.0 0.05\n";
        let p = PotentialProfile::parse(potc);
        assert_eq!(p.ends(), Some((0.10, 0.05)));
        let shift = p.vacuum_shift(-0.1).unwrap();
        assert!((shift + 0.2 * 27.2114).abs() < 1e-9);
    }

    #[test]
    fn test_charge_density() {
        let f25 = "-%-0-MAPN    3    2  0.1E+00\nline2\nline3\n1.0 2.0 3.0 4.0 5.0 6.0\n";
        let rho = ChargeDensity::parse(f25).unwrap();
        assert_eq!((rho.nx, rho.ny), (3, 2));
        assert_eq!(rho.get(2, 1), 6.0);
        let (lo, hi) = rho.clip_range();
        assert!(((lo + hi) / 2.0 - 3.5).abs() < 1e-12);
        assert_eq!(rho.matrix_text().lines().count(), 2);
        assert!(ChargeDensity::parse("-%-0-MAPN 3 3\nx\ny\n1 2 3\n").is_err());
    }
}
