//! # CRYSTAL `.d12` 输入文件
//!
//! 生成、读取与改写 CRYSTAL 主输入文件。CRYSTAL 按固定格式逐行读取，
//! 写出的每一行都必须与关键字语法完全一致。
//!
//! ## 功能
//! - `write_deck`: 由结构与 `DeckOptions` 生成完整输入
//! - `DeckHeader`: 读取标题、维度、空间群与 SHRINK 行
//! - `fix_shrink`: 各向异性 k 点改为各向同性
//! - `rewrite_optimized`: 用优化后几何替换晶胞与原子，去掉 OPTGEOM 块
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs`, `commands/deck.rs` 使用
//! - 使用 `models/`, `parsers/crystal_out.rs`

use crate::error::{read_to_string, CryskitError, Result};
use crate::models::options::{Basis, CalculationType, DeckOptions, OriginSetting, ScfMethod};
use crate::models::symmetry::has_origin_choice;
use crate::models::{CellParameters, CrystalSystem, Dimensionality, Structure};
use crate::parsers::crystal_out::OptimizedGeometry;

use std::collections::BTreeSet;

/// k 点候选值
const K_CANDIDATES: [u32; 21] = [
    2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 15, 16, 18, 20, 24, 30, 36, 40, 45, 48, 60,
];
/// 找不到满足窗口的 k 时的默认值
const K_DEFAULT: u32 = 12;
/// k·L 窗口 (Å)
const K_WINDOW: (f64, f64) = (40.0, 80.0);
/// 原子数超过此值时加大积分缓冲区
const LARGE_SYSTEM_ATOMS: usize = 5;

/// 使用赝势的元素（Rb-Mo, Ru-Hg）
fn is_ecp_element(z: u32) -> bool {
    (37..=42).contains(&z) || (44..=80).contains(&z)
}

/// CRYSTAL 浮点格式：定点小数后去掉末尾 0，零写作 `0.0`
pub fn format_crystal_float(value: f64) -> String {
    if value == 0.0 {
        return "0.0".to_string();
    }
    let precision = if value.abs() < 1e-4 { 10 } else { 8 };
    let s = format!("{:.*}", precision, value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "0" || s == "-0" {
        "0.0".to_string()
    } else {
        s.to_string()
    }
}

// ─────────────────────────────────────────────────────────────
// k 点
// ─────────────────────────────────────────────────────────────

/// 单个方向的 k：满足 40 < k·L < 80 的最小候选值
fn k_for_length(length: f64) -> u32 {
    K_CANDIDATES
        .iter()
        .copied()
        .find(|&k| {
            let kl = k as f64 * length;
            kl > K_WINDOW.0 && kl < K_WINDOW.1
        })
        .unwrap_or(K_DEFAULT)
}

/// 不小于 value 的最小候选值
fn k_at_least(value: u32) -> u32 {
    K_CANDIDATES
        .iter()
        .copied()
        .find(|&k| k >= value)
        .unwrap_or(K_CANDIDATES[K_CANDIDATES.len() - 1])
}

/// 按晶格常数与对称性生成 (ka, kb, kc)
///
/// 立方三个方向取同一值；四方、三方、六方 ka = kb；非周期方向为 1。
pub fn kpoints(cell: &CellParameters, space_group: u32, dim: Dimensionality) -> (u32, u32, u32) {
    let mut ka = k_for_length(cell.a);
    let mut kb = k_for_length(cell.b);
    let mut kc = k_for_length(cell.c);

    if dim == Dimensionality::Crystal && space_group > 1 {
        match CrystalSystem::from_space_group(space_group) {
            Some(CrystalSystem::Cubic) => {
                let avg = ((ka + kb + kc) as f64 / 3.0).round() as u32;
                let k = k_at_least(avg);
                ka = k;
                kb = k;
                kc = k;
            }
            Some(CrystalSystem::Tetragonal)
            | Some(CrystalSystem::Trigonal)
            | Some(CrystalSystem::Hexagonal) => {
                let k = k_at_least(((ka + kb) as f64 / 2.0).round() as u32);
                ka = k;
                kb = k;
            }
            Some(CrystalSystem::Orthorhombic) => {
                ka = k_at_least(ka);
                kb = k_at_least(kb);
                kc = k_at_least(kc);
            }
            _ => {}
        }
    }

    match dim {
        Dimensionality::Crystal => (ka, kb, kc),
        Dimensionality::Slab => (ka, kb, 1),
        Dimensionality::Polymer => (ka, 1, 1),
        Dimensionality::Molecule => (0, 0, 0),
    }
}

// ─────────────────────────────────────────────────────────────
// 写出
// ─────────────────────────────────────────────────────────────

/// 晶胞行：仅包含该晶系的自由参数
pub fn cell_line(cell: &CellParameters, system: CrystalSystem) -> String {
    cell.free_values(system)
        .into_iter()
        .map(format_crystal_float)
        .collect::<Vec<_>>()
        .join(" ")
}

/// CRYSTAL 块首行 (IFLAG IFHR IFSO)
fn origin_line(structure: &Structure, setting: OriginSetting) -> &'static str {
    if !has_origin_choice(structure.space_group) {
        return "0 0 0";
    }
    match setting {
        OriginSetting::Standard => "0 0 0",
        OriginSetting::Alternate => "0 0 1",
        OriginSetting::Auto => {
            // 227 号：原子在原点而非 1/8 处时为第二原点
            let near = |p: &[f64; 3], v: f64| p.iter().all(|x| (x - v).abs() < 1e-3);
            let wrapped: Vec<[f64; 3]> = structure.atoms.iter().map(|a| a.wrapped()).collect();
            let at_origin = wrapped.iter().any(|p| near(p, 0.0));
            let at_eighth = wrapped.iter().any(|p| near(p, 0.125));
            if structure.space_group == 227 && at_origin && !at_eighth {
                "0 0 1"
            } else {
                "0 0 0"
            }
        }
    }
}

fn geometry_block(out: &mut Vec<String>, structure: &Structure, options: &DeckOptions) {
    let cell = &structure.cell;
    match options.dimensionality {
        Dimensionality::Crystal => {
            out.push(origin_line(structure, options.origin).to_string());
            out.push(structure.space_group.to_string());
            out.push(cell_line(cell, structure.crystal_system()));
        }
        Dimensionality::Slab => {
            out.push(structure.space_group.to_string());
            out.push(
                [cell.a, cell.b, cell.gamma]
                    .iter()
                    .map(|v| format_crystal_float(*v))
                    .collect::<Vec<_>>()
                    .join(" "),
            );
        }
        Dimensionality::Polymer => {
            out.push(structure.space_group.to_string());
            out.push(format_crystal_float(cell.a));
        }
        Dimensionality::Molecule => {
            out.push("1".to_string());
        }
    }

    let ecp = options.ecp_labels && matches!(options.basis, Basis::External { .. });
    out.push(structure.atoms.len().to_string());
    for atom in &structure.atoms {
        let z = if ecp && is_ecp_element(atom.atomic_number) {
            atom.atomic_number + 200
        } else {
            atom.atomic_number
        };
        let p = atom.wrapped();
        out.push(format!(
            "{} {} {} {}",
            z,
            format_crystal_float(p[0]),
            format_crystal_float(p[1]),
            format_crystal_float(p[2])
        ));
    }
}

fn calculation_block(out: &mut Vec<String>, options: &DeckOptions) {
    match options.calculation {
        CalculationType::Sp => out.push("END".to_string()),
        CalculationType::Opt => {
            let s = &options.opt_settings;
            out.push("OPTGEOM".to_string());
            if let Some(opt) = options.optimization {
                out.push(opt.keyword().to_string());
            }
            out.push("MAXCYCLE".to_string());
            out.push(s.maxcycle.to_string());
            out.push("TOLDEG".to_string());
            out.push(format_crystal_float(s.toldeg));
            out.push("TOLDEX".to_string());
            out.push(format_crystal_float(s.toldex));
            out.push("TOLDEE".to_string());
            out.push(s.toldee.to_string());
            if let Some(r) = s.maxtradius {
                out.push("MAXTRADIUS".to_string());
                out.push(format_crystal_float(r));
            }
            out.push("ENDOPT".to_string());
            out.push("END".to_string());
        }
        CalculationType::Freq => {
            out.push("FREQCALC".to_string());
            out.push("NUMDERIV".to_string());
            out.push(options.numderiv.to_string());
            out.push("END".to_string());
            out.push("END".to_string());
        }
    }
}

fn basis_block(out: &mut Vec<String>, structure: &Structure, options: &DeckOptions) -> Result<()> {
    match &options.basis {
        Basis::External { dir } => {
            let elements: BTreeSet<u32> = structure.atoms.iter().map(|a| a.atomic_number).collect();
            for z in elements {
                let path = dir.join(z.to_string());
                if !path.exists() {
                    return Err(CryskitError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                let text = read_to_string(&path)?;
                out.extend(text.lines().map(|l| l.trim_end().to_string()).filter(|l| !l.is_empty()));
            }
            out.push("99 0".to_string());
            out.push("END".to_string());
        }
        Basis::Internal { name } => {
            out.push("BASISSET".to_string());
            out.push(name.clone());
            out.push("END".to_string());
        }
    }
    Ok(())
}

fn hamiltonian_block(out: &mut Vec<String>, structure: &Structure, options: &DeckOptions) {
    out.push("DFT".to_string());
    if options.spin_polarized {
        out.push("SPIN".to_string());
    }
    out.push(options.functional_keyword());
    if !options.grid.eq_ignore_ascii_case("DEFAULT") {
        out.push(options.grid.clone());
    }
    out.push("ENDDFT".to_string());

    let (tolinteg, toldee) = options.tolerances();
    out.push("TOLINTEG".to_string());
    out.push(tolinteg);
    out.push("TOLDEE".to_string());
    out.push(toldee.to_string());

    let (ka, kb, kc) = kpoints(&structure.cell, structure.space_group, options.dimensionality);
    let kmax = ka.max(kb).max(kc);
    out.push("SHRINK".to_string());
    out.push(format!("0 {}", 2 * kmax));
    out.push(format!("{} {} {}", ka, kb, kc));

    if let Some(width) = options.smearing {
        out.push("SMEAR".to_string());
        out.push(format!("{:.6}", width));
    }
    out.push("SCFDIR".to_string());
    if structure.atoms.len() > LARGE_SYSTEM_ATOMS {
        out.push("BIPOSIZE".to_string());
        out.push("110000000".to_string());
        out.push("EXCHSIZE".to_string());
        out.push("110000000".to_string());
    }
    out.push("MAXCYCLE".to_string());
    out.push(options.scf_maxcycle.to_string());
    out.push("FMIXING".to_string());
    out.push(options.fmixing.to_string());
    out.push(options.scf_method.keyword().to_string());
    if options.scf_method == ScfMethod::Diis {
        out.push("HISTDIIS".to_string());
        out.push("100".to_string());
    }
    out.push("PPAN".to_string());
    out.push("END".to_string());
}

/// 生成完整 `.d12` 文本
pub fn write_deck(structure: &Structure, options: &DeckOptions) -> Result<String> {
    let mut out = vec![
        structure.title.clone(),
        options.dimensionality.keyword().to_string(),
    ];
    geometry_block(&mut out, structure, options);
    calculation_block(&mut out, options);
    basis_block(&mut out, structure, options)?;
    hamiltonian_block(&mut out, structure, options);

    let mut text = out.join("\n");
    text.push('\n');
    Ok(text)
}

// ─────────────────────────────────────────────────────────────
// 读取
// ─────────────────────────────────────────────────────────────

/// `.d12` 头部信息
#[derive(Debug, Clone, PartialEq)]
pub struct DeckHeader {
    pub title: String,
    pub dimensionality: Option<Dimensionality>,
    pub space_group: Option<u32>,
    /// SHRINK 之后的行（各向异性时两行）
    pub shrink: Vec<String>,
}

impl DeckHeader {
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let title = lines.first().map(|s| s.to_string()).unwrap_or_default();
        let dimensionality = lines.get(1).and_then(|l| Dimensionality::from_keyword(l));

        // CRYSTAL 块第 3 行为原点设置，其余维度直接是空间群
        let sg_line = match dimensionality {
            Some(Dimensionality::Crystal) => lines.get(3),
            Some(_) => lines.get(2),
            None => None,
        };
        let space_group = sg_line
            .and_then(|l| l.split_whitespace().next())
            .and_then(|t| t.parse::<u32>().ok());

        Self {
            title,
            dimensionality,
            space_group,
            shrink: shrink_lines(&lines),
        }
    }
}

fn shrink_lines(lines: &[&str]) -> Vec<String> {
    let idx = match lines.iter().position(|l| *l == "SHRINK") {
        Some(i) => i,
        None => return Vec::new(),
    };
    let mut shrink = Vec::new();
    if let Some(first) = lines.get(idx + 1) {
        shrink.push(first.to_string());
        if first.split_whitespace().next() == Some("0") {
            if let Some(second) = lines.get(idx + 2) {
                shrink.push(second.to_string());
            }
        }
    }
    shrink
}

/// 将 SHRINK 的各向异性 k 行改为最小 k 重复三次
///
/// 返回改写后的文本，若无需修改返回 `None`。
pub fn fix_shrink(text: &str) -> Option<String> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let idx = lines.iter().position(|l| l.trim() == "SHRINK")?;
    if lines.get(idx + 1)?.split_whitespace().next() != Some("0") {
        return None;
    }
    let k_line = lines.get(idx + 2)?;
    let ks: Vec<u32> = k_line
        .split_whitespace()
        .filter_map(|t| t.parse().ok())
        .collect();
    let min = *ks.iter().min()?;
    if ks.len() == 3 && ks.iter().all(|&k| k == min) {
        return None;
    }
    lines[idx + 2] = format!("{} {} {}", min, min, min);

    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    Some(out)
}

/// 用优化后几何改写输入：替换晶胞与不可约原子，去掉 OPTGEOM…ENDOPT
pub fn rewrite_optimized(deck: &str, geometry: &OptimizedGeometry) -> Result<String> {
    let lines: Vec<&str> = deck.lines().collect();
    let bad = |reason: &str| CryskitError::ParseError {
        format: "d12".to_string(),
        path: Default::default(),
        reason: reason.to_string(),
    };

    let geo_idx = lines
        .iter()
        .position(|l| Dimensionality::from_keyword(l.trim()).is_some())
        .ok_or_else(|| bad("no geometry keyword"))?;
    let dim = Dimensionality::from_keyword(lines[geo_idx].trim()).ok_or_else(|| bad("no geometry keyword"))?;

    let mut out: Vec<String> = lines[..=geo_idx].iter().map(|l| l.to_string()).collect();
    let mut i = geo_idx + 1;
    let cell = &geometry.cell;

    let sg_idx = match dim {
        Dimensionality::Crystal => {
            out.push(lines.get(i).ok_or_else(|| bad("truncated geometry block"))?.to_string());
            i + 1
        }
        Dimensionality::Slab | Dimensionality::Polymer => i,
        Dimensionality::Molecule => return Err(bad("MOLECULE decks have no cell to rewrite")),
    };
    let sg_text = lines.get(sg_idx).ok_or_else(|| bad("missing space group"))?;
    let space_group: u32 = sg_text
        .split_whitespace()
        .next()
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| bad("invalid space group line"))?;
    out.push(sg_text.to_string());

    let new_cell = match dim {
        Dimensionality::Crystal => {
            let system = CrystalSystem::from_space_group(space_group)
                .ok_or(CryskitError::InvalidSpaceGroup(space_group))?;
            cell_line(cell, system)
        }
        Dimensionality::Slab => [cell.a, cell.b, cell.gamma]
            .iter()
            .map(|v| format_crystal_float(*v))
            .collect::<Vec<_>>()
            .join(" "),
        _ => format_crystal_float(cell.a),
    };
    out.push(new_cell);
    i = sg_idx + 2;

    // 跳过旧原子表
    let old_count: usize = lines
        .get(i)
        .and_then(|l| l.split_whitespace().next())
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| bad("invalid atom count line"))?;
    i += 1 + old_count;
    if i > lines.len() {
        return Err(bad("atom table shorter than its count"));
    }

    out.push(geometry.atoms.len().to_string());
    for atom in &geometry.atoms {
        out.push(format!(
            "{} {} {} {}",
            atom.label_number,
            format_crystal_float(atom.position[0]),
            format_crystal_float(atom.position[1]),
            format_crystal_float(atom.position[2])
        ));
    }

    let mut in_opt = false;
    for line in &lines[i..] {
        match line.trim() {
            "OPTGEOM" => in_opt = true,
            "ENDOPT" if in_opt => in_opt = false,
            _ if in_opt => {}
            _ => out.push(line.to_string()),
        }
    }
    if in_opt {
        return Err(bad("unterminated OPTGEOM block"));
    }

    let mut text = out.join("\n");
    text.push('\n');
    Ok(text)
}
