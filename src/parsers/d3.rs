//! # CRYSTAL `.d3` 性质计算输入
//!
//! 能带路径模板库与 BOLTZTRA 输运输入。
//!
//! ## 功能
//! - 按 (晶系, 格子中心化) 选择能带路径模板，可由模板目录覆盖
//! - `band_deck`: NEWK + BAND 输入
//! - `transport_deck`: NEWK + BOLTZTRA 输入
//! - `path_labels`: 从已有 `_BAND.d3` 读回高对称点标签
//!
//! ## 依赖关系
//! - 被 `commands/deck.rs` 使用
//! - 使用 `models/symmetry.rs`, `models/results.rs`

use crate::error::{read_to_string, CryskitError, Result};
use crate::models::results::BandEdges;
use crate::models::{Centering, CrystalSystem};

use std::path::Path;

/// 沿路径每段的 k 点数
const BAND_POINTS: u32 = 1000;
/// 默认 NEWK 网格
const DEFAULT_NEWK: &str = "48 48";

/// 能带路径模板
#[derive(Debug, Clone, PartialEq)]
pub struct BandTemplate {
    /// 显式坐标的分母；0 表示使用符号标签
    pub iss: u32,
    /// 每行一段 (`G X` 或 `0 0 0  1 0 0`)
    pub segments: Vec<String>,
}

impl BandTemplate {
    fn symbolic(segments: &[&str]) -> Self {
        Self {
            iss: 0,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// 读取模板文本：段落行直到 END；可选首行 `ISS n`
    pub fn parse(text: &str) -> Option<Self> {
        let mut iss = 0;
        let mut segments = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.eq_ignore_ascii_case("END") {
                break;
            }
            let mut tokens = line.split_whitespace();
            if tokens.next().map(|t| t.eq_ignore_ascii_case("ISS")).unwrap_or(false) {
                iss = tokens.next()?.parse().ok()?;
                continue;
            }
            segments.push(line.to_string());
        }
        if segments.is_empty() {
            None
        } else {
            Some(Self { iss, segments })
        }
    }
}

/// 模板文件名，如 `Cubic-F.d3`
pub fn template_file_name(system: CrystalSystem, centering: Centering) -> String {
    let system = system.to_string();
    let mut chars = system.chars();
    let capitalized = match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    };
    format!("{}-{}.d3", capitalized, centering)
}

/// 内置路径表
fn builtin_template(system: CrystalSystem, centering: Centering) -> Option<BandTemplate> {
    use Centering::*;
    use CrystalSystem::*;

    let template = match (system, centering) {
        // 三斜无对称标签，用 1/2 为单位的显式坐标
        (Triclinic, P) => BandTemplate {
            iss: 2,
            segments: [
                "1 0 0  0 0 0",
                "0 0 0  0 1 0",
                "1 1 0  0 0 0",
                "0 0 0  0 0 1",
                "1 0 1  0 0 0",
                "0 0 0  0 1 1",
                "1 1 1  0 0 0",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        },
        (Monoclinic, P) => BandTemplate::symbolic(&["G Y", "Y C", "C Z", "Z G", "G B", "B A", "A E", "E D"]),
        (Monoclinic, C) => BandTemplate::symbolic(&["G Y", "Y A", "A M", "M G"]),
        (Orthorhombic, P) => BandTemplate::symbolic(&["G X", "X S", "S Y", "Y G", "G Z", "Z U", "U R", "R T", "T Z"]),
        (Orthorhombic, C) | (Orthorhombic, A) => {
            BandTemplate::symbolic(&["G Y", "Y T", "T Z", "Z G", "G S", "S R", "R Z"])
        }
        (Orthorhombic, F) => BandTemplate::symbolic(&["G Y", "Y X", "X Z", "Z G", "G L"]),
        (Orthorhombic, I) => BandTemplate::symbolic(&["G X", "X S", "S R", "R G", "G T", "T W"]),
        (Tetragonal, P) => BandTemplate::symbolic(&["G X", "X M", "M G", "G Z", "Z R", "R A", "A Z"]),
        (Tetragonal, I) => BandTemplate::symbolic(&["G X", "X M", "M G", "G Z", "Z P", "P N"]),
        // 三方 P 与六方共用六方路径
        (Trigonal, P) | (Hexagonal, P) => {
            BandTemplate::symbolic(&["G M", "M K", "K G", "G A", "A L", "L H", "H A"])
        }
        (Trigonal, R) => BandTemplate::symbolic(&["G T", "T F", "F G", "G L"]),
        (Cubic, P) => BandTemplate::symbolic(&["G X", "X M", "M G", "G R", "R X", "M R"]),
        (Cubic, F) => BandTemplate::symbolic(&["G X", "X W", "W K", "K G", "G L", "L U", "U W", "W L", "L K"]),
        (Cubic, I) => BandTemplate::symbolic(&["G H", "H N", "N G", "G P", "P H", "P N"]),
        _ => return None,
    };
    Some(template)
}

/// 选择能带路径模板；模板目录中的同名文件优先
pub fn band_template(
    system: CrystalSystem,
    centering: Centering,
    template_dir: Option<&Path>,
) -> Result<BandTemplate> {
    if let Some(dir) = template_dir {
        // 三斜所有中心化共用 P 模板
        let lookup = if system == CrystalSystem::Triclinic {
            Centering::P
        } else {
            centering
        };
        let path = dir.join(template_file_name(system, lookup));
        if path.exists() {
            let text = read_to_string(&path)?;
            return BandTemplate::parse(&text).ok_or_else(|| CryskitError::ParseError {
                format: "d3 template".to_string(),
                path: path.display().to_string(),
                reason: "no path segments before END".to_string(),
            });
        }
        log::debug!("template {} not found, using built-in path", path.display());
    }

    builtin_template(system, centering).ok_or_else(|| CryskitError::TemplateNotFound {
        system: system.to_string(),
        centering: centering.to_string(),
    })
}

/// 能带计算输入
pub fn band_deck(name: &str, template: &BandTemplate, orbitals: u32) -> String {
    let mut out = vec![
        "NEWK".to_string(),
        DEFAULT_NEWK.to_string(),
        "1 0".to_string(),
        "BAND".to_string(),
        name.to_string(),
        format!(
            "{} {} {} 1 {} 1 0",
            template.segments.len(),
            template.iss,
            BAND_POINTS,
            orbitals
        ),
    ];
    out.extend(template.segments.iter().cloned());
    out.push("END".to_string());

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// 读取 `_BAND.d3` 中各高对称点的标签
///
/// 相邻段不连续时合并为 `A|B`；`G` 记为 `Γ`。显式坐标路径返回空列表。
pub fn path_labels(d3: &str) -> Vec<String> {
    let lines: Vec<&str> = d3.lines().map(str::trim).collect();
    let start = match lines.iter().position(|l| l.starts_with("BAND")) {
        Some(i) => i + 3,
        None => return Vec::new(),
    };

    let greek = |s: &str| if s == "G" { "Γ".to_string() } else { s.to_string() };
    let mut labels: Vec<String> = Vec::new();
    let mut previous_end: Option<String> = None;
    for line in lines.iter().skip(start).take_while(|l| !l.eq_ignore_ascii_case("END")) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            return Vec::new();
        }
        let (from, to) = (greek(tokens[0]), greek(tokens[1]));
        match previous_end.take() {
            None => labels.push(from),
            Some(end) if end == from => labels.push(end),
            Some(end) => labels.push(format!("{}|{}", end, from)),
        }
        previous_end = Some(to);
    }
    labels.extend(previous_end);
    labels
}

/// 输运能量窗口：价带顶下 1 eV 至导带底上 1 eV，保留一位小数
pub fn transport_window(edges: &BandEdges) -> (f64, f64) {
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    (round1(edges.vbm - 1.0), round1(edges.cbm + 1.0))
}

/// BOLTZTRA 输运输入
///
/// `shrink` 为主输入 SHRINK 之后的行；为空时使用 `48 48`。
pub fn transport_deck(shrink: &[String], edges: &BandEdges) -> String {
    let (val, cond) = transport_window(edges);
    let mut out = vec!["NEWK".to_string()];
    if shrink.is_empty() {
        out.push(DEFAULT_NEWK.to_string());
    } else {
        out.extend(shrink.iter().cloned());
    }
    out.extend(
        [
            "1 0".to_string(),
            "BOLTZTRA".to_string(),
            "TDFRANGE".to_string(),
            format!("{:.1} {:.1} 0.001", val, cond),
            "MURANGE".to_string(),
            format!("{:.1} {:.1} 0.01", val, cond),
            "TRANGE".to_string(),
            "300. 700. 200.".to_string(),
            "RELAXTIM".to_string(),
            "22".to_string(),
            "END".to_string(),
            "END".to_string(),
        ]
        .into_iter(),
    );

    let mut text = out.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_library_coverage() {
        use Centering::*;
        use CrystalSystem::*;
        let supported = [
            (Triclinic, P),
            (Monoclinic, P),
            (Monoclinic, C),
            (Orthorhombic, P),
            (Orthorhombic, C),
            (Orthorhombic, A),
            (Orthorhombic, F),
            (Orthorhombic, I),
            (Tetragonal, P),
            (Tetragonal, I),
            (Trigonal, P),
            (Trigonal, R),
            (Hexagonal, P),
            (Cubic, P),
            (Cubic, F),
            (Cubic, I),
        ];
        for (system, centering) in supported {
            assert!(band_template(system, centering, None).is_ok(), "{} {}", system, centering);
        }
    }

    #[test]
    fn test_missing_combination() {
        let err = band_template(CrystalSystem::Cubic, Centering::C, None).unwrap_err();
        assert!(matches!(err, CryskitError::TemplateNotFound { .. }));
        assert!(band_template(CrystalSystem::Tetragonal, Centering::F, None).is_err());
    }

    #[test]
    fn test_hexagonal_and_triclinic_need_primitive_centering() {
        let err = band_template(CrystalSystem::Hexagonal, Centering::C, None).unwrap_err();
        assert!(matches!(
            err,
            CryskitError::TemplateNotFound { ref system, ref centering } if system == "hexagonal" && centering == "C"
        ));
        assert!(band_template(CrystalSystem::Triclinic, Centering::I, None).is_err());
        assert!(band_template(CrystalSystem::Trigonal, Centering::C, None).is_err());
    }

    #[test]
    fn test_band_deck_header() {
        let template = band_template(CrystalSystem::Cubic, Centering::F, None).unwrap();
        let deck = band_deck("MgO", &template, 36);
        let lines: Vec<&str> = deck.lines().collect();
        assert_eq!(&lines[..6], &["NEWK", "48 48", "1 0", "BAND", "MgO", "9 0 1000 1 36 1 0"]);
        assert_eq!(lines[6], "G X");
        assert_eq!(*lines.last().unwrap(), "END");
        assert_eq!(lines.len(), 6 + 9 + 1);

        let triclinic = band_template(CrystalSystem::Triclinic, Centering::P, None).unwrap();
        assert!(band_deck("x", &triclinic, 10).contains("\n7 2 1000 1 10 1 0\n"));
    }

    #[test]
    fn test_template_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cubic-F.d3"), "G X\nX W\nEND\n").unwrap();
        let t = band_template(CrystalSystem::Cubic, Centering::F, Some(dir.path())).unwrap();
        assert_eq!(t.segments, vec!["G X", "X W"]);
        assert_eq!(t.iss, 0);
        // 目录中没有的组合回退到内置模板
        let t = band_template(CrystalSystem::Cubic, Centering::I, Some(dir.path())).unwrap();
        assert_eq!(t.segments[0], "G H");
    }

    #[test]
    fn test_template_parse_iss() {
        let t = BandTemplate::parse("ISS 4\n0 0 0  2 0 0\nEND\n").unwrap();
        assert_eq!(t.iss, 4);
        assert_eq!(t.segments.len(), 1);
        assert!(BandTemplate::parse("END\n").is_none());
    }

    #[test]
    fn test_transport_deck() {
        let edges = BandEdges { vbm: -5.123, cbm: -1.96 };
        assert_eq!(transport_window(&edges), (-6.1, -1.0));

        let deck = transport_deck(&[], &edges);
        let expected = "NEWK\n48 48\n1 0\nBOLTZTRA\nTDFRANGE\n-6.1 -1.0 0.001\nMURANGE\n-6.1 -1.0 0.01\nTRANGE\n300. 700. 200.\nRELAXTIM\n22\nEND\nEND\n";
        assert_eq!(deck, expected);

        let shrink = vec!["0 24".to_string(), "12 12 12".to_string()];
        assert!(transport_deck(&shrink, &edges).starts_with("NEWK\n0 24\n12 12 12\n1 0\n"));
    }

    #[test]
    fn test_path_labels() {
        let template = BandTemplate::symbolic(&["G X", "X M", "R G"]);
        let deck = band_deck("s", &template, 4);
        assert_eq!(path_labels(&deck), vec!["Γ", "X", "M|R", "Γ"]);

        let triclinic = band_template(CrystalSystem::Triclinic, Centering::P, None).unwrap();
        assert!(path_labels(&band_deck("t", &triclinic, 4)).is_empty());
        assert!(path_labels("NEWK\nEND\n").is_empty());
    }

    #[test]
    fn test_template_file_name() {
        assert_eq!(template_file_name(CrystalSystem::Cubic, Centering::F), "Cubic-F.d3");
        assert_eq!(template_file_name(CrystalSystem::Orthorhombic, Centering::C), "Orthorhombic-C.d3");
    }
}
