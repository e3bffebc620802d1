//! # CIF 解析器
//!
//! 手写的 CIF 关键字/数值扫描器，只读取生成输入文件所需的最小字段集合：
//! 晶胞参数、空间群号、原子位点（不可约单元，分数坐标）。
//! 另提供 P1 CIF 写出 (`to_p1_cif`)。
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{read_to_string, CryskitError, Result};
use crate::models::{Atom, CellParameters, Structure};

use std::collections::HashMap;
use std::path::Path;

/// 解析 CIF 文件
pub fn parse_cif_file(path: &Path) -> Result<Structure> {
    let content = read_to_string(path)?;
    let default_title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("structure");
    parse_cif(&content, default_title).map_err(|e| match e {
        CryskitError::ParseError { format, reason, .. } => CryskitError::ParseError {
            format,
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })
}

/// CIF 数据块：单值标签 + loop 表
#[derive(Debug, Default)]
struct CifBlock {
    tags: HashMap<String, String>,
    loops: Vec<CifLoop>,
}

#[derive(Debug, Default)]
struct CifLoop {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl CifLoop {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// 解析 CIF 文本
pub fn parse_cif(content: &str, default_title: &str) -> Result<Structure> {
    let block = scan(content);
    let err = |reason: &str| CryskitError::ParseError {
        format: "CIF".to_string(),
        path: default_title.to_string(),
        reason: reason.to_string(),
    };

    let number = |key: &str| block.tags.get(key).and_then(|v| parse_cif_number(v));
    let cell = match (
        number("_cell_length_a"),
        number("_cell_length_b"),
        number("_cell_length_c"),
        number("_cell_angle_alpha"),
        number("_cell_angle_beta"),
        number("_cell_angle_gamma"),
    ) {
        (Some(a), Some(b), Some(c), Some(al), Some(be), Some(ga)) => {
            CellParameters::new(a, b, c, al, be, ga)
        }
        _ => return Err(err("missing _cell_length_* or _cell_angle_* tag")),
    };

    let space_group = ["_symmetry_Int_Tables_number", "_space_group_IT_number"]
        .iter()
        .find_map(|k| number(*k))
        .map(|n| n.round() as u32)
        .or_else(|| {
            // 仅 P1 可由 H-M 符号直接确定
            ["_symmetry_space_group_name_H-M", "_space_group_name_H-M_alt"]
                .iter()
                .filter_map(|k| block.tags.get(*k))
                .find(|s| s.replace(' ', "") == "P1")
                .map(|_| 1)
        })
        .ok_or_else(|| err("missing space group number"))?;

    let sites = block
        .loops
        .iter()
        .find(|l| l.column("_atom_site_fract_x").is_some())
        .ok_or_else(|| err("missing _atom_site loop"))?;

    let col = |name: &str| sites.column(name);
    let (ix, iy, iz) = match (
        col("_atom_site_fract_x"),
        col("_atom_site_fract_y"),
        col("_atom_site_fract_z"),
    ) {
        (Some(x), Some(y), Some(z)) => (x, y, z),
        _ => return Err(err("incomplete fractional coordinate columns")),
    };
    let isym = col("_atom_site_type_symbol")
        .or_else(|| col("_atom_site_label"))
        .ok_or_else(|| err("missing _atom_site_type_symbol / _atom_site_label"))?;

    let mut atoms = Vec::with_capacity(sites.rows.len());
    for row in &sites.rows {
        let coord = |i: usize| {
            row.get(i)
                .and_then(|v| parse_cif_number(v))
                .ok_or_else(|| err(&format!("bad coordinate in row {:?}", row)))
        };
        let position = [coord(ix)?, coord(iy)?, coord(iz)?];
        let symbol = row.get(isym).map(|s| s.as_str()).unwrap_or("");
        atoms.push(Atom::from_symbol(symbol, position)?);
    }

    if atoms.is_empty() {
        return Err(err("no atoms in _atom_site loop"));
    }

    let title = block
        .tags
        .get("data_")
        .cloned()
        .unwrap_or_else(|| default_title.to_string());

    Structure::new(title, space_group, cell, atoms)
}

/// "5.4307(2)" → 5.4307；"?" 和 "." 视为缺失
pub fn parse_cif_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw == "?" || raw == "." {
        return None;
    }
    let cut = raw.find('(').unwrap_or(raw.len());
    raw[..cut].parse::<f64>().ok()
}

/// 按空白切分，保留引号内空格
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut tok = String::new();
            while let Some(ch) = chars.next() {
                // 只有后接空白或行尾的引号才结束字符串
                if ch == c && chars.peek().map_or(true, |n| n.is_whitespace()) {
                    break;
                }
                tok.push(ch);
            }
            tokens.push(tok);
        } else if c == '#' {
            break;
        } else {
            let mut tok = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                tok.push(ch);
                chars.next();
            }
            tokens.push(tok);
        }
    }
    tokens
}

/// 扫描第一个数据块
fn scan(content: &str) -> CifBlock {
    let mut block = CifBlock::default();
    let mut lines = content.lines().peekable();
    let mut pending_tag: Option<String> = None;

    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // 多行文本块 ; ... ;
        if line.starts_with(';') {
            let mut text = line[1..].to_string();
            for inner in lines.by_ref() {
                if inner.starts_with(';') {
                    break;
                }
                text.push('\n');
                text.push_str(inner);
            }
            if let Some(tag) = pending_tag.take() {
                block.tags.insert(tag, text.trim().to_string());
            }
            continue;
        }

        if let Some(name) = line.strip_prefix("data_") {
            if block.tags.contains_key("data_") {
                // 只读取第一个数据块
                break;
            }
            block.tags.insert("data_".to_string(), name.trim().to_string());
            continue;
        }

        if line.eq_ignore_ascii_case("loop_") {
            let mut lp = CifLoop::default();
            while let Some(next) = lines.peek() {
                let t = next.trim();
                if t.starts_with('_') {
                    lp.headers.push(t.split_whitespace().next().unwrap_or(t).to_string());
                    lines.next();
                } else {
                    break;
                }
            }
            let mut values = Vec::new();
            while let Some(next) = lines.peek() {
                let t = next.trim();
                if t.starts_with('_')
                    || t.eq_ignore_ascii_case("loop_")
                    || t.starts_with("data_")
                {
                    break;
                }
                if !t.is_empty() && !t.starts_with('#') {
                    values.extend(tokenize(t));
                }
                lines.next();
            }
            if !lp.headers.is_empty() {
                lp.rows = values
                    .chunks(lp.headers.len())
                    .filter(|c| c.len() == lp.headers.len())
                    .map(|c| c.to_vec())
                    .collect();
            }
            block.loops.push(lp);
            continue;
        }

        if line.starts_with('_') {
            let mut tokens = tokenize(line);
            let tag = tokens.remove(0);
            if tokens.is_empty() {
                pending_tag = Some(tag);
            } else {
                block.tags.insert(tag, tokens.join(" "));
            }
            continue;
        }

        // 上一行标签的值单独成行
        if let Some(tag) = pending_tag.take() {
            block.tags.insert(tag, tokenize(line).join(" "));
        }
    }

    block
}

// ─────────────────────────────────────────────────────────────
// 写出
// ─────────────────────────────────────────────────────────────

/// 写出 P1 CIF；`atoms` 为 (元素符号, 分数坐标)
pub fn to_p1_cif(title: &str, cell: &CellParameters, atoms: &[(String, [f64; 3])]) -> String {
    let mut out = String::new();
    out.push_str(&format!("data_{}\n\n", title));
    out.push_str(&format!("_cell_length_a {}\n", cell.a));
    out.push_str(&format!("_cell_length_b {}\n", cell.b));
    out.push_str(&format!("_cell_length_c {}\n", cell.c));
    out.push_str(&format!("_cell_angle_alpha {}\n", cell.alpha));
    out.push_str(&format!("_cell_angle_beta {}\n", cell.beta));
    out.push_str(&format!("_cell_angle_gamma {}\n", cell.gamma));
    out.push_str("_symmetry_space_group_name_H-M         'P 1'\n");
    out.push_str("_symmetry_Int_Tables_number            1\n\n");
    out.push_str("loop_\n_symmetry_equiv_pos_as_xyz\n   'x, y, z'\n\n");
    out.push_str("loop_\n_atom_site_label\n_atom_site_type_symbol\n");
    out.push_str("_atom_site_fract_x\n_atom_site_fract_y\n_atom_site_fract_z\n");
    for (i, (symbol, p)) in atoms.iter().enumerate() {
        out.push_str(&format!(
            "{}{:03} {} {:.6} {:.6} {:.6}\n",
            symbol,
            i + 1,
            symbol,
            p[0],
            p[1],
            p[2]
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const NACL: &str = r#"
# generated by hand
data_NaCl
_symmetry_space_group_name_H-M   'F m -3 m'
_symmetry_Int_Tables_number      225
_cell_length_a                   5.6402(3)
_cell_length_b                   5.6402(3)
_cell_length_c                   5.6402(3)
_cell_angle_alpha                90
_cell_angle_beta                 90
_cell_angle_gamma                90
_chemical_name_common
;
 rock salt
;
loop_
_symmetry_equiv_pos_as_xyz
  'x, y, z'
  '-x, -y, -z'
loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
_atom_site_occupancy
Na1 Na+ 0.00000 0.00000 0.00000 1
Cl1 Cl- 0.50000 0.50000
   0.50000 1
"#;

    #[test]
    fn test_parse_rock_salt() {
        let s = parse_cif(NACL, "fallback").unwrap();
        assert_eq!(s.title, "NaCl");
        assert_eq!(s.space_group, 225);
        assert!((s.cell.a - 5.6402).abs() < 1e-12);
        assert_eq!(s.atoms.len(), 2);
        assert_eq!(s.atoms[0].atomic_number, 11);
        assert_eq!(s.atoms[1].symbol, "Cl");
        assert!((s.atoms[1].position[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_space_group_it_number_and_labels() {
        let text = r#"
data_Si
_space_group_IT_number 227
_cell_length_a 5.431
_cell_length_b 5.431
_cell_length_c 5.431
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Si1 0.125 0.125 0.125
"#;
        let s = parse_cif(text, "x").unwrap();
        assert_eq!(s.space_group, 227);
        assert_eq!(s.atoms[0].symbol, "Si");
    }

    #[test]
    fn test_missing_cell_is_error() {
        let err = parse_cif("data_x\n_space_group_IT_number 1\n", "x").unwrap_err();
        assert!(matches!(err, CryskitError::ParseError { .. }));
    }

    #[test]
    fn test_number_with_uncertainty() {
        assert_eq!(parse_cif_number("5.4307(2)"), Some(5.4307));
        assert_eq!(parse_cif_number("?"), None);
        assert_eq!(parse_cif_number("90"), Some(90.0));
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize("'F m -3 m' 225 \"it's\""),
            vec!["F m -3 m".to_string(), "225".to_string(), "it's".to_string()]
        );
    }

    #[test]
    fn test_p1_round_trip() {
        let cell = CellParameters::new(3.0, 3.0, 40.0, 90.0, 90.0, 120.0);
        let atoms = vec![
            ("Mo".to_string(), [0.0, 0.0, 0.5]),
            ("S".to_string(), [1.0 / 3.0, 2.0 / 3.0, 0.54]),
        ];
        let text = to_p1_cif("MoS2", &cell, &atoms);
        assert!(text.contains("Mo001 Mo 0.000000 0.000000 0.500000"));
        assert!(text.contains("S002 S"));

        let parsed = parse_cif(&text, "x").unwrap();
        assert_eq!(parsed.space_group, 1);
        assert_eq!(parsed.atoms.len(), 2);
        assert!((parsed.cell.c - 40.0).abs() < 1e-12);
        assert!((parsed.cell.gamma - 120.0).abs() < 1e-12);
    }
}
