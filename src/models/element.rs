//! # 元素周期表
//!
//! 元素符号、原子序数与标准原子质量的对照表。
//!
//! ## 依赖关系
//! - 被 `models/structure.rs`, `parsers/cif.rs`, `commands/scrape/props.rs` 使用
//! - 无外部模块依赖

/// (符号, 标准原子质量 amu)，下标 = Z - 1
const ELEMENTS: [(&str, f64); 118] = [
    ("H", 1.008),
    ("He", 4.0026),
    ("Li", 6.94),
    ("Be", 9.0122),
    ("B", 10.81),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("F", 18.998),
    ("Ne", 20.180),
    ("Na", 22.990),
    ("Mg", 24.305),
    ("Al", 26.982),
    ("Si", 28.085),
    ("P", 30.974),
    ("S", 32.06),
    ("Cl", 35.45),
    ("Ar", 39.948),
    ("K", 39.098),
    ("Ca", 40.078),
    ("Sc", 44.956),
    ("Ti", 47.867),
    ("V", 50.942),
    ("Cr", 51.996),
    ("Mn", 54.938),
    ("Fe", 55.845),
    ("Co", 58.933),
    ("Ni", 58.693),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Ga", 69.723),
    ("Ge", 72.630),
    ("As", 74.922),
    ("Se", 78.971),
    ("Br", 79.904),
    ("Kr", 83.798),
    ("Rb", 85.468),
    ("Sr", 87.62),
    ("Y", 88.906),
    ("Zr", 91.224),
    ("Nb", 92.906),
    ("Mo", 95.95),
    ("Tc", 98.0),
    ("Ru", 101.07),
    ("Rh", 102.91),
    ("Pd", 106.42),
    ("Ag", 107.87),
    ("Cd", 112.41),
    ("In", 114.82),
    ("Sn", 118.71),
    ("Sb", 121.76),
    ("Te", 127.60),
    ("I", 126.90),
    ("Xe", 131.29),
    ("Cs", 132.91),
    ("Ba", 137.33),
    ("La", 138.91),
    ("Ce", 140.12),
    ("Pr", 140.91),
    ("Nd", 144.24),
    ("Pm", 145.0),
    ("Sm", 150.36),
    ("Eu", 151.96),
    ("Gd", 157.25),
    ("Tb", 158.93),
    ("Dy", 162.50),
    ("Ho", 164.93),
    ("Er", 167.26),
    ("Tm", 168.93),
    ("Yb", 173.05),
    ("Lu", 174.97),
    ("Hf", 178.49),
    ("Ta", 180.95),
    ("W", 183.84),
    ("Re", 186.21),
    ("Os", 190.23),
    ("Ir", 192.22),
    ("Pt", 195.08),
    ("Au", 196.97),
    ("Hg", 200.59),
    ("Tl", 204.38),
    ("Pb", 207.2),
    ("Bi", 208.98),
    ("Po", 209.0),
    ("At", 210.0),
    ("Rn", 222.0),
    ("Fr", 223.0),
    ("Ra", 226.0),
    ("Ac", 227.0),
    ("Th", 232.04),
    ("Pa", 231.04),
    ("U", 238.03),
    ("Np", 237.0),
    ("Pu", 244.0),
    ("Am", 243.0),
    ("Cm", 247.0),
    ("Bk", 247.0),
    ("Cf", 251.0),
    ("Es", 252.0),
    ("Fm", 257.0),
    ("Md", 258.0),
    ("No", 259.0),
    ("Lr", 262.0),
    ("Rf", 267.0),
    ("Db", 270.0),
    ("Sg", 269.0),
    ("Bh", 270.0),
    ("Hs", 270.0),
    ("Mt", 278.0),
    ("Ds", 281.0),
    ("Rg", 281.0),
    ("Cn", 285.0),
    ("Nh", 286.0),
    ("Fl", 289.0),
    ("Mc", 289.0),
    ("Lv", 293.0),
    ("Ts", 293.0),
    ("Og", 294.0),
];

/// 由元素符号查原子序数（大小写不敏感，忽略数字和电荷后缀）
pub fn atomic_number(symbol: &str) -> Option<u32> {
    let letters: String = symbol
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }

    // CIF 标签如 "Fe1"、"O2-" 只取字母部分；"Sn" 与 "S" 需要先尝试两位符号
    let normalized = normalize_symbol(&letters);
    if let Some(z) = lookup(&normalized) {
        return Some(z);
    }
    let first: String = normalized.chars().take(1).collect();
    lookup(&first)
}

fn lookup(symbol: &str) -> Option<u32> {
    ELEMENTS
        .iter()
        .position(|(s, _)| *s == symbol)
        .map(|i| i as u32 + 1)
}

/// 由原子序数查元素符号
pub fn symbol(z: u32) -> Option<&'static str> {
    if z == 0 {
        return None;
    }
    ELEMENTS.get(z as usize - 1).map(|(s, _)| *s)
}

/// 标准原子质量 (amu)
pub fn atomic_mass(z: u32) -> Option<f64> {
    if z == 0 {
        return None;
    }
    ELEMENTS.get(z as usize - 1).map(|(_, m)| *m)
}

/// 统一为首字母大写的两字符以内符号 ("FE" -> "Fe")
pub fn normalize_symbol(raw: &str) -> String {
    let mut chars = raw.chars().take(2);
    let mut out = String::new();
    if let Some(c) = chars.next() {
        out.push(c.to_ascii_uppercase());
    }
    if let Some(c) = chars.next() {
        out.push(c.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_lookup() {
        assert_eq!(atomic_number("Mg"), Some(12));
        assert_eq!(atomic_number("MG"), Some(12));
        assert_eq!(atomic_number("O2-"), Some(8));
        assert_eq!(atomic_number("Fe1"), Some(26));
        assert_eq!(atomic_number("Og"), Some(118));
        assert_eq!(atomic_number("?"), None);
    }

    #[test]
    fn test_label_falls_back_to_single_letter() {
        // "Oa" 不是元素，退回 "O"
        assert_eq!(atomic_number("Oa"), Some(8));
    }

    #[test]
    fn test_symbol_and_mass() {
        assert_eq!(symbol(1), Some("H"));
        assert_eq!(symbol(79), Some("Au"));
        assert_eq!(symbol(0), None);
        assert_eq!(symbol(119), None);
        assert!((atomic_mass(6).unwrap() - 12.011).abs() < 1e-9);
    }
}
