//! # 晶系与心型
//!
//! 由空间群号划分七大晶系，并给出每个晶系需要写入输入文件的独立晶胞参数。
//!
//! ## 依赖关系
//! - 被 `parsers/d12.rs`, `parsers/d3.rs` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};
use std::fmt;

/// 七大晶系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrystalSystem {
    Triclinic,
    Monoclinic,
    Orthorhombic,
    Tetragonal,
    Trigonal,
    Hexagonal,
    Cubic,
}

impl CrystalSystem {
    /// 空间群号 (1-230) 映射到晶系，越界返回 None
    pub fn from_space_group(number: u32) -> Option<Self> {
        match number {
            1..=2 => Some(CrystalSystem::Triclinic),
            3..=15 => Some(CrystalSystem::Monoclinic),
            16..=74 => Some(CrystalSystem::Orthorhombic),
            75..=142 => Some(CrystalSystem::Tetragonal),
            143..=167 => Some(CrystalSystem::Trigonal),
            168..=194 => Some(CrystalSystem::Hexagonal),
            195..=230 => Some(CrystalSystem::Cubic),
            _ => None,
        }
    }

    /// 独立晶胞参数（按 a b c α β γ 的固定顺序）
    pub fn free_parameters(self) -> &'static [CellParameter] {
        use CellParameter::*;
        match self {
            CrystalSystem::Triclinic => &[A, B, C, Alpha, Beta, Gamma],
            CrystalSystem::Monoclinic => &[A, B, C, Beta],
            CrystalSystem::Orthorhombic => &[A, B, C],
            CrystalSystem::Tetragonal | CrystalSystem::Trigonal | CrystalSystem::Hexagonal => {
                &[A, C]
            }
            CrystalSystem::Cubic => &[A],
        }
    }
}

impl fmt::Display for CrystalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrystalSystem::Triclinic => "triclinic",
            CrystalSystem::Monoclinic => "monoclinic",
            CrystalSystem::Orthorhombic => "orthorhombic",
            CrystalSystem::Tetragonal => "tetragonal",
            CrystalSystem::Trigonal => "trigonal",
            CrystalSystem::Hexagonal => "hexagonal",
            CrystalSystem::Cubic => "cubic",
        };
        write!(f, "{}", name)
    }
}

/// 晶胞参数名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellParameter {
    A,
    B,
    C,
    Alpha,
    Beta,
    Gamma,
}

/// 布拉维心型字母
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Centering {
    P,
    A,
    B,
    C,
    F,
    I,
    R,
}

impl Centering {
    /// 从 Hermann-Mauguin 符号或单个字母解析心型（"F M 3 M", "P 63/m m c", "R"）
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim().chars().next()?.to_ascii_uppercase() {
            'P' => Some(Centering::P),
            'A' => Some(Centering::A),
            'B' => Some(Centering::B),
            'C' => Some(Centering::C),
            'F' => Some(Centering::F),
            'I' => Some(Centering::I),
            'R' => Some(Centering::R),
            _ => None,
        }
    }
}

impl fmt::Display for Centering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Centering::P => "P",
            Centering::A => "A",
            Centering::B => "B",
            Centering::C => "C",
            Centering::F => "F",
            Centering::I => "I",
            Centering::R => "R",
        };
        write!(f, "{}", c)
    }
}

/// 有两种原点选择的空间群（International Tables 第二原点）
pub const MULTI_ORIGIN_GROUPS: [u32; 24] = [
    48, 50, 59, 68, 70, 85, 86, 88, 125, 126, 129, 130, 133, 134, 137, 138, 141, 142, 201, 203,
    222, 224, 227, 228,
];

/// 是否存在第二原点选择
pub fn has_origin_choice(space_group: u32) -> bool {
    MULTI_ORIGIN_GROUPS.contains(&space_group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_group_boundaries() {
        let table = [
            (1, CrystalSystem::Triclinic),
            (2, CrystalSystem::Triclinic),
            (3, CrystalSystem::Monoclinic),
            (15, CrystalSystem::Monoclinic),
            (16, CrystalSystem::Orthorhombic),
            (74, CrystalSystem::Orthorhombic),
            (75, CrystalSystem::Tetragonal),
            (142, CrystalSystem::Tetragonal),
            (143, CrystalSystem::Trigonal),
            (167, CrystalSystem::Trigonal),
            (168, CrystalSystem::Hexagonal),
            (194, CrystalSystem::Hexagonal),
            (195, CrystalSystem::Cubic),
            (230, CrystalSystem::Cubic),
        ];
        for (sg, expected) in table {
            assert_eq!(CrystalSystem::from_space_group(sg), Some(expected), "sg {}", sg);
        }
        assert_eq!(CrystalSystem::from_space_group(0), None);
        assert_eq!(CrystalSystem::from_space_group(231), None);
    }

    #[test]
    fn test_every_space_group_is_classified() {
        for sg in 1..=230 {
            let system = CrystalSystem::from_space_group(sg).unwrap();
            let expected = if sg <= 2 {
                CrystalSystem::Triclinic
            } else if sg <= 15 {
                CrystalSystem::Monoclinic
            } else if sg <= 74 {
                CrystalSystem::Orthorhombic
            } else if sg <= 142 {
                CrystalSystem::Tetragonal
            } else if sg <= 167 {
                CrystalSystem::Trigonal
            } else if sg <= 194 {
                CrystalSystem::Hexagonal
            } else {
                CrystalSystem::Cubic
            };
            assert_eq!(system, expected);
        }
    }

    #[test]
    fn test_free_parameter_counts() {
        assert_eq!(CrystalSystem::Triclinic.free_parameters().len(), 6);
        assert_eq!(
            CrystalSystem::Monoclinic.free_parameters(),
            &[
                CellParameter::A,
                CellParameter::B,
                CellParameter::C,
                CellParameter::Beta
            ]
        );
        assert_eq!(CrystalSystem::Hexagonal.free_parameters().len(), 2);
        assert_eq!(CrystalSystem::Cubic.free_parameters(), &[CellParameter::A]);
    }

    #[test]
    fn test_centering_from_symbol() {
        assert_eq!(Centering::from_symbol("F M 3 M"), Some(Centering::F));
        assert_eq!(Centering::from_symbol(" p 63/m m c"), Some(Centering::P));
        assert_eq!(Centering::from_symbol("R"), Some(Centering::R));
        assert_eq!(Centering::from_symbol("X"), None);
        assert_eq!(Centering::from_symbol(""), None);
    }

    #[test]
    fn test_origin_choice() {
        assert!(has_origin_choice(227));
        assert!(!has_origin_choice(225));
    }
}
