//! # 晶体结构数据模型
//!
//! CIF 解析、日志几何提取与输入文件生成共用的结构表示。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `commands/` 使用
//! - 使用 `models/element.rs`, `models/symmetry.rs`

use crate::error::{CryskitError, Result};
use crate::models::element;
use crate::models::symmetry::{CellParameter, CrystalSystem};

use serde::{Deserialize, Serialize};

/// 体系维度（决定 .d12 几何块的关键字）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimensionality {
    Crystal,
    Slab,
    Polymer,
    Molecule,
}

impl Dimensionality {
    /// 输入文件中的关键字
    pub fn keyword(self) -> &'static str {
        match self {
            Dimensionality::Crystal => "CRYSTAL",
            Dimensionality::Slab => "SLAB",
            Dimensionality::Polymer => "POLYMER",
            Dimensionality::Molecule => "MOLECULE",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.trim() {
            "CRYSTAL" => Some(Dimensionality::Crystal),
            "SLAB" => Some(Dimensionality::Slab),
            "POLYMER" => Some(Dimensionality::Polymer),
            "MOLECULE" => Some(Dimensionality::Molecule),
            _ => None,
        }
    }
}

/// 晶胞参数，长度 Å，角度 °
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl CellParameters {
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        CellParameters {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
        }
    }

    /// 立方晶胞
    pub fn cubic(a: f64) -> Self {
        CellParameters::new(a, a, a, 90.0, 90.0, 90.0)
    }

    pub fn get(&self, param: CellParameter) -> f64 {
        match param {
            CellParameter::A => self.a,
            CellParameter::B => self.b,
            CellParameter::C => self.c,
            CellParameter::Alpha => self.alpha,
            CellParameter::Beta => self.beta,
            CellParameter::Gamma => self.gamma,
        }
    }

    /// 按晶系取出独立参数
    pub fn free_values(&self, system: CrystalSystem) -> Vec<f64> {
        system
            .free_parameters()
            .iter()
            .map(|p| self.get(*p))
            .collect()
    }

    /// 晶胞体积 (Å³)
    pub fn volume(&self) -> f64 {
        let (ca, cb, cg) = (
            self.alpha.to_radians().cos(),
            self.beta.to_radians().cos(),
            self.gamma.to_radians().cos(),
        );
        self.a
            * self.b
            * self.c
            * (1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg)
                .max(0.0)
                .sqrt()
    }

    /// 垂直于 ab 面的晶胞高度 V / (a·b·sinγ)
    pub fn height(&self) -> f64 {
        let sin_gamma = self.gamma.to_radians().sin();
        if sin_gamma.abs() < 1e-12 {
            return 0.0;
        }
        self.volume() / (self.a * self.b * sin_gamma)
    }
}

/// 原子：原子序数、元素符号、分数坐标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub atomic_number: u32,
    pub symbol: String,
    pub position: [f64; 3],
}

impl Atom {
    pub fn new(atomic_number: u32, position: [f64; 3]) -> Self {
        let symbol = element::symbol(atomic_number).unwrap_or("X").to_string();
        Atom {
            atomic_number,
            symbol,
            position,
        }
    }

    /// 由元素符号创建
    pub fn from_symbol(symbol: &str, position: [f64; 3]) -> Result<Self> {
        let z = element::atomic_number(symbol)
            .ok_or_else(|| CryskitError::InvalidStructure(format!("unknown element '{}'", symbol)))?;
        Ok(Atom::new(z, position))
    }

    /// 坐标折回 [0, 1)
    pub fn wrapped(&self) -> [f64; 3] {
        let mut p = self.position;
        for x in p.iter_mut() {
            *x -= x.floor();
            // -1e-17 折回后可能恰好为 1.0
            if *x >= 1.0 {
                *x = 0.0;
            }
        }
        p
    }
}

/// 晶体结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    /// 标题（通常为材料名）
    pub title: String,
    /// 空间群号 1-230
    pub space_group: u32,
    pub cell: CellParameters,
    pub atoms: Vec<Atom>,
}

impl Structure {
    /// 创建结构，校验空间群与坐标
    pub fn new(
        title: impl Into<String>,
        space_group: u32,
        cell: CellParameters,
        atoms: Vec<Atom>,
    ) -> Result<Self> {
        if CrystalSystem::from_space_group(space_group).is_none() {
            return Err(CryskitError::InvalidSpaceGroup(space_group));
        }
        if let Some(atom) = atoms
            .iter()
            .find(|a| a.position.iter().any(|x| !x.is_finite()))
        {
            return Err(CryskitError::InvalidStructure(format!(
                "non-finite coordinate for {}",
                atom.symbol
            )));
        }
        Ok(Structure {
            title: title.into(),
            space_group,
            cell,
            atoms,
        })
    }

    pub fn crystal_system(&self) -> CrystalSystem {
        // new() 已校验范围
        CrystalSystem::from_space_group(self.space_group).unwrap_or(CrystalSystem::Triclinic)
    }

    /// 化学式（按元素符号排序）
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.symbol.as_str()).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .map(|(el, n)| if n == 1 { el.to_string() } else { format!("{}{}", el, n) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_volume() {
        let cell = CellParameters::cubic(5.0);
        assert!((cell.volume() - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_hexagonal_height() {
        let cell = CellParameters::new(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        assert!((cell.height() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_free_values_order() {
        let cell = CellParameters::new(1.0, 2.0, 3.0, 80.0, 85.0, 95.0);
        assert_eq!(
            cell.free_values(CrystalSystem::Triclinic),
            vec![1.0, 2.0, 3.0, 80.0, 85.0, 95.0]
        );
        assert_eq!(cell.free_values(CrystalSystem::Monoclinic), vec![1.0, 2.0, 3.0, 85.0]);
        assert_eq!(cell.free_values(CrystalSystem::Tetragonal), vec![1.0, 3.0]);
    }

    #[test]
    fn test_wrapped_coordinates() {
        let atom = Atom::new(8, [1.25, -0.25, 0.5]);
        let w = atom.wrapped();
        assert!((w[0] - 0.25).abs() < 1e-12);
        assert!((w[1] - 0.75).abs() < 1e-12);
        assert!((w[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_structure_rejects_bad_input() {
        let cell = CellParameters::cubic(4.0);
        assert!(Structure::new("x", 0, cell, vec![]).is_err());
        assert!(Structure::new("x", 225, cell, vec![Atom::new(11, [f64::NAN, 0.0, 0.0])]).is_err());
    }

    #[test]
    fn test_formula() {
        let atoms = vec![
            Atom::new(11, [0.0, 0.0, 0.0]),
            Atom::new(17, [0.5, 0.5, 0.5]),
            Atom::new(17, [0.0, 0.5, 0.5]),
        ];
        let s = Structure::new("NaCl2", 225, CellParameters::cubic(5.0), atoms).unwrap();
        assert_eq!(s.formula(), "Cl2Na");
        assert_eq!(Atom::new(26, [0.0; 3]).symbol, "Fe");
    }
}
