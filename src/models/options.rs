//! # 输入文件生成选项
//!
//! `.d12` 生成的全部可调参数，可保存为 JSON 以便批量复用。
//!
//! ## 依赖关系
//! - 被 `parsers/d12.rs`, `commands/convert.rs` 使用
//! - 使用 `serde`, `serde_json`

use crate::error::{read_to_string, write_string, Result};
use crate::models::Dimensionality;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 计算类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CalculationType {
    /// 单点
    Sp,
    /// 几何优化
    Opt,
    /// 频率
    Freq,
}

impl CalculationType {
    pub fn tag(self) -> &'static str {
        match self {
            CalculationType::Sp => "SP",
            CalculationType::Opt => "OPT",
            CalculationType::Freq => "FREQ",
        }
    }
}

/// 几何优化类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptimizationType {
    Fulloptg,
    Cvolopt,
    Cellonly,
    Atomonly,
}

impl OptimizationType {
    pub fn keyword(self) -> &'static str {
        match self {
            OptimizationType::Fulloptg => "FULLOPTG",
            OptimizationType::Cvolopt => "CVOLOPT",
            OptimizationType::Cellonly => "CELLONLY",
            OptimizationType::Atomonly => "ATOMONLY",
        }
    }
}

/// SCF 收敛加速方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScfMethod {
    Diis,
    Anderson,
    Broyden,
}

impl ScfMethod {
    pub fn keyword(self) -> &'static str {
        match self {
            ScfMethod::Diis => "DIIS",
            ScfMethod::Anderson => "ANDERSON",
            ScfMethod::Broyden => "BROYDEN",
        }
    }
}

/// 多原点空间群的原点选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OriginSetting {
    /// 227 号按原子位置自动判断，其余用标准原点
    Auto,
    Standard,
    Alternate,
}

/// 基组来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Basis {
    /// 目录中按原子序数命名的基组文件
    External { dir: PathBuf },
    /// 程序内置基组名，如 POB-TZVP-REV2
    Internal { name: String },
}

impl Basis {
    /// 输出文件名中的基组标签
    pub fn tag(&self) -> String {
        match self {
            Basis::External { dir } => dir
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("external")
                .to_string(),
            Basis::Internal { name } => name.clone(),
        }
    }
}

/// 几何优化参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptSettings {
    pub maxcycle: u32,
    pub toldeg: f64,
    pub toldex: f64,
    pub toldee: u32,
    pub maxtradius: Option<f64>,
}

impl Default for OptSettings {
    fn default() -> Self {
        OptSettings {
            maxcycle: 800,
            toldeg: 0.00003,
            toldex: 0.00012,
            toldee: 7,
            maxtradius: Some(0.25),
        }
    }
}

/// 支持 -D3 色散校正的泛函
pub const D3_FUNCTIONALS: [&str; 10] = [
    "BLYP", "PBE", "B97", "B3LYP", "PBE0", "PW1PW", "M06", "HSE06", "HSEsol", "LC-wPBE",
];

/// `.d12` 生成选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckOptions {
    pub dimensionality: Dimensionality,
    pub calculation: CalculationType,
    pub optimization: Option<OptimizationType>,
    pub opt_settings: OptSettings,
    pub numderiv: u32,
    pub basis: Basis,
    pub functional: String,
    pub dispersion: bool,
    pub spin_polarized: bool,
    /// DFT 积分格点；DEFAULT 时不写出
    pub grid: String,
    pub tolinteg: String,
    pub toldee: u32,
    pub scf_method: ScfMethod,
    pub scf_maxcycle: u32,
    pub fmixing: u32,
    /// 费米展宽 (Hartree)
    pub smearing: Option<f64>,
    pub origin: OriginSetting,
    /// 赝势元素原子序数 +200
    pub ecp_labels: bool,
}

impl Default for DeckOptions {
    fn default() -> Self {
        DeckOptions {
            dimensionality: Dimensionality::Crystal,
            calculation: CalculationType::Opt,
            optimization: Some(OptimizationType::Fulloptg),
            opt_settings: OptSettings::default(),
            numderiv: 2,
            basis: Basis::Internal {
                name: "POB-TZVP-REV2".to_string(),
            },
            functional: "B3LYP".to_string(),
            dispersion: false,
            spin_polarized: false,
            grid: "XLGRID".to_string(),
            tolinteg: "7 7 7 7 14".to_string(),
            toldee: 7,
            scf_method: ScfMethod::Diis,
            scf_maxcycle: 800,
            fmixing: 30,
            smearing: None,
            origin: OriginSetting::Auto,
            ecp_labels: true,
        }
    }
}

impl DeckOptions {
    /// 泛函关键字（含 -D3）
    pub fn functional_keyword(&self) -> String {
        if self.dispersion && D3_FUNCTIONALS.contains(&self.functional.as_str()) {
            format!("{}-D3", self.functional)
        } else {
            self.functional.clone()
        }
    }

    /// 频率计算使用更严格的积分与 SCF 容差
    pub fn tolerances(&self) -> (String, u32) {
        let defaults = DeckOptions::default();
        if self.calculation == CalculationType::Freq
            && self.tolinteg == defaults.tolinteg
            && self.toldee == defaults.toldee
        {
            ("12 12 12 12 24".to_string(), 12)
        } else {
            (self.tolinteg.clone(), self.toldee)
        }
    }

    /// 输出文件名 `{base}_{维度}_{类型}_{泛函}_{基组}.d12`
    pub fn output_name(&self, base: &str) -> String {
        format!(
            "{}_{}_{}_{}_{}.d12",
            base,
            self.dimensionality.keyword(),
            self.calculation.tag(),
            self.functional_keyword(),
            self.basis.tag()
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        write_string(path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_functional_keyword() {
        let mut opts = DeckOptions::default();
        assert_eq!(opts.functional_keyword(), "B3LYP");
        opts.dispersion = true;
        assert_eq!(opts.functional_keyword(), "B3LYP-D3");
        opts.functional = "PBESOL0".to_string();
        assert_eq!(opts.functional_keyword(), "PBESOL0");
    }

    #[test]
    fn test_output_name() {
        let opts = DeckOptions::default();
        assert_eq!(opts.output_name("MgO"), "MgO_CRYSTAL_OPT_B3LYP_POB-TZVP-REV2.d12");
    }

    #[test]
    fn test_freq_tolerances() {
        let mut opts = DeckOptions::default();
        assert_eq!(opts.tolerances(), ("7 7 7 7 14".to_string(), 7));
        opts.calculation = CalculationType::Freq;
        assert_eq!(opts.tolerances(), ("12 12 12 12 24".to_string(), 12));
    }

    #[test]
    fn test_json_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opts.json");
        let mut opts = DeckOptions::default();
        opts.basis = Basis::External {
            dir: PathBuf::from("basis/full.basis.doublezeta"),
        };
        opts.save(&path).unwrap();
        assert_eq!(DeckOptions::load(&path).unwrap(), opts);

        // 缺省字段取默认值
        let partial: DeckOptions =
            serde_json::from_str(r#"{"calculation":"SP","spin_polarized":true}"#).unwrap();
        assert_eq!(partial.calculation, CalculationType::Sp);
        assert!(partial.spin_polarized);
        assert_eq!(partial.fmixing, 30);
    }
}
