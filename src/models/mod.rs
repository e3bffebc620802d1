//! # 数据模型模块
//!
//! 定义晶体结构、对称性、材料文件组与日志提取结果的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/` 和 `commands/` 使用
//! - 子模块: structure, element, symmetry, material, options, results, jobs

pub mod element;
pub mod jobs;
pub mod material;
pub mod options;
pub mod results;
pub mod structure;
pub mod symmetry;

pub use material::{FileRole, MaterialFiles};
pub use structure::{Atom, CellParameters, Dimensionality, Structure};
pub use symmetry::{Centering, CrystalSystem};
