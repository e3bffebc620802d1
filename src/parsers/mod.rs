//! # 解析器模块
//!
//! CRYSTAL 输入输出与结构文件的解析器和生成器。
//!
//! ## 依赖关系
//! - 被 `commands/`, `plot/` 使用
//! - 使用 `models/` 数据模型
//! - 子模块: rules, crystal_out, status, cif, d12, d3, dat

pub mod cif;
pub mod crystal_out;
pub mod d12;
pub mod d3;
pub mod dat;
pub mod rules;
pub mod status;

pub use rules::LogFile;
