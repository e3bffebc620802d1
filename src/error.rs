//! # 统一错误处理模块
//!
//! 定义 Cryskit 的所有错误类型，使用 `thiserror` 派生。
//! 批处理中单个材料的错误转为 `ProcessResult::Failed`，不会中断整批。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - `csv`、`serde_json` 错误通过 `#[from]` 转换

use thiserror::Error;

/// Cryskit 统一错误类型
#[derive(Error, Debug)]
pub enum CryskitError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),

    #[error("Space group {0} is outside 1-230")]
    InvalidSpaceGroup(u32),

    // ─────────────────────────────────────────────────────────────
    // 模板 / 材料文件组错误
    // ─────────────────────────────────────────────────────────────
    #[error("No band path template for {system} lattice with centering '{centering}'")]
    TemplateNotFound { system: String, centering: String },

    #[error("Material '{material}' is missing its {role} file")]
    MissingSibling { material: String, role: String },

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 绘图 / 作业状态错误
    // ─────────────────────────────────────────────────────────────
    #[error("Plot rendering failed: {0}")]
    PlotError(String),

    #[error("No writable location for the job status file")]
    StatusUnwritable,

    // ─────────────────────────────────────────────────────────────
    // CSV / JSON 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, CryskitError>;

/// 读取文本文件，附带路径信息
pub fn read_to_string(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CryskitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 读取日志类文本，非 UTF-8 字节以替换字符代替
pub fn read_lossy(path: &std::path::Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| CryskitError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// 写入文本文件，附带路径信息
pub fn write_string(path: &std::path::Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| write_error(path, e))
}

/// 写入类 I/O 错误（含复制、移动、建目录）
pub fn write_error(path: &std::path::Path, source: std::io::Error) -> CryskitError {
    CryskitError::FileWriteError {
        path: path.display().to_string(),
        source,
    }
}

/// 递归创建目录
pub fn create_dir(path: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| write_error(path, e))
}
