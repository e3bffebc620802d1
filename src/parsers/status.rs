//! # 计算日志状态分类
//!
//! 先按错误关键字（大小写不敏感，按表中顺序）归类，再判断是否正常结束。
//!
//! ## 依赖关系
//! - 被 `commands/jobs.rs` 使用
//! - 无外部模块依赖

use std::fmt;

/// 日志所属类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    TooManyScf,
    Memory,
    Quota,
    Time,
    GeometrySmallDist,
    ShrinkError,
    LinearBasis,
    Potential,
    /// 几何优化收敛
    Complete,
    /// 单点计算结束
    CompleteSp,
    Unknown,
    Ongoing,
}

/// 错误类别及其关键字，按优先级排列
pub const ERROR_PATTERNS: &[(Category, &[&str])] = &[
    (Category::TooManyScf, &["TOO MANY CYCLES"]),
    (Category::Memory, &["out-of-memory handler"]),
    (Category::Quota, &["error during write"]),
    (Category::Time, &["DUE TO TIME LIMIT"]),
    (Category::GeometrySmallDist, &["**** NEIGHB ****"]),
    (Category::ShrinkError, &["ANISOTROPIC SHRINKING FACTOR"]),
    (Category::LinearBasis, &["BASIS SET LINEARLY DEPENDENT"]),
    (
        Category::Potential,
        &[
            "segmentation fault",
            "=   bad termination of",
            "abort(1) on node",
            "srun: error:",
            "slurmstepd: error: ***",
            "forrtl: error (78):",
            "Stack trace terminated abnormally.",
        ],
    ),
];

impl Category {
    pub const ALL: [Category; 12] = [
        Category::TooManyScf,
        Category::Memory,
        Category::Quota,
        Category::Time,
        Category::GeometrySmallDist,
        Category::ShrinkError,
        Category::LinearBasis,
        Category::Potential,
        Category::Complete,
        Category::CompleteSp,
        Category::Unknown,
        Category::Ongoing,
    ];

    /// 名称（同时是 `{name}_list.csv` 的前缀）
    pub fn name(self) -> &'static str {
        match self {
            Category::TooManyScf => "too_many_scf",
            Category::Memory => "memory",
            Category::Quota => "quota",
            Category::Time => "time",
            Category::GeometrySmallDist => "geometry_small_dist",
            Category::ShrinkError => "shrink_error",
            Category::LinearBasis => "linear_basis",
            Category::Potential => "potential",
            Category::Complete => "complete",
            Category::CompleteSp => "completesp",
            Category::Unknown => "unknown",
            Category::Ongoing => "ongoing",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn is_error(self) -> bool {
        ERROR_PATTERNS.iter().any(|(c, _)| *c == self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 对整份日志文本分类
pub fn categorize(text: &str) -> Category {
    let lower = text.to_lowercase();
    for (category, patterns) in ERROR_PATTERNS {
        if patterns.iter().any(|p| lower.contains(&p.to_lowercase())) {
            return *category;
        }
    }

    if text.contains("OPT END") {
        Category::Complete
    } else if text.contains("    TOTAL CPU TIME =") {
        Category::CompleteSp
    } else if lower.contains("error") {
        Category::Unknown
    } else {
        Category::Ongoing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_patterns_take_priority() {
        let text = " * OPT END - CONVERGED * E(AU): -2.7E+02\n TOO MANY CYCLES\n";
        assert_eq!(categorize(text), Category::TooManyScf);
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(categorize("SEGMENTATION FAULT occurred"), Category::Potential);
        assert_eq!(categorize("job killed due to time limit"), Category::Time);
    }

    #[test]
    fn test_order_inside_error_table() {
        // 同时命中内存与配额，内存在前
        let text = "out-of-memory handler\nerror during write\n";
        assert_eq!(categorize(text), Category::Memory);
    }

    #[test]
    fn test_completion_and_fallbacks() {
        assert_eq!(categorize(" * OPT END - CONVERGED *"), Category::Complete);
        assert_eq!(
            categorize(" EEEEEEEEEE TERMINATION\n    TOTAL CPU TIME =    12.3"),
            Category::CompleteSp
        );
        assert_eq!(categorize("WARNING: some Error"), Category::Unknown);
        assert_eq!(categorize(" CYC   3 ETOT(AU) -1.0"), Category::Ongoing);
    }

    #[test]
    fn test_names_round_trip() {
        for c in Category::ALL {
            assert_eq!(Category::from_name(c.name()), Some(c));
        }
        assert!(Category::Quota.is_error());
        assert!(!Category::Complete.is_error());
    }
}
