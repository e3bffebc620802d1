//! # 作业状态数据模型
//!
//! 作业名分为三组：`pending`、`submitted`（名→作业号）、`completed`。
//! 序列化格式：`{ "submitted": {name: id}, "pending": [name], "completed": [name] }`
//!
//! ## 依赖关系
//! - 被 `queue/` 使用
//! - 使用 `serde`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 持久化的作业状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub submitted: BTreeMap<String, String>,
    #[serde(default)]
    pub pending: Vec<String>,
    #[serde(default)]
    pub completed: Vec<String>,
}

impl JobStatus {
    /// 作业是否已被记录在任一分组
    pub fn knows(&self, name: &str) -> bool {
        self.submitted.contains_key(name)
            || self.pending.iter().any(|n| n == name)
            || self.completed.iter().any(|n| n == name)
    }

    pub fn total(&self) -> usize {
        self.submitted.len() + self.pending.len() + self.completed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let mut status = JobStatus::default();
        status.submitted.insert("MgO".into(), "1234".into());
        status.pending.push("ZnO".into());

        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"submitted":{"MgO":"1234"},"pending":["ZnO"],"completed":[]}"#
        );

        let back: JobStatus = serde_json::from_str(r#"{"pending":["a"]}"#).unwrap();
        assert_eq!(back.pending, vec!["a".to_string()]);
        assert!(back.knows("a"));
        assert!(!back.knows("b"));
    }
}
