//! # 文件与材料收集器
//!
//! 根据目录和模式收集待处理文件，或按文件名约定把兄弟文件归组为材料。
//!
//! ## 功能
//! - glob 模式匹配（逗号分隔多模式）
//! - 可选递归目录搜索
//! - 按锚定角色（如 `.out`）发现材料并组装 `MaterialFiles`
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use crate::error::{CryskitError, Result};
use crate::models::{FileRole, MaterialFiles};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
pub struct FileCollector {
    dir: PathBuf,
    patterns: Vec<glob::Pattern>,
    recursive: bool,
}

impl FileCollector {
    /// 创建收集器，`pattern` 支持逗号分隔的多个 glob
    pub fn new(dir: &Path, pattern: &str) -> Result<Self> {
        let patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    CryskitError::InvalidArgument(format!("Invalid pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if patterns.is_empty() {
            return Err(CryskitError::InvalidArgument("empty file pattern".to_string()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            patterns,
            recursive: false,
        })
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件（排序）
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(CryskitError::DirectoryNotFound {
                path: self.dir.display().to_string(),
            });
        }

        let walker = if self.recursive {
            WalkDir::new(&self.dir)
        } else {
            WalkDir::new(&self.dir).max_depth(1)
        };

        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|name| self.patterns.iter().any(|p| p.matches(name)))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        Ok(files)
    }
}

/// 材料收集器：锚定角色的文件名决定材料名
pub struct MaterialCollector {
    dir: PathBuf,
    anchor: FileRole,
    recursive: bool,
}

impl MaterialCollector {
    pub fn new(dir: &Path, anchor: FileRole) -> Self {
        Self {
            dir: dir.to_path_buf(),
            anchor,
            recursive: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 发现所有材料，按目录与名称排序
    pub fn collect(&self) -> Result<Vec<MaterialFiles>> {
        let pattern = format!("*{}", self.anchor.suffix());
        let files = FileCollector::new(&self.dir, &pattern)?
            .recursive(self.recursive)
            .collect()?;

        // `X_BAND.out` 也匹配 `*.out`，只保留最长后缀恰为锚定角色的文件
        let stems: BTreeSet<(PathBuf, String)> = files
            .iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let (role, stem) = FileRole::classify(name)?;
                if role != self.anchor {
                    return None;
                }
                let parent = path.parent().unwrap_or(self.dir.as_path()).to_path_buf();
                Some((parent, stem.to_string()))
            })
            .collect();

        let materials: Vec<MaterialFiles> = stems
            .into_iter()
            .map(|(dir, stem)| MaterialFiles::discover(&dir, &stem))
            .collect();

        if materials.is_empty() {
            log::debug!("no '{}' files in {}", pattern, self.dir.display());
        }
        Ok(materials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_file_collector_patterns() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.cif", "b.CIF", "c.d12", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let files = FileCollector::new(dir.path(), "*.cif, *.d12").unwrap().collect().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.cif", "c.d12"]);

        assert!(FileCollector::new(dir.path(), "[").is_err());
        assert!(FileCollector::new(&dir.path().join("missing"), "*").unwrap().collect().is_err());
    }

    #[test]
    fn test_material_collector_groups_siblings() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["MgO.out", "MgO.d12", "MgO_BAND.out", "ZnO.out", "ZnO_POTC.out"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let materials = MaterialCollector::new(dir.path(), FileRole::Log).collect().unwrap();
        let names: Vec<&str> = materials.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["MgO", "ZnO"]);
        assert!(materials[0].has(FileRole::Deck));
        assert!(materials[0].has(FileRole::BandLog));
        assert!(materials[1].has(FileRole::PotentialLog));
    }

    #[test]
    fn test_recursive_search() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("X.out"), "").unwrap();
        assert!(MaterialCollector::new(dir.path(), FileRole::Log).collect().unwrap().is_empty());
        let found = MaterialCollector::new(dir.path(), FileRole::Log)
            .recursive(true)
            .collect()
            .unwrap();
        assert_eq!(found[0].dir, dir.path().join("sub"));
    }
}
