//! # 材料文件组
//!
//! 同一材料的各类文件共享文件名主干（如 `MgO.out`, `MgO.d12`, `MgO_BAND.BAND.dat`）。
//! `MaterialFiles` 把这种约定变成显式记录，并在使用前校验所需文件是否齐全。
//!
//! ## 依赖关系
//! - 被 `batch/collector.rs` 构建
//! - 被 `commands/` 使用

use crate::error::{CryskitError, Result};

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// 文件在材料组中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileRole {
    /// 主计算日志 `.out`
    Log,
    /// 输入文件 `.d12`
    Deck,
    /// 波函数 `.f9`
    Wavefunction,
    /// 能带数据 `_BAND.BAND.dat`
    BandData,
    BandLog,
    /// 态密度数据 `_DOSS.DOSS.dat`
    DosData,
    DosDeck,
    DosLog,
    TransportLog,
    /// 静电势 `_POTC.POTC.dat`
    PotentialData,
    PotentialLog,
    SlabLog,
    BulkLog,
    /// 电荷密度 `.f25`
    ChargeDensity,
}

impl FileRole {
    pub const ALL: [FileRole; 14] = [
        FileRole::Log,
        FileRole::Deck,
        FileRole::Wavefunction,
        FileRole::BandData,
        FileRole::BandLog,
        FileRole::DosData,
        FileRole::DosDeck,
        FileRole::DosLog,
        FileRole::TransportLog,
        FileRole::PotentialData,
        FileRole::PotentialLog,
        FileRole::SlabLog,
        FileRole::BulkLog,
        FileRole::ChargeDensity,
    ];

    /// 文件名后缀
    pub fn suffix(self) -> &'static str {
        match self {
            FileRole::Log => ".out",
            FileRole::Deck => ".d12",
            FileRole::Wavefunction => ".f9",
            FileRole::BandData => "_BAND.BAND.dat",
            FileRole::BandLog => "_BAND.out",
            FileRole::DosData => "_DOSS.DOSS.dat",
            FileRole::DosDeck => "_DOSS.d3",
            FileRole::DosLog => "_DOSS.out",
            FileRole::TransportLog => "_TRANSPORT.out",
            FileRole::PotentialData => "_POTC.POTC.dat",
            FileRole::PotentialLog => "_POTC.out",
            FileRole::SlabLog => "_slab.out",
            FileRole::BulkLog => "_bulk.out",
            FileRole::ChargeDensity => ".f25",
        }
    }

    /// 按最长后缀判定文件角色，返回 (角色, 材料名)
    pub fn classify(file_name: &str) -> Option<(FileRole, &str)> {
        FileRole::ALL
            .iter()
            .filter(|r| file_name.ends_with(r.suffix()) && file_name.len() > r.suffix().len())
            .max_by_key(|r| r.suffix().len())
            .map(|r| (*r, &file_name[..file_name.len() - r.suffix().len()]))
    }
}

impl fmt::Display for FileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*{}", self.suffix())
    }
}

/// 一个材料的全部兄弟文件
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialFiles {
    pub name: String,
    pub dir: PathBuf,
    files: BTreeMap<FileRole, PathBuf>,
}

impl MaterialFiles {
    /// 扫描 `dir` 中属于 `name` 的所有已知文件
    pub fn discover(dir: &Path, name: &str) -> Self {
        let mut files = BTreeMap::new();
        for role in FileRole::ALL {
            let path = dir.join(format!("{}{}", name, role.suffix()));
            if path.is_file() {
                files.insert(role, path);
            }
        }
        MaterialFiles {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            files,
        }
    }

    pub fn get(&self, role: FileRole) -> Option<&Path> {
        self.files.get(&role).map(|p| p.as_path())
    }

    pub fn has(&self, role: FileRole) -> bool {
        self.files.contains_key(&role)
    }

    /// 取出必需文件，缺失时报错
    pub fn path(&self, role: FileRole) -> Result<&Path> {
        self.get(role).ok_or_else(|| CryskitError::MissingSibling {
            material: self.name.clone(),
            role: role.to_string(),
        })
    }

    /// 校验所有必需文件都存在
    pub fn require(&self, roles: &[FileRole]) -> Result<&Self> {
        for role in roles {
            self.path(*role)?;
        }
        Ok(self)
    }

    /// 同目录下的派生文件路径（不要求存在）
    pub fn sibling(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.name, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_classify_longest_suffix() {
        assert_eq!(FileRole::classify("MgO.out"), Some((FileRole::Log, "MgO")));
        assert_eq!(
            FileRole::classify("MgO_POTC.out"),
            Some((FileRole::PotentialLog, "MgO"))
        );
        assert_eq!(
            FileRole::classify("MgO_BAND.BAND.dat"),
            Some((FileRole::BandData, "MgO"))
        );
        assert_eq!(FileRole::classify("notes.txt"), None);
        assert_eq!(FileRole::classify(".out"), None);
    }

    #[test]
    fn test_discover_and_require() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("MgO.out"), "").unwrap();
        fs::write(dir.path().join("MgO.d12"), "").unwrap();

        let m = MaterialFiles::discover(dir.path(), "MgO");
        assert!(m.has(FileRole::Log));
        assert!(m.require(&[FileRole::Log, FileRole::Deck]).is_ok());

        let err = m.require(&[FileRole::Log, FileRole::Wavefunction]).unwrap_err();
        assert!(matches!(err, CryskitError::MissingSibling { .. }));
        assert_eq!(m.sibling("_BAND.d3"), dir.path().join("MgO_BAND.d3"));
    }
}
