//! # 作业状态持久化
//!
//! 状态文件先写入 `path.tmp` 再重命名，任何时刻磁盘上都是完整的旧版本或新版本。
//! 主位置不可用时依次尝试家目录与系统临时目录。

use crate::error::{read_to_string, write_error, CryskitError, Result};
use crate::models::jobs::JobStatus;

use std::fs;
use std::path::{Path, PathBuf};

/// 默认状态文件名
pub const DEFAULT_STATUS_FILE: &str = "crystal_job_status.json";

/// 状态文件存储
#[derive(Debug, Clone)]
pub struct StatusStore {
    /// 查找与保存的候选位置，首个为主位置
    locations: Vec<PathBuf>,
    /// 当前使用的位置
    current: PathBuf,
}

impl StatusStore {
    /// 主位置 + `$HOME/<文件名>` + `<temp>/<文件名>`
    pub fn new(primary: &Path) -> Self {
        let file_name = primary
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| DEFAULT_STATUS_FILE.into());
        let mut fallbacks = Vec::new();
        if let Some(home) = std::env::var_os("HOME") {
            fallbacks.push(PathBuf::from(home).join(&file_name));
        }
        fallbacks.push(std::env::temp_dir().join(&file_name));
        Self::with_locations(primary, fallbacks)
    }

    pub fn with_locations(primary: &Path, fallbacks: Vec<PathBuf>) -> Self {
        let mut locations = vec![primary.to_path_buf()];
        for path in fallbacks {
            if !locations.contains(&path) {
                locations.push(path);
            }
        }
        Self {
            current: primary.to_path_buf(),
            locations,
        }
    }

    /// 当前状态文件位置
    pub fn path(&self) -> &Path {
        &self.current
    }

    /// 按候选顺序加载第一个可读的状态文件；都没有时返回空状态
    pub fn load(&mut self) -> JobStatus {
        for path in &self.locations {
            if !path.exists() {
                continue;
            }
            let parsed = read_to_string(path)
                .and_then(|text| serde_json::from_str::<JobStatus>(&text).map_err(CryskitError::from));
            match parsed {
                Ok(status) => {
                    log::info!("loaded job status from {}", path.display());
                    self.current = path.clone();
                    return status;
                }
                Err(e) => log::warn!("unreadable status file {}: {}", path.display(), e),
            }
        }
        log::info!("no status file found, starting fresh at {}", self.current.display());
        JobStatus::default()
    }

    /// 保存到当前位置，失败时依次尝试其余位置
    pub fn save(&mut self, status: &JobStatus) -> Result<()> {
        let mut order = vec![self.current.clone()];
        order.extend(self.locations.iter().filter(|p| **p != self.current).cloned());

        let mut last_err = None;
        for path in order {
            match write_temp(&path, status).and_then(|tmp| commit(&tmp, &path)) {
                Ok(()) => {
                    if path != self.current {
                        log::warn!("status saved to alternate location {}", path.display());
                        self.current = path;
                    }
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("failed to save status to {}: {}", path.display(), e);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or(CryskitError::StatusUnwritable))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// 写入 `path.tmp`
pub fn write_temp(path: &Path, status: &JobStatus) -> Result<PathBuf> {
    let tmp = temp_path(path);
    let text = serde_json::to_string_pretty(status)?;
    if let Err(e) = fs::write(&tmp, text) {
        let _ = fs::remove_file(&tmp);
        return Err(write_error(&tmp, e));
    }
    Ok(tmp)
}

/// 将临时文件重命名为目标文件
pub fn commit(tmp: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        write_error(path, e)
    })
}
