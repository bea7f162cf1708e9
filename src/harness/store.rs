//! 代码仓：servant 源码的唯一写入口
//!
//! 写入前先把现有版本复制到固定的派生路径（`<源码路径>.bak`，仅保留一代，
//! 每次覆盖）；备份失败立即中止，不碰源文件。写入本身走 临时文件 + 原子重命名，
//! 任何时刻磁盘上要么是完整旧版、要么是完整新版。

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::KeeperError;

/// 代码仓：持有 servant 源码路径，独占其读写
pub struct CodeStore {
    path: PathBuf,
}

impl CodeStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 备份路径：在完整文件名后追加 .bak（servant.py -> servant.py.bak）
    pub fn backup_path(&self) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(".bak");
        PathBuf::from(os)
    }

    /// 读取当前源码；不存在时报 SourceNotFound
    pub fn read(&self) -> Result<String, KeeperError> {
        if !self.path.exists() {
            return Err(KeeperError::SourceNotFound(self.path.clone()));
        }
        fs::read_to_string(&self.path)
            .map_err(|e| KeeperError::StoreError(format!("read {}: {}", self.path.display(), e)))
    }

    /// 写入新源码：先备份旧版（若存在），再 临时文件 + rename 原子落盘
    pub fn write(&self, new_source: &str) -> Result<(), KeeperError> {
        if self.path.exists() {
            let backup = self.backup_path();
            fs::copy(&self.path, &backup).map_err(|e| {
                KeeperError::StoreError(format!("backup to {}: {}", backup.display(), e))
            })?;
            tracing::info!(backup = %backup.display(), "backed up previous servant source");
        }

        // rename 要求同目录，否则可能跨文件系统
        let mut tmp_os = self.path.clone().into_os_string();
        tmp_os.push(".tmp");
        let tmp = PathBuf::from(tmp_os);

        fs::write(&tmp, new_source)
            .map_err(|e| KeeperError::StoreError(format!("write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            KeeperError::StoreError(format!("rename to {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }
}
