// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};

/// 会话存储服务
///
/// 在本地认证目录与对象存储之间镜像会话的认证产物。
/// 对象键为 `<session_id>/<relative-path>`，备份与恢复逐文件进行
pub struct SessionStorageService {
    storage: Arc<dyn StorageRepository>,
    auth_root: PathBuf,
}

impl SessionStorageService {
    pub fn new(storage: Arc<dyn StorageRepository>, auth_root: PathBuf) -> Self {
        Self { storage, auth_root }
    }

    /// 会话认证目录的本地路径
    pub fn auth_path(&self, session_id: &str) -> PathBuf {
        self.auth_root.join(session_id)
    }

    /// 把会话认证目录备份到对象存储
    ///
    /// # 返回值
    ///
    /// 返回上传的文件数量
    pub async fn backup(&self, session_id: &str) -> Result<usize, StorageError> {
        let root = self.auth_path(session_id);
        if !root.exists() {
            debug!("No auth directory for session {}, nothing to back up", session_id);
            return Ok(0);
        }

        let files = collect_files(&root).await?;
        let mut uploaded = 0;
        for path in files {
            let rel = path
                .strip_prefix(&root)
                .map_err(|e| StorageError::Other(e.to_string()))?;
            let key = format!("{}/{}", session_id, rel.to_string_lossy().replace('\\', "/"));
            let data = fs::read(&path).await?;
            self.storage.save(&key, &data).await?;
            uploaded += 1;
        }

        info!("Backed up {} files for session {}", uploaded, session_id);
        Ok(uploaded)
    }

    /// 从对象存储恢复会话认证目录
    ///
    /// 对象存储中没有该会话的产物不是错误——意味着需要首次认证
    ///
    /// # 返回值
    ///
    /// 返回恢复的文件数量（0表示无可恢复产物）
    pub async fn restore(&self, session_id: &str) -> Result<usize, StorageError> {
        let keys = self.storage.list(session_id).await?;
        if keys.is_empty() {
            debug!("No stored auth artifacts for session {}", session_id);
            return Ok(0);
        }

        let root = self.auth_path(session_id);
        let mut restored = 0;
        for key in keys {
            let Some(data) = self.storage.get(&key).await? else {
                continue;
            };
            let rel = key
                .strip_prefix(&format!("{}/", session_id))
                .unwrap_or(&key);
            let target = root.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&target, &data).await?;
            restored += 1;
        }

        info!("Restored {} files for session {}", restored, session_id);
        Ok(restored)
    }

    /// 删除对象存储中该会话的全部产物
    pub async fn delete_remote(&self, session_id: &str) -> Result<(), StorageError> {
        self.storage.delete_prefix(session_id).await
    }

    /// 删除本地认证目录
    pub async fn delete_local(&self, session_id: &str) -> Result<(), StorageError> {
        let root = self.auth_path(session_id);
        match fs::remove_dir_all(&root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

/// 递归收集目录下的全部文件
async fn collect_files(root: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    Ok(files)
}
