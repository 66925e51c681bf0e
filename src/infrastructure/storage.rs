// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::settings::ObjectStorageSettings;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};

/// 单文件大小上限：10 MiB
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Supabase对象存储实现
///
/// 通过Storage REST接口操作私有桶；逐文件upsert上传，
/// 按前缀列举与下载恢复
pub struct SupabaseStorage {
    base_url: String,
    service_key: String,
    bucket: String,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(base_url: String, service_key: String, bucket: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
            bucket,
            client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[async_trait]
impl StorageRepository for SupabaseStorage {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let url = format!("{}/storage/v1/bucket", self.base_url);
        let body = serde_json::json!({
            "id": self.bucket,
            "name": self.bucket,
            "public": false,
            "file_size_limit": MAX_FILE_SIZE,
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        // 已存在的桶返回409，视为成功
        if resp.status().is_success() || resp.status().as_u16() == 409 {
            Ok(())
        } else {
            Err(StorageError::Other(format!(
                "bucket create failed with status {}",
                resp.status()
            )))
        }
    }

    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > MAX_FILE_SIZE {
            return Err(StorageError::FileTooLarge {
                size: data.len() as u64,
                limit: MAX_FILE_SIZE,
            });
        }
        let resp = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(StorageError::Other(format!(
                "upload of {} failed with status {}",
                key,
                resp.status()
            )))
        }
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let resp = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        if resp.status().as_u16() == 404 {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(StorageError::Other(format!(
                "download of {} failed with status {}",
                key,
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, self.bucket);
        let body = serde_json::json!({
            "prefix": prefix,
            "limit": 1000,
        });
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(StorageError::Other(format!(
                "list of {} failed with status {}",
                prefix,
                resp.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct Entry {
            name: String,
        }
        let entries: Vec<Entry> = resp
            .json()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;
        Ok(entries
            .into_iter()
            .map(|e| format!("{}/{}", prefix.trim_end_matches('/'), e.name))
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let resp = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;

        if resp.status().is_success() || resp.status().as_u16() == 404 {
            Ok(())
        } else {
            Err(StorageError::Other(format!(
                "delete of {} failed with status {}",
                key,
                resp.status()
            )))
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        for key in self.list(prefix).await? {
            self.delete(&key).await?;
        }
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let resp = self
            .client
            .head(self.object_url(key))
            .bearer_auth(&self.service_key)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.to_string()))?;
        Ok(resp.status().is_success())
    }
}

/// 本地文件系统存储实现（开发环境用）
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn full_path(&self, key: &str) -> std::path::PathBuf {
        Path::new(&self.base_path).join(key)
    }
}

#[async_trait]
impl StorageRepository for LocalStorage {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > MAX_FILE_SIZE {
            return Err(StorageError::FileTooLarge {
                size: data.len() as u64,
                limit: MAX_FILE_SIZE,
            });
        }
        let full_path = self.full_path(key);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&full_path).await?;
        file.write_all(data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.full_path(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let root = self.full_path(prefix);
        if !root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut stack = vec![root];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.base_path) {
                    keys.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.full_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        let root = self.full_path(prefix);
        match fs::remove_dir_all(root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.full_path(key).exists())
    }
}

/// 测试用的内存存储实现（用于单元测试）
pub struct InMemoryStorage {
    data: std::sync::Arc<tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            data: std::sync::Arc::new(tokio::sync::RwLock::new(
                std::collections::HashMap::new(),
            )),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageRepository for InMemoryStorage {
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > MAX_FILE_SIZE {
            return Err(StorageError::FileTooLarge {
                size: data.len() as u64,
                limit: MAX_FILE_SIZE,
            });
        }
        let mut map = self.data.write().await;
        map.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let map = self.data.read().await;
        Ok(map.get(key).cloned())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let map = self.data.read().await;
        Ok(map
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.data.write().await;
        map.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        let mut map = self.data.write().await;
        map.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let map = self.data.read().await;
        Ok(map.contains_key(key))
    }
}

/// 存储工厂函数
pub fn create_storage_repository(
    settings: &ObjectStorageSettings,
) -> Result<std::sync::Arc<dyn StorageRepository>, StorageError> {
    match settings.backend.as_str() {
        "supabase" => {
            let url = settings
                .url
                .as_ref()
                .ok_or_else(|| StorageError::Other("object storage url is required".to_string()))?
                .clone();
            let key = settings
                .service_key
                .as_ref()
                .ok_or_else(|| {
                    StorageError::Other("object storage service key is required".to_string())
                })?
                .clone();
            Ok(std::sync::Arc::new(SupabaseStorage::new(
                url,
                key,
                settings.bucket.clone(),
            )))
        }
        "local" => {
            let base_path = settings
                .local_path
                .clone()
                .unwrap_or_else(|| "./storage".to_string());
            Ok(std::sync::Arc::new(LocalStorage::new(base_path)))
        }
        "memory" => Ok(std::sync::Arc::new(InMemoryStorage::new())),
        other => Err(StorageError::Other(format!(
            "Unsupported storage backend: {}",
            other
        ))),
    }
}
