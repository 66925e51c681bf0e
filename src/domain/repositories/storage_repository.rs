// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 单文件超出大小上限
    #[error("File too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },
    /// 存储错误
    #[error("Storage error: {0}")]
    Other(String),
}

/// 对象存储仓库特质
///
/// 定义会话认证目录镜像所需的对象存储访问接口。
/// 键为 `<session_id>/<relative-path>` 形式的扁平路径
#[async_trait]
pub trait StorageRepository: Send + Sync {
    /// 确保存储桶存在（幂等）
    async fn ensure_bucket(&self) -> Result<(), StorageError>;

    /// 使用指定键保存数据（逐文件upsert）
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// 根据键检索数据
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// 列出指定前缀下的全部键
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// 根据键删除数据
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// 删除指定前缀下的全部对象
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError>;

    /// 检查指定键是否存在
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}
