// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::api_key::ApiKey;
use crate::utils::errors::RepositoryError;

/// API密钥仓库特质
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// 插入新密钥
    async fn create(&self, api_key: &ApiKey) -> Result<ApiKey, RepositoryError>;

    /// 按密钥字符串查询激活的密钥
    async fn find_active_by_key(&self, key: &str) -> Result<Option<ApiKey>, RepositoryError>;

    /// 查询会话当前激活的密钥
    async fn find_active_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ApiKey>, RepositoryError>;

    /// 会话首次就绪时生成密钥（已有激活密钥则返回现有的）
    async fn ensure_for_session(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<ApiKey, RepositoryError>;

    /// 吊销密钥
    async fn revoke(&self, key_id: Uuid) -> Result<(), RepositoryError>;

    /// 命中后刷新最近使用时间并累加使用次数
    async fn touch_usage(&self, key_id: Uuid) -> Result<(), RepositoryError>;
}
