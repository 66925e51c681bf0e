// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::rate_limit::RateLimitSettings;
use crate::utils::errors::RepositoryError;

/// 限流设置仓库特质
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// 读取用户限流设置；未配置时返回默认值
    async fn get_settings(&self, user_id: Uuid) -> Result<RateLimitSettings, RepositoryError>;

    /// 写入（插入或更新）用户限流设置
    async fn put_settings(&self, settings: &RateLimitSettings) -> Result<(), RepositoryError>;
}
