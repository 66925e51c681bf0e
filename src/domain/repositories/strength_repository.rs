// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::errors::RepositoryError;

/// 账号强度指标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStrength {
    pub user_id: Uuid,
    pub session_id: String,
    /// 0-100 的综合分
    pub strength_score: i32,
    pub total_messages: i64,
    pub total_contacts: i32,
    pub last_strengthened_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// 账号强度仓库特质
#[async_trait]
pub trait StrengthRepository: Send + Sync {
    /// 读取指标；不存在时返回零值记录
    async fn get(&self, user_id: Uuid, session_id: &str)
        -> Result<AccountStrength, RepositoryError>;

    /// 更新账号强度指标（upsert）
    async fn update_account_strength_metrics(
        &self,
        metrics: &AccountStrength,
    ) -> Result<(), RepositoryError>;
}
