// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::webhook::WebhookLog;
use crate::utils::errors::RepositoryError;

/// Webhook投递日志仓库特质
#[async_trait]
pub trait WebhookLogRepository: Send + Sync {
    /// 追加一条尝试记录
    async fn append(&self, log: &WebhookLog) -> Result<WebhookLog, RepositoryError>;

    /// 查询某个订阅的投递日志（按时间倒序）
    async fn find_by_webhook(
        &self,
        webhook_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<WebhookLog>, RepositoryError>;
}
