// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::webhook::{Webhook, WebhookEventType};
use crate::utils::errors::RepositoryError;

/// Webhook仓库特质
#[async_trait]
pub trait WebhookRepository: Send + Sync {
    /// 创建订阅；(用户, 会话, 类型) 上有唯一约束
    async fn create(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Webhook>, RepositoryError>;

    /// 查询用户的全部订阅
    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Webhook>, RepositoryError>;

    /// 事件路由查询：激活的、类型命中任一候选类型的订阅
    ///
    /// 候选类型集合由扇出引擎给出（具体类型 ∪ 通用入站类型 ∪ all）
    async fn find_active_for_event(
        &self,
        user_id: Uuid,
        session_id: &str,
        types: &[WebhookEventType],
    ) -> Result<Vec<Webhook>, RepositoryError>;

    /// 更新订阅配置
    async fn update(&self, webhook: &Webhook) -> Result<Webhook, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 一次投递终结后更新累计统计
    ///
    /// total/success/failed 计数与最近调用时间戳在单条UPDATE内完成
    async fn update_webhook_stats(
        &self,
        webhook_id: Uuid,
        success: bool,
    ) -> Result<(), RepositoryError>;
}
