// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::automation_log::{AutomationLog, AutomationType, SendStatus};
use crate::domain::repositories::automation_log_repository::AutomationLogRepository;
use crate::infrastructure::database::entities::automation_log;
use crate::utils::errors::RepositoryError;

/// 自动化日志仓库实现
#[derive(Clone)]
pub struct AutomationLogRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl AutomationLogRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<automation_log::Model> for AutomationLog {
    fn from(model: automation_log::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            session_id: model.session_id,
            message_type: model
                .message_type
                .parse()
                .unwrap_or(AutomationType::ApiMessage),
            recipient: model.recipient,
            recipients: model.recipients,
            message: model.message,
            status: model.status.parse().unwrap_or(SendStatus::Failed),
            error_message: model.error_message,
            message_count: model.message_count,
            created_at: model.created_at.into(),
        }
    }
}

#[async_trait]
impl AutomationLogRepository for AutomationLogRepositoryImpl {
    async fn append(&self, log: &AutomationLog) -> Result<AutomationLog, RepositoryError> {
        let active = automation_log::ActiveModel {
            id: Set(log.id),
            user_id: Set(log.user_id),
            session_id: Set(log.session_id.clone()),
            message_type: Set(log.message_type.to_string()),
            recipient: Set(log.recipient.clone()),
            recipients: Set(log.recipients.clone()),
            message: Set(log.message.clone()),
            status: Set(log.status.to_string()),
            error_message: Set(log.error_message.clone()),
            message_count: Set(log.message_count),
            created_at: Set(log.created_at.into()),
        };
        automation_log::Entity::insert(active)
            .exec(self.db.as_ref())
            .await?;
        Ok(log.clone())
    }

    async fn count_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let count = automation_log::Entity::find()
            .filter(automation_log::Column::UserId.eq(user_id))
            .filter(automation_log::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await?;
        Ok(count as i64)
    }

    async fn find_by_session_and_type(
        &self,
        session_id: &str,
        message_type: AutomationType,
        limit: Option<u64>,
    ) -> Result<Vec<AutomationLog>, RepositoryError> {
        let mut query = automation_log::Entity::find()
            .filter(automation_log::Column::SessionId.eq(session_id))
            .filter(automation_log::Column::MessageType.eq(message_type.to_string()))
            .order_by_desc(automation_log::Column::CreatedAt);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let models = query.all(self.db.as_ref()).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn total_messages_for_session(&self, session_id: &str) -> Result<i64, RepositoryError> {
        // 强度指标统计的是消息条数，群发按收件人数量累计
        let models = automation_log::Entity::find()
            .filter(automation_log::Column::SessionId.eq(session_id))
            .all(self.db.as_ref())
            .await?;
        Ok(models.iter().map(|m| m.message_count as i64).sum())
    }
}
