// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::webhook::WebhookLog;
use crate::domain::repositories::webhook_log_repository::WebhookLogRepository;
use crate::infrastructure::database::entities::webhook_log;
use crate::utils::errors::RepositoryError;

/// Webhook投递日志仓库实现
#[derive(Clone)]
pub struct WebhookLogRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl WebhookLogRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<webhook_log::Model> for WebhookLog {
    fn from(model: webhook_log::Model) -> Self {
        Self {
            id: model.id,
            webhook_id: model.webhook_id,
            event_type: model.event_type,
            payload: model.payload,
            response_status: model.response_status,
            response_body: model.response_body,
            success: model.success,
            error_message: model.error_message,
            attempt_number: model.attempt_number,
            is_retry: model.is_retry,
            created_at: model.created_at.into(),
        }
    }
}

#[async_trait]
impl WebhookLogRepository for WebhookLogRepositoryImpl {
    async fn append(&self, log: &WebhookLog) -> Result<WebhookLog, RepositoryError> {
        let active = webhook_log::ActiveModel {
            id: Set(log.id),
            webhook_id: Set(log.webhook_id),
            event_type: Set(log.event_type.clone()),
            payload: Set(log.payload.clone()),
            response_status: Set(log.response_status),
            response_body: Set(log.response_body.clone()),
            success: Set(log.success),
            error_message: Set(log.error_message.clone()),
            attempt_number: Set(log.attempt_number),
            is_retry: Set(log.is_retry),
            created_at: Set(log.created_at.into()),
        };
        webhook_log::Entity::insert(active)
            .exec(self.db.as_ref())
            .await?;
        Ok(log.clone())
    }

    async fn find_by_webhook(
        &self,
        webhook_id: Uuid,
        limit: Option<u64>,
    ) -> Result<Vec<WebhookLog>, RepositoryError> {
        let mut query = webhook_log::Entity::find()
            .filter(webhook_log::Column::WebhookId.eq(webhook_id))
            .order_by_desc(webhook_log::Column::CreatedAt);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let models = query.all(self.db.as_ref()).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
