// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::webhook::{Webhook, WebhookEventType};
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::infrastructure::database::entities::webhook;
use crate::utils::errors::RepositoryError;

/// Webhook仓库实现
#[derive(Clone)]
pub struct WebhookRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl WebhookRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<webhook::Model> for Webhook {
    fn from(model: webhook::Model) -> Self {
        let headers = model
            .headers
            .and_then(|v| serde_json::from_value::<HashMap<String, String>>(v).ok());
        Self {
            id: model.id,
            user_id: model.user_id,
            session_id: model.session_id,
            webhook_type: model.webhook_type.parse().unwrap_or(WebhookEventType::All),
            url: model.url,
            success_webhook_url: model.success_webhook_url,
            failure_webhook_url: model.failure_webhook_url,
            custom_payload: model.custom_payload,
            headers,
            max_retries: model.max_retries,
            retry_delay_seconds: model.retry_delay_seconds,
            retry_on_failure: model.retry_on_failure,
            is_active: model.is_active,
            total_calls: model.total_calls,
            success_calls: model.success_calls,
            failed_calls: model.failed_calls,
            last_called_at: model.last_called_at.map(Into::into),
            last_success_at: model.last_success_at.map(Into::into),
            last_failure_at: model.last_failure_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

fn to_active_model(w: &Webhook) -> webhook::ActiveModel {
    webhook::ActiveModel {
        id: Set(w.id),
        user_id: Set(w.user_id),
        session_id: Set(w.session_id.clone()),
        webhook_type: Set(w.webhook_type.to_string()),
        url: Set(w.url.clone()),
        success_webhook_url: Set(w.success_webhook_url.clone()),
        failure_webhook_url: Set(w.failure_webhook_url.clone()),
        custom_payload: Set(w.custom_payload.clone()),
        headers: Set(w
            .headers
            .as_ref()
            .and_then(|h| serde_json::to_value(h).ok())),
        max_retries: Set(w.max_retries),
        retry_delay_seconds: Set(w.retry_delay_seconds),
        retry_on_failure: Set(w.retry_on_failure),
        is_active: Set(w.is_active),
        total_calls: Set(w.total_calls),
        success_calls: Set(w.success_calls),
        failed_calls: Set(w.failed_calls),
        last_called_at: Set(w.last_called_at.map(Into::into)),
        last_success_at: Set(w.last_success_at.map(Into::into)),
        last_failure_at: Set(w.last_failure_at.map(Into::into)),
        created_at: Set(w.created_at.into()),
        updated_at: Set(w.updated_at.into()),
    }
}

#[async_trait]
impl WebhookRepository for WebhookRepositoryImpl {
    async fn create(&self, w: &Webhook) -> Result<Webhook, RepositoryError> {
        // (用户, 会话, 类型) 唯一
        let duplicate = webhook::Entity::find()
            .filter(webhook::Column::UserId.eq(w.user_id))
            .filter(webhook::Column::SessionId.eq(w.session_id.clone()))
            .filter(webhook::Column::WebhookType.eq(w.webhook_type.to_string()))
            .one(self.db.as_ref())
            .await?;
        if duplicate.is_some() {
            return Err(RepositoryError::AlreadyExists);
        }

        webhook::Entity::insert(to_active_model(w))
            .exec(self.db.as_ref())
            .await?;
        Ok(w.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Webhook>, RepositoryError> {
        let model = webhook::Entity::find_by_id(id).one(self.db.as_ref()).await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Webhook>, RepositoryError> {
        let models = webhook::Entity::find()
            .filter(webhook::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_active_for_event(
        &self,
        user_id: Uuid,
        session_id: &str,
        types: &[WebhookEventType],
    ) -> Result<Vec<Webhook>, RepositoryError> {
        let type_names: Vec<String> = types.iter().map(|t| t.to_string()).collect();
        let models = webhook::Entity::find()
            .filter(webhook::Column::UserId.eq(user_id))
            .filter(webhook::Column::SessionId.eq(session_id))
            .filter(webhook::Column::IsActive.eq(true))
            .filter(webhook::Column::WebhookType.is_in(type_names))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, w: &Webhook) -> Result<Webhook, RepositoryError> {
        let existing = webhook::Entity::find_by_id(w.id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut active = to_active_model(w);
        active.created_at = Set(existing.created_at);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(self.db.as_ref()).await?;
        self.find_by_id(w.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        webhook::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn update_webhook_stats(
        &self,
        webhook_id: Uuid,
        success: bool,
    ) -> Result<(), RepositoryError> {
        let model = webhook::Entity::find_by_id(webhook_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let now = Utc::now().fixed_offset();
        let total = model.total_calls + 1;
        let succeeded = model.success_calls + i64::from(success);
        let failed = model.failed_calls + i64::from(!success);

        let mut active: webhook::ActiveModel = model.into();
        active.total_calls = Set(total);
        active.success_calls = Set(succeeded);
        active.failed_calls = Set(failed);
        active.last_called_at = Set(Some(now));
        if success {
            active.last_success_at = Set(Some(now));
        } else {
            active.last_failure_at = Set(Some(now));
        }
        active.update(self.db.as_ref()).await?;
        Ok(())
    }
}
