// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::api_key::{generate_api_key, generate_api_secret, ApiKey};
use crate::domain::repositories::api_key_repository::ApiKeyRepository;
use crate::infrastructure::database::entities::api_key;
use crate::utils::errors::RepositoryError;

/// API密钥仓库实现
#[derive(Clone)]
pub struct ApiKeyRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl ApiKeyRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<api_key::Model> for ApiKey {
    fn from(model: api_key::Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            secret: model.secret,
            user_id: model.user_id,
            session_id: model.session_id,
            is_active: model.is_active,
            last_used_at: model.last_used_at.map(Into::into),
            usage_count: model.usage_count,
            created_at: model.created_at.into(),
        }
    }
}

#[async_trait]
impl ApiKeyRepository for ApiKeyRepositoryImpl {
    async fn create(&self, k: &ApiKey) -> Result<ApiKey, RepositoryError> {
        let active = api_key::ActiveModel {
            id: Set(k.id),
            key: Set(k.key.clone()),
            secret: Set(k.secret.clone()),
            user_id: Set(k.user_id),
            session_id: Set(k.session_id.clone()),
            is_active: Set(k.is_active),
            last_used_at: Set(k.last_used_at.map(Into::into)),
            usage_count: Set(k.usage_count),
            created_at: Set(k.created_at.into()),
        };
        api_key::Entity::insert(active)
            .exec(self.db.as_ref())
            .await?;
        Ok(k.clone())
    }

    async fn find_active_by_key(&self, key: &str) -> Result<Option<ApiKey>, RepositoryError> {
        let model = api_key::Entity::find()
            .filter(api_key::Column::Key.eq(key))
            .filter(api_key::Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_active_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ApiKey>, RepositoryError> {
        let model = api_key::Entity::find()
            .filter(api_key::Column::SessionId.eq(session_id))
            .filter(api_key::Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn ensure_for_session(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<ApiKey, RepositoryError> {
        if let Some(existing) = self.find_active_by_session(session_id).await? {
            return Ok(existing);
        }

        let key = ApiKey {
            id: Uuid::new_v4(),
            key: generate_api_key(),
            secret: generate_api_secret(),
            user_id,
            session_id: session_id.to_string(),
            is_active: true,
            last_used_at: None,
            usage_count: 0,
            created_at: Utc::now(),
        };
        self.create(&key).await
    }

    async fn revoke(&self, key_id: Uuid) -> Result<(), RepositoryError> {
        let model = api_key::Entity::find_by_id(key_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut active: api_key::ActiveModel = model.into();
        active.is_active = Set(false);
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn touch_usage(&self, key_id: Uuid) -> Result<(), RepositoryError> {
        let model = api_key::Entity::find_by_id(key_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let count = model.usage_count + 1;
        let mut active: api_key::ActiveModel = model.into();
        active.last_used_at = Set(Some(Utc::now().fixed_offset()));
        active.usage_count = Set(count);
        active.update(self.db.as_ref()).await?;
        Ok(())
    }
}
