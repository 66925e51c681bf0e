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

use crate::domain::models::rate_limit::RateLimitSettings;
use crate::domain::repositories::rate_limit_repository::RateLimitRepository;
use crate::infrastructure::database::entities::rate_limit_settings;
use crate::utils::errors::RepositoryError;

/// 限流设置仓库实现
#[derive(Clone)]
pub struct RateLimitRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl RateLimitRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RateLimitRepository for RateLimitRepositoryImpl {
    async fn get_settings(&self, user_id: Uuid) -> Result<RateLimitSettings, RepositoryError> {
        let model = rate_limit_settings::Entity::find()
            .filter(rate_limit_settings::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await?;

        Ok(match model {
            Some(m) => RateLimitSettings {
                user_id: m.user_id,
                per_minute: m.per_minute,
                per_hour: m.per_hour,
                per_day: m.per_day,
            },
            None => RateLimitSettings::defaults(user_id),
        })
    }

    async fn put_settings(&self, settings: &RateLimitSettings) -> Result<(), RepositoryError> {
        let existing = rate_limit_settings::Entity::find()
            .filter(rate_limit_settings::Column::UserId.eq(settings.user_id))
            .one(self.db.as_ref())
            .await?;

        match existing {
            Some(model) => {
                let mut active: rate_limit_settings::ActiveModel = model.into();
                active.per_minute = Set(settings.per_minute);
                active.per_hour = Set(settings.per_hour);
                active.per_day = Set(settings.per_day);
                active.updated_at = Set(Utc::now().fixed_offset());
                active.update(self.db.as_ref()).await?;
            }
            None => {
                let active = rate_limit_settings::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(settings.user_id),
                    per_minute: Set(settings.per_minute),
                    per_hour: Set(settings.per_hour),
                    per_day: Set(settings.per_day),
                    updated_at: Set(Utc::now().fixed_offset()),
                };
                rate_limit_settings::Entity::insert(active)
                    .exec(self.db.as_ref())
                    .await?;
            }
        }
        Ok(())
    }
}
