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

use crate::domain::repositories::strength_repository::{AccountStrength, StrengthRepository};
use crate::infrastructure::database::entities::account_strength;
use crate::utils::errors::RepositoryError;

/// 账号强度仓库实现
#[derive(Clone)]
pub struct StrengthRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl StrengthRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StrengthRepository for StrengthRepositoryImpl {
    async fn get(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<AccountStrength, RepositoryError> {
        let model = account_strength::Entity::find()
            .filter(account_strength::Column::UserId.eq(user_id))
            .filter(account_strength::Column::SessionId.eq(session_id))
            .one(self.db.as_ref())
            .await?;

        Ok(match model {
            Some(m) => AccountStrength {
                user_id: m.user_id,
                session_id: m.session_id,
                strength_score: m.strength_score,
                total_messages: m.total_messages,
                total_contacts: m.total_contacts,
                last_strengthened_at: m.last_strengthened_at.map(Into::into),
                updated_at: m.updated_at.into(),
            },
            None => AccountStrength {
                user_id,
                session_id: session_id.to_string(),
                strength_score: 0,
                total_messages: 0,
                total_contacts: 0,
                last_strengthened_at: None,
                updated_at: Utc::now(),
            },
        })
    }

    async fn update_account_strength_metrics(
        &self,
        metrics: &AccountStrength,
    ) -> Result<(), RepositoryError> {
        let existing = account_strength::Entity::find()
            .filter(account_strength::Column::UserId.eq(metrics.user_id))
            .filter(account_strength::Column::SessionId.eq(metrics.session_id.clone()))
            .one(self.db.as_ref())
            .await?;

        let now = Utc::now().fixed_offset();
        match existing {
            Some(model) => {
                let mut active: account_strength::ActiveModel = model.into();
                active.strength_score = Set(metrics.strength_score);
                active.total_messages = Set(metrics.total_messages);
                active.total_contacts = Set(metrics.total_contacts);
                active.last_strengthened_at = Set(metrics.last_strengthened_at.map(Into::into));
                active.updated_at = Set(now);
                active.update(self.db.as_ref()).await?;
            }
            None => {
                let active = account_strength::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(metrics.user_id),
                    session_id: Set(metrics.session_id.clone()),
                    strength_score: Set(metrics.strength_score),
                    total_messages: Set(metrics.total_messages),
                    total_contacts: Set(metrics.total_contacts),
                    last_strengthened_at: Set(metrics.last_strengthened_at.map(Into::into)),
                    updated_at: Set(now),
                };
                account_strength::Entity::insert(active)
                    .exec(self.db.as_ref())
                    .await?;
            }
        }
        Ok(())
    }
}
