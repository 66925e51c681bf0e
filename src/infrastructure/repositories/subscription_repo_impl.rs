// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::subscription::{
    Subscription, SubscriptionTier, SubscriptionVerdict,
};
use crate::domain::repositories::subscription_repository::SubscriptionRepository;
use crate::infrastructure::database::entities::subscription;
use crate::utils::errors::RepositoryError;

/// 订阅仓库实现
#[derive(Clone)]
pub struct SubscriptionRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl SubscriptionRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<subscription::Model> for Subscription {
    fn from(model: subscription::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            tier: model.tier.parse().unwrap_or(SubscriptionTier::Basic),
            messages_used: model.messages_used,
            numbers_used: model.numbers_used,
            is_active: model.is_active,
            started_at: model.started_at.into(),
            expires_at: model.expires_at.map(Into::into),
            updated_at: model.updated_at.into(),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionRepositoryImpl {
    async fn find_active(&self, user_id: Uuid) -> Result<Option<Subscription>, RepositoryError> {
        let model = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn activate(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<Subscription, RepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        // 至多一条激活订阅：先停用既有的
        let existing = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::IsActive.eq(true))
            .all(&txn)
            .await?;
        for model in existing {
            let mut active: subscription::ActiveModel = model.into();
            active.is_active = Set(false);
            active.updated_at = Set(now.fixed_offset());
            active.update(&txn).await?;
        }

        let expires_at = tier
            .limits()
            .duration_days
            .map(|days| (now + Duration::days(days)).fixed_offset());
        let model = subscription::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            tier: Set(tier.to_string()),
            messages_used: Set(0),
            numbers_used: Set(0),
            is_active: Set(true),
            started_at: Set(now.fixed_offset()),
            expires_at: Set(expires_at),
            updated_at: Set(now.fixed_offset()),
        };
        let inserted = model.insert(&txn).await?;
        txn.commit().await?;
        Ok(inserted.into())
    }

    async fn check_subscription_limits(
        &self,
        user_id: Uuid,
        messages_needed: i64,
        numbers_needed: i32,
    ) -> Result<SubscriptionVerdict, RepositoryError> {
        let Some(sub) = self.find_active(user_id).await? else {
            return Ok(SubscriptionVerdict::denied("no_active_subscription"));
        };

        if sub.is_expired(Utc::now()) {
            return Ok(SubscriptionVerdict::denied("subscription_expired"));
        }

        let limits = sub.tier.limits();
        if let Some(max_messages) = limits.messages {
            if sub.messages_used + messages_needed > max_messages {
                return Ok(SubscriptionVerdict::denied("message_limit_exceeded"));
            }
        }
        if let Some(max_numbers) = limits.numbers {
            if sub.numbers_used + numbers_needed > max_numbers {
                return Ok(SubscriptionVerdict::denied("number_limit_exceeded"));
            }
        }

        Ok(SubscriptionVerdict::allowed())
    }

    async fn increment_subscription_usage(
        &self,
        user_id: Uuid,
        messages: i64,
        numbers: i32,
    ) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await?;
        let model = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::IsActive.eq(true))
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let new_messages = model.messages_used + messages;
        let new_numbers = model.numbers_used + numbers;
        let mut active: subscription::ActiveModel = model.into();
        active.messages_used = Set(new_messages);
        active.numbers_used = Set(new_numbers);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}
