// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;

use crate::domain::models::delivery::{DeliveryStatus, DeliveryTracking};
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::infrastructure::database::entities::delivery_tracking;
use crate::utils::errors::RepositoryError;

/// 投递跟踪仓库实现
#[derive(Clone)]
pub struct DeliveryRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl DeliveryRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<delivery_tracking::Model> for DeliveryTracking {
    fn from(model: delivery_tracking::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            session_id: model.session_id,
            message_id: model.message_id,
            recipient: model.recipient,
            status: model.status.parse().unwrap_or(DeliveryStatus::Sent),
            delivered_at: model.delivered_at.map(Into::into),
            read_at: model.read_at.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[async_trait]
impl DeliveryRepository for DeliveryRepositoryImpl {
    async fn create(
        &self,
        tracking: &DeliveryTracking,
    ) -> Result<DeliveryTracking, RepositoryError> {
        let active = delivery_tracking::ActiveModel {
            id: Set(tracking.id),
            user_id: Set(tracking.user_id),
            session_id: Set(tracking.session_id.clone()),
            message_id: Set(tracking.message_id.clone()),
            recipient: Set(tracking.recipient.clone()),
            status: Set(tracking.status.to_string()),
            delivered_at: Set(tracking.delivered_at.map(Into::into)),
            read_at: Set(tracking.read_at.map(Into::into)),
            created_at: Set(tracking.created_at.into()),
            updated_at: Set(tracking.updated_at.into()),
        };
        delivery_tracking::Entity::insert(active)
            .exec(self.db.as_ref())
            .await?;
        Ok(tracking.clone())
    }

    async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<DeliveryTracking>, RepositoryError> {
        let model = delivery_tracking::Entity::find()
            .filter(delivery_tracking::Column::MessageId.eq(message_id))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn update_status(
        &self,
        message_id: &str,
        status: DeliveryStatus,
    ) -> Result<(), RepositoryError> {
        let model = delivery_tracking::Entity::find()
            .filter(delivery_tracking::Column::MessageId.eq(message_id))
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // 状态只前进：read 不会被 delivered 覆盖
        let current: DeliveryStatus = model.status.parse().unwrap_or(DeliveryStatus::Sent);
        if matches!(current, DeliveryStatus::Read) && matches!(status, DeliveryStatus::Delivered) {
            return Ok(());
        }

        let now = Utc::now().fixed_offset();
        let mut active: delivery_tracking::ActiveModel = model.into();
        active.status = Set(status.to_string());
        match status {
            DeliveryStatus::Delivered => active.delivered_at = Set(Some(now)),
            DeliveryStatus::Read => active.read_at = Set(Some(now)),
            DeliveryStatus::Sent => {}
        }
        active.updated_at = Set(now);
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn find_by_session(
        &self,
        session_id: &str,
        limit: Option<u64>,
    ) -> Result<Vec<DeliveryTracking>, RepositoryError> {
        let mut query = delivery_tracking::Entity::find()
            .filter(delivery_tracking::Column::SessionId.eq(session_id))
            .order_by_desc(delivery_tracking::Column::CreatedAt);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let models = query.all(self.db.as_ref()).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}
