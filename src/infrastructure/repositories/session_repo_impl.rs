// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::session::{ConnectionEventType, Session, SessionStatus};
use crate::domain::repositories::session_repository::SessionRepository;
use crate::infrastructure::database::entities::{connection_event, session};
use crate::utils::errors::RepositoryError;

/// 会话仓库实现
#[derive(Clone)]
pub struct SessionRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl SessionRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<session::Model> for Session {
    fn from(model: session::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            phone_number: model.phone_number,
            status: model
                .status
                .parse()
                .unwrap_or(SessionStatus::Disconnected),
            qr_code: model.qr_code,
            last_activity: model.last_activity.map(Into::into),
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }
}

#[async_trait]
impl SessionRepository for SessionRepositoryImpl {
    async fn create(&self, s: &Session) -> Result<Session, RepositoryError> {
        let active = session::ActiveModel {
            id: Set(s.id.clone()),
            user_id: Set(s.user_id),
            phone_number: Set(s.phone_number.clone()),
            status: Set(s.status.to_string()),
            qr_code: Set(s.qr_code.clone()),
            last_activity: Set(s.last_activity.map(Into::into)),
            created_at: Set(s.created_at.into()),
            updated_at: Set(s.updated_at.into()),
        };
        session::Entity::insert(active).exec(self.db.as_ref()).await?;
        Ok(s.clone())
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, RepositoryError> {
        let model = session::Entity::find_by_id(session_id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_user_and_status(
        &self,
        user_id: Uuid,
        status: SessionStatus,
    ) -> Result<Vec<Session>, RepositoryError> {
        let models = session::Entity::find()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::Status.eq(status.to_string()))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_all_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<Session>, RepositoryError> {
        let models = session::Entity::find()
            .filter(session::Column::Status.eq(status.to_string()))
            .all(self.db.as_ref())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), RepositoryError> {
        let model = session::Entity::find_by_id(session_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut active: session::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn update_qr_code(&self, session_id: &str, qr: &str) -> Result<(), RepositoryError> {
        let model = session::Entity::find_by_id(session_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut active: session::ActiveModel = model.into();
        active.qr_code = Set(Some(qr.to_string()));
        active.status = Set(SessionStatus::QrPending.to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn touch_activity(&self, session_id: &str) -> Result<(), RepositoryError> {
        let model = session::Entity::find_by_id(session_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let mut active: session::ActiveModel = model.into();
        active.last_activity = Set(Some(Utc::now().fixed_offset()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn mark_ready(
        &self,
        session_id: &str,
        user_id: Uuid,
        phone_number: &str,
    ) -> Result<bool, RepositoryError> {
        let txn = self.db.begin().await?;

        let current = session::Entity::find_by_id(session_id)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let was_connected = current.status == SessionStatus::Connected.to_string();

        // 同一用户的其他已连接会话全部强制断开
        let others = session::Entity::find()
            .filter(session::Column::UserId.eq(user_id))
            .filter(session::Column::Status.eq(SessionStatus::Connected.to_string()))
            .filter(session::Column::Id.ne(session_id))
            .all(&txn)
            .await?;
        let had_other_connected = !others.is_empty();
        for other in others {
            let mut active: session::ActiveModel = other.into();
            active.status = Set(SessionStatus::Disconnected.to_string());
            active.updated_at = Set(Utc::now().fixed_offset());
            active.update(&txn).await?;
        }

        let mut active: session::ActiveModel = current.into();
        active.status = Set(SessionStatus::Connected.to_string());
        active.phone_number = Set(Some(phone_number.to_string()));
        active.qr_code = Set(None);
        active.last_activity = Set(Some(Utc::now().fixed_offset()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&txn).await?;

        txn.commit().await?;

        // 只有本会话确实新建立连接且此前没有其他已连接会话时，
        // 调用方才递增号码用量；重复的ready事件不会重复计数
        Ok(!was_connected && !had_other_connected)
    }

    async fn delete(&self, session_id: &str) -> Result<(), RepositoryError> {
        session::Entity::delete_by_id(session_id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn log_connection_event(
        &self,
        session_id: &str,
        user_id: Uuid,
        event_type: ConnectionEventType,
        details: Option<Value>,
    ) -> Result<(), RepositoryError> {
        let active = connection_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id.to_string()),
            user_id: Set(user_id),
            event_type: Set(event_type.to_string()),
            details: Set(details),
            created_at: Set(Utc::now().fixed_offset()),
        };
        connection_event::Entity::insert(active)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
