// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::models::session::{ConnectionEventType, Session, SessionStatus};
use crate::utils::errors::RepositoryError;

/// 会话仓库特质
///
/// 管理会话行及其状态迁移的持久化
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// 创建会话行
    async fn create(&self, session: &Session) -> Result<Session, RepositoryError>;

    /// 按ID查询会话
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>, RepositoryError>;

    /// 查询用户处于指定状态的全部会话
    async fn find_by_user_and_status(
        &self,
        user_id: Uuid,
        status: SessionStatus,
    ) -> Result<Vec<Session>, RepositoryError>;

    /// 查询全部处于指定状态的会话（启动对账用）
    async fn find_all_by_status(
        &self,
        status: SessionStatus,
    ) -> Result<Vec<Session>, RepositoryError>;

    /// 更新会话状态
    async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
    ) -> Result<(), RepositoryError>;

    /// 写入最新的QR码载荷
    async fn update_qr_code(&self, session_id: &str, qr: &str) -> Result<(), RepositoryError>;

    /// 刷新最近活跃时间
    async fn touch_activity(&self, session_id: &str) -> Result<(), RepositoryError>;

    /// 会话就绪：在一个事务内写入手机号、清除QR码、刷新活跃时间，
    /// 并把同一用户的其他 `connected` 会话全部置为 `disconnected`
    ///
    /// # 返回值
    ///
    /// 返回该用户在本次就绪之前是否已有其他已连接会话，
    /// 调用方据此决定是否递增订阅的号码用量
    async fn mark_ready(
        &self,
        session_id: &str,
        user_id: Uuid,
        phone_number: &str,
    ) -> Result<bool, RepositoryError>;

    /// 删除会话行
    async fn delete(&self, session_id: &str) -> Result<(), RepositoryError>;

    /// 追加连接事件审计记录
    async fn log_connection_event(
        &self,
        session_id: &str,
        user_id: Uuid,
        event_type: ConnectionEventType,
        details: Option<Value>,
    ) -> Result<(), RepositoryError>;
}
