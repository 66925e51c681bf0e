// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::models::automation_log::{AutomationLog, AutomationType};
use crate::utils::errors::RepositoryError;

/// 自动化日志仓库特质
///
/// 日志行在派发完成后（成功或已分类的失败）写入，
/// 同时作为限流窗口计数的数据源
#[async_trait]
pub trait AutomationLogRepository: Send + Sync {
    /// 追加一条日志
    async fn append(&self, log: &AutomationLog) -> Result<AutomationLog, RepositoryError>;

    /// 统计用户自指定时刻以来的日志行数
    async fn count_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, RepositoryError>;

    /// 查询用户在某会话上指定类型的日志（按时间倒序）
    async fn find_by_session_and_type(
        &self,
        session_id: &str,
        message_type: AutomationType,
        limit: Option<u64>,
    ) -> Result<Vec<AutomationLog>, RepositoryError>;

    /// 统计会话累计发送的消息条数（账号强度指标用）
    async fn total_messages_for_session(&self, session_id: &str) -> Result<i64, RepositoryError>;
}
