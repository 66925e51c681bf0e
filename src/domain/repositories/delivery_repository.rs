// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;

use crate::domain::models::delivery::{DeliveryStatus, DeliveryTracking};
use crate::utils::errors::RepositoryError;

/// 投递跟踪仓库特质
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    /// 发送成功后创建 `sent` 状态的跟踪行
    async fn create(&self, tracking: &DeliveryTracking)
        -> Result<DeliveryTracking, RepositoryError>;

    /// 按消息ID查询跟踪行
    async fn find_by_message_id(
        &self,
        message_id: &str,
    ) -> Result<Option<DeliveryTracking>, RepositoryError>;

    /// 回执到达后升级状态并打时间戳
    ///
    /// 状态只前进不后退：`read` 不会被 `delivered` 覆盖
    async fn update_status(
        &self,
        message_id: &str,
        status: DeliveryStatus,
    ) -> Result<(), RepositoryError>;

    /// 查询会话最近的投递记录
    async fn find_by_session(
        &self,
        session_id: &str,
        limit: Option<u64>,
    ) -> Result<Vec<DeliveryTracking>, RepositoryError>;
}
