// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::models::subscription::{Subscription, SubscriptionTier, SubscriptionVerdict};
use crate::utils::errors::RepositoryError;

/// 订阅仓库特质
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// 查询用户当前激活的订阅
    async fn find_active(&self, user_id: Uuid) -> Result<Option<Subscription>, RepositoryError>;

    /// 激活指定档位的订阅（停用既有订阅，至多一条激活）
    async fn activate(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> Result<Subscription, RepositoryError>;

    /// 订阅准入检查
    ///
    /// 校验激活状态、有效期以及消息/号码余量；高级档永不拒绝。
    /// 任何拒绝原因以代码形式返回并原样透传给调用方
    async fn check_subscription_limits(
        &self,
        user_id: Uuid,
        messages_needed: i64,
        numbers_needed: i32,
    ) -> Result<SubscriptionVerdict, RepositoryError>;

    /// 在一个事务内校验并累加用量计数
    ///
    /// `messages` 与 `numbers` 只增不减
    async fn increment_subscription_usage(
        &self,
        user_id: Uuid,
        messages: i64,
        numbers: i32,
    ) -> Result<(), RepositoryError>;
}
