// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 订阅档位枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    /// 基础档：1200条消息 / 1个号码 / 30天
    Basic,
    /// 标准档：3000条消息 / 3个号码 / 30天
    Standard,
    /// 高级档：不限消息 / 不限号码 / 永不过期
    Premium,
}

/// 档位限额
///
/// `None` 表示不限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub messages: Option<i64>,
    pub numbers: Option<i32>,
    pub duration_days: Option<i64>,
}

impl SubscriptionTier {
    /// 返回本档位的限额
    pub fn limits(&self) -> TierLimits {
        match self {
            SubscriptionTier::Basic => TierLimits {
                messages: Some(1200),
                numbers: Some(1),
                duration_days: Some(30),
            },
            SubscriptionTier::Standard => TierLimits {
                messages: Some(3000),
                numbers: Some(3),
                duration_days: Some(30),
            },
            SubscriptionTier::Premium => TierLimits {
                messages: None,
                numbers: None,
                duration_days: None,
            },
        }
    }

    pub fn all() -> [SubscriptionTier; 3] {
        [
            SubscriptionTier::Basic,
            SubscriptionTier::Standard,
            SubscriptionTier::Premium,
        ]
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionTier::Basic => write!(f, "basic"),
            SubscriptionTier::Standard => write!(f, "standard"),
            SubscriptionTier::Premium => write!(f, "premium"),
        }
    }
}

impl std::str::FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(SubscriptionTier::Basic),
            "standard" => Ok(SubscriptionTier::Standard),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!("unknown subscription tier: {}", other)),
        }
    }
}

/// 订阅实体
///
/// 每个用户至多一条激活的订阅
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub messages_used: i64,
    pub numbers_used: i32,
    pub is_active: bool,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// 订阅是否已过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| e <= now)
    }
}

/// 订阅准入结论
///
/// `check_subscription_limits` 的返回值；`reason` 原样透传给调用方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl SubscriptionVerdict {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_limits() {
        assert_eq!(SubscriptionTier::Basic.limits().messages, Some(1200));
        assert_eq!(SubscriptionTier::Standard.limits().numbers, Some(3));
        assert_eq!(SubscriptionTier::Premium.limits().messages, None);
        assert_eq!(SubscriptionTier::Premium.limits().duration_days, None);
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let sub = Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            tier: SubscriptionTier::Basic,
            messages_used: 0,
            numbers_used: 0,
            is_active: true,
            started_at: now - chrono::Duration::days(31),
            expires_at: Some(now - chrono::Duration::days(1)),
            updated_at: now,
        };
        assert!(sub.is_expired(now));
    }
}
