// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 每用户限流设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub user_id: Uuid,
    pub per_minute: i32,
    pub per_hour: i32,
    pub per_day: i32,
}

impl RateLimitSettings {
    /// 用户未配置时的默认限额
    pub fn defaults(user_id: Uuid) -> Self {
        Self {
            user_id,
            per_minute: 10,
            per_hour: 100,
            per_day: 1000,
        }
    }
}

/// 限流窗口枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitWindow {
    Minute,
    Hour,
    Day,
}

impl RateLimitWindow {
    pub fn duration(&self) -> Duration {
        match self {
            RateLimitWindow::Minute => Duration::minutes(1),
            RateLimitWindow::Hour => Duration::hours(1),
            RateLimitWindow::Day => Duration::hours(24),
        }
    }

    /// 拒绝原因代码，返回给调用方
    pub fn reason_code(&self) -> &'static str {
        match self {
            RateLimitWindow::Minute => "rate_limit_minute",
            RateLimitWindow::Hour => "rate_limit_hour",
            RateLimitWindow::Day => "rate_limit_day",
        }
    }
}

impl std::fmt::Display for RateLimitWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitWindow::Minute => write!(f, "minute"),
            RateLimitWindow::Hour => write!(f, "hour"),
            RateLimitWindow::Day => write!(f, "day"),
        }
    }
}
