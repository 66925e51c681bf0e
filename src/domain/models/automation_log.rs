// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 自动化日志实体
///
/// 每次外发尝试追加一条，兼作审计、限流计数与账号强度指标的数据源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub message_type: AutomationType,
    /// 单发时的收件人
    pub recipient: Option<String>,
    /// 群发时的收件人集合（JSON数组）
    pub recipients: Option<serde_json::Value>,
    pub message: String,
    pub status: SendStatus,
    /// 错误详情；群发时为每个收件人失败的JSON列表
    pub error_message: Option<String>,
    /// 本条日志覆盖的消息条数（群发为收件人数量）
    pub message_count: i32,
    pub created_at: DateTime<Utc>,
}

/// 外发消息类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationType {
    Otp,
    Announcement,
    ApiMessage,
    Strengthening,
}

impl std::fmt::Display for AutomationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutomationType::Otp => write!(f, "otp"),
            AutomationType::Announcement => write!(f, "announcement"),
            AutomationType::ApiMessage => write!(f, "api_message"),
            AutomationType::Strengthening => write!(f, "strengthening"),
        }
    }
}

impl std::str::FromStr for AutomationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "otp" => Ok(AutomationType::Otp),
            "announcement" => Ok(AutomationType::Announcement),
            "api_message" => Ok(AutomationType::ApiMessage),
            "strengthening" => Ok(AutomationType::Strengthening),
            other => Err(format!("unknown automation type: {}", other)),
        }
    }
}

/// 发送状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Sent,
    Failed,
    /// 群发的部分成功
    Partial,
}

impl std::fmt::Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendStatus::Sent => write!(f, "sent"),
            SendStatus::Failed => write!(f, "failed"),
            SendStatus::Partial => write!(f, "partial"),
        }
    }
}

impl std::str::FromStr for SendStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(SendStatus::Sent),
            "failed" => Ok(SendStatus::Failed),
            "partial" => Ok(SendStatus::Partial),
            other => Err(format!("unknown send status: {}", other)),
        }
    }
}
