// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 会话实体
///
/// 表示一个用户绑定的WhatsApp会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// 会话唯一标识符（客户端提供的不透明字符串）
    pub id: String,
    /// 所属用户ID
    pub user_id: Uuid,
    /// 认证完成后填充的手机号
    pub phone_number: Option<String>,
    /// 会话状态
    pub status: SessionStatus,
    /// 最近一次下发的QR码载荷
    pub qr_code: Option<String>,
    /// 最近活跃时间
    pub last_activity: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            phone_number: None,
            status: SessionStatus::Initializing,
            qr_code: None,
            last_activity: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 会话状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// 初始化中
    Initializing,
    /// 等待扫码
    QrPending,
    /// 认证通过，等待就绪
    Connecting,
    /// 已连接
    Connected,
    /// 已断开（终态）
    Disconnected,
    /// 认证失败（终态）
    Failed,
}

impl SessionStatus {
    /// 是否为终态
    ///
    /// 终态的会话不再接受任何发送请求，其监管器会从注册表中移除
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Disconnected | SessionStatus::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Initializing => write!(f, "initializing"),
            SessionStatus::QrPending => write!(f, "qr_pending"),
            SessionStatus::Connecting => write!(f, "connecting"),
            SessionStatus::Connected => write!(f, "connected"),
            SessionStatus::Disconnected => write!(f, "disconnected"),
            SessionStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(SessionStatus::Initializing),
            "qr_pending" => Ok(SessionStatus::QrPending),
            "connecting" => Ok(SessionStatus::Connecting),
            "connected" => Ok(SessionStatus::Connected),
            "disconnected" => Ok(SessionStatus::Disconnected),
            "failed" => Ok(SessionStatus::Failed),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

/// 连接事件类型
///
/// 监管器在每次状态迁移时写入的审计记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEventType {
    Connected,
    Disconnected,
    Reconnecting,
    Error,
}

impl fmt::Display for ConnectionEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionEventType::Connected => write!(f, "connected"),
            ConnectionEventType::Disconnected => write!(f, "disconnected"),
            ConnectionEventType::Reconnecting => write!(f, "reconnecting"),
            ConnectionEventType::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(SessionStatus::Disconnected.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Connected.is_terminal());
        assert!(!SessionStatus::QrPending.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SessionStatus::Initializing,
            SessionStatus::QrPending,
            SessionStatus::Connecting,
            SessionStatus::Connected,
            SessionStatus::Disconnected,
            SessionStatus::Failed,
        ] {
            let parsed: SessionStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
