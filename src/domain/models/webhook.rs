// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Webhook实体
///
/// 表示一个 (用户, 会话, 事件类型) 上的事件订阅端点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub webhook_type: WebhookEventType,
    /// 主回调URL
    pub url: String,
    /// 成功事件的覆盖URL
    pub success_webhook_url: Option<String>,
    /// 失败事件的覆盖URL
    pub failure_webhook_url: Option<String>,
    /// 合并进每个事件载荷的自定义键值（冲突时覆盖引擎字段）
    pub custom_payload: Option<Value>,
    /// 随请求发送的自定义头
    pub headers: Option<HashMap<String, String>>,
    /// 最大尝试次数
    pub max_retries: i32,
    /// 两次尝试之间的固定延迟（秒）
    pub retry_delay_seconds: i32,
    /// 失败后是否重试
    pub retry_on_failure: bool,
    pub is_active: bool,
    pub total_calls: i64,
    pub success_calls: i64,
    pub failed_calls: i64,
    pub last_called_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    /// 按事件成败选择投递URL
    ///
    /// 成功事件优先使用 success_webhook_url，失败事件优先使用
    /// failure_webhook_url，否则回落到主URL
    pub fn delivery_url(&self, success: Option<bool>) -> &str {
        match success {
            Some(true) => self.success_webhook_url.as_deref().unwrap_or(&self.url),
            Some(false) => self.failure_webhook_url.as_deref().unwrap_or(&self.url),
            None => &self.url,
        }
    }
}

/// Webhook事件类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    Otp,
    Announcement,
    IncomingText,
    IncomingMedia,
    IncomingLocation,
    /// 任意入站消息的通用类型
    IncomingMessage,
    MessageDelivered,
    MessageRead,
    /// 订阅全部事件
    All,
}

impl fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookEventType::Otp => write!(f, "otp"),
            WebhookEventType::Announcement => write!(f, "announcement"),
            WebhookEventType::IncomingText => write!(f, "incoming_text"),
            WebhookEventType::IncomingMedia => write!(f, "incoming_media"),
            WebhookEventType::IncomingLocation => write!(f, "incoming_location"),
            WebhookEventType::IncomingMessage => write!(f, "incoming_message"),
            WebhookEventType::MessageDelivered => write!(f, "message_delivered"),
            WebhookEventType::MessageRead => write!(f, "message_read"),
            WebhookEventType::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for WebhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "otp" => Ok(WebhookEventType::Otp),
            "announcement" => Ok(WebhookEventType::Announcement),
            "incoming_text" => Ok(WebhookEventType::IncomingText),
            "incoming_media" => Ok(WebhookEventType::IncomingMedia),
            "incoming_location" => Ok(WebhookEventType::IncomingLocation),
            "incoming_message" => Ok(WebhookEventType::IncomingMessage),
            "message_delivered" => Ok(WebhookEventType::MessageDelivered),
            "message_read" => Ok(WebhookEventType::MessageRead),
            "all" => Ok(WebhookEventType::All),
            other => Err(format!("unknown webhook type: {}", other)),
        }
    }
}

/// Webhook投递日志
///
/// 每次HTTP尝试一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookLog {
    pub id: Uuid,
    pub webhook_id: Uuid,
    pub event_type: String,
    pub payload: Value,
    pub response_status: Option<i32>,
    /// 响应体前缀（截断保存）
    pub response_body: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub attempt_number: i32,
    pub is_retry: bool,
    pub created_at: DateTime<Utc>,
}

/// 网关事件
///
/// 监管器、准入管道与发送执行器产生、扇出引擎消费的内部事件
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    OtpSent {
        recipient: String,
        code: String,
    },
    OtpFailed {
        recipient: String,
        code: String,
        error: String,
    },
    AnnouncementSent {
        total: usize,
        sent: usize,
        failed: usize,
        errors: Vec<Value>,
    },
    IncomingText {
        from: String,
        text: String,
        at: DateTime<Utc>,
    },
    IncomingMedia {
        from: String,
        media_type: String,
        at: DateTime<Utc>,
    },
    IncomingLocation {
        from: String,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    },
    MessageDelivered {
        message_id: String,
        recipient: String,
        at: DateTime<Utc>,
    },
    MessageRead {
        message_id: String,
        recipient: String,
        at: DateTime<Utc>,
    },
    /// Webhook测试端点触发的合成事件
    Test {
        webhook_id: Uuid,
    },
}

impl GatewayEvent {
    /// 事件对应的订阅类型
    pub fn event_type(&self) -> WebhookEventType {
        match self {
            GatewayEvent::OtpSent { .. } | GatewayEvent::OtpFailed { .. } => WebhookEventType::Otp,
            GatewayEvent::AnnouncementSent { .. } => WebhookEventType::Announcement,
            GatewayEvent::IncomingText { .. } => WebhookEventType::IncomingText,
            GatewayEvent::IncomingMedia { .. } => WebhookEventType::IncomingMedia,
            GatewayEvent::IncomingLocation { .. } => WebhookEventType::IncomingLocation,
            GatewayEvent::MessageDelivered { .. } => WebhookEventType::MessageDelivered,
            GatewayEvent::MessageRead { .. } => WebhookEventType::MessageRead,
            GatewayEvent::Test { .. } => WebhookEventType::All,
        }
    }

    /// 事件的成败标记，用于URL选择
    pub fn success_flag(&self) -> Option<bool> {
        match self {
            GatewayEvent::OtpSent { .. } => Some(true),
            GatewayEvent::OtpFailed { .. } => Some(false),
            _ => None,
        }
    }

    /// 构造引擎侧基础载荷
    ///
    /// 自定义载荷随后由扇出引擎深合并覆盖其上
    pub fn base_payload(&self) -> Value {
        let timestamp = match self {
            GatewayEvent::IncomingText { at, .. }
            | GatewayEvent::IncomingMedia { at, .. }
            | GatewayEvent::IncomingLocation { at, .. }
            | GatewayEvent::MessageDelivered { at, .. }
            | GatewayEvent::MessageRead { at, .. } => *at,
            _ => Utc::now(),
        };
        let timestamp = timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        match self {
            GatewayEvent::OtpSent { recipient, code } => json!({
                "event": "otp_sent",
                "success": true,
                "recipient": recipient,
                "otp": code,
                "timestamp": timestamp,
            }),
            GatewayEvent::OtpFailed {
                recipient,
                code,
                error,
            } => json!({
                "event": "otp_failed",
                "success": false,
                "recipient": recipient,
                "otp": code,
                "error": error,
                "timestamp": timestamp,
            }),
            GatewayEvent::AnnouncementSent {
                total,
                sent,
                failed,
                errors,
            } => json!({
                "event": "announcement_sent",
                "success": *failed == 0,
                "total": total,
                "sent": sent,
                "failed": failed,
                "errors": errors,
                "timestamp": timestamp,
            }),
            GatewayEvent::IncomingText { from, text, .. } => json!({
                "event": "message_received",
                "messageType": "text",
                "from": from,
                "text": text,
                "timestamp": timestamp,
            }),
            GatewayEvent::IncomingMedia {
                from, media_type, ..
            } => json!({
                "event": "message_received",
                "messageType": media_type,
                "from": from,
                "timestamp": timestamp,
            }),
            GatewayEvent::IncomingLocation {
                from,
                latitude,
                longitude,
                ..
            } => json!({
                "event": "message_received",
                "messageType": "location",
                "from": from,
                "latitude": latitude,
                "longitude": longitude,
                "timestamp": timestamp,
            }),
            GatewayEvent::MessageDelivered {
                message_id,
                recipient,
                ..
            } => json!({
                "event": "message_delivered",
                "messageId": message_id,
                "recipient": recipient,
                "timestamp": timestamp,
            }),
            GatewayEvent::MessageRead {
                message_id,
                recipient,
                ..
            } => json!({
                "event": "message_read",
                "messageId": message_id,
                "recipient": recipient,
                "timestamp": timestamp,
            }),
            GatewayEvent::Test { webhook_id } => json!({
                "event": "test",
                "webhookId": webhook_id.to_string(),
                "timestamp": timestamp,
            }),
        }
    }
}
