// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::models::automation_log::{AutomationLog, AutomationType, SendStatus};
use crate::domain::models::delivery::{DeliveryStatus, DeliveryTracking};
use crate::domain::repositories::automation_log_repository::AutomationLogRepository;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::engines::traits::WorkerError;
use crate::workers::session_supervisor::{SendEnvelope, SupervisorHandle};

/// OTP消息语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtpLanguage {
    /// 阿拉伯语（默认）
    #[default]
    Ar,
    En,
}

impl std::str::FromStr for OtpLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ar" => Ok(OtpLanguage::Ar),
            "en" => Ok(OtpLanguage::En),
            other => Err(format!("unknown otp language: {}", other)),
        }
    }
}

/// 渲染OTP消息模板
///
/// 固定短文案，只插入验证码；有效期5分钟条款为模板一部分
pub fn otp_message(code: &str, lang: OtpLanguage) -> String {
    match lang {
        OtpLanguage::Ar => format!(
            "رمز التحقق الخاص بك هو: {}\n\nهذا الرمز صالح لمدة 5 دقائق.",
            code
        ),
        OtpLanguage::En => format!(
            "Your verification code is: {}\n\nThis code is valid for 5 minutes.",
            code
        ),
    }
}

/// 单个收件人的发送结局
#[derive(Debug, Clone)]
pub enum RecipientOutcome {
    Sent { message_id: String },
    Failed { error: String },
}

/// 群发报告
#[derive(Debug, Clone)]
pub struct BulkReport {
    /// 按请求顺序的 (收件人, 结局)
    pub outcomes: Vec<(String, RecipientOutcome)>,
    pub sent: usize,
    pub failed: usize,
    /// 中途发生会话关闭，批次被截断
    pub session_closed: bool,
}

impl BulkReport {
    /// 每个失败收件人的JSON错误列表
    pub fn error_list(&self) -> Vec<serde_json::Value> {
        self.outcomes
            .iter()
            .filter_map(|(recipient, outcome)| match outcome {
                RecipientOutcome::Failed { error } => Some(json!({
                    "recipient": recipient,
                    "error": error,
                })),
                RecipientOutcome::Sent { .. } => None,
            })
            .collect()
    }
}

/// 发送执行器
///
/// 经监管器派发消息，负责投递跟踪行、逐次审计日志，
/// 以及群发的顺序迭代。不做内部重试——重试是调用方的事
pub struct SendExecutor {
    automation_log_repo: Arc<dyn AutomationLogRepository>,
    delivery_repo: Arc<dyn DeliveryRepository>,
}

impl SendExecutor {
    pub fn new(
        automation_log_repo: Arc<dyn AutomationLogRepository>,
        delivery_repo: Arc<dyn DeliveryRepository>,
    ) -> Self {
        Self {
            automation_log_repo,
            delivery_repo,
        }
    }

    /// 单发：派发、登记投递跟踪、写一条审计日志
    ///
    /// 日志在派发完成后写入，反映真实结局
    pub async fn execute_single(
        &self,
        handle: &SupervisorHandle,
        recipient_digits: &str,
        body: &str,
        kind: AutomationType,
    ) -> Result<String, WorkerError> {
        let result = handle
            .send(SendEnvelope {
                recipient_digits: recipient_digits.to_string(),
                body: body.to_string(),
            })
            .await;

        match &result {
            Ok(message_id) => {
                self.track_delivery(handle, recipient_digits, message_id).await;
                self.append_log(
                    handle,
                    kind,
                    Some(recipient_digits),
                    None,
                    body,
                    SendStatus::Sent,
                    None,
                    1,
                )
                .await;
            }
            Err(e) => {
                self.append_log(
                    handle,
                    kind,
                    Some(recipient_digits),
                    None,
                    body,
                    SendStatus::Failed,
                    Some(e.to_string()),
                    1,
                )
                .await;
            }
        }

        result
    }

    /// 群发：顺序迭代收件人，逐个重查就绪状态
    ///
    /// 中途断开停止后续尝试；整个批次写一条日志，
    /// `recipients` 为JSON数组，错误为逐收件人JSON列表
    pub async fn execute_bulk(
        &self,
        handle: &SupervisorHandle,
        recipients: &[String],
        body: &str,
    ) -> BulkReport {
        let mut outcomes = Vec::with_capacity(recipients.len());
        let mut session_closed = false;

        for recipient in recipients {
            if session_closed {
                outcomes.push((
                    recipient.clone(),
                    RecipientOutcome::Failed {
                        error: WorkerError::SessionClosed.to_string(),
                    },
                ));
                continue;
            }

            // 批内逐个重查就绪，及时发现中途断开
            if !handle.ready().await {
                session_closed = true;
                outcomes.push((
                    recipient.clone(),
                    RecipientOutcome::Failed {
                        error: WorkerError::NotReady.to_string(),
                    },
                ));
                continue;
            }

            match handle
                .send(SendEnvelope {
                    recipient_digits: recipient.clone(),
                    body: body.to_string(),
                })
                .await
            {
                Ok(message_id) => {
                    self.track_delivery(handle, recipient, &message_id).await;
                    outcomes.push((recipient.clone(), RecipientOutcome::Sent { message_id }));
                }
                Err(WorkerError::SessionClosed) => {
                    session_closed = true;
                    outcomes.push((
                        recipient.clone(),
                        RecipientOutcome::Failed {
                            error: WorkerError::SessionClosed.to_string(),
                        },
                    ));
                }
                Err(e) => {
                    outcomes.push((
                        recipient.clone(),
                        RecipientOutcome::Failed {
                            error: e.to_string(),
                        },
                    ));
                }
            }
        }

        let sent = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, RecipientOutcome::Sent { .. }))
            .count();
        let failed = outcomes.len() - sent;
        let report = BulkReport {
            outcomes,
            sent,
            failed,
            session_closed,
        };

        let status = if report.failed == 0 {
            SendStatus::Sent
        } else if report.sent == 0 {
            SendStatus::Failed
        } else {
            SendStatus::Partial
        };
        let errors = report.error_list();
        let error_message = if errors.is_empty() {
            None
        } else {
            Some(json!(errors).to_string())
        };
        self.append_log(
            handle,
            AutomationType::Announcement,
            None,
            Some(json!(recipients)),
            body,
            status,
            error_message,
            recipients.len() as i32,
        )
        .await;

        report
    }

    async fn track_delivery(&self, handle: &SupervisorHandle, recipient: &str, message_id: &str) {
        let now = Utc::now();
        let tracking = DeliveryTracking {
            id: Uuid::new_v4(),
            user_id: handle.user_id,
            session_id: handle.session_id.clone(),
            message_id: message_id.to_string(),
            recipient: recipient.to_string(),
            status: DeliveryStatus::Sent,
            delivered_at: None,
            read_at: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = self.delivery_repo.create(&tracking).await {
            warn!("Failed to create delivery tracking for {}: {}", message_id, e);
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn append_log(
        &self,
        handle: &SupervisorHandle,
        kind: AutomationType,
        recipient: Option<&str>,
        recipients: Option<serde_json::Value>,
        body: &str,
        status: SendStatus,
        error_message: Option<String>,
        message_count: i32,
    ) {
        let log = AutomationLog {
            id: Uuid::new_v4(),
            user_id: handle.user_id,
            session_id: handle.session_id.clone(),
            message_type: kind,
            recipient: recipient.map(|r| r.to_string()),
            recipients,
            message: body.to_string(),
            status,
            error_message,
            message_count,
            created_at: Utc::now(),
        };
        if let Err(e) = self.automation_log_repo.append(&log).await {
            warn!("Failed to append automation log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_template_arabic_default() {
        let msg = otp_message("123456", OtpLanguage::default());
        assert!(msg.contains("123456"));
        assert!(msg.contains("5 دقائق"));
    }

    #[test]
    fn test_otp_template_english() {
        let msg = otp_message("987654", OtpLanguage::En);
        assert!(msg.contains("987654"));
        assert!(msg.contains("5 minutes"));
    }

    #[test]
    fn test_otp_language_parse() {
        assert_eq!("ar".parse::<OtpLanguage>().unwrap(), OtpLanguage::Ar);
        assert_eq!("en".parse::<OtpLanguage>().unwrap(), OtpLanguage::En);
        assert!("fr".parse::<OtpLanguage>().is_err());
    }
}
