// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::domain::models::automation_log::AutomationType;
use crate::domain::models::rate_limit::RateLimitWindow;
use crate::domain::models::session::SessionStatus;
use crate::domain::models::wallet::WalletTransactionType;
use crate::domain::models::webhook::GatewayEvent;
use crate::domain::repositories::automation_log_repository::AutomationLogRepository;
use crate::domain::repositories::rate_limit_repository::RateLimitRepository;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::repositories::subscription_repository::SubscriptionRepository;
use crate::domain::repositories::wallet_repository::{WalletRepository, WalletRepositoryError};
use crate::domain::services::send_executor::{otp_message, OtpLanguage, SendExecutor};
use crate::domain::services::webhook_service::WebhookFanout;
use crate::engines::traits::WorkerError;
use crate::utils::errors::RepositoryError;
use crate::utils::validators::normalize_phone;
use crate::workers::registry::SessionRegistry;
use crate::workers::session_supervisor::SupervisorHandle;

/// 就绪轮询总时长
const READINESS_POLL_TIMEOUT: Duration = Duration::from_secs(15);

/// 就绪轮询间隔
const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// 准入错误
///
/// 首个失败的闸门以结构化原因返回；此时不发生任何
/// 钱包或计数器变动
#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("Session not found")]
    SessionNotFound,

    /// 会话仍在初始化或恢复中，调用方稍后重试
    #[error("Session is initializing, try again shortly")]
    SessionInitializing,

    /// 会话处于终态，需要用户重新连接
    #[error("Session is not usable (status: {0})")]
    SessionBad(SessionStatus),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// 号码无法解析为可达的聊天对象
    #[error("Recipient not reachable: {0}")]
    UnreachableRecipient(String),

    #[error("Subscription limit exceeded: {reason}")]
    SubscriptionExceeded { reason: String },

    #[error("Rate limit exceeded in {window} window: {current}/{limit}")]
    RateLimited {
        window: RateLimitWindow,
        limit: i32,
        current: i64,
    },

    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<RepositoryError> for AdmissionError {
    fn from(err: RepositoryError) -> Self {
        AdmissionError::Repository(err.to_string())
    }
}

impl From<crate::utils::validators::ValidationError> for AdmissionError {
    fn from(err: crate::utils::validators::ValidationError) -> Self {
        AdmissionError::InvalidRecipient(err.to_string())
    }
}

/// 单发回执
#[derive(Debug, Clone)]
pub struct SendReceipt {
    pub message_id: String,
    pub recipient: String,
    pub new_balance: i64,
}

/// 群发回执
#[derive(Debug, Clone)]
pub struct BulkReceipt {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// 失败部分的冲正金额
    pub refunded: i64,
    pub errors: Vec<serde_json::Value>,
    pub new_balance: i64,
}

/// 准入管道
///
/// 每条外发消息按序通过闸门：会话就绪 → 收件人校验 → 订阅 →
/// 限流 → 钱包扣费 → 派发与结算。失败的发送以补偿贷记冲正
pub struct AdmissionPipeline {
    registry: Arc<SessionRegistry>,
    session_repo: Arc<dyn SessionRepository>,
    wallet_repo: Arc<dyn WalletRepository>,
    subscription_repo: Arc<dyn SubscriptionRepository>,
    rate_limit_repo: Arc<dyn RateLimitRepository>,
    automation_log_repo: Arc<dyn AutomationLogRepository>,
    executor: Arc<SendExecutor>,
    fanout: Arc<WebhookFanout>,
    cost_per_message: i64,
}

impl AdmissionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<SessionRegistry>,
        session_repo: Arc<dyn SessionRepository>,
        wallet_repo: Arc<dyn WalletRepository>,
        subscription_repo: Arc<dyn SubscriptionRepository>,
        rate_limit_repo: Arc<dyn RateLimitRepository>,
        automation_log_repo: Arc<dyn AutomationLogRepository>,
        executor: Arc<SendExecutor>,
        fanout: Arc<WebhookFanout>,
        cost_per_message: i64,
    ) -> Self {
        Self {
            registry,
            session_repo,
            wallet_repo,
            subscription_repo,
            rate_limit_repo,
            automation_log_repo,
            executor,
            fanout,
            cost_per_message,
        }
    }

    pub fn cost_per_message(&self) -> i64 {
        self.cost_per_message
    }

    /// 闸门1：会话存在且就绪
    ///
    /// 注册表缺失而行状态为已连接时按需恢复监管器（进程重启后的
    /// 恢复路径）；随后以500毫秒间隔轮询至多15秒等待就绪
    async fn ensure_ready(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<Arc<SupervisorHandle>, AdmissionError> {
        let handle = match self.registry.get(session_id) {
            Some(handle) => handle,
            None => {
                let row = self
                    .session_repo
                    .find_by_id(session_id)
                    .await?
                    .ok_or(AdmissionError::SessionNotFound)?;
                if row.user_id != user_id {
                    return Err(AdmissionError::SessionNotFound);
                }
                if row.status == SessionStatus::Connected {
                    // 行存储认为已连接但进程里没有监管器：按需恢复
                    self.registry.create_if_absent(session_id, row.user_id, true)
                } else if row.status.is_terminal() {
                    return Err(AdmissionError::SessionBad(row.status));
                } else {
                    return Err(AdmissionError::SessionInitializing);
                }
            }
        };

        if handle.user_id != user_id {
            return Err(AdmissionError::SessionNotFound);
        }

        let deadline = tokio::time::Instant::now() + READINESS_POLL_TIMEOUT;
        loop {
            let status = handle.status();
            if status.is_terminal() {
                return Err(AdmissionError::SessionBad(status));
            }
            if status == SessionStatus::Connected && handle.ready().await {
                return Ok(handle);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AdmissionError::SessionInitializing);
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    /// 闸门4：限流
    ///
    /// 对每个窗口统计自动化日志行数，任一窗口加上本次请求量
    /// 超限即拒绝
    async fn check_rate_limit(&self, user_id: Uuid, requested: i64) -> Result<(), AdmissionError> {
        let settings = self.rate_limit_repo.get_settings(user_id).await?;
        let now = chrono::Utc::now();

        let windows = [
            (RateLimitWindow::Minute, settings.per_minute),
            (RateLimitWindow::Hour, settings.per_hour),
            (RateLimitWindow::Day, settings.per_day),
        ];
        for (window, limit) in windows {
            let current = self
                .automation_log_repo
                .count_since(user_id, now - window.duration())
                .await?;
            if current + requested > limit as i64 {
                return Err(AdmissionError::RateLimited {
                    window,
                    limit,
                    current,
                });
            }
        }
        Ok(())
    }

    /// 闸门3：订阅准入
    async fn check_subscription(
        &self,
        user_id: Uuid,
        messages_needed: i64,
    ) -> Result<(), AdmissionError> {
        let verdict = self
            .subscription_repo
            .check_subscription_limits(user_id, messages_needed, 0)
            .await?;
        if !verdict.allowed {
            return Err(AdmissionError::SubscriptionExceeded {
                reason: verdict.reason.unwrap_or_else(|| "denied".to_string()),
            });
        }
        Ok(())
    }

    fn map_wallet_error(err: WalletRepositoryError) -> AdmissionError {
        match err {
            WalletRepositoryError::InsufficientBalance {
                available,
                required,
            } => AdmissionError::InsufficientBalance {
                available,
                required,
            },
            other => AdmissionError::Repository(other.to_string()),
        }
    }

    /// 单发：OTP、测试消息与编程接口消息共用的路径
    pub async fn send_single(
        &self,
        user_id: Uuid,
        session_id: &str,
        raw_recipient: &str,
        body: &str,
        kind: AutomationType,
        otp_code: Option<&str>,
    ) -> Result<SendReceipt, AdmissionError> {
        let handle = self.ensure_ready(user_id, session_id).await?;
        let recipient = normalize_phone(raw_recipient)?;

        self.check_subscription(user_id, 1).await?;
        self.check_rate_limit(user_id, 1).await?;

        // 扣费在派发之前原子完成；之后的任何失败都触发冲正贷记
        let reference = Uuid::new_v4().to_string();
        let new_balance = self
            .wallet_repo
            .deduct_wallet_balance(
                user_id,
                self.cost_per_message,
                Some(session_id),
                format!("{} message to {}", kind, recipient),
                Some(reference.clone()),
            )
            .await
            .map_err(Self::map_wallet_error)?;

        match self
            .executor
            .execute_single(&handle, &recipient, body, kind)
            .await
        {
            Ok(message_id) => {
                // 只统计实际送出的消息
                if let Err(e) = self
                    .subscription_repo
                    .increment_subscription_usage(user_id, 1, 0)
                    .await
                {
                    warn!("Failed to increment subscription usage: {}", e);
                }
                if let Some(code) = otp_code {
                    self.fanout.emit(
                        user_id,
                        session_id,
                        GatewayEvent::OtpSent {
                            recipient: recipient.clone(),
                            code: code.to_string(),
                        },
                    );
                }
                Ok(SendReceipt {
                    message_id,
                    recipient,
                    new_balance,
                })
            }
            Err(worker_err) => {
                // 补偿贷记必须在错误返回给客户端之前落账
                let refunded = self
                    .wallet_repo
                    .credit_wallet_balance(
                        user_id,
                        self.cost_per_message,
                        Some(session_id),
                        WalletTransactionType::Credit,
                        format!("Refund for failed send: {}", worker_err),
                        Some(format!("refund_{}", reference)),
                    )
                    .await;
                if let Err(e) = refunded {
                    error!("Refund for failed send did not complete: {}", e);
                }

                if let Some(code) = otp_code {
                    self.fanout.emit(
                        user_id,
                        session_id,
                        GatewayEvent::OtpFailed {
                            recipient: recipient.clone(),
                            code: code.to_string(),
                            error: worker_err.to_string(),
                        },
                    );
                }

                Err(match worker_err {
                    WorkerError::SessionClosed => {
                        AdmissionError::SessionBad(SessionStatus::Disconnected)
                    }
                    WorkerError::NotReady => AdmissionError::SessionInitializing,
                    WorkerError::UnreachableRecipient(r) => {
                        AdmissionError::UnreachableRecipient(r)
                    }
                    other => AdmissionError::SendFailed(other.to_string()),
                })
            }
        }
    }

    /// OTP发送：固定短模板，只插入验证码
    pub async fn send_otp(
        &self,
        user_id: Uuid,
        session_id: &str,
        raw_recipient: &str,
        code: &str,
        lang: OtpLanguage,
    ) -> Result<SendReceipt, AdmissionError> {
        let body = otp_message(code, lang);
        self.send_single(
            user_id,
            session_id,
            raw_recipient,
            &body,
            AutomationType::Otp,
            Some(code),
        )
        .await
    }

    /// 群发：全额预扣，批后按失败数一次性冲正
    pub async fn send_bulk(
        &self,
        user_id: Uuid,
        session_id: &str,
        raw_recipients: &[String],
        body: &str,
    ) -> Result<BulkReceipt, AdmissionError> {
        if raw_recipients.is_empty() {
            return Err(AdmissionError::InvalidRecipient(
                "recipient list is empty".to_string(),
            ));
        }

        let handle = self.ensure_ready(user_id, session_id).await?;

        let mut recipients = Vec::with_capacity(raw_recipients.len());
        for raw in raw_recipients {
            recipients.push(normalize_phone(raw)?);
        }
        let total = recipients.len();

        self.check_subscription(user_id, total as i64).await?;
        // 限流按日志行计数，整个批次只落一条日志
        self.check_rate_limit(user_id, 1).await?;

        let reference = Uuid::new_v4().to_string();
        let upfront = self.cost_per_message * total as i64;
        let mut balance = self
            .wallet_repo
            .deduct_wallet_balance(
                user_id,
                upfront,
                Some(session_id),
                format!("Announcement to {} recipients", total),
                Some(reference.clone()),
            )
            .await
            .map_err(Self::map_wallet_error)?;

        let report = self.executor.execute_bulk(&handle, &recipients, body).await;

        // 结算：失败部分一次性冲正
        let refund_amount = self.cost_per_message * report.failed as i64;
        if refund_amount > 0 {
            match self
                .wallet_repo
                .credit_wallet_balance(
                    user_id,
                    refund_amount,
                    Some(session_id),
                    WalletTransactionType::Credit,
                    format!(
                        "Refund for {} failed recipients in announcement",
                        report.failed
                    ),
                    Some(format!("refund_{}", reference)),
                )
                .await
            {
                Ok(new_balance) => balance = new_balance,
                Err(e) => error!("Bulk refund did not complete: {}", e),
            }
        }

        if report.sent > 0 {
            if let Err(e) = self
                .subscription_repo
                .increment_subscription_usage(user_id, report.sent as i64, 0)
                .await
            {
                warn!("Failed to increment subscription usage: {}", e);
            }
        }

        let errors = report.error_list();
        self.fanout.emit(
            user_id,
            session_id,
            GatewayEvent::AnnouncementSent {
                total,
                sent: report.sent,
                failed: report.failed,
                errors: errors.clone(),
            },
        );

        Ok(BulkReceipt {
            total,
            sent: report.sent,
            failed: report.failed,
            refunded: refund_amount,
            errors,
            new_balance: balance,
        })
    }
}
