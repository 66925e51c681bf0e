// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::models::delivery::DeliveryStatus;
use crate::domain::models::session::{ConnectionEventType, SessionStatus};
use crate::domain::models::webhook::GatewayEvent;
use crate::domain::repositories::api_key_repository::ApiKeyRepository;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::repositories::subscription_repository::SubscriptionRepository;
use crate::domain::services::session_storage_service::SessionStorageService;
use crate::domain::services::webhook_service::WebhookFanout;
use crate::engines::traits::{
    MessageBody, WhatsappWorker, WorkerError, WorkerEvent, WorkerFactory,
};
use crate::workers::registry::ClientMap;

/// 恢复会话的初始化期限
const RESTORE_DEADLINE: Duration = Duration::from_secs(120);

/// 新建会话自最近一次事件起的初始化期限
const FRESH_DEADLINE: Duration = Duration::from_secs(5 * 60);

/// 监管器协作方集合
#[derive(Clone)]
pub struct SupervisorDeps {
    pub session_repo: Arc<dyn SessionRepository>,
    pub api_key_repo: Arc<dyn ApiKeyRepository>,
    pub subscription_repo: Arc<dyn SubscriptionRepository>,
    pub delivery_repo: Arc<dyn DeliveryRepository>,
    pub storage_service: Arc<SessionStorageService>,
    pub fanout: Arc<WebhookFanout>,
}

/// 发送信封
#[derive(Debug, Clone)]
pub struct SendEnvelope {
    /// 已规范化的纯数字收件号码（9-15位）
    pub recipient_digits: String,
    pub body: String,
}

/// 监管器状态快照
#[derive(Debug, Clone)]
pub struct SupervisorSnapshot {
    pub status: SessionStatus,
    pub phone_number: Option<String>,
    pub ready: bool,
}

/// 强化活动采样结果
#[derive(Debug, Clone)]
pub struct StrengthSample {
    pub profile_name: Option<String>,
    pub chat_count: u32,
    pub contact_count: u32,
    pub client_state: String,
}

/// 监管器命令
///
/// 公共操作以类型化消息发送给状态环，经oneshot等待类型化回复
enum Command {
    Send(
        SendEnvelope,
        oneshot::Sender<Result<String, WorkerError>>,
    ),
    Snapshot(oneshot::Sender<SupervisorSnapshot>),
    Strengthen(oneshot::Sender<Result<StrengthSample, WorkerError>>),
    Logout(oneshot::Sender<Result<(), WorkerError>>),
}

/// 监管器句柄
///
/// 注册表对外暴露的轻量引用；所有操作经命令通道串行化
pub struct SupervisorHandle {
    pub session_id: String,
    pub user_id: Uuid,
    cmd_tx: mpsc::Sender<Command>,
    status_rx: watch::Receiver<SessionStatus>,
}

impl SupervisorHandle {
    /// 当前状态（无锁读取）
    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// 完整就绪检查：状态已连接且工作器身份与页面均有效
    pub async fn ready(&self) -> bool {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Snapshot(tx)).await.is_err() {
            return false;
        }
        rx.await.map(|s| s.ready).unwrap_or(false)
    }

    pub async fn snapshot(&self) -> Option<SupervisorSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx.send(Command::Snapshot(tx)).await.ok()?;
        rx.await.ok()
    }

    /// 发送一条消息；会话未就绪或投递失败返回类型化错误
    pub async fn send(&self, envelope: SendEnvelope) -> Result<String, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Send(envelope, tx))
            .await
            .map_err(|_| WorkerError::SessionClosed)?;
        rx.await.map_err(|_| WorkerError::SessionClosed)?
    }

    /// 执行账号强化活动链
    pub async fn strengthen(&self) -> Result<StrengthSample, WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Strengthen(tx))
            .await
            .map_err(|_| WorkerError::SessionClosed)?;
        rx.await.map_err(|_| WorkerError::SessionClosed)?
    }

    /// 登出并终结监管器
    pub async fn logout(&self) -> Result<(), WorkerError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Logout(tx))
            .await
            .map_err(|_| WorkerError::SessionClosed)?;
        rx.await.map_err(|_| WorkerError::SessionClosed)?
    }
}

/// 会话监管器
///
/// 每会话一个actor：独占浏览器工作器，消费其事件流，
/// 把状态迁移写入行存储并向扇出引擎发射事件
pub struct SessionSupervisor {
    session_id: String,
    user_id: Uuid,
    worker: Option<Box<dyn WhatsappWorker>>,
    events_rx: mpsc::Receiver<WorkerEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    status_tx: watch::Sender<SessionStatus>,
    deps: SupervisorDeps,
    clients: ClientMap,
    restored: bool,
    ready_seen: bool,
    deadline: Instant,
}

impl SessionSupervisor {
    /// 启动一个监管器并返回其句柄
    ///
    /// 同步返回；认证目录恢复与浏览器初始化在actor任务内进行。
    /// `restored` 标记走恢复路径（120秒期限）还是新建路径（5分钟期限）
    pub fn spawn(
        session_id: String,
        user_id: Uuid,
        restored: bool,
        worker_factory: &Arc<dyn WorkerFactory>,
        deps: SupervisorDeps,
        clients: ClientMap,
    ) -> Arc<SupervisorHandle> {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (status_tx, status_rx) = watch::channel(SessionStatus::Initializing);

        let auth_path = deps.storage_service.auth_path(&session_id);
        let worker = worker_factory.create(&session_id, auth_path, events_tx);

        let deadline = Instant::now()
            + if restored {
                RESTORE_DEADLINE
            } else {
                FRESH_DEADLINE
            };

        let supervisor = SessionSupervisor {
            session_id: session_id.clone(),
            user_id,
            worker: Some(worker),
            events_rx,
            cmd_rx,
            status_tx,
            deps,
            clients,
            restored,
            ready_seen: false,
            deadline,
        };

        tokio::spawn(supervisor.run());

        Arc::new(SupervisorHandle {
            session_id,
            user_id,
            cmd_tx,
            status_rx,
        })
    }

    async fn run(mut self) {
        // 恢复认证目录；对象存储中不存在表示首次认证，不是错误
        if let Err(e) = self
            .deps
            .storage_service
            .restore(&self.session_id)
            .await
        {
            warn!(
                "Auth directory restore for session {} failed: {}",
                self.session_id, e
            );
        }

        if let Some(worker) = self.worker.as_mut() {
            if let Err(e) = worker.initialize().await {
                error!(
                    "Worker initialization for session {} failed: {}",
                    self.session_id, e
                );
                self.transition_terminal(SessionStatus::Failed, &e.to_string())
                    .await;
                self.teardown().await;
                return;
            }
        }

        info!("Supervisor for session {} started", self.session_id);

        loop {
            tokio::select! {
                maybe_cmd = self.cmd_rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => {
                            if self.handle_command(cmd).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                maybe_event = self.events_rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            if self.handle_event(event).await {
                                break;
                            }
                        }
                        None => {
                            self.transition_terminal(
                                SessionStatus::Disconnected,
                                "worker event channel closed",
                            )
                            .await;
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(self.deadline), if !self.ready_seen => {
                    self.handle_deadline().await;
                    break;
                }
            }
        }

        self.teardown().await;
        info!("Supervisor for session {} stopped", self.session_id);
    }

    /// 处理工作器事件；返回true表示监管器应终结
    async fn handle_event(&mut self, event: WorkerEvent) -> bool {
        // 新建路径的期限从最近一次事件重新起算
        if !self.restored && !self.ready_seen {
            self.deadline = Instant::now() + FRESH_DEADLINE;
        }

        match event {
            WorkerEvent::Qr(qr) => {
                if let Err(e) = self
                    .deps
                    .session_repo
                    .update_qr_code(&self.session_id, &qr)
                    .await
                {
                    error!("Failed to persist QR for session {}: {}", self.session_id, e);
                }
                let _ = self.status_tx.send(SessionStatus::QrPending);
                false
            }
            WorkerEvent::Authenticated => {
                if let Err(e) = self
                    .deps
                    .session_repo
                    .update_status(&self.session_id, SessionStatus::Connecting)
                    .await
                {
                    error!(
                        "Failed to persist connecting status for session {}: {}",
                        self.session_id, e
                    );
                }
                let _ = self.status_tx.send(SessionStatus::Connecting);

                // 认证产物异步备份；失败只记日志，不影响会话状态
                let storage = self.deps.storage_service.clone();
                let session_id = self.session_id.clone();
                tokio::spawn(async move {
                    if let Err(e) = storage.backup(&session_id).await {
                        warn!("Auth directory backup for session {} failed: {}", session_id, e);
                    }
                });
                false
            }
            WorkerEvent::Ready { phone_number } => {
                self.on_ready(&phone_number).await;
                false
            }
            WorkerEvent::AuthFailure(reason) => {
                warn!("Auth failure for session {}: {}", self.session_id, reason);
                self.transition_terminal(SessionStatus::Failed, &reason).await;
                true
            }
            WorkerEvent::Disconnected(reason) => {
                info!("Session {} disconnected: {}", self.session_id, reason);
                self.transition_terminal(SessionStatus::Disconnected, &reason)
                    .await;
                true
            }
            WorkerEvent::Message(message) => {
                self.on_incoming_message(message).await;
                false
            }
            WorkerEvent::Ack { message_id, code } => {
                self.on_ack(&message_id, code).await;
                false
            }
        }
    }

    async fn on_ready(&mut self, phone_number: &str) {
        self.ready_seen = true;

        let first_connect = match self
            .deps
            .session_repo
            .mark_ready(&self.session_id, self.user_id, phone_number)
            .await
        {
            Ok(first) => first,
            Err(e) => {
                error!(
                    "Failed to persist ready transition for session {}: {}",
                    self.session_id, e
                );
                false
            }
        };

        // 用户的第一个当前连接号码计入订阅用量；重复ready不重复计数
        if first_connect {
            if let Err(e) = self
                .deps
                .subscription_repo
                .increment_subscription_usage(self.user_id, 0, 1)
                .await
            {
                warn!(
                    "Failed to increment numbers_used for user {}: {}",
                    self.user_id, e
                );
            }
        }

        if let Err(e) = self
            .deps
            .api_key_repo
            .ensure_for_session(self.user_id, &self.session_id)
            .await
        {
            error!(
                "Failed to ensure API key for session {}: {}",
                self.session_id, e
            );
        }

        if let Err(e) = self
            .deps
            .session_repo
            .log_connection_event(
                &self.session_id,
                self.user_id,
                ConnectionEventType::Connected,
                Some(json!({ "phone_number": phone_number })),
            )
            .await
        {
            warn!("Failed to log connection event: {}", e);
        }

        let _ = self.status_tx.send(SessionStatus::Connected);
        info!(
            "Session {} ready with number {}",
            self.session_id, phone_number
        );
    }

    async fn on_incoming_message(&self, message: crate::engines::traits::IncomingMessage) {
        // 系统广播不进入扇出
        if message.from.contains("status@broadcast") {
            return;
        }

        if let Err(e) = self.deps.session_repo.touch_activity(&self.session_id).await {
            warn!("Failed to touch activity for session {}: {}", self.session_id, e);
        }

        let from = message
            .from
            .split('@')
            .next()
            .unwrap_or(&message.from)
            .to_string();

        let event = match message.body {
            MessageBody::Text(text) => GatewayEvent::IncomingText {
                from,
                text,
                at: message.timestamp,
            },
            MessageBody::Media { media_type } => GatewayEvent::IncomingMedia {
                from,
                media_type,
                at: message.timestamp,
            },
            MessageBody::Location {
                latitude,
                longitude,
            } => GatewayEvent::IncomingLocation {
                from,
                latitude,
                longitude,
                at: message.timestamp,
            },
        };

        self.deps
            .fanout
            .emit(self.user_id, &self.session_id, event);
    }

    async fn on_ack(&self, message_id: &str, code: i32) {
        let status = match code {
            2 => DeliveryStatus::Delivered,
            3 => DeliveryStatus::Read,
            _ => return,
        };

        let recipient = match self
            .deps
            .delivery_repo
            .find_by_message_id(message_id)
            .await
        {
            Ok(Some(tracking)) => tracking.recipient,
            Ok(None) => return,
            Err(e) => {
                warn!("Delivery lookup for {} failed: {}", message_id, e);
                return;
            }
        };

        if let Err(e) = self
            .deps
            .delivery_repo
            .update_status(message_id, status)
            .await
        {
            warn!("Delivery update for {} failed: {}", message_id, e);
        }

        let at = Utc::now();
        let event = match status {
            DeliveryStatus::Delivered => GatewayEvent::MessageDelivered {
                message_id: message_id.to_string(),
                recipient,
                at,
            },
            DeliveryStatus::Read => GatewayEvent::MessageRead {
                message_id: message_id.to_string(),
                recipient,
                at,
            },
            DeliveryStatus::Sent => return,
        };
        self.deps
            .fanout
            .emit(self.user_id, &self.session_id, event);
    }

    /// 处理命令；返回true表示监管器应终结
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Snapshot(reply) => {
                let ready = self.is_ready().await;
                let phone_number = match self.worker.as_ref() {
                    Some(worker) => worker.identity().await,
                    None => None,
                };
                let _ = reply.send(SupervisorSnapshot {
                    status: *self.status_tx.borrow(),
                    phone_number,
                    ready,
                });
                false
            }
            Command::Send(envelope, reply) => {
                let (result, terminal) = self.do_send(&envelope).await;
                let _ = reply.send(result);
                terminal
            }
            Command::Strengthen(reply) => {
                let result = self.do_strengthen().await;
                let _ = reply.send(result);
                false
            }
            Command::Logout(reply) => {
                if let Some(worker) = self.worker.as_ref() {
                    if let Err(e) = worker.logout().await {
                        warn!("Logout for session {} failed: {}", self.session_id, e);
                    }
                }
                self.transition_terminal(SessionStatus::Disconnected, "user logout")
                    .await;
                let _ = reply.send(Ok(()));
                true
            }
        }
    }

    /// 就绪定义：已见ready事件、工作器身份非空且页面未关闭
    async fn is_ready(&self) -> bool {
        if !self.ready_seen {
            return false;
        }
        let Some(worker) = self.worker.as_ref() else {
            return false;
        };
        worker.identity().await.is_some() && worker.is_page_open().await
    }

    async fn do_send(&mut self, envelope: &SendEnvelope) -> (Result<String, WorkerError>, bool) {
        if !self.is_ready().await {
            return (Err(WorkerError::NotReady), false);
        }
        let worker = self.worker.as_ref().expect("worker present when ready");

        let chat_id = match worker.resolve_number(&envelope.recipient_digits).await {
            Ok(Some(chat_id)) => chat_id,
            Ok(None) => {
                return (
                    Err(WorkerError::UnreachableRecipient(
                        envelope.recipient_digits.clone(),
                    )),
                    false,
                )
            }
            Err(WorkerError::SessionClosed) => {
                self.transition_terminal(SessionStatus::Disconnected, "session closed on resolve")
                    .await;
                return (Err(WorkerError::SessionClosed), true);
            }
            Err(e) => return (Err(e), false),
        };

        match worker.send_text(&chat_id, &envelope.body).await {
            Ok(message_id) => {
                if let Err(e) = self.deps.session_repo.touch_activity(&self.session_id).await {
                    warn!("Failed to touch activity: {}", e);
                }
                (Ok(message_id), false)
            }
            Err(WorkerError::SessionClosed) => {
                self.transition_terminal(SessionStatus::Disconnected, "session closed on send")
                    .await;
                (Err(WorkerError::SessionClosed), true)
            }
            Err(e) => (Err(e), false),
        }
    }

    async fn do_strengthen(&mut self) -> Result<StrengthSample, WorkerError> {
        if !self.is_ready().await {
            return Err(WorkerError::NotReady);
        }
        let worker = self.worker.as_ref().expect("worker present when ready");

        // 无害的活动链：拉资料、点聊天列表、同步联系人、查状态、短暂空闲
        let profile_name = worker.fetch_profile().await?;
        let chat_count = worker.get_chats().await?;
        let contact_count = worker.get_contacts().await?;
        let client_state = worker.get_state().await?;
        tokio::time::sleep(Duration::from_millis(800)).await;

        if let Err(e) = self.deps.session_repo.touch_activity(&self.session_id).await {
            warn!("Failed to touch activity: {}", e);
        }

        Ok(StrengthSample {
            profile_name,
            chat_count,
            contact_count,
            client_state,
        })
    }

    async fn handle_deadline(&mut self) {
        // 期限内未就绪：恢复路径置为断开，新建路径置为失败
        let (status, reason) = if self.restored {
            (SessionStatus::Disconnected, "restore deadline exceeded")
        } else {
            (SessionStatus::Failed, "initialization deadline exceeded")
        };
        warn!("Session {} timed out: {}", self.session_id, reason);
        self.transition_terminal(status, reason).await;
    }

    /// 写入终态、记录连接事件并从注册表移除
    async fn transition_terminal(&mut self, status: SessionStatus, reason: &str) {
        if let Err(e) = self
            .deps
            .session_repo
            .update_status(&self.session_id, status)
            .await
        {
            // 行可能已被显式断开删除
            warn!(
                "Failed to persist terminal status for session {}: {}",
                self.session_id, e
            );
        }

        let event_type = match status {
            SessionStatus::Failed => ConnectionEventType::Error,
            _ => ConnectionEventType::Disconnected,
        };
        if let Err(e) = self
            .deps
            .session_repo
            .log_connection_event(
                &self.session_id,
                self.user_id,
                event_type,
                Some(json!({ "reason": reason })),
            )
            .await
        {
            warn!("Failed to log connection event: {}", e);
        }

        let _ = self.status_tx.send(status);
        self.clients.remove(&self.session_id);
    }

    async fn teardown(&mut self) {
        self.clients.remove(&self.session_id);
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown().await;
        }
    }
}
