// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::domain::models::session::SessionStatus;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::repositories::storage_repository::StorageRepository;
use crate::workers::registry::SessionRegistry;

/// 启动对账器
///
/// 进程启动时确保存储桶存在，找出行存储中标记为已连接的会话，
/// 为每个会话调度异步恢复。恢复被调度后立即返回，从不阻塞监听
pub struct StartupReconciler {
    session_repo: Arc<dyn SessionRepository>,
    storage: Arc<dyn StorageRepository>,
    registry: Arc<SessionRegistry>,
}

impl StartupReconciler {
    pub fn new(
        session_repo: Arc<dyn SessionRepository>,
        storage: Arc<dyn StorageRepository>,
        registry: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            session_repo,
            storage,
            registry,
        }
    }

    /// 调度全部已连接会话的恢复
    ///
    /// # 返回值
    ///
    /// 返回已调度恢复的会话数量
    pub async fn reconcile(&self) -> anyhow::Result<usize> {
        if let Err(e) = self.storage.ensure_bucket().await {
            // 桶缺失只影响备份/恢复，不阻止服务启动
            warn!("Storage bucket check failed: {}", e);
        }

        let sessions = self
            .session_repo
            .find_all_by_status(SessionStatus::Connected)
            .await?;

        if sessions.is_empty() {
            info!("No connected sessions to restore");
            return Ok(0);
        }

        info!("Scheduling restoration of {} sessions", sessions.len());
        let count = sessions.len();

        for session in sessions {
            let registry = self.registry.clone();
            let session_repo = self.session_repo.clone();
            tokio::spawn(async move {
                let handle = registry.create_if_absent(&session.id, session.user_id, true);
                // 恢复超时或失败由监管器自身置为断开；
                // 这里只兜底句柄立即消失的情况
                if handle.status() == SessionStatus::Failed {
                    if let Err(e) = session_repo
                        .update_status(&session.id, SessionStatus::Disconnected)
                        .await
                    {
                        error!("Failed to mark session {} disconnected: {}", session.id, e);
                    }
                }
            });
        }

        Ok(count)
    }
}
