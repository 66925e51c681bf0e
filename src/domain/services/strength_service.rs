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
use crate::domain::repositories::automation_log_repository::AutomationLogRepository;
use crate::domain::repositories::strength_repository::{AccountStrength, StrengthRepository};
use crate::domain::services::admission_service::AdmissionError;
use crate::engines::traits::WorkerError;
use crate::workers::registry::SessionRegistry;

/// 账号强度服务
///
/// 读取强度指标，并通过监管器执行无害的活动链
/// （拉资料、聊天列表、联系人同步、状态检查、短暂空闲）
/// 来刷新活跃度与指标
pub struct StrengthService {
    registry: Arc<SessionRegistry>,
    strength_repo: Arc<dyn StrengthRepository>,
    automation_log_repo: Arc<dyn AutomationLogRepository>,
}

impl StrengthService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        strength_repo: Arc<dyn StrengthRepository>,
        automation_log_repo: Arc<dyn AutomationLogRepository>,
    ) -> Self {
        Self {
            registry,
            strength_repo,
            automation_log_repo,
        }
    }

    /// 读取当前强度指标
    pub async fn get_metrics(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<AccountStrength, AdmissionError> {
        Ok(self.strength_repo.get(user_id, session_id).await?)
    }

    /// 历史强化活动日志
    pub async fn get_logs(
        &self,
        session_id: &str,
        limit: Option<u64>,
    ) -> Result<Vec<AutomationLog>, AdmissionError> {
        Ok(self
            .automation_log_repo
            .find_by_session_and_type(session_id, AutomationType::Strengthening, limit)
            .await?)
    }

    /// 综合强化：经监管器执行活动链并更新指标
    pub async fn strengthen_comprehensive(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<AccountStrength, AdmissionError> {
        let handle = self
            .registry
            .get(session_id)
            .ok_or(AdmissionError::SessionNotFound)?;
        if handle.user_id != user_id {
            return Err(AdmissionError::SessionNotFound);
        }

        let sample = handle.strengthen().await.map_err(|e| match e {
            WorkerError::NotReady => AdmissionError::SessionInitializing,
            WorkerError::SessionClosed => AdmissionError::SessionBad(
                crate::domain::models::session::SessionStatus::Disconnected,
            ),
            other => AdmissionError::SendFailed(other.to_string()),
        })?;

        let total_messages = self
            .automation_log_repo
            .total_messages_for_session(session_id)
            .await
            .unwrap_or(0);

        let metrics = AccountStrength {
            user_id,
            session_id: session_id.to_string(),
            strength_score: compute_score(total_messages, sample.contact_count),
            total_messages,
            total_contacts: sample.contact_count as i32,
            last_strengthened_at: Some(Utc::now()),
            updated_at: Utc::now(),
        };
        self.strength_repo
            .update_account_strength_metrics(&metrics)
            .await?;

        let log = AutomationLog {
            id: Uuid::new_v4(),
            user_id,
            session_id: session_id.to_string(),
            message_type: AutomationType::Strengthening,
            recipient: None,
            recipients: None,
            message: json!({
                "profile": sample.profile_name,
                "chats": sample.chat_count,
                "contacts": sample.contact_count,
                "state": sample.client_state,
            })
            .to_string(),
            status: SendStatus::Sent,
            error_message: None,
            message_count: 0,
            created_at: Utc::now(),
        };
        if let Err(e) = self.automation_log_repo.append(&log).await {
            warn!("Failed to log strengthening run: {}", e);
        }

        Ok(metrics)
    }
}

/// 0-100 的综合强度分
///
/// 消息量最多贡献50分，联系人最多贡献30分，完成活动链得20分
fn compute_score(total_messages: i64, contact_count: u32) -> i32 {
    let message_score = (total_messages / 20).min(50) as i32;
    let contact_score = (contact_count / 10).min(30) as i32;
    (message_score + contact_score + 20).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert_eq!(compute_score(0, 0), 20);
        assert_eq!(compute_score(10_000, 10_000), 100);
        assert!(compute_score(200, 50) <= 100);
    }
}
