// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;

use crate::config::settings::Settings;
use crate::domain::repositories::api_key_repository::ApiKeyRepository;
use crate::domain::repositories::automation_log_repository::AutomationLogRepository;
use crate::domain::repositories::delivery_repository::DeliveryRepository;
use crate::domain::repositories::rate_limit_repository::RateLimitRepository;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::repositories::subscription_repository::SubscriptionRepository;
use crate::domain::repositories::wallet_repository::WalletRepository;
use crate::domain::repositories::webhook_log_repository::WebhookLogRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::services::admission_service::AdmissionPipeline;
use crate::domain::services::session_storage_service::SessionStorageService;
use crate::domain::services::strength_service::StrengthService;
use crate::domain::services::webhook_service::WebhookFanout;
use crate::workers::registry::SessionRegistry;

/// 处理器共享状态
///
/// 所有HTTP处理器通过一个 `Extension<Arc<GatewayState>>` 取得协作方
pub struct GatewayState {
    pub registry: Arc<SessionRegistry>,
    pub pipeline: Arc<AdmissionPipeline>,
    pub strength: Arc<StrengthService>,
    pub fanout: Arc<WebhookFanout>,
    pub storage_service: Arc<SessionStorageService>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub api_key_repo: Arc<dyn ApiKeyRepository>,
    pub wallet_repo: Arc<dyn WalletRepository>,
    pub subscription_repo: Arc<dyn SubscriptionRepository>,
    pub rate_limit_repo: Arc<dyn RateLimitRepository>,
    pub automation_log_repo: Arc<dyn AutomationLogRepository>,
    pub webhook_repo: Arc<dyn WebhookRepository>,
    pub webhook_log_repo: Arc<dyn WebhookLogRepository>,
    pub delivery_repo: Arc<dyn DeliveryRepository>,
    pub settings: Arc<Settings>,
}
