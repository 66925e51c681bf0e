// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use migration::{Migrator, MigratorTrait};
use wassrs::config::settings::Settings;
use wassrs::domain::services::admission_service::AdmissionPipeline;
use wassrs::domain::services::send_executor::SendExecutor;
use wassrs::domain::services::session_storage_service::SessionStorageService;
use wassrs::domain::services::strength_service::StrengthService;
use wassrs::domain::services::webhook_service::WebhookFanout;
use wassrs::engines::chromium_worker::ChromiumWorkerFactory;
use wassrs::engines::traits::WorkerFactory;
use wassrs::infrastructure::database::connection;
use wassrs::infrastructure::repositories::api_key_repo_impl::ApiKeyRepositoryImpl;
use wassrs::infrastructure::repositories::automation_log_repo_impl::AutomationLogRepositoryImpl;
use wassrs::infrastructure::repositories::delivery_repo_impl::DeliveryRepositoryImpl;
use wassrs::infrastructure::repositories::rate_limit_repo_impl::RateLimitRepositoryImpl;
use wassrs::infrastructure::repositories::session_repo_impl::SessionRepositoryImpl;
use wassrs::infrastructure::repositories::strength_repo_impl::StrengthRepositoryImpl;
use wassrs::infrastructure::repositories::subscription_repo_impl::SubscriptionRepositoryImpl;
use wassrs::infrastructure::repositories::wallet_repo_impl::WalletRepositoryImpl;
use wassrs::infrastructure::repositories::webhook_log_repo_impl::WebhookLogRepositoryImpl;
use wassrs::infrastructure::repositories::webhook_repo_impl::WebhookRepositoryImpl;
use wassrs::infrastructure::storage::create_storage_repository;
use wassrs::presentation::middleware::auth_middleware::AuthState;
use wassrs::presentation::routes;
use wassrs::presentation::state::GatewayState;
use wassrs::utils::telemetry;
use wassrs::workers::reconciler::StartupReconciler;
use wassrs::workers::registry::SessionRegistry;
use wassrs::workers::session_supervisor::SupervisorDeps;
use wassrs::workers::webhook_worker::WebhookWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 初始化日志和指标
    telemetry::init_telemetry();
    info!("Starting wassrs...");
    wassrs::infrastructure::metrics::init_metrics();

    // 2. 加载配置
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. 建立数据库连接并运行迁移
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. 对象存储与会话存储服务
    let storage = create_storage_repository(&settings.object_storage)?;
    let storage_service = Arc::new(SessionStorageService::new(
        storage.clone(),
        PathBuf::from(&settings.browser.auth_root),
    ));

    // 5. 仓库
    let session_repo = Arc::new(SessionRepositoryImpl::new(db.clone()));
    let api_key_repo = Arc::new(ApiKeyRepositoryImpl::new(db.clone()));
    let wallet_repo = Arc::new(WalletRepositoryImpl::new(
        db.clone(),
        settings.billing.initial_balance,
    ));
    let subscription_repo = Arc::new(SubscriptionRepositoryImpl::new(db.clone()));
    let rate_limit_repo = Arc::new(RateLimitRepositoryImpl::new(db.clone()));
    let automation_log_repo = Arc::new(AutomationLogRepositoryImpl::new(db.clone()));
    let webhook_repo = Arc::new(WebhookRepositoryImpl::new(db.clone()));
    let webhook_log_repo = Arc::new(WebhookLogRepositoryImpl::new(db.clone()));
    let delivery_repo = Arc::new(DeliveryRepositoryImpl::new(db.clone()));
    let strength_repo = Arc::new(StrengthRepositoryImpl::new(db.clone()));

    // 6. Webhook投递池与扇出引擎
    let delivery_queue = WebhookWorker::new(
        webhook_repo.clone(),
        webhook_log_repo.clone(),
        &settings.webhook.user_agent,
    )
    .spawn_pool(settings.webhook.pool_size, settings.webhook.queue_capacity);
    let fanout = Arc::new(WebhookFanout::new(webhook_repo.clone(), delivery_queue));
    info!("Webhook delivery pool started");

    // 7. 会话注册表
    let worker_factory: Arc<dyn WorkerFactory> = Arc::new(ChromiumWorkerFactory::new(
        settings.browser.binary_path.as_ref().map(PathBuf::from),
    ));
    let deps = SupervisorDeps {
        session_repo: session_repo.clone(),
        api_key_repo: api_key_repo.clone(),
        subscription_repo: subscription_repo.clone(),
        delivery_repo: delivery_repo.clone(),
        storage_service: storage_service.clone(),
        fanout: fanout.clone(),
    };
    let registry = Arc::new(SessionRegistry::new(worker_factory, deps));

    // 8. 准入管道与领域服务
    let executor = Arc::new(SendExecutor::new(
        automation_log_repo.clone(),
        delivery_repo.clone(),
    ));
    let pipeline = Arc::new(AdmissionPipeline::new(
        registry.clone(),
        session_repo.clone(),
        wallet_repo.clone(),
        subscription_repo.clone(),
        rate_limit_repo.clone(),
        automation_log_repo.clone(),
        executor,
        fanout.clone(),
        settings.billing.cost_per_message,
    ));
    let strength = Arc::new(StrengthService::new(
        registry.clone(),
        strength_repo,
        automation_log_repo.clone(),
    ));

    // 9. 启动对账：调度已连接会话的恢复，不阻塞监听
    let reconciler = StartupReconciler::new(session_repo.clone(), storage, registry.clone());
    match reconciler.reconcile().await {
        Ok(count) => info!("Startup reconciler scheduled {} restorations", count),
        Err(e) => warn!("Startup reconciliation failed: {}", e),
    }

    // 10. 路由与HTTP服务
    let state = Arc::new(GatewayState {
        registry,
        pipeline,
        strength,
        fanout,
        storage_service,
        session_repo,
        api_key_repo: api_key_repo.clone(),
        wallet_repo,
        subscription_repo,
        rate_limit_repo,
        automation_log_repo,
        webhook_repo,
        webhook_log_repo,
        delivery_repo,
        settings: settings.clone(),
    });
    let auth_state = AuthState {
        api_key_repo,
    };
    let app = routes::routes(state, auth_state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
