// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum_test::TestServer;
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use wassrs::config::settings::Settings;
use wassrs::domain::models::session::{Session, SessionStatus};
use wassrs::domain::models::subscription::SubscriptionTier;
use wassrs::domain::services::admission_service::AdmissionPipeline;
use wassrs::domain::services::send_executor::SendExecutor;
use wassrs::domain::services::session_storage_service::SessionStorageService;
use wassrs::domain::services::strength_service::StrengthService;
use wassrs::domain::services::webhook_service::WebhookFanout;
use wassrs::engines::mock_worker::{MockTemplate, MockWorkerFactory};
use wassrs::engines::traits::{WorkerEvent, WorkerFactory};
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
use wassrs::infrastructure::storage::InMemoryStorage;
use wassrs::presentation::middleware::auth_middleware::AuthState;
use wassrs::presentation::routes;
use wassrs::presentation::state::GatewayState;
use wassrs::workers::registry::SessionRegistry;
use wassrs::workers::session_supervisor::SupervisorDeps;
use wassrs::workers::webhook_worker::WebhookWorker;

/// 测试用的每条消息费用，与默认配置一致
pub const COST_PER_MESSAGE: i64 = 10;

/// 测试用的初始余额
pub const INITIAL_BALANCE: i64 = 1000;

#[allow(dead_code)]
pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub state: Arc<GatewayState>,
    pub factory: Arc<MockWorkerFactory>,
    pub server: TestServer,
    /// 认证目录根（每个TestApp独立的临时目录）
    pub auth_root: PathBuf,
}

impl TestApp {
    /// 就绪完成的会话：插入行、启动脚本化监管器并等待连接
    pub async fn connect_ready_session(&self, user_id: Uuid, session_id: &str) {
        self.connect_session_with_template(user_id, session_id, default_template()).await;
    }

    /// 按指定模板连接会话并等待其落到 `connected`
    pub async fn connect_session_with_template(
        &self,
        user_id: Uuid,
        session_id: &str,
        template: MockTemplate,
    ) {
        let session = Session::new(session_id.to_string(), user_id);
        self.state.session_repo.create(&session).await.unwrap();

        self.factory.set_template(template);
        self.state.registry.create_if_absent(session_id, user_id, false);
        self.wait_for_status(session_id, SessionStatus::Connected).await;
    }

    /// 轮询行存储直到会话达到指定状态
    pub async fn wait_for_status(&self, session_id: &str, status: SessionStatus) {
        for _ in 0..100 {
            if let Some(row) = self.state.session_repo.find_by_id(session_id).await.unwrap() {
                if row.status == status {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("session {} never reached status {}", session_id, status);
    }

    /// 向会话的监管器注入一个工作器事件
    pub async fn push_worker_event(&self, session_id: &str, event: WorkerEvent) {
        let state = self
            .factory
            .state_of(session_id)
            .expect("mock worker state");
        let tx = state
            .lock()
            .await
            .events_tx
            .clone()
            .expect("worker initialized");
        tx.send(event).await.unwrap();
    }

    /// 建立有激活订阅与默认钱包的测试用户
    pub async fn setup_user(&self, tier: SubscriptionTier) -> Uuid {
        let user_id = Uuid::new_v4();
        self.state
            .subscription_repo
            .activate(user_id, tier)
            .await
            .unwrap();
        // 首次读取即以初始额度建立钱包
        let balance = self.state.wallet_repo.get_balance(user_id).await.unwrap();
        assert_eq!(balance, INITIAL_BALANCE);
        user_id
    }
}

/// 默认的脚本化工作器模板：认证通过后立即就绪
pub fn default_template() -> MockTemplate {
    MockTemplate {
        script: vec![
            WorkerEvent::Authenticated,
            WorkerEvent::Ready {
                phone_number: "9647800000001".to_string(),
            },
        ],
        chat_count: 12,
        contact_count: 40,
        ..MockTemplate::default()
    }
}

pub async fn create_test_app() -> TestApp {
    let db = Arc::new(Database::connect("sqlite::memory:").await.unwrap());
    Migrator::up(db.as_ref(), None).await.unwrap();

    let auth_root = std::env::temp_dir().join(format!("wassrs-test-{}", Uuid::new_v4()));
    let storage: Arc<dyn wassrs::domain::repositories::storage_repository::StorageRepository> =
        Arc::new(InMemoryStorage::new());
    let storage_service = Arc::new(SessionStorageService::new(storage, auth_root.clone()));

    let session_repo = Arc::new(SessionRepositoryImpl::new(db.clone()));
    let api_key_repo = Arc::new(ApiKeyRepositoryImpl::new(db.clone()));
    let wallet_repo = Arc::new(WalletRepositoryImpl::new(db.clone(), INITIAL_BALANCE));
    let subscription_repo = Arc::new(SubscriptionRepositoryImpl::new(db.clone()));
    let rate_limit_repo = Arc::new(RateLimitRepositoryImpl::new(db.clone()));
    let automation_log_repo = Arc::new(AutomationLogRepositoryImpl::new(db.clone()));
    let webhook_repo = Arc::new(WebhookRepositoryImpl::new(db.clone()));
    let webhook_log_repo = Arc::new(WebhookLogRepositoryImpl::new(db.clone()));
    let delivery_repo = Arc::new(DeliveryRepositoryImpl::new(db.clone()));
    let strength_repo = Arc::new(StrengthRepositoryImpl::new(db.clone()));

    let delivery_queue = WebhookWorker::new(
        webhook_repo.clone(),
        webhook_log_repo.clone(),
        "Wassrs-Webhook/test",
    )
    .spawn_pool(2, 64);
    let fanout = Arc::new(WebhookFanout::new(webhook_repo.clone(), delivery_queue));

    let factory = Arc::new(MockWorkerFactory::new());
    let worker_factory: Arc<dyn WorkerFactory> = factory.clone();
    let deps = SupervisorDeps {
        session_repo: session_repo.clone(),
        api_key_repo: api_key_repo.clone(),
        subscription_repo: subscription_repo.clone(),
        delivery_repo: delivery_repo.clone(),
        storage_service: storage_service.clone(),
        fanout: fanout.clone(),
    };
    let registry = Arc::new(SessionRegistry::new(worker_factory, deps));

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
        COST_PER_MESSAGE,
    ));
    let strength = Arc::new(StrengthService::new(
        registry.clone(),
        strength_repo,
        automation_log_repo.clone(),
    ));

    let settings = Arc::new(Settings::new().unwrap());
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
        settings,
    });

    let auth_state = AuthState {
        api_key_repo,
    };
    let server = TestServer::new(routes::routes(state.clone(), auth_state)).unwrap();

    TestApp {
        db,
        state,
        factory,
        server,
        auth_root,
    }
}
