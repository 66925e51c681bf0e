// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    routing::{get, post, put},
    Extension, Router,
};
use std::sync::Arc;

use crate::presentation::handlers::{
    message_handler, session_handler, settings_handler, strength_handler, subscription_handler,
    v1_handler, wallet_handler, webhook_handler,
};
use crate::presentation::middleware::auth_middleware::{api_key_middleware, AuthState};
use crate::presentation::middleware::cors::cors_layer;
use crate::presentation::state::GatewayState;

/// 创建应用路由
///
/// 两套并行的端点族：仪表盘族（用户ID入参）与 `/api/v1` 族
/// （API密钥鉴权，绑定会话）
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes(state: Arc<GatewayState>, auth_state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version));

    let dashboard_routes = Router::new()
        .route("/api/whatsapp/connect", post(session_handler::connect))
        .route(
            "/api/whatsapp/session/{sessionId}",
            get(session_handler::get_session),
        )
        .route(
            "/api/whatsapp/disconnect/{sessionId}",
            post(session_handler::disconnect),
        )
        .route("/api/whatsapp/send-otp", post(message_handler::send_otp))
        .route(
            "/api/whatsapp/send-announcement",
            post(message_handler::send_announcement),
        )
        .route(
            "/api/whatsapp/test-message",
            post(message_handler::test_message),
        )
        .route(
            "/api/wallet/balance/{userId}",
            get(wallet_handler::get_balance),
        )
        .route(
            "/api/wallet/transactions/{userId}",
            get(wallet_handler::get_transactions),
        )
        .route("/api/wallet/topup", post(wallet_handler::topup))
        .route(
            "/api/webhooks/{userId}",
            get(webhook_handler::list_webhooks).post(webhook_handler::create_webhook),
        )
        .route(
            "/api/webhooks/{userId}/{webhookId}",
            put(webhook_handler::update_webhook).delete(webhook_handler::delete_webhook),
        )
        .route(
            "/api/webhooks/{userId}/{webhookId}/logs",
            get(webhook_handler::get_webhook_logs),
        )
        .route(
            "/api/webhooks/{userId}/{webhookId}/test",
            post(webhook_handler::test_webhook),
        )
        .route(
            "/api/account-strength/{userId}/{sessionId}",
            get(strength_handler::get_strength),
        )
        .route(
            "/api/account-strength/{userId}/{sessionId}/logs",
            get(strength_handler::get_strength_logs),
        )
        .route(
            "/api/account-strength/{userId}/{sessionId}/strengthen-comprehensive",
            post(strength_handler::strengthen_comprehensive),
        )
        .route(
            "/api/subscriptions/tiers",
            get(subscription_handler::get_tiers),
        )
        .route(
            "/api/subscriptions",
            post(subscription_handler::activate_subscription),
        )
        .route(
            "/api/subscriptions/{userId}",
            get(subscription_handler::get_subscription),
        )
        .route(
            "/api/settings/{userId}",
            get(settings_handler::get_settings).put(settings_handler::put_settings),
        );

    let v1_routes = Router::new()
        .route("/api/v1/auth/info", get(v1_handler::auth_info))
        .route("/api/v1/session/status", get(v1_handler::session_status))
        .route("/api/v1/wallet/balance", get(v1_handler::wallet_balance))
        .route(
            "/api/v1/wallet/transactions",
            get(v1_handler::wallet_transactions),
        )
        .route("/api/v1/messages/send", post(v1_handler::send_message))
        .route("/api/v1/messages/send-bulk", post(v1_handler::send_bulk))
        .route("/api/v1/otp/send", post(v1_handler::send_otp))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            api_key_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(dashboard_routes)
        .merge(v1_routes)
        .layer(Extension(state))
        .layer(cors_layer())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
