// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, COST_PER_MESSAGE, INITIAL_BALANCE};
use serde_json::{json, Value};
use wassrs::domain::models::subscription::SubscriptionTier;
use wassrs::engines::traits::WorkerEvent;

#[tokio::test]
async fn test_health_and_version_are_public() {
    let app = create_test_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");

    let response = app.server.get("/version").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_v1_requires_api_key() {
    let app = create_test_app().await;

    let response = app.server.get("/api/v1/wallet/balance").await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"], "API key is required");

    let response = app
        .server
        .get("/api/v1/wallet/balance")
        .add_header("X-API-Key", "wass_definitely-not-real")
        .await;
    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert_eq!(body["error"], "Invalid API key");
}

#[tokio::test]
async fn test_v1_send_with_api_key() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-api").await;

    // 就绪时生成的密钥授权针对绑定会话的调用
    let api_key = app
        .state
        .api_key_repo
        .find_active_by_session("sess-api")
        .await
        .unwrap()
        .unwrap();

    let response = app
        .server
        .post("/api/v1/messages/send")
        .add_header("X-API-Key", api_key.key.as_str())
        .json(&json!({ "recipient": "9647812345678", "message": "Hi" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert!(body["messageId"].is_string());
    assert_eq!(body["balance"], INITIAL_BALANCE - COST_PER_MESSAGE);

    // Bearer形式同样被接受
    let response = app
        .server
        .get("/api/v1/auth/info")
        .add_header("Authorization", format!("Bearer {}", api_key.key))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["sessionId"], "sess-api");

    // 使用统计被刷新
    let refreshed = app
        .state
        .api_key_repo
        .find_active_by_key(&api_key.key)
        .await
        .unwrap()
        .unwrap();
    assert!(refreshed.usage_count >= 2);
    assert!(refreshed.last_used_at.is_some());
}

#[tokio::test]
async fn test_v1_insufficient_balance_maps_to_402() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-api-402").await;
    let api_key = app
        .state
        .api_key_repo
        .find_active_by_session("sess-api-402")
        .await
        .unwrap()
        .unwrap();

    app.state
        .wallet_repo
        .deduct_wallet_balance(user_id, INITIAL_BALANCE - 5, None, "drain".to_string(), None)
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/v1/messages/send")
        .add_header("X-API-Key", api_key.key.as_str())
        .json(&json!({ "recipient": "9647812345678", "message": "Hi" }))
        .await;
    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Insufficient balance");
}

#[tokio::test]
async fn test_connect_returns_initial_qr() {
    let app = create_test_app().await;
    let user_id = uuid::Uuid::new_v4();

    let mut template = super::helpers::default_template();
    template.script = vec![WorkerEvent::Qr("QR-INITIAL".to_string())];
    app.factory.set_template(template);

    let response = app
        .server
        .post("/api/whatsapp/connect")
        .json(&json!({ "userId": user_id, "sessionId": "sess-connect" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["qrCode"], "QR-INITIAL");
    assert_eq!(body["status"], "qr_pending");
}

#[tokio::test]
async fn test_duplicate_connect_rejected_for_second_session() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-first").await;

    let response = app
        .server
        .post("/api/whatsapp/connect")
        .json(&json!({ "userId": user_id, "sessionId": "sess-second" }))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "User already has a connected session");
}

#[tokio::test]
async fn test_disconnect_removes_session_row() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-gone").await;

    let response = app
        .server
        .post("/api/whatsapp/disconnect/sess-gone")
        .await;
    response.assert_status_ok();

    assert!(app
        .state
        .session_repo
        .find_by_id("sess-gone")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_dashboard_wallet_endpoints() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Basic).await;

    let response = app
        .server
        .get(&format!("/api/wallet/balance/{}", user_id))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["balance"], INITIAL_BALANCE);
    assert_eq!(body["currency"], "IQD");

    // 充值带阶梯赠送
    let response = app
        .server
        .post("/api/wallet/topup")
        .json(&json!({ "userId": user_id, "amount": 50000 }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["bonus"], 5000);
    assert_eq!(body["balance"], INITIAL_BALANCE + 50000 + 5000);

    let response = app
        .server
        .get(&format!("/api/wallet/transactions/{}", user_id))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["transactions"].as_array().unwrap().len() >= 3);
}

#[tokio::test]
async fn test_rate_limit_surfaces_as_429_with_window_hint() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-429").await;

    let response = app
        .server
        .put(&format!("/api/settings/{}", user_id))
        .json(&json!({ "perMinute": 1, "perHour": 100, "perDay": 1000 }))
        .await;
    response.assert_status_ok();

    let send = json!({
        "userId": user_id,
        "sessionId": "sess-429",
        "recipient": "9647812345678",
        "message": "Hi",
    });
    let response = app
        .server
        .post("/api/whatsapp/test-message")
        .json(&send)
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/api/whatsapp/test-message")
        .json(&send)
        .await;
    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["reason"], "rate_limit_minute");
    assert_eq!(body["limit"], 1);
    assert_eq!(body["current"], 1);
}

#[tokio::test]
async fn test_subscription_tier_catalogue() {
    let app = create_test_app().await;
    let response = app.server.get("/api/subscriptions/tiers").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let tiers = body["tiers"].as_array().unwrap();
    assert_eq!(tiers.len(), 3);
    let premium = tiers.iter().find(|t| t["tier"] == "premium").unwrap();
    assert!(premium["messages"].is_null());
    assert!(premium["durationDays"].is_null());
}

#[tokio::test]
async fn test_cors_reflects_origin() {
    let app = create_test_app().await;
    let response = app
        .server
        .get("/health")
        .add_header("Origin", "https://dashboard.example.com")
        .await;
    response.assert_status_ok();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://dashboard.example.com")
    );
}
