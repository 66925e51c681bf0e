// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use std::time::Duration;
use wassrs::domain::models::session::SessionStatus;
use wassrs::domain::models::subscription::SubscriptionTier;
use wassrs::engines::traits::WorkerEvent;
use wassrs::workers::session_supervisor::SendEnvelope;

#[tokio::test]
async fn test_connect_flow_reaches_connected_and_provisions_key() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-flow").await;

    let row = app
        .state
        .session_repo
        .find_by_id("sess-flow")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, SessionStatus::Connected);
    assert_eq!(row.phone_number.as_deref(), Some("9647800000001"));
    // 就绪时清除QR码并刷新活跃时间
    assert!(row.qr_code.is_none());
    assert!(row.last_activity.is_some());

    // 首次就绪自动生成wass_前缀的API密钥
    let key = app
        .state
        .api_key_repo
        .find_active_by_session("sess-flow")
        .await
        .unwrap()
        .expect("api key generated on ready");
    assert!(key.key.starts_with("wass_"));
    assert!(key.key.len() >= 5 + 43);
    assert_eq!(key.user_id, user_id);

    // 号码用量计1
    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.numbers_used, 1);
}

#[tokio::test]
async fn test_qr_event_persists_payload() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let session = wassrs::domain::models::session::Session::new("sess-qr".to_string(), user_id);
    app.state.session_repo.create(&session).await.unwrap();

    let mut template = super::helpers::default_template();
    template.script = vec![WorkerEvent::Qr("QR-PAYLOAD-1".to_string())];
    app.factory.set_template(template);
    app.state.registry.create_if_absent("sess-qr", user_id, false);

    app.wait_for_status("sess-qr", SessionStatus::QrPending).await;
    let row = app
        .state
        .session_repo
        .find_by_id("sess-qr")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.qr_code.as_deref(), Some("QR-PAYLOAD-1"));
}

/// 同一用户第二个会话就绪会把第一个强制断开，
/// 且号码用量不重复累计
#[tokio::test]
async fn test_at_most_one_connected_session_per_user() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    app.connect_ready_session(user_id, "sess-one").await;
    app.connect_ready_session(user_id, "sess-two").await;

    app.wait_for_status("sess-one", SessionStatus::Disconnected).await;
    let two = app
        .state
        .session_repo
        .find_by_id("sess-two")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(two.status, SessionStatus::Connected);

    let connected = app
        .state
        .session_repo
        .find_by_user_and_status(user_id, SessionStatus::Connected)
        .await
        .unwrap();
    assert_eq!(connected.len(), 1);
    assert_eq!(connected[0].id, "sess-two");

    // 第二次就绪时用户已有连接中的号码，不再递增
    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.numbers_used, 1);
}

#[tokio::test]
async fn test_duplicate_ready_does_not_double_count_numbers() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-dup").await;

    // 重复的ready事件
    app.push_worker_event(
        "sess-dup",
        WorkerEvent::Ready {
            phone_number: "9647800000001".to_string(),
        },
    )
    .await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.numbers_used, 1);
}

#[tokio::test]
async fn test_registry_holds_single_supervisor_per_session() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let session = wassrs::domain::models::session::Session::new("sess-reg".to_string(), user_id);
    app.state.session_repo.create(&session).await.unwrap();
    app.factory.set_template(super::helpers::default_template());

    let a = app.state.registry.create_if_absent("sess-reg", user_id, false);
    let b = app.state.registry.create_if_absent("sess-reg", user_id, false);
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(app.state.registry.len(), 1);
}

#[tokio::test]
async fn test_disconnect_event_is_terminal_and_evicts() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-term").await;
    assert!(app.state.registry.get("sess-term").is_some());

    app.push_worker_event(
        "sess-term",
        WorkerEvent::Disconnected("remote logout".to_string()),
    )
    .await;

    app.wait_for_status("sess-term", SessionStatus::Disconnected).await;
    for _ in 0..50 {
        if app.state.registry.get("sess-term").is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(app.state.registry.get("sess-term").is_none());
}

#[tokio::test]
async fn test_auth_failure_marks_failed() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let session = wassrs::domain::models::session::Session::new("sess-authfail".to_string(), user_id);
    app.state.session_repo.create(&session).await.unwrap();

    let mut template = super::helpers::default_template();
    template.script = vec![WorkerEvent::AuthFailure("bad credentials".to_string())];
    app.factory.set_template(template);
    app.state
        .registry
        .create_if_absent("sess-authfail", user_id, false);

    app.wait_for_status("sess-authfail", SessionStatus::Failed).await;
}

#[tokio::test]
async fn test_send_before_ready_returns_not_ready() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let session = wassrs::domain::models::session::Session::new("sess-early".to_string(), user_id);
    app.state.session_repo.create(&session).await.unwrap();

    let mut template = super::helpers::default_template();
    template.script = vec![WorkerEvent::Qr("pending".to_string())];
    app.factory.set_template(template);
    let handle = app
        .state
        .registry
        .create_if_absent("sess-early", user_id, false);
    app.wait_for_status("sess-early", SessionStatus::QrPending).await;

    let err = handle
        .send(SendEnvelope {
            recipient_digits: "9647812345678".to_string(),
            body: "hi".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        wassrs::engines::traits::WorkerError::NotReady
    ));
}

/// 送达与已读回执推进投递跟踪状态，且read不被delivered回退
#[tokio::test]
async fn test_ack_events_advance_delivery_tracking() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-ack").await;

    let receipt = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-ack",
            "9647812345678",
            "hi",
            wassrs::domain::models::automation_log::AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap();

    app.push_worker_event(
        "sess-ack",
        WorkerEvent::Ack {
            message_id: receipt.message_id.clone(),
            code: 2,
        },
    )
    .await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let tracking = app
        .state
        .delivery_repo
        .find_by_message_id(&receipt.message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        tracking.status,
        wassrs::domain::models::delivery::DeliveryStatus::Delivered
    );
    assert!(tracking.delivered_at.is_some());

    app.push_worker_event(
        "sess-ack",
        WorkerEvent::Ack {
            message_id: receipt.message_id.clone(),
            code: 3,
        },
    )
    .await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // 迟到的送达回执不把状态从read拉回
    app.push_worker_event(
        "sess-ack",
        WorkerEvent::Ack {
            message_id: receipt.message_id.clone(),
            code: 2,
        },
    )
    .await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    let tracking = app
        .state
        .delivery_repo
        .find_by_message_id(&receipt.message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        tracking.status,
        wassrs::domain::models::delivery::DeliveryStatus::Read
    );
    assert!(tracking.read_at.is_some());
}
