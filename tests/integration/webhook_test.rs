// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::create_test_app;
use axum::{extract::Json, http::StatusCode, routing::post, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use uuid::Uuid;

use wassrs::domain::models::subscription::SubscriptionTier;
use wassrs::domain::models::webhook::{GatewayEvent, Webhook, WebhookEventType};
use wassrs::engines::traits::{IncomingMessage, MessageBody, WorkerEvent};

type Received = Arc<Mutex<Vec<Value>>>;

/// 本地接收端：记录每个POST的JSON体并返回固定状态码
async fn start_recording_server(status: StatusCode) -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let rec = received.clone();
    let app = Router::new().route(
        "/hook",
        post(move |Json(body): Json<Value>| {
            let rec = rec.clone();
            async move {
                rec.lock().await.push(body);
                status
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/hook", addr), received)
}

async fn wait_for_count(received: &Received, expected: usize) {
    for _ in 0..100 {
        if received.lock().await.len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "expected {} webhook deliveries, got {}",
        expected,
        received.lock().await.len()
    );
}

fn make_webhook(
    user_id: Uuid,
    session_id: &str,
    webhook_type: WebhookEventType,
    url: &str,
) -> Webhook {
    let now = Utc::now();
    Webhook {
        id: Uuid::new_v4(),
        user_id,
        session_id: session_id.to_string(),
        webhook_type,
        url: url.to_string(),
        success_webhook_url: None,
        failure_webhook_url: None,
        custom_payload: None,
        headers: None,
        max_retries: 3,
        retry_delay_seconds: 0,
        retry_on_failure: true,
        is_active: true,
        total_calls: 0,
        success_calls: 0,
        failed_calls: 0,
        last_called_at: None,
        last_success_at: None,
        last_failure_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// 入站文本扇出：自定义载荷覆盖合并进引擎载荷，恰好投递一次
#[tokio::test]
async fn test_incoming_text_fanout_with_custom_payload() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-hook").await;

    let (url, received) = start_recording_server(StatusCode::OK).await;
    let mut webhook = make_webhook(user_id, "sess-hook", WebhookEventType::IncomingText, &url);
    webhook.custom_payload = Some(json!({ "tenant": "acme" }));
    app.state.webhook_repo.create(&webhook).await.unwrap();

    app.push_worker_event(
        "sess-hook",
        WorkerEvent::Message(IncomingMessage {
            from: "9647812345678@c.us".to_string(),
            body: MessageBody::Text("hello".to_string()),
            timestamp: Utc::now(),
        }),
    )
    .await;

    wait_for_count(&received, 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let bodies = received.lock().await;
    assert_eq!(bodies.len(), 1, "exactly one delivery per event");
    let body = &bodies[0];
    assert_eq!(body["event"], "message_received");
    assert_eq!(body["messageType"], "text");
    assert_eq!(body["from"], "9647812345678");
    assert_eq!(body["text"], "hello");
    assert_eq!(body["tenant"], "acme");
    assert!(body["timestamp"].is_string());
    drop(bodies);

    // 统计与逐次日志
    for _ in 0..50 {
        let stats = app
            .state
            .webhook_repo
            .find_by_id(webhook.id)
            .await
            .unwrap()
            .unwrap();
        if stats.total_calls == 1 {
            assert_eq!(stats.success_calls, 1);
            assert_eq!(stats.failed_calls, 0);
            assert!(stats.last_success_at.is_some());
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    let logs = app
        .state
        .webhook_log_repo
        .find_by_webhook(webhook.id, None)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].success);
    assert_eq!(logs[0].attempt_number, 1);
    assert!(!logs[0].is_retry);
}

/// 持续失败的端点按重试上限尝试后记为失败
#[tokio::test]
async fn test_retry_until_attempts_exhausted() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-retry").await;

    let (url, received) = start_recording_server(StatusCode::INTERNAL_SERVER_ERROR).await;
    let webhook = make_webhook(user_id, "sess-retry", WebhookEventType::Otp, &url);
    app.state.webhook_repo.create(&webhook).await.unwrap();

    app.state.fanout.emit(
        user_id,
        "sess-retry",
        GatewayEvent::OtpSent {
            recipient: "9647812345678".to_string(),
            code: "111222".to_string(),
        },
    );

    wait_for_count(&received, 3).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(received.lock().await.len(), 3);

    let logs = app
        .state
        .webhook_log_repo
        .find_by_webhook(webhook.id, None)
        .await
        .unwrap();
    assert_eq!(logs.len(), 3);
    let mut attempts: Vec<i32> = logs.iter().map(|l| l.attempt_number).collect();
    attempts.sort_unstable();
    assert_eq!(attempts, vec![1, 2, 3]);
    assert!(logs.iter().all(|l| !l.success));
    assert_eq!(logs.iter().filter(|l| l.is_retry).count(), 2);

    let stats = app
        .state
        .webhook_repo
        .find_by_id(webhook.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.total_calls, 1);
    assert_eq!(stats.failed_calls, 1);
    assert!(stats.last_failure_at.is_some());
}

#[tokio::test]
async fn test_retry_disabled_makes_single_attempt() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-noretry").await;

    let (url, received) = start_recording_server(StatusCode::INTERNAL_SERVER_ERROR).await;
    let mut webhook = make_webhook(user_id, "sess-noretry", WebhookEventType::Otp, &url);
    webhook.retry_on_failure = false;
    app.state.webhook_repo.create(&webhook).await.unwrap();

    app.state.fanout.emit(
        user_id,
        "sess-noretry",
        GatewayEvent::OtpSent {
            recipient: "9647812345678".to_string(),
            code: "333444".to_string(),
        },
    );

    wait_for_count(&received, 1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(received.lock().await.len(), 1);
}

/// 成功事件优先投递到成功覆盖URL
#[tokio::test]
async fn test_success_url_override_selected() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-url").await;

    let (primary_url, primary_received) = start_recording_server(StatusCode::OK).await;
    let (success_url, success_received) = start_recording_server(StatusCode::OK).await;
    let mut webhook = make_webhook(user_id, "sess-url", WebhookEventType::Otp, &primary_url);
    webhook.success_webhook_url = Some(success_url);
    app.state.webhook_repo.create(&webhook).await.unwrap();

    app.state.fanout.emit(
        user_id,
        "sess-url",
        GatewayEvent::OtpSent {
            recipient: "9647812345678".to_string(),
            code: "555666".to_string(),
        },
    );

    wait_for_count(&success_received, 1).await;
    assert!(primary_received.lock().await.is_empty());
    let bodies = success_received.lock().await;
    assert_eq!(bodies[0]["event"], "otp_sent");
    assert_eq!(bodies[0]["success"], true);
    assert_eq!(bodies[0]["otp"], "555666");
}

/// 订阅过滤：只有 (用户, 会话, 类型∈{T, 通用入站, all}) 的激活
/// 订阅收到事件
#[tokio::test]
async fn test_subscription_filter() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-filter").await;

    let (text_url, text_received) = start_recording_server(StatusCode::OK).await;
    let (otp_url, otp_received) = start_recording_server(StatusCode::OK).await;
    let (all_url, all_received) = start_recording_server(StatusCode::OK).await;
    let (generic_url, generic_received) = start_recording_server(StatusCode::OK).await;
    let (other_session_url, other_session_received) = start_recording_server(StatusCode::OK).await;

    app.state
        .webhook_repo
        .create(&make_webhook(
            user_id,
            "sess-filter",
            WebhookEventType::IncomingText,
            &text_url,
        ))
        .await
        .unwrap();
    app.state
        .webhook_repo
        .create(&make_webhook(
            user_id,
            "sess-filter",
            WebhookEventType::Otp,
            &otp_url,
        ))
        .await
        .unwrap();
    app.state
        .webhook_repo
        .create(&make_webhook(
            user_id,
            "sess-filter",
            WebhookEventType::All,
            &all_url,
        ))
        .await
        .unwrap();
    app.state
        .webhook_repo
        .create(&make_webhook(
            user_id,
            "sess-filter",
            WebhookEventType::IncomingMessage,
            &generic_url,
        ))
        .await
        .unwrap();
    app.state
        .webhook_repo
        .create(&make_webhook(
            user_id,
            "sess-other",
            WebhookEventType::IncomingText,
            &other_session_url,
        ))
        .await
        .unwrap();

    app.push_worker_event(
        "sess-filter",
        WorkerEvent::Message(IncomingMessage {
            from: "9647812345678@c.us".to_string(),
            body: MessageBody::Text("filtered".to_string()),
            timestamp: Utc::now(),
        }),
    )
    .await;

    wait_for_count(&text_received, 1).await;
    wait_for_count(&all_received, 1).await;
    wait_for_count(&generic_received, 1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(otp_received.lock().await.is_empty());
    assert!(other_session_received.lock().await.is_empty());
}

/// 非激活的订阅即使类型命中也不接收事件
#[tokio::test]
async fn test_inactive_subscription_is_skipped() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-inactive").await;

    let (url, received) = start_recording_server(StatusCode::OK).await;
    let mut webhook = make_webhook(
        user_id,
        "sess-inactive",
        WebhookEventType::IncomingText,
        &url,
    );
    webhook.is_active = false;
    app.state.webhook_repo.create(&webhook).await.unwrap();

    app.push_worker_event(
        "sess-inactive",
        WorkerEvent::Message(IncomingMessage {
            from: "9647812345678@c.us".to_string(),
            body: MessageBody::Text("quiet".to_string()),
            timestamp: Utc::now(),
        }),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(received.lock().await.is_empty());
}

/// status@broadcast 消息被丢弃，不进入扇出
#[tokio::test]
async fn test_broadcast_messages_are_dropped() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-bcast").await;

    let (url, received) = start_recording_server(StatusCode::OK).await;
    app.state
        .webhook_repo
        .create(&make_webhook(
            user_id,
            "sess-bcast",
            WebhookEventType::All,
            &url,
        ))
        .await
        .unwrap();

    app.push_worker_event(
        "sess-bcast",
        WorkerEvent::Message(IncomingMessage {
            from: "status@broadcast".to_string(),
            body: MessageBody::Text("story".to_string()),
            timestamp: Utc::now(),
        }),
    )
    .await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(received.lock().await.is_empty());
}
