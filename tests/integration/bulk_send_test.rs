// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, COST_PER_MESSAGE, INITIAL_BALANCE};
use wassrs::domain::models::automation_log::{AutomationType, SendStatus};
use wassrs::domain::models::session::SessionStatus;
use wassrs::domain::models::subscription::SubscriptionTier;
use wassrs::domain::models::wallet::WalletTransactionType;

fn recipients() -> Vec<String> {
    vec![
        "9647812345678".to_string(),
        "9647812345679".to_string(),
        "9647812345680".to_string(),
    ]
}

#[tokio::test]
async fn test_bulk_send_all_succeed() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-bulk-ok").await;

    let receipt = app
        .state
        .pipeline
        .send_bulk(user_id, "sess-bulk-ok", &recipients(), "hello all")
        .await
        .unwrap();

    assert_eq!(receipt.total, 3);
    assert_eq!(receipt.sent, 3);
    assert_eq!(receipt.failed, 0);
    assert_eq!(receipt.refunded, 0);
    assert_eq!(
        receipt.new_balance,
        INITIAL_BALANCE - 3 * COST_PER_MESSAGE
    );

    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.messages_used, 3);

    // 整个批次一条日志，收件人序列化为JSON数组
    let logs = app
        .state
        .automation_log_repo
        .find_by_session_and_type("sess-bulk-ok", AutomationType::Announcement, None)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SendStatus::Sent);
    assert_eq!(logs[0].message_count, 3);
    let recipients_json = logs[0].recipients.as_ref().unwrap();
    assert_eq!(recipients_json.as_array().unwrap().len(), 3);
}

/// 第二条消息触发会话关闭：1条送出、2条失败、冲正20、
/// 会话行断开、订阅只记1条
#[tokio::test]
async fn test_session_closed_mid_bulk_refunds_and_disconnects() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let mut template = super::helpers::default_template();
    template.session_closed_after = Some(1);
    app.connect_session_with_template(user_id, "sess-bulk-closed", template)
        .await;

    let receipt = app
        .state
        .pipeline
        .send_bulk(user_id, "sess-bulk-closed", &recipients(), "hello all")
        .await
        .unwrap();

    assert_eq!(receipt.total, 3);
    assert_eq!(receipt.sent, 1);
    assert_eq!(receipt.failed, 2);
    assert_eq!(receipt.refunded, 2 * COST_PER_MESSAGE);
    assert_eq!(receipt.errors.len(), 2);
    assert_eq!(
        receipt.new_balance,
        INITIAL_BALANCE - 3 * COST_PER_MESSAGE + 2 * COST_PER_MESSAGE
    );

    // 一条等于失败额的贷记，引用与预扣共享
    let txns = app
        .state
        .wallet_repo
        .get_transaction_history(user_id, None)
        .await
        .unwrap();
    let debit = txns
        .iter()
        .find(|t| t.transaction_type == WalletTransactionType::Debit)
        .expect("upfront debit");
    assert_eq!(debit.amount, 3 * COST_PER_MESSAGE);
    let refund = txns
        .iter()
        .find(|t| {
            t.reference_id
                .as_deref()
                .is_some_and(|r| r.starts_with("refund_"))
        })
        .expect("refund credit");
    assert_eq!(refund.amount, 2 * COST_PER_MESSAGE);
    assert_eq!(
        refund.reference_id.as_deref().unwrap(),
        format!("refund_{}", debit.reference_id.as_deref().unwrap())
    );

    // 中途断开后会话落为disconnected，监管器被移除
    app.wait_for_status("sess-bulk-closed", SessionStatus::Disconnected)
        .await;
    for _ in 0..50 {
        if app.state.registry.get("sess-bulk-closed").is_none() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    assert!(app.state.registry.get("sess-bulk-closed").is_none());

    // 只有送出的那条计入订阅
    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.messages_used, 1);

    // 批次日志为partial，错误为逐收件人JSON列表
    let logs = app
        .state
        .automation_log_repo
        .find_by_session_and_type("sess-bulk-closed", AutomationType::Announcement, None)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SendStatus::Partial);
    let errors: serde_json::Value =
        serde_json::from_str(logs[0].error_message.as_deref().unwrap()).unwrap();
    assert_eq!(errors.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_bulk_with_empty_recipient_list_rejected() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-bulk-empty").await;

    let err = app
        .state
        .pipeline
        .send_bulk(user_id, "sess-bulk-empty", &[], "hello")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        wassrs::domain::services::admission_service::AdmissionError::InvalidRecipient(_)
    ));
    assert_eq!(
        app.state.wallet_repo.get_balance(user_id).await.unwrap(),
        INITIAL_BALANCE
    );
}

/// 限流按日志行计数：一个批次只算一行，收件人数量不影响窗口
#[tokio::test]
async fn test_bulk_counts_as_single_log_row_for_rate_limiting() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-bulk-rate").await;

    app.state
        .rate_limit_repo
        .put_settings(&wassrs::domain::models::rate_limit::RateLimitSettings {
            user_id,
            per_minute: 2,
            per_hour: 100,
            per_day: 1000,
        })
        .await
        .unwrap();

    // 收件人数量超过每分钟限额，但批次只产生一条日志，应放行
    let receipt = app
        .state
        .pipeline
        .send_bulk(user_id, "sess-bulk-rate", &recipients(), "hello all")
        .await
        .unwrap();
    assert_eq!(receipt.sent, 3);

    app.state
        .pipeline
        .send_bulk(user_id, "sess-bulk-rate", &recipients(), "hello again")
        .await
        .unwrap();

    // 窗口内已有两行，第三个批次被拒
    let err = app
        .state
        .pipeline
        .send_bulk(user_id, "sess-bulk-rate", &recipients(), "hello more")
        .await
        .unwrap_err();
    match err {
        wassrs::domain::services::admission_service::AdmissionError::RateLimited {
            window,
            limit,
            current,
        } => {
            assert_eq!(
                window,
                wassrs::domain::models::rate_limit::RateLimitWindow::Minute
            );
            assert_eq!(limit, 2);
            assert_eq!(current, 2);
        }
        other => panic!("expected rate limit error, got {:?}", other),
    }
}

/// 群发预扣需要全额余额
#[tokio::test]
async fn test_bulk_requires_full_upfront_balance() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-bulk-poor").await;

    // 只留两条消息的钱
    app.state
        .wallet_repo
        .deduct_wallet_balance(
            user_id,
            INITIAL_BALANCE - 2 * COST_PER_MESSAGE,
            None,
            "drain".to_string(),
            None,
        )
        .await
        .unwrap();

    let err = app
        .state
        .pipeline
        .send_bulk(user_id, "sess-bulk-poor", &recipients(), "hello")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        wassrs::domain::services::admission_service::AdmissionError::InsufficientBalance { .. }
    ));
}
