// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, COST_PER_MESSAGE, INITIAL_BALANCE};
use std::collections::HashSet;
use wassrs::domain::models::automation_log::{AutomationType, SendStatus};
use wassrs::domain::models::rate_limit::{RateLimitSettings, RateLimitWindow};
use wassrs::domain::models::subscription::SubscriptionTier;
use wassrs::domain::models::wallet::WalletTransactionType;
use wassrs::domain::services::admission_service::AdmissionError;

const RECIPIENT: &str = "9647812345678";

#[tokio::test]
async fn test_happy_send_deducts_wallet_and_counts_usage() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-happy").await;

    let receipt = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-happy",
            RECIPIENT,
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap();

    assert_eq!(receipt.new_balance, INITIAL_BALANCE - COST_PER_MESSAGE);
    assert_eq!(receipt.recipient, RECIPIENT);

    // 一条借记交易，金额与前后余额自洽
    let txns = app
        .state
        .wallet_repo
        .get_transaction_history(user_id, None)
        .await
        .unwrap();
    let debit = txns
        .iter()
        .find(|t| t.transaction_type == WalletTransactionType::Debit)
        .expect("debit transaction");
    assert_eq!(debit.amount, COST_PER_MESSAGE);
    assert_eq!(debit.balance_before, INITIAL_BALANCE);
    assert_eq!(debit.balance_after, INITIAL_BALANCE - COST_PER_MESSAGE);

    // 一条状态为sent的自动化日志
    let since = chrono::Utc::now() - chrono::Duration::hours(1);
    assert_eq!(
        app.state
            .automation_log_repo
            .count_since(user_id, since)
            .await
            .unwrap(),
        1
    );

    // 订阅用量递增
    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.messages_used, 1);
}

#[tokio::test]
async fn test_insufficient_balance_rejected_without_side_effects() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-poor").await;

    // 余额降到5，不足一条消息的费用
    app.state
        .wallet_repo
        .deduct_wallet_balance(user_id, INITIAL_BALANCE - 5, None, "drain".to_string(), None)
        .await
        .unwrap();
    let txns_before = app
        .state
        .wallet_repo
        .get_transaction_history(user_id, None)
        .await
        .unwrap()
        .len();

    let err = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-poor",
            RECIPIENT,
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AdmissionError::InsufficientBalance {
            available: 5,
            required: COST_PER_MESSAGE,
        }
    ));

    // 没有新的交易、日志或用量变动
    let txns_after = app
        .state
        .wallet_repo
        .get_transaction_history(user_id, None)
        .await
        .unwrap()
        .len();
    assert_eq!(txns_before, txns_after);
    assert_eq!(app.state.wallet_repo.get_balance(user_id).await.unwrap(), 5);

    let since = chrono::Utc::now() - chrono::Duration::hours(1);
    assert_eq!(
        app.state
            .automation_log_repo
            .count_since(user_id, since)
            .await
            .unwrap(),
        0
    );
    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.messages_used, 0);
}

#[tokio::test]
async fn test_rate_limit_minute_window() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-rate").await;

    app.state
        .rate_limit_repo
        .put_settings(&RateLimitSettings {
            user_id,
            per_minute: 2,
            per_hour: 100,
            per_day: 1000,
        })
        .await
        .unwrap();

    for _ in 0..2 {
        app.state
            .pipeline
            .send_single(
                user_id,
                "sess-rate",
                RECIPIENT,
                "Hi",
                AutomationType::ApiMessage,
                None,
            )
            .await
            .unwrap();
    }

    let err = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-rate",
            RECIPIENT,
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap_err();

    match err {
        AdmissionError::RateLimited {
            window,
            limit,
            current,
        } => {
            assert_eq!(window, RateLimitWindow::Minute);
            assert_eq!(window.reason_code(), "rate_limit_minute");
            assert_eq!(limit, 2);
            assert_eq!(current, 2);
        }
        other => panic!("expected rate limit error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_premium_tier_never_enforces_message_limit() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Premium).await;
    app.connect_ready_session(user_id, "sess-prem").await;

    // 已用量远超基础档位的限额
    app.state
        .subscription_repo
        .increment_subscription_usage(user_id, 3000, 0)
        .await
        .unwrap();

    let receipt = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-prem",
            RECIPIENT,
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap();
    assert!(!receipt.message_id.is_empty());

    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.messages_used, 3001);
}

#[tokio::test]
async fn test_basic_tier_message_limit_rejected() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Basic).await;
    app.connect_ready_session(user_id, "sess-basic").await;

    app.state
        .subscription_repo
        .increment_subscription_usage(user_id, 1200, 0)
        .await
        .unwrap();

    let err = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-basic",
            RECIPIENT,
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap_err();
    match err {
        AdmissionError::SubscriptionExceeded { reason } => {
            assert_eq!(reason, "message_limit_exceeded");
        }
        other => panic!("expected subscription error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_recipient_is_refunded() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let mut template = super::helpers::default_template();
    template.unreachable = HashSet::from([RECIPIENT.to_string()]);
    app.connect_session_with_template(user_id, "sess-unreach", template)
        .await;

    let err = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-unreach",
            RECIPIENT,
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::UnreachableRecipient(_)));

    // 扣费被等额冲正，引用带 refund_ 前缀
    assert_eq!(
        app.state.wallet_repo.get_balance(user_id).await.unwrap(),
        INITIAL_BALANCE
    );
    let txns = app
        .state
        .wallet_repo
        .get_transaction_history(user_id, None)
        .await
        .unwrap();
    let debit = txns
        .iter()
        .find(|t| t.transaction_type == WalletTransactionType::Debit)
        .expect("debit row");
    let refund = txns
        .iter()
        .find(|t| {
            t.reference_id
                .as_deref()
                .is_some_and(|r| r.starts_with("refund_"))
        })
        .expect("refund row");
    assert_eq!(refund.amount, debit.amount);
    assert_eq!(
        refund.reference_id.as_deref().unwrap(),
        format!("refund_{}", debit.reference_id.as_deref().unwrap())
    );

    // 失败的发送不计入订阅用量
    let sub = app
        .state
        .subscription_repo
        .find_active(user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sub.messages_used, 0);
}

#[tokio::test]
async fn test_malformed_recipient_rejected_before_any_mutation() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-bad").await;

    let err = app
        .state
        .pipeline
        .send_single(
            user_id,
            "sess-bad",
            "12345",
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::InvalidRecipient(_)));
    assert_eq!(
        app.state.wallet_repo.get_balance(user_id).await.unwrap(),
        INITIAL_BALANCE
    );
}

#[tokio::test]
async fn test_missing_session_is_not_found() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let err = app
        .state
        .pipeline
        .send_single(
            user_id,
            "no-such-session",
            RECIPIENT,
            "Hi",
            AutomationType::ApiMessage,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::SessionNotFound));
}

/// 钱包守恒：initial + Σ贷记 − Σ借记 == 当前余额，
/// 且每条交易的前后余额链自洽
#[tokio::test]
async fn test_wallet_conservation_under_mixed_operations() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;

    let operations: [(bool, i64); 7] = [
        (true, 100),
        (false, 250),
        (true, 40),
        (false, 15),
        (true, 500),
        (false, 620),
        (true, 5),
    ];
    for (i, (is_debit, amount)) in operations.iter().enumerate() {
        if *is_debit {
            app.state
                .wallet_repo
                .deduct_wallet_balance(user_id, *amount, None, format!("op {}", i), None)
                .await
                .unwrap();
        } else {
            app.state
                .wallet_repo
                .credit_wallet_balance(
                    user_id,
                    *amount,
                    None,
                    WalletTransactionType::Credit,
                    format!("op {}", i),
                    None,
                )
                .await
                .unwrap();
        }
    }

    let balance = app.state.wallet_repo.get_balance(user_id).await.unwrap();
    let txns = app
        .state
        .wallet_repo
        .get_transaction_history(user_id, None)
        .await
        .unwrap();

    let mut net = 0i64;
    for txn in &txns {
        match txn.transaction_type {
            WalletTransactionType::Debit => {
                net -= txn.amount;
                assert_eq!(txn.balance_after, txn.balance_before - txn.amount);
            }
            WalletTransactionType::Credit | WalletTransactionType::Initial => {
                net += txn.amount;
                assert_eq!(txn.balance_after, txn.balance_before + txn.amount);
            }
        }
    }
    // 初始额度本身也是一条交易，净额即当前余额
    assert_eq!(net, balance);
}

/// 派发完成后日志才落库：成功路径日志状态为sent
#[tokio::test]
async fn test_log_reflects_outcome() {
    let app = create_test_app().await;
    let user_id = app.setup_user(SubscriptionTier::Standard).await;
    app.connect_ready_session(user_id, "sess-log").await;

    app.state
        .pipeline
        .send_otp(user_id, "sess-log", RECIPIENT, "123456", Default::default())
        .await
        .unwrap();

    let logs = app
        .state
        .automation_log_repo
        .find_by_session_and_type("sess-log", AutomationType::Otp, None)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, SendStatus::Sent);
    assert_eq!(logs[0].recipient.as_deref(), Some(RECIPIENT));
    // OTP正文带验证码与有效期条款
    assert!(logs[0].message.contains("123456"));
}
