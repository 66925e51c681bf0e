// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::send_request::TopupDto;
use crate::domain::models::wallet::{calculate_topup_bonus, WalletTransactionType};
use crate::presentation::errors::AppError;
use crate::presentation::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// 查询余额
pub async fn get_balance(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let balance = state.wallet_repo.get_balance(user_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "balance": balance, "currency": "IQD" })),
    ))
}

/// 查询交易历史
pub async fn get_transactions(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = state
        .wallet_repo
        .get_transaction_history(user_id, query.limit.or(Some(50)))
        .await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "transactions": transactions })),
    ))
}

/// 充值
///
/// 阶梯赠送随充值在同一路径入账，两笔贷记共享引用
pub async fn topup(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(payload): Json<TopupDto>,
) -> Result<impl IntoResponse, AppError> {
    if payload.amount <= 0 {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Top-up amount must be positive" })),
        )
            .into_response());
    }

    let reference = format!("topup_{}", Uuid::new_v4());
    let mut balance = state
        .wallet_repo
        .credit_wallet_balance(
            payload.user_id,
            payload.amount,
            None,
            WalletTransactionType::Credit,
            format!("Wallet top-up of {} IQD", payload.amount),
            Some(reference.clone()),
        )
        .await?;

    let bonus = calculate_topup_bonus(payload.amount);
    if bonus > 0 {
        balance = state
            .wallet_repo
            .credit_wallet_balance(
                payload.user_id,
                bonus,
                None,
                WalletTransactionType::Credit,
                format!("Top-up bonus of {} IQD", bonus),
                Some(format!("bonus_{}", reference)),
            )
            .await?;
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "amount": payload.amount,
            "bonus": bonus,
            "balance": balance,
        })),
    )
        .into_response())
}
