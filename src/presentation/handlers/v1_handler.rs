// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::application::dto::send_request::{V1SendBulkDto, V1SendDto, V1SendOtpDto};
use crate::domain::models::automation_log::AutomationType;
use crate::domain::services::send_executor::OtpLanguage;
use crate::presentation::errors::AppError;
use crate::presentation::middleware::auth_middleware::ApiKeyIdentity;
use crate::presentation::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

/// 密钥身份信息
pub async fn auth_info(
    Extension(identity): Extension<ApiKeyIdentity>,
) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "userId": identity.user_id,
            "sessionId": identity.session_id,
        })),
    )
}

/// 绑定会话的状态
pub async fn session_status(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(identity): Extension<ApiKeyIdentity>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.session_repo.find_by_id(&identity.session_id).await?;
    let deliveries = state
        .delivery_repo
        .find_by_session(&identity.session_id, Some(20))
        .await?;
    match session {
        Some(session) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "session": session,
                "recentDeliveries": deliveries,
            })),
        )
            .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Session not found" })),
        )
            .into_response()),
    }
}

/// 钱包余额
pub async fn wallet_balance(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(identity): Extension<ApiKeyIdentity>,
) -> Result<impl IntoResponse, AppError> {
    let balance = state.wallet_repo.get_balance(identity.user_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "balance": balance, "currency": "IQD" })),
    ))
}

/// 钱包交易历史
pub async fn wallet_transactions(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(identity): Extension<ApiKeyIdentity>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let transactions = state
        .wallet_repo
        .get_transaction_history(identity.user_id, query.limit.or(Some(50)))
        .await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "transactions": transactions })),
    ))
}

/// 单发消息
pub async fn send_message(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(identity): Extension<ApiKeyIdentity>,
    Json(payload): Json<V1SendDto>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state
        .pipeline
        .send_single(
            identity.user_id,
            &identity.session_id,
            &payload.recipient,
            &payload.message,
            AutomationType::ApiMessage,
            None,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "messageId": receipt.message_id,
            "recipient": receipt.recipient,
            "balance": receipt.new_balance,
        })),
    ))
}

/// 群发消息
pub async fn send_bulk(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(identity): Extension<ApiKeyIdentity>,
    Json(payload): Json<V1SendBulkDto>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state
        .pipeline
        .send_bulk(
            identity.user_id,
            &identity.session_id,
            &payload.recipients,
            &payload.message,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "total": receipt.total,
            "sent": receipt.sent,
            "failed": receipt.failed,
            "refunded": receipt.refunded,
            "errors": receipt.errors,
            "balance": receipt.new_balance,
        })),
    ))
}

/// 发送OTP
pub async fn send_otp(
    Extension(state): Extension<Arc<GatewayState>>,
    Extension(identity): Extension<ApiKeyIdentity>,
    Json(payload): Json<V1SendOtpDto>,
) -> Result<impl IntoResponse, AppError> {
    let lang = payload
        .language
        .as_deref()
        .and_then(|l| l.parse::<OtpLanguage>().ok())
        .unwrap_or_default();

    let receipt = state
        .pipeline
        .send_otp(
            identity.user_id,
            &identity.session_id,
            &payload.recipient,
            &payload.otp_code,
            lang,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "messageId": receipt.message_id,
            "recipient": receipt.recipient,
            "balance": receipt.new_balance,
        })),
    ))
}
