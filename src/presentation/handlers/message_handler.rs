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
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;

use crate::application::dto::send_request::{SendAnnouncementDto, SendOtpDto, TestMessageDto};
use crate::domain::models::automation_log::AutomationType;
use crate::domain::services::send_executor::OtpLanguage;
use crate::presentation::errors::AppError;
use crate::presentation::state::GatewayState;

/// 仪表盘OTP发送
pub async fn send_otp(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(payload): Json<SendOtpDto>,
) -> Result<impl IntoResponse, AppError> {
    let lang = payload
        .language
        .as_deref()
        .and_then(|l| l.parse::<OtpLanguage>().ok())
        .unwrap_or_default();

    let receipt = state
        .pipeline
        .send_otp(
            payload.user_id,
            &payload.session_id,
            &payload.phone_number,
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

/// 仪表盘群发公告
pub async fn send_announcement(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(payload): Json<SendAnnouncementDto>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state
        .pipeline
        .send_bulk(
            payload.user_id,
            &payload.session_id,
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

/// 仪表盘测试消息
pub async fn test_message(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(payload): Json<TestMessageDto>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state
        .pipeline
        .send_single(
            payload.user_id,
            &payload.session_id,
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
            "balance": receipt.new_balance,
        })),
    ))
}
