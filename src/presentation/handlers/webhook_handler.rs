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
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::webhook_request::{CreateWebhookDto, UpdateWebhookDto};
use crate::domain::models::webhook::{GatewayEvent, Webhook, WebhookEventType};
use crate::presentation::errors::AppError;
use crate::presentation::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u64>,
}

/// 列出用户的全部Webhook订阅
pub async fn list_webhooks(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let webhooks = state.webhook_repo.find_by_user(user_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "webhooks": webhooks })),
    ))
}

/// 创建Webhook订阅
pub async fn create_webhook(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<CreateWebhookDto>,
) -> Result<impl IntoResponse, AppError> {
    let webhook_type: WebhookEventType = match payload.webhook_type.parse() {
        Ok(t) => t,
        Err(e) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e })),
            )
                .into_response())
        }
    };

    let now = Utc::now();
    let webhook = Webhook {
        id: Uuid::new_v4(),
        user_id,
        session_id: payload.session_id,
        webhook_type,
        url: payload.url,
        success_webhook_url: payload.success_webhook_url,
        failure_webhook_url: payload.failure_webhook_url,
        custom_payload: payload.custom_payload,
        headers: payload.headers,
        max_retries: payload.max_retries.unwrap_or(3),
        retry_delay_seconds: payload.retry_delay_seconds.unwrap_or(5),
        retry_on_failure: payload.retry_on_failure.unwrap_or(true),
        is_active: true,
        total_calls: 0,
        success_calls: 0,
        failed_calls: 0,
        last_called_at: None,
        last_success_at: None,
        last_failure_at: None,
        created_at: now,
        updated_at: now,
    };

    let created = state.webhook_repo.create(&webhook).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "webhook": created })),
    )
        .into_response())
}

/// 更新Webhook订阅
pub async fn update_webhook(
    Extension(state): Extension<Arc<GatewayState>>,
    Path((user_id, webhook_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateWebhookDto>,
) -> Result<impl IntoResponse, AppError> {
    let Some(mut webhook) = state.webhook_repo.find_by_id(webhook_id).await? else {
        return Ok(not_found());
    };
    if webhook.user_id != user_id {
        return Ok(not_found());
    }

    if let Some(url) = payload.url {
        webhook.url = url;
    }
    if payload.success_webhook_url.is_some() {
        webhook.success_webhook_url = payload.success_webhook_url;
    }
    if payload.failure_webhook_url.is_some() {
        webhook.failure_webhook_url = payload.failure_webhook_url;
    }
    if payload.custom_payload.is_some() {
        webhook.custom_payload = payload.custom_payload;
    }
    if payload.headers.is_some() {
        webhook.headers = payload.headers;
    }
    if let Some(max_retries) = payload.max_retries {
        webhook.max_retries = max_retries;
    }
    if let Some(delay) = payload.retry_delay_seconds {
        webhook.retry_delay_seconds = delay;
    }
    if let Some(retry) = payload.retry_on_failure {
        webhook.retry_on_failure = retry;
    }
    if let Some(active) = payload.is_active {
        webhook.is_active = active;
    }

    let updated = state.webhook_repo.update(&webhook).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "webhook": updated })),
    )
        .into_response())
}

/// 删除Webhook订阅
pub async fn delete_webhook(
    Extension(state): Extension<Arc<GatewayState>>,
    Path((user_id, webhook_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let Some(webhook) = state.webhook_repo.find_by_id(webhook_id).await? else {
        return Ok(not_found());
    };
    if webhook.user_id != user_id {
        return Ok(not_found());
    }
    state.webhook_repo.delete(webhook_id).await?;
    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

/// 读取Webhook投递日志
pub async fn get_webhook_logs(
    Extension(state): Extension<Arc<GatewayState>>,
    Path((user_id, webhook_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let Some(webhook) = state.webhook_repo.find_by_id(webhook_id).await? else {
        return Ok(not_found());
    };
    if webhook.user_id != user_id {
        return Ok(not_found());
    }
    let logs = state
        .webhook_log_repo
        .find_by_webhook(webhook_id, query.limit.or(Some(50)))
        .await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "logs": logs })),
    )
        .into_response())
}

/// 触发合成测试事件
///
/// 走真实的扇出与投递路径，便于验证端点配置
pub async fn test_webhook(
    Extension(state): Extension<Arc<GatewayState>>,
    Path((user_id, webhook_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let Some(webhook) = state.webhook_repo.find_by_id(webhook_id).await? else {
        return Ok(not_found());
    };
    if webhook.user_id != user_id {
        return Ok(not_found());
    }

    state
        .fanout
        .dispatch_to(webhook, &GatewayEvent::Test { webhook_id })
        .await;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Test event queued" })),
    )
        .into_response())
}

fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Webhook not found" })),
    )
        .into_response()
}
