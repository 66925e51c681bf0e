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
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::application::dto::connect_request::ConnectRequestDto;
use crate::domain::models::session::{Session, SessionStatus};
use crate::presentation::errors::AppError;
use crate::presentation::state::GatewayState;

/// 连接后等待初始QR码的轮询预算
const QR_WAIT_ATTEMPTS: usize = 20;
const QR_WAIT_INTERVAL: Duration = Duration::from_millis(500);

/// 发起会话连接
///
/// 创建会话行并启动监管器；若初始QR码在轮询预算内出现则随响应返回
pub async fn connect(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(payload): Json<ConnectRequestDto>,
) -> Result<impl IntoResponse, AppError> {
    // 同一用户不允许有第二个已连接会话
    let connected = state
        .session_repo
        .find_by_user_and_status(payload.user_id, SessionStatus::Connected)
        .await?;
    if connected.iter().any(|s| s.id != payload.session_id) {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "User already has a connected session",
            })),
        )
            .into_response());
    }

    match state.session_repo.find_by_id(&payload.session_id).await? {
        Some(existing) => {
            if existing.user_id != payload.user_id {
                return Ok((
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "success": false,
                        "error": "Session belongs to another user",
                    })),
                )
                    .into_response());
            }
            // 终态行重新连接：重置为初始化状态
            if existing.status.is_terminal() {
                state
                    .session_repo
                    .update_status(&payload.session_id, SessionStatus::Initializing)
                    .await?;
            }
        }
        None => {
            let session = Session::new(payload.session_id.clone(), payload.user_id);
            state.session_repo.create(&session).await?;
        }
    }

    info!("Connect requested for session {}", payload.session_id);
    state
        .registry
        .create_if_absent(&payload.session_id, payload.user_id, false);

    // 等一小段时间，尽量把首个QR码带回给前端
    let mut qr_code = None;
    let mut status = SessionStatus::Initializing;
    for _ in 0..QR_WAIT_ATTEMPTS {
        if let Some(row) = state.session_repo.find_by_id(&payload.session_id).await? {
            status = row.status;
            if row.qr_code.is_some() {
                qr_code = row.qr_code;
                break;
            }
            if row.status == SessionStatus::Connected || row.status.is_terminal() {
                break;
            }
        }
        tokio::time::sleep(QR_WAIT_INTERVAL).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "sessionId": payload.session_id,
            "status": status.to_string(),
            "qrCode": qr_code,
        })),
    )
        .into_response())
}

/// 查询会话
pub async fn get_session(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.session_repo.find_by_id(&session_id).await?;
    match session {
        Some(session) => Ok((
            StatusCode::OK,
            Json(json!({ "success": true, "session": session })),
        )
            .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Session not found" })),
        )
            .into_response()),
    }
}

/// 断开会话
///
/// 登出、删除会话行并清理本地与对象存储中的认证目录
pub async fn disconnect(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if state.session_repo.find_by_id(&session_id).await?.is_none() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Session not found" })),
        )
            .into_response());
    }

    if let Some(handle) = state.registry.get(&session_id) {
        if let Err(e) = handle.logout().await {
            warn!("Logout for session {} returned: {}", session_id, e);
        }
    }

    state.session_repo.delete(&session_id).await?;

    if let Err(e) = state.storage_service.delete_local(&session_id).await {
        warn!("Local auth cleanup for {} failed: {}", session_id, e);
    }
    // 对象存储清理在后台进行
    let storage = state.storage_service.clone();
    let sid = session_id.clone();
    tokio::spawn(async move {
        if let Err(e) = storage.delete_remote(&sid).await {
            warn!("Remote auth cleanup for {} failed: {}", sid, e);
        }
    });

    info!("Session {} disconnected and removed", session_id);
    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}
