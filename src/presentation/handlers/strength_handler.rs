// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::presentation::errors::AppError;
use crate::presentation::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<u64>,
}

/// 读取账号强度指标
pub async fn get_strength(
    Extension(state): Extension<Arc<GatewayState>>,
    Path((user_id, session_id)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let metrics = state.strength.get_metrics(user_id, &session_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "metrics": metrics })),
    ))
}

/// 读取历史强化日志
pub async fn get_strength_logs(
    Extension(state): Extension<Arc<GatewayState>>,
    Path((_user_id, session_id)): Path<(Uuid, String)>,
    Query(query): Query<LogsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let logs = state
        .strength
        .get_logs(&session_id, query.limit.or(Some(50)))
        .await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "logs": logs })),
    ))
}

/// 执行综合强化活动链
pub async fn strengthen_comprehensive(
    Extension(state): Extension<Arc<GatewayState>>,
    Path((user_id, session_id)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let metrics = state
        .strength
        .strengthen_comprehensive(user_id, &session_id)
        .await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "metrics": metrics })),
    ))
}
