// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::send_request::RateLimitSettingsDto;
use crate::domain::models::rate_limit::RateLimitSettings;
use crate::presentation::errors::AppError;
use crate::presentation::state::GatewayState;

/// 读取用户限流设置（未配置时返回默认值）
pub async fn get_settings(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let settings = state.rate_limit_repo.get_settings(user_id).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "settings": settings })),
    ))
}

/// 更新用户限流设置
pub async fn put_settings(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<RateLimitSettingsDto>,
) -> Result<impl IntoResponse, AppError> {
    if payload.per_minute <= 0 || payload.per_hour <= 0 || payload.per_day <= 0 {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Limits must be positive" })),
        )
            .into_response());
    }

    let settings = RateLimitSettings {
        user_id,
        per_minute: payload.per_minute,
        per_hour: payload.per_hour,
        per_day: payload.per_day,
    };
    state.rate_limit_repo.put_settings(&settings).await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "success": true, "settings": settings })),
    )
        .into_response())
}
