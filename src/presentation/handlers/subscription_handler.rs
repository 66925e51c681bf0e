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

use crate::application::dto::send_request::ActivateSubscriptionDto;
use crate::domain::models::subscription::SubscriptionTier;
use crate::presentation::errors::AppError;
use crate::presentation::state::GatewayState;

/// 档位目录
pub async fn get_tiers() -> impl IntoResponse {
    let tiers: Vec<_> = SubscriptionTier::all()
        .iter()
        .map(|tier| {
            let limits = tier.limits();
            json!({
                "tier": tier.to_string(),
                "messages": limits.messages,
                "numbers": limits.numbers,
                "durationDays": limits.duration_days,
            })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "success": true, "tiers": tiers })))
}

/// 查询用户当前激活的订阅
pub async fn get_subscription(
    Extension(state): Extension<Arc<GatewayState>>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = state.subscription_repo.find_active(user_id).await?;
    match subscription {
        Some(sub) => Ok((
            StatusCode::OK,
            Json(json!({ "success": true, "subscription": sub })),
        )
            .into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "No active subscription" })),
        )
            .into_response()),
    }
}

/// 激活订阅档位
pub async fn activate_subscription(
    Extension(state): Extension<Arc<GatewayState>>,
    Json(payload): Json<ActivateSubscriptionDto>,
) -> Result<impl IntoResponse, AppError> {
    let tier: SubscriptionTier = match payload.tier.parse() {
        Ok(t) => t,
        Err(e) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e })),
            )
                .into_response())
        }
    };

    let subscription = state
        .subscription_repo
        .activate(payload.user_id, tier)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "subscription": subscription })),
    )
        .into_response())
}
