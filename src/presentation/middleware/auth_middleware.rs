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
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::repositories::api_key_repository::ApiKeyRepository;

/// 认证状态
#[derive(Clone)]
pub struct AuthState {
    pub api_key_repo: Arc<dyn ApiKeyRepository>,
}

/// 密钥命中后注入请求扩展的身份
#[derive(Clone, Debug)]
pub struct ApiKeyIdentity {
    pub key_id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub key: String,
}

/// API密钥认证中间件
///
/// 接受 `X-API-Key: <key>`（大小写不敏感）或 `Authorization: Bearer <key>`；
/// 命中后注入绑定的 (用户, 会话) 并刷新使用统计
///
/// # 参数
///
/// * `state` - 认证状态
/// * `req` - HTTP请求
/// * `next` - 下一个中间件
///
/// # 返回值
///
/// * `Ok(Response)` - 认证成功的响应
/// * `Err(Response)` - 认证失败的401响应
pub async fn api_key_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    debug!("ApiKeyMiddleware processing path: {}", req.uri().path());

    let key = extract_key(&req).ok_or_else(|| {
        unauthorized("API key is required")
    })?;

    match state.api_key_repo.find_active_by_key(&key).await {
        Ok(Some(api_key)) => {
            if let Err(e) = state.api_key_repo.touch_usage(api_key.id).await {
                warn!("Failed to update API key usage: {}", e);
            }
            req.extensions_mut().insert(ApiKeyIdentity {
                key_id: api_key.id,
                user_id: api_key.user_id,
                session_id: api_key.session_id,
                key,
            });
            Ok(next.run(req).await)
        }
        Ok(None) => {
            warn!("API key not found");
            Err(unauthorized("Invalid API key"))
        }
        Err(e) => {
            tracing::error!("Database error checking API key: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "internal error" })),
            )
                .into_response())
        }
    }
}

fn extract_key(req: &Request) -> Option<String> {
    // X-API-Key优先；HeaderName匹配本身大小写不敏感
    if let Some(value) = req.headers().get("x-api-key") {
        if let Ok(key) = value.to_str() {
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
    }
    let auth = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ").map(|k| k.to_string())
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": message })),
    )
        .into_response()
}
