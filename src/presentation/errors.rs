// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::repositories::wallet_repository::WalletRepositoryError;
use crate::domain::services::admission_service::AdmissionError;
use crate::utils::errors::RepositoryError;

/// 应用错误类型
///
/// 封装所有可能的应用层错误，在处理器边界统一映射为
/// 状态码与 `{"success": false, "error": ...}` 响应体
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 准入错误携带结构化细节
        if let Some(admission) = self.0.downcast_ref::<AdmissionError>() {
            return admission_response(admission);
        }

        if let Some(wallet) = self.0.downcast_ref::<WalletRepositoryError>() {
            if let WalletRepositoryError::InsufficientBalance {
                available,
                required,
            } = wallet
            {
                return (
                    StatusCode::PAYMENT_REQUIRED,
                    Json(json!({
                        "success": false,
                        "error": "Insufficient balance",
                        "available": available,
                        "required": required,
                    })),
                )
                    .into_response();
            }
        }

        let status = match self.0.downcast_ref::<RepositoryError>() {
            Some(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
            Some(RepositoryError::AlreadyExists) => StatusCode::BAD_REQUEST,
            Some(RepositoryError::InvalidParameter(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "success": false, "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

fn admission_response(err: &AdmissionError) -> Response {
    match err {
        AdmissionError::SessionNotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": err.to_string() })),
        )
            .into_response(),
        AdmissionError::SessionInitializing => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": err.to_string(),
                "hint": "service-unavailable",
                "retryAfter": 5,
            })),
        )
            .into_response(),
        AdmissionError::SessionBad(_)
        | AdmissionError::InvalidRecipient(_)
        | AdmissionError::UnreachableRecipient(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": err.to_string() })),
        )
            .into_response(),
        AdmissionError::SubscriptionExceeded { reason } => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "error": err.to_string(),
                "reason": reason,
            })),
        )
            .into_response(),
        AdmissionError::RateLimited {
            window,
            limit,
            current,
        } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "success": false,
                "error": err.to_string(),
                "reason": window.reason_code(),
                "limit": limit,
                "current": current,
            })),
        )
            .into_response(),
        AdmissionError::InsufficientBalance {
            available,
            required,
        } => (
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({
                "success": false,
                "error": "Insufficient balance",
                "available": available,
                "required": required,
            })),
        )
            .into_response(),
        AdmissionError::SendFailed(_) | AdmissionError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": err.to_string() })),
        )
            .into_response(),
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
