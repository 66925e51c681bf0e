// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// 创建Webhook订阅请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookDto {
    pub session_id: String,
    /// 事件类型 (otp, announcement, incoming_text, ..., all)
    pub webhook_type: String,
    pub url: String,
    pub success_webhook_url: Option<String>,
    pub failure_webhook_url: Option<String>,
    pub custom_payload: Option<Value>,
    pub headers: Option<HashMap<String, String>>,
    pub max_retries: Option<i32>,
    pub retry_delay_seconds: Option<i32>,
    pub retry_on_failure: Option<bool>,
}

/// 更新Webhook订阅请求（全部字段可选）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebhookDto {
    pub url: Option<String>,
    pub success_webhook_url: Option<String>,
    pub failure_webhook_url: Option<String>,
    pub custom_payload: Option<Value>,
    pub headers: Option<HashMap<String, String>>,
    pub max_retries: Option<i32>,
    pub retry_delay_seconds: Option<i32>,
    pub retry_on_failure: Option<bool>,
    pub is_active: Option<bool>,
}
