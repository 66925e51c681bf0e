// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Deserialize;
use uuid::Uuid;

/// 仪表盘OTP发送请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpDto {
    pub user_id: Uuid,
    pub session_id: String,
    pub phone_number: String,
    pub otp_code: String,
    /// 语言 (ar, en)，默认阿拉伯语
    pub language: Option<String>,
}

/// 仪表盘群发请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAnnouncementDto {
    pub user_id: Uuid,
    pub session_id: String,
    pub recipients: Vec<String>,
    pub message: String,
}

/// 仪表盘测试消息请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMessageDto {
    pub user_id: Uuid,
    pub session_id: String,
    pub recipient: String,
    pub message: String,
}

/// 编程接口单发请求（会话由API密钥绑定）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V1SendDto {
    pub recipient: String,
    pub message: String,
}

/// 编程接口群发请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V1SendBulkDto {
    pub recipients: Vec<String>,
    pub message: String,
}

/// 编程接口OTP请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V1SendOtpDto {
    pub recipient: String,
    pub otp_code: String,
    pub language: Option<String>,
}

/// 充值请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopupDto {
    pub user_id: Uuid,
    pub amount: i64,
}

/// 订阅激活请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateSubscriptionDto {
    pub user_id: Uuid,
    pub tier: String,
}

/// 限流设置更新请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitSettingsDto {
    pub per_minute: i32,
    pub per_hour: i32,
    pub per_day: i32,
}
