// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API密钥实体
///
/// 一条密钥绑定一个会话，授权针对该会话的所有编程接口调用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    /// 密钥字符串，形如 `wass_<base64url>`，全局唯一
    pub key: String,
    /// 配套的独立随机密文
    #[serde(skip_serializing)]
    pub secret: String,
    pub user_id: Uuid,
    pub session_id: String,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
}

/// 生成新的API密钥字符串
///
/// `wass_` 前缀加32字节随机数的URL安全base64编码
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    format!("wass_{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// 生成独立的API密文
pub fn generate_api_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shape() {
        let key = generate_api_key();
        assert!(key.starts_with("wass_"));
        // 32字节 base64url 无填充编码为43个字符
        assert_eq!(key.len(), 5 + 43);
    }

    #[test]
    fn test_keys_are_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_ne!(a, b);
        assert_ne!(generate_api_secret(), generate_api_secret());
    }
}
