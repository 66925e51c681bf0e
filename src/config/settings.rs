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

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// 应用程序配置设置
///
/// 包含数据库、对象存储、服务器、浏览器、计费和Webhook等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 对象存储配置
    pub object_storage: ObjectStorageSettings,
    /// 浏览器工作器配置
    pub browser: BrowserSettings,
    /// 计费配置
    pub billing: BillingSettings,
    /// Webhook投递配置
    pub webhook: WebhookSettings,
    /// 仪表盘前端地址（CORS提示用，可选）
    pub client_url: Option<String>,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 对象存储配置设置
#[derive(Debug, Deserialize)]
pub struct ObjectStorageSettings {
    /// 存储后端 (supabase, local, memory)
    pub backend: String,
    /// 存储服务URL (backend=supabase 时使用)
    pub url: Option<String>,
    /// 服务密钥 (backend=supabase 时使用)
    pub service_key: Option<String>,
    /// 存储桶名称
    pub bucket: String,
    /// 本地存储路径 (backend=local 时使用)
    pub local_path: Option<String>,
}

/// 浏览器工作器配置设置
#[derive(Debug, Deserialize)]
pub struct BrowserSettings {
    /// 浏览器可执行文件路径；缺省时探测固定的Linux路径列表
    pub binary_path: Option<String>,
    /// 会话认证目录的本地根路径
    pub auth_root: String,
}

/// 计费配置设置
#[derive(Debug, Deserialize)]
pub struct BillingSettings {
    /// 每条消息的费用（IQD）
    pub cost_per_message: i64,
    /// 钱包首次使用时的初始余额（IQD）
    pub initial_balance: i64,
}

/// Webhook投递配置设置
#[derive(Debug, Deserialize)]
pub struct WebhookSettings {
    /// 后台投递工作器数量
    pub pool_size: usize,
    /// 投递队列容量
    pub queue_capacity: usize,
    /// 投递请求的User-Agent
    pub user_agent: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            // Default DB pool settings
            .set_default("database.url", "sqlite::memory:")?
            .set_default("database.max_connections", 50)?
            .set_default("database.min_connections", 5)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default object storage settings
            .set_default("object_storage.backend", "local")?
            .set_default("object_storage.bucket", "whatsapp-sessions")?
            .set_default("object_storage.local_path", "./storage")?
            // Default browser settings
            .set_default("browser.auth_root", "./wa-auth")?
            // Default billing settings
            .set_default("billing.cost_per_message", 10)?
            .set_default("billing.initial_balance", 1000)?
            // Default webhook delivery settings
            .set_default("webhook.pool_size", 4)?
            .set_default("webhook.queue_capacity", 1024)?
            .set_default("webhook.user_agent", "Wassrs-Webhook/0.1.0")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("WASSRS").separator("__"));

        // 裸PORT环境变量优先于默认端口（部署平台惯例）
        let builder = match std::env::var("PORT").ok().and_then(|p| p.parse::<i64>().ok()) {
            Some(port) => builder.set_override("server.port", port)?,
            None => builder,
        };

        builder.build()?.try_deserialize()
    }
}
