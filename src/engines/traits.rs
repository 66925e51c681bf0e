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

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// 工作器错误类型
///
/// 底层自动化库的各种失败在适配器内翻译为类型化错误，
/// 上层不做任何错误字符串匹配
#[derive(Error, Debug)]
pub enum WorkerError {
    /// 浏览器会话已关闭（终态，监管器随之断开）
    #[error("Session closed")]
    SessionClosed,
    /// 工作器尚未就绪
    #[error("Worker not ready")]
    NotReady,
    /// 号码无法解析为可寻址的聊天ID
    #[error("Recipient not reachable: {0}")]
    UnreachableRecipient(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 浏览器层错误
    #[error("Browser error: {0}")]
    Browser(String),
    /// 其他错误
    #[error("{0}")]
    Other(String),
}

/// 入站消息体
#[derive(Debug, Clone)]
pub enum MessageBody {
    Text(String),
    Media { media_type: String },
    Location { latitude: f64, longitude: f64 },
}

/// 入站消息
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// 发送方聊天ID（形如 `9647812345678@c.us`）
    pub from: String,
    pub body: MessageBody,
    pub timestamp: DateTime<Utc>,
}

/// 工作器事件
///
/// 每个监管器独占消费自己工作器的事件通道，按到达顺序处理
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// 新的QR码载荷
    Qr(String),
    /// 扫码认证通过
    Authenticated,
    /// 工作器就绪，携带账号手机号
    Ready { phone_number: String },
    /// 认证失败
    AuthFailure(String),
    /// 连接断开
    Disconnected(String),
    /// 入站消息
    Message(IncomingMessage),
    /// 消息回执（2=送达，3=已读）
    Ack { message_id: String, code: i32 },
}

/// WhatsApp浏览器工作器特质
///
/// 对嵌入式浏览器自动化客户端的不透明适配：初始化、号码解析、
/// 发送与状态查询。事件经构造时传入的通道异步交付
#[async_trait]
pub trait WhatsappWorker: Send + Sync {
    /// 开始初始化（非阻塞，进度以事件形式交付）
    async fn initialize(&mut self) -> Result<(), WorkerError>;

    /// 当前账号标识；认证完成前为空
    async fn identity(&self) -> Option<String>;

    /// 底层页面是否仍然打开（不可探测的实现恒返回true）
    async fn is_page_open(&self) -> bool;

    /// 把纯数字号码解析为工作器内部的聊天ID
    ///
    /// 返回 `None` 表示号码不可达
    async fn resolve_number(&self, digits: &str) -> Result<Option<String>, WorkerError>;

    /// 发送文本消息，返回不透明的消息ID
    async fn send_text(&self, chat_id: &str, body: &str) -> Result<String, WorkerError>;

    /// 查询聊天数量
    async fn get_chats(&self) -> Result<u32, WorkerError>;

    /// 查询联系人数量
    async fn get_contacts(&self) -> Result<u32, WorkerError>;

    /// 查询客户端连接状态字符串
    async fn get_state(&self) -> Result<String, WorkerError>;

    /// 拉取本账号的资料名
    async fn fetch_profile(&self) -> Result<Option<String>, WorkerError>;

    /// 登出并失效当前认证
    async fn logout(&self) -> Result<(), WorkerError>;

    /// 关闭浏览器进程，释放全部资源
    async fn shutdown(&mut self);
}

/// 工作器工厂特质
///
/// 注册表为每个新监管器构造一个工作器；测试注入脚本化实现
pub trait WorkerFactory: Send + Sync {
    fn create(
        &self,
        session_id: &str,
        auth_path: PathBuf,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Box<dyn WhatsappWorker>;
}
