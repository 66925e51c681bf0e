// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{
    WhatsappWorker, WorkerError, WorkerEvent, WorkerFactory,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// 脚本化工作器状态（测试用）
///
/// 工厂按模板为每个会话克隆一份；测试通过共享句柄
/// 注入事件、预置失败并断言已发送的消息
#[derive(Default)]
pub struct MockState {
    /// initialize 时按序发出的事件
    pub script: Vec<WorkerEvent>,
    /// 解析失败（不可达）的号码集合
    pub unreachable: HashSet<String>,
    /// 成功发送N条后开始返回 `SessionClosed`
    pub session_closed_after: Option<usize>,
    /// 已成功发送的 (聊天ID, 内容)
    pub sent: Vec<(String, String)>,
    pub identity: Option<String>,
    /// 事件通道，测试可借此在初始化后继续注入事件
    pub events_tx: Option<mpsc::Sender<WorkerEvent>>,
    pub chat_count: u32,
    pub contact_count: u32,
}

/// 脚本化工作器（测试用）
///
/// 与生产适配器走完全相同的特质边界
pub struct MockWorker {
    state: Arc<Mutex<MockState>>,
    events: mpsc::Sender<WorkerEvent>,
    open: bool,
}

#[async_trait]
impl WhatsappWorker for MockWorker {
    async fn initialize(&mut self) -> Result<(), WorkerError> {
        let script = {
            let mut state = self.state.lock().await;
            state.events_tx = Some(self.events.clone());
            state.script.drain(..).collect::<Vec<_>>()
        };
        for event in script {
            if let WorkerEvent::Ready { ref phone_number } = event {
                self.state.lock().await.identity = Some(phone_number.clone());
            }
            let _ = self.events.send(event).await;
        }
        Ok(())
    }

    async fn identity(&self) -> Option<String> {
        self.state.lock().await.identity.clone()
    }

    async fn is_page_open(&self) -> bool {
        self.open
    }

    async fn resolve_number(&self, digits: &str) -> Result<Option<String>, WorkerError> {
        let state = self.state.lock().await;
        if state.unreachable.contains(digits) {
            Ok(None)
        } else {
            Ok(Some(format!("{}@c.us", digits)))
        }
    }

    async fn send_text(&self, chat_id: &str, body: &str) -> Result<String, WorkerError> {
        let mut state = self.state.lock().await;
        if let Some(limit) = state.session_closed_after {
            if state.sent.len() >= limit {
                return Err(WorkerError::SessionClosed);
            }
        }
        state.sent.push((chat_id.to_string(), body.to_string()));
        Ok(format!("{}_{}", chat_id, state.sent.len()))
    }

    async fn get_chats(&self) -> Result<u32, WorkerError> {
        Ok(self.state.lock().await.chat_count)
    }

    async fn get_contacts(&self) -> Result<u32, WorkerError> {
        Ok(self.state.lock().await.contact_count)
    }

    async fn get_state(&self) -> Result<String, WorkerError> {
        Ok("CONNECTED".to_string())
    }

    async fn fetch_profile(&self) -> Result<Option<String>, WorkerError> {
        Ok(Some("mock".to_string()))
    }

    async fn logout(&self) -> Result<(), WorkerError> {
        self.state.lock().await.identity = None;
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.open = false;
    }
}

/// 脚本化工作器工厂（测试用）
///
/// 持有每个已创建会话的状态句柄，供测试注入与断言
#[derive(Default)]
pub struct MockWorkerFactory {
    template: std::sync::Mutex<MockTemplate>,
    pub states: DashMap<String, Arc<Mutex<MockState>>>,
}

#[derive(Default, Clone)]
pub struct MockTemplate {
    pub script: Vec<WorkerEvent>,
    pub unreachable: HashSet<String>,
    pub session_closed_after: Option<usize>,
    pub chat_count: u32,
    pub contact_count: u32,
}

impl MockWorkerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置后续创建的工作器模板
    pub fn set_template(&self, template: MockTemplate) {
        *self.template.lock().unwrap() = template;
    }

    /// 取某个会话的状态句柄
    pub fn state_of(&self, session_id: &str) -> Option<Arc<Mutex<MockState>>> {
        self.states.get(session_id).map(|s| s.clone())
    }
}

impl WorkerFactory for MockWorkerFactory {
    fn create(
        &self,
        session_id: &str,
        _auth_path: PathBuf,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Box<dyn WhatsappWorker> {
        let template = self.template.lock().unwrap().clone();
        let state = Arc::new(Mutex::new(MockState {
            script: template.script,
            unreachable: template.unreachable,
            session_closed_after: template.session_closed_after,
            sent: Vec::new(),
            identity: None,
            events_tx: None,
            chat_count: template.chat_count,
            contact_count: template.contact_count,
        }));
        self.states.insert(session_id.to_string(), state.clone());
        Box::new(MockWorker {
            state,
            events,
            open: true,
        })
    }
}
