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

use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::engines::traits::WorkerFactory;
use crate::workers::session_supervisor::{SessionSupervisor, SupervisorDeps, SupervisorHandle};

/// 进程级会话目录
///
/// 键为会话ID，值为监管器句柄；写入只发生在创建与终态移除
pub type ClientMap = Arc<DashMap<String, Arc<SupervisorHandle>>>;

/// 会话注册表
///
/// 每个会话ID至多一个监管器；`get` 无锁，
/// `create_if_absent` 经entry接口单飞创建
pub struct SessionRegistry {
    clients: ClientMap,
    worker_factory: Arc<dyn WorkerFactory>,
    deps: SupervisorDeps,
}

impl SessionRegistry {
    pub fn new(worker_factory: Arc<dyn WorkerFactory>, deps: SupervisorDeps) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            worker_factory,
            deps,
        }
    }

    /// 查询会话的监管器句柄
    pub fn get(&self, session_id: &str) -> Option<Arc<SupervisorHandle>> {
        self.clients.get(session_id).map(|h| h.clone())
    }

    /// 当前注册的监管器数量
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// 原子地获取或创建监管器
    ///
    /// 竞争创建时只有一个胜出，其余拿到同一个句柄。
    /// `restored` 标记恢复路径（更短的初始化期限）
    pub fn create_if_absent(
        &self,
        session_id: &str,
        user_id: Uuid,
        restored: bool,
    ) -> Arc<SupervisorHandle> {
        self.clients
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!(
                    "Spawning supervisor for session {} (restored: {})",
                    session_id, restored
                );
                SessionSupervisor::spawn(
                    session_id.to_string(),
                    user_id,
                    restored,
                    &self.worker_factory,
                    self.deps.clone(),
                    self.clients.clone(),
                )
            })
            .clone()
    }

    /// 移除会话的注册表项（只应在终态调用）
    pub fn remove(&self, session_id: &str) {
        self.clients.remove(session_id);
    }
}
