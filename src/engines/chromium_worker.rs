// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{
    IncomingMessage, MessageBody, WhatsappWorker, WorkerError, WorkerEvent, WorkerFactory,
};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use chrono::Utc;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, RwLock};

/// 容器化沙箱运行所需的固定进程参数
const BROWSER_ARGS: [&str; 6] = [
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--no-first-run",
    "--mute-audio",
];

/// 未显式配置时依次探测的Linux浏览器路径
const BROWSER_PATHS: [&str; 5] = [
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
];

const WHATSAPP_WEB_URL: &str = "https://web.whatsapp.com";

/// 页面状态探针
///
/// 返回 {phase, qr, phone} 的JSON，由事件泵轮询求值
const PROBE_SCRIPT: &str = r#"
(() => {
    const hook = window.__wass_hook || {};
    const qrEl = document.querySelector('div[data-ref]');
    if (qrEl) {
        return JSON.stringify({ phase: 'qr', qr: qrEl.getAttribute('data-ref'), phone: null });
    }
    if (hook.ready && hook.phone) {
        return JSON.stringify({ phase: 'ready', qr: null, phone: hook.phone });
    }
    if (hook.authenticated || document.querySelector('#app [data-testid], #app [role="grid"]')) {
        return JSON.stringify({ phase: 'authenticated', qr: null, phone: hook.phone || null });
    }
    return JSON.stringify({ phase: 'loading', qr: null, phone: null });
})()
"#;

/// 排空页面侧事件缓冲（入站消息与回执）
const DRAIN_SCRIPT: &str = r#"
(() => {
    const hook = window.__wass_hook;
    if (!hook || !hook.queue) { return '[]'; }
    const out = JSON.stringify(hook.queue);
    hook.queue = [];
    return out;
})()
"#;

#[derive(Debug, Clone, serde::Deserialize)]
struct ProbeState {
    phase: String,
    qr: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct HookEvent {
    kind: String,
    from: Option<String>,
    body: Option<String>,
    media_type: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    message_id: Option<String>,
    ack: Option<i32>,
}

/// Chromium工作器
///
/// 基于chromiumoxide驱动WhatsApp Web页面的浏览器自动化适配器。
/// 每个会话独占一个浏览器进程，认证目录即浏览器的用户数据目录
pub struct ChromiumWorker {
    session_id: String,
    auth_path: PathBuf,
    binary_path: Option<PathBuf>,
    events: mpsc::Sender<WorkerEvent>,
    browser: Arc<Mutex<Option<Browser>>>,
    page: Arc<RwLock<Option<Page>>>,
    identity: Arc<RwLock<Option<String>>>,
}

impl ChromiumWorker {
    pub fn new(
        session_id: String,
        auth_path: PathBuf,
        binary_path: Option<PathBuf>,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Self {
        Self {
            session_id,
            auth_path,
            binary_path,
            events,
            browser: Arc::new(Mutex::new(None)),
            page: Arc::new(RwLock::new(None)),
            identity: Arc::new(RwLock::new(None)),
        }
    }

    /// 定位浏览器可执行文件
    fn find_browser_binary(&self) -> Result<PathBuf, WorkerError> {
        if let Some(ref path) = self.binary_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(WorkerError::Browser(format!(
                "configured browser binary not found: {}",
                path.display()
            )));
        }
        BROWSER_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .ok_or_else(|| WorkerError::Browser("no browser binary found".to_string()))
    }

    /// 在页面上求值并把底层错误翻译为类型化错误
    ///
    /// 页面或浏览器进程消失统一归类为 `SessionClosed`
    async fn eval(&self, script: &str) -> Result<String, WorkerError> {
        let guard = self.page.read().await;
        let page = guard.as_ref().ok_or(WorkerError::NotReady)?;
        let result = page
            .evaluate(script)
            .await
            .map_err(translate_browser_error)?;
        result
            .into_value::<String>()
            .map_err(|e| WorkerError::Other(e.to_string()))
    }

    async fn run_event_pump(
        session_id: String,
        page: Arc<RwLock<Option<Page>>>,
        identity: Arc<RwLock<Option<String>>>,
        events: mpsc::Sender<WorkerEvent>,
    ) {
        let mut last_phase = String::from("loading");
        let mut last_qr: Option<String> = None;

        loop {
            tokio::time::sleep(Duration::from_secs(2)).await;

            let guard = page.read().await;
            let Some(page_ref) = guard.as_ref() else {
                break;
            };

            let probe = match page_ref.evaluate(PROBE_SCRIPT).await {
                Ok(v) => v.into_value::<String>().ok(),
                Err(e) => {
                    tracing::warn!("Probe failed for session {}: {}", session_id, e);
                    let _ = events
                        .send(WorkerEvent::Disconnected(e.to_string()))
                        .await;
                    break;
                }
            };
            drop(guard);

            let Some(state) = probe.and_then(|s| serde_json::from_str::<ProbeState>(&s).ok())
            else {
                continue;
            };

            match state.phase.as_str() {
                "qr" => {
                    if let Some(qr) = state.qr {
                        if last_qr.as_deref() != Some(qr.as_str()) {
                            last_qr = Some(qr.clone());
                            let _ = events.send(WorkerEvent::Qr(qr)).await;
                        }
                    }
                    last_phase = "qr".to_string();
                }
                "authenticated" => {
                    if last_phase != "authenticated" && last_phase != "ready" {
                        let _ = events.send(WorkerEvent::Authenticated).await;
                    }
                    last_phase = "authenticated".to_string();
                }
                "ready" => {
                    if last_phase != "ready" {
                        if let Some(phone) = state.phone.clone() {
                            *identity.write().await = Some(phone.clone());
                            let _ = events
                                .send(WorkerEvent::Ready {
                                    phone_number: phone,
                                })
                                .await;
                        }
                    }
                    last_phase = "ready".to_string();
                }
                _ => {}
            }

            // 就绪后排空页面侧的消息与回执缓冲
            if last_phase == "ready" {
                Self::drain_hook_events(&session_id, &page, &events).await;
            }
        }
    }

    async fn drain_hook_events(
        session_id: &str,
        page: &Arc<RwLock<Option<Page>>>,
        events: &mpsc::Sender<WorkerEvent>,
    ) {
        let guard = page.read().await;
        let Some(page_ref) = guard.as_ref() else {
            return;
        };
        let drained = match page_ref.evaluate(DRAIN_SCRIPT).await {
            Ok(v) => v.into_value::<String>().unwrap_or_else(|_| "[]".to_string()),
            Err(e) => {
                tracing::debug!("Drain failed for session {}: {}", session_id, e);
                return;
            }
        };
        drop(guard);

        let hook_events: Vec<HookEvent> = serde_json::from_str(&drained).unwrap_or_default();
        for ev in hook_events {
            match ev.kind.as_str() {
                "message" => {
                    let Some(from) = ev.from else { continue };
                    let body = if let Some(text) = ev.body {
                        MessageBody::Text(text)
                    } else if let (Some(lat), Some(lon)) = (ev.latitude, ev.longitude) {
                        MessageBody::Location {
                            latitude: lat,
                            longitude: lon,
                        }
                    } else if let Some(media_type) = ev.media_type {
                        MessageBody::Media { media_type }
                    } else {
                        continue;
                    };
                    let _ = events
                        .send(WorkerEvent::Message(IncomingMessage {
                            from,
                            body,
                            timestamp: Utc::now(),
                        }))
                        .await;
                }
                "ack" => {
                    if let (Some(message_id), Some(code)) = (ev.message_id, ev.ack) {
                        let _ = events.send(WorkerEvent::Ack { message_id, code }).await;
                    }
                }
                other => {
                    tracing::debug!("Unknown hook event kind: {}", other);
                }
            }
        }
    }
}

/// 把chromiumoxide错误翻译为类型化的工作器错误
///
/// 上层只依赖 `WorkerError::SessionClosed`，不做字符串嗅探
fn translate_browser_error(err: chromiumoxide::error::CdpError) -> WorkerError {
    let text = err.to_string();
    if text.contains("Session closed")
        || text.contains("Connection is closed")
        || text.contains("Target closed")
    {
        WorkerError::SessionClosed
    } else {
        WorkerError::Browser(text)
    }
}

#[async_trait]
impl WhatsappWorker for ChromiumWorker {
    async fn initialize(&mut self) -> Result<(), WorkerError> {
        let binary = self.find_browser_binary()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&binary)
            .user_data_dir(&self.auth_path)
            .no_sandbox()
            .request_timeout(Duration::from_secs(30));
        for arg in BROWSER_ARGS {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| WorkerError::Browser(e.to_string()))?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(translate_browser_error)?;

        // 浏览器事件循环，退出即进程终止
        tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page(WHATSAPP_WEB_URL)
            .await
            .map_err(translate_browser_error)?;

        *self.browser.lock().await = Some(browser);
        *self.page.write().await = Some(page);

        tokio::spawn(Self::run_event_pump(
            self.session_id.clone(),
            self.page.clone(),
            self.identity.clone(),
            self.events.clone(),
        ));

        Ok(())
    }

    async fn identity(&self) -> Option<String> {
        self.identity.read().await.clone()
    }

    async fn is_page_open(&self) -> bool {
        self.page.read().await.is_some()
    }

    async fn resolve_number(&self, digits: &str) -> Result<Option<String>, WorkerError> {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(None);
        }
        let script = format!(
            "window.__wass_hook && window.__wass_hook.resolve ? window.__wass_hook.resolve('{}') : ''",
            digits
        );
        let resolved = self.eval(&script).await?;
        if resolved.is_empty() {
            Ok(None)
        } else {
            Ok(Some(resolved))
        }
    }

    async fn send_text(&self, chat_id: &str, body: &str) -> Result<String, WorkerError> {
        let payload = serde_json::to_string(body).map_err(|e| WorkerError::Other(e.to_string()))?;
        let script = format!(
            "window.__wass_hook.send('{}', {})",
            chat_id, payload
        );
        let message_id = self.eval(&script).await?;
        if message_id.is_empty() {
            return Err(WorkerError::Other("send returned no message id".to_string()));
        }
        Ok(message_id)
    }

    async fn get_chats(&self) -> Result<u32, WorkerError> {
        let count = self
            .eval("String(window.__wass_hook ? window.__wass_hook.chatCount() : 0)")
            .await?;
        count
            .parse()
            .map_err(|_| WorkerError::Other("bad chat count".to_string()))
    }

    async fn get_contacts(&self) -> Result<u32, WorkerError> {
        let count = self
            .eval("String(window.__wass_hook ? window.__wass_hook.contactCount() : 0)")
            .await?;
        count
            .parse()
            .map_err(|_| WorkerError::Other("bad contact count".to_string()))
    }

    async fn get_state(&self) -> Result<String, WorkerError> {
        self.eval("window.__wass_hook ? window.__wass_hook.state() : 'UNKNOWN'")
            .await
    }

    async fn fetch_profile(&self) -> Result<Option<String>, WorkerError> {
        let name = self
            .eval("window.__wass_hook && window.__wass_hook.profileName ? window.__wass_hook.profileName() : ''")
            .await?;
        Ok(if name.is_empty() { None } else { Some(name) })
    }

    async fn logout(&self) -> Result<(), WorkerError> {
        let _ = self
            .eval("window.__wass_hook && window.__wass_hook.logout ? window.__wass_hook.logout() : ''")
            .await;
        Ok(())
    }

    async fn shutdown(&mut self) {
        *self.page.write().await = None;
        if let Some(mut browser) = self.browser.lock().await.take() {
            if let Err(e) = browser.close().await {
                tracing::debug!("Browser close for session {} failed: {}", self.session_id, e);
            }
        }
    }
}

/// Chromium工作器工厂
pub struct ChromiumWorkerFactory {
    binary_path: Option<PathBuf>,
}

impl ChromiumWorkerFactory {
    pub fn new(binary_path: Option<PathBuf>) -> Self {
        Self { binary_path }
    }
}

impl WorkerFactory for ChromiumWorkerFactory {
    fn create(
        &self,
        session_id: &str,
        auth_path: PathBuf,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Box<dyn WhatsappWorker> {
        Box::new(ChromiumWorker::new(
            session_id.to_string(),
            auth_path,
            self.binary_path.clone(),
            events,
        ))
    }
}
