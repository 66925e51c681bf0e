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

use chrono::Utc;
use metrics::{counter, histogram};
use reqwest::{header, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::models::webhook::WebhookLog;
use crate::domain::repositories::webhook_log_repository::WebhookLogRepository;
use crate::domain::repositories::webhook_repository::WebhookRepository;
use crate::domain::services::webhook_service::WebhookJob;
use crate::workers::circuit_breaker::CircuitBreaker;

/// 响应体保留的前缀长度
const RESPONSE_BODY_PREFIX: usize = 512;

/// 单次投递请求的超时
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook投递工作器
///
/// 固定数量的后台任务消费有界队列；同一事件的第1..N次尝试
/// 在单个工作器内串行，目标级熔断器隔离持续故障的端点
#[derive(Clone)]
pub struct WebhookWorker {
    webhook_repo: Arc<dyn WebhookRepository>,
    log_repo: Arc<dyn WebhookLogRepository>,
    breaker: CircuitBreaker,
    client: Client,
}

impl WebhookWorker {
    /// 创建新的Webhook投递工作器实例
    ///
    /// # 参数
    ///
    /// * `webhook_repo` - Webhook仓库（统计更新）
    /// * `log_repo` - 投递日志仓库
    /// * `user_agent` - 投递请求的User-Agent
    pub fn new(
        webhook_repo: Arc<dyn WebhookRepository>,
        log_repo: Arc<dyn WebhookLogRepository>,
        user_agent: &str,
    ) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(user_agent)
                .unwrap_or_else(|_| header::HeaderValue::from_static("Wassrs-Webhook/0.1.0")),
        );
        Self {
            webhook_repo,
            log_repo,
            breaker: CircuitBreaker::new(),
            client: Client::builder()
                .default_headers(headers)
                .build()
                .expect("reqwest client build"),
        }
    }

    /// 启动投递池
    ///
    /// 返回入队端；`pool_size` 个工作器共享消费同一队列
    pub fn spawn_pool(self, pool_size: usize, queue_capacity: usize) -> mpsc::Sender<WebhookJob> {
        let (tx, rx) = mpsc::channel::<WebhookJob>(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..pool_size.max(1) {
            let worker = self.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                info!("Webhook delivery worker {} started", worker_id);
                loop {
                    let job = { rx.lock().await.recv().await };
                    match job {
                        Some(job) => worker.deliver(job).await,
                        None => break,
                    }
                }
                info!("Webhook delivery worker {} stopped", worker_id);
            });
        }
        tx
    }

    /// 投递一个作业：按重试策略尝试，逐次写日志，最终更新统计
    async fn deliver(&self, job: WebhookJob) {
        if self.breaker.is_open(&job.url) {
            warn!(
                "Circuit open for {}, skipping delivery of {}",
                job.url, job.event_type
            );
            self.append_log(&job, None, None, false, Some("circuit breaker open"), 1, false)
                .await;
            self.finish(&job.webhook.id, false).await;
            return;
        }

        let max_attempts = if job.webhook.retry_on_failure {
            job.webhook.max_retries.max(1)
        } else {
            1
        };
        let delay = Duration::from_secs(job.webhook.retry_delay_seconds.max(0) as u64);

        let mut delivered = false;
        for attempt in 1..=max_attempts {
            counter!("webhook_delivery_attempts_total").increment(1);
            let start = std::time::Instant::now();
            let outcome = self.attempt(&job).await;
            histogram!("webhook_delivery_duration_seconds")
                .record(start.elapsed().as_secs_f64());

            match outcome {
                Ok((status, body)) if (200..300).contains(&status) => {
                    self.append_log(&job, Some(status), Some(&body), true, None, attempt, attempt > 1)
                        .await;
                    delivered = true;
                    break;
                }
                Ok((status, body)) => {
                    warn!(
                        "Webhook {} attempt {} returned status {}",
                        job.webhook.id, attempt, status
                    );
                    self.append_log(
                        &job,
                        Some(status),
                        Some(&body),
                        false,
                        Some(&format!("non-success status {}", status)),
                        attempt,
                        attempt > 1,
                    )
                    .await;
                }
                Err(e) => {
                    warn!("Webhook {} attempt {} failed: {}", job.webhook.id, attempt, e);
                    self.append_log(&job, None, None, false, Some(&e.to_string()), attempt, attempt > 1)
                        .await;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        if delivered {
            self.breaker.record_success(&job.url);
            counter!("webhook_delivery_success_total").increment(1);
        } else {
            self.breaker.record_failure(&job.url);
            counter!("webhook_delivery_failed_total").increment(1);
        }
        self.finish(&job.webhook.id, delivered).await;
    }

    async fn attempt(&self, job: &WebhookJob) -> anyhow::Result<(i32, String)> {
        // 用户自定义头合并在默认头之上，同名时覆盖而非追加
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        if let Some(ref custom) = job.webhook.headers {
            for (name, value) in custom {
                let name: header::HeaderName = match name.parse() {
                    Ok(name) => name,
                    Err(_) => continue,
                };
                let Ok(value) = header::HeaderValue::from_str(value) else {
                    continue;
                };
                headers.insert(name, value);
            }
        }

        let response = self
            .client
            .post(&job.url)
            .headers(headers)
            .timeout(DELIVERY_TIMEOUT)
            .json(&job.payload)
            .send()
            .await?;
        let status = response.status().as_u16() as i32;
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    #[allow(clippy::too_many_arguments)]
    async fn append_log(
        &self,
        job: &WebhookJob,
        response_status: Option<i32>,
        response_body: Option<&str>,
        success: bool,
        error_message: Option<&str>,
        attempt_number: i32,
        is_retry: bool,
    ) {
        let log = WebhookLog {
            id: Uuid::new_v4(),
            webhook_id: job.webhook.id,
            event_type: job.event_type.clone(),
            payload: job.payload.clone(),
            response_status,
            response_body: response_body.map(|b| b.chars().take(RESPONSE_BODY_PREFIX).collect()),
            success,
            error_message: error_message.map(|e| e.to_string()),
            attempt_number,
            is_retry,
            created_at: Utc::now(),
        };
        if let Err(e) = self.log_repo.append(&log).await {
            error!("Failed to persist webhook log: {}", e);
        }
    }

    async fn finish(&self, webhook_id: &Uuid, success: bool) {
        if let Err(e) = self
            .webhook_repo
            .update_webhook_stats(*webhook_id, success)
            .await
        {
            error!("Failed to update webhook stats: {}", e);
        }
    }
}
