// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::models::webhook::{GatewayEvent, Webhook, WebhookEventType};
use crate::domain::repositories::webhook_repository::WebhookRepository;

/// 一次待投递的Webhook调用
///
/// 扇出引擎组装载荷后入队，后台投递池负责重试与日志
#[derive(Debug, Clone)]
pub struct WebhookJob {
    pub webhook: Webhook,
    pub event_type: String,
    pub url: String,
    pub payload: Value,
}

/// Webhook扇出引擎
///
/// 负责订阅查询、URL选择与载荷组装；投递本身交给后台工作池，
/// 生产方调用即返回，不等待任何重试循环
pub struct WebhookFanout {
    webhook_repo: Arc<dyn WebhookRepository>,
    queue: mpsc::Sender<WebhookJob>,
}

impl WebhookFanout {
    pub fn new(webhook_repo: Arc<dyn WebhookRepository>, queue: mpsc::Sender<WebhookJob>) -> Self {
        Self {
            webhook_repo,
            queue,
        }
    }

    /// 发射事件（即发即忘）
    ///
    /// 订阅查询与入队在独立任务中进行，任何失败只记日志
    pub fn emit(self: &Arc<Self>, user_id: Uuid, session_id: &str, event: GatewayEvent) {
        let fanout = self.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = fanout.dispatch(user_id, &session_id, event).await {
                warn!("Webhook fan-out failed for session {}: {}", session_id, e);
            }
        });
    }

    /// 查询订阅并为每个命中的Webhook组装一次投递
    async fn dispatch(
        &self,
        user_id: Uuid,
        session_id: &str,
        event: GatewayEvent,
    ) -> anyhow::Result<()> {
        let types = subscription_types(&event);
        let webhooks = self
            .webhook_repo
            .find_active_for_event(user_id, session_id, &types)
            .await?;

        if webhooks.is_empty() {
            debug!(
                "No webhooks subscribed to {} for session {}",
                event.event_type(),
                session_id
            );
            return Ok(());
        }

        for webhook in webhooks {
            self.enqueue(webhook, &event).await;
        }
        Ok(())
    }

    /// 跳过订阅查询直接投递到指定Webhook（测试端点用）
    pub async fn dispatch_to(&self, webhook: Webhook, event: &GatewayEvent) {
        self.enqueue(webhook, event).await;
    }

    async fn enqueue(&self, webhook: Webhook, event: &GatewayEvent) {
        let url = webhook.delivery_url(event.success_flag()).to_string();
        let mut payload = event.base_payload();
        if let Some(ref custom) = webhook.custom_payload {
            deep_merge(&mut payload, custom);
        }

        let job = WebhookJob {
            event_type: event.event_type().to_string(),
            url,
            payload,
            webhook,
        };
        // 有界队列：投递池饱和时丢弃并记日志，不阻塞生产方
        if let Err(e) = self.queue.try_send(job) {
            warn!("Webhook delivery queue full, dropping event: {}", e);
            metrics::counter!("webhook_jobs_dropped_total").increment(1);
        }
    }
}

/// 事件命中的订阅类型集合
///
/// 入站消息同时命中其具体类型与通用 `incoming_message`；
/// 任何事件都命中 `all`。每个Webhook对一次事件至多收到一次投递
pub fn subscription_types(event: &GatewayEvent) -> Vec<WebhookEventType> {
    let specific = event.event_type();
    let mut types = vec![specific, WebhookEventType::All];
    if matches!(
        specific,
        WebhookEventType::IncomingText
            | WebhookEventType::IncomingMedia
            | WebhookEventType::IncomingLocation
    ) {
        types.insert(1, WebhookEventType::IncomingMessage);
    }
    types
}

/// 深合并：`overlay` 的键覆盖 `base` 中的同名键
///
/// 两侧均为对象时递归合并，否则整体替换
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_deep_merge_overlay_wins() {
        let mut base = json!({
            "event": "otp_sent",
            "meta": { "a": 1, "b": 2 },
        });
        let overlay = json!({
            "tenant": "acme",
            "meta": { "b": 3 },
        });
        deep_merge(&mut base, &overlay);
        assert_eq!(base["event"], "otp_sent");
        assert_eq!(base["tenant"], "acme");
        assert_eq!(base["meta"]["a"], 1);
        assert_eq!(base["meta"]["b"], 3);
    }

    #[test]
    fn test_subscription_types_for_incoming() {
        let event = GatewayEvent::IncomingText {
            from: "9647812345678".to_string(),
            text: "hello".to_string(),
            at: Utc::now(),
        };
        let types = subscription_types(&event);
        assert_eq!(
            types,
            vec![
                WebhookEventType::IncomingText,
                WebhookEventType::IncomingMessage,
                WebhookEventType::All,
            ]
        );
    }

    #[test]
    fn test_subscription_types_for_otp() {
        let event = GatewayEvent::OtpSent {
            recipient: "9647812345678".to_string(),
            code: "123456".to_string(),
        };
        assert_eq!(
            subscription_types(&event),
            vec![WebhookEventType::Otp, WebhookEventType::All]
        );
    }

    #[test]
    fn test_incoming_payload_shape() {
        let at = Utc::now();
        let event = GatewayEvent::IncomingText {
            from: "9647812345678".to_string(),
            text: "hello".to_string(),
            at,
        };
        let payload = event.base_payload();
        assert_eq!(payload["event"], "message_received");
        assert_eq!(payload["messageType"], "text");
        assert_eq!(payload["from"], "9647812345678");
        assert_eq!(payload["text"], "hello");
        assert!(payload["timestamp"].is_string());
    }
}
