// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, gauge};
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// 熔断器配置
#[derive(Clone, Debug)]
pub struct CircuitConfig {
    /// 失败阈值
    pub failure_threshold: u32,
    /// 恢复超时时间
    pub recovery_timeout: Duration,
    /// 失败时间窗口
    pub failure_window: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            failure_window: Duration::from_secs(60),
        }
    }
}

/// 熔断器状态
#[derive(Clone, Debug)]
struct CircuitState {
    status: Status,
    failure_timestamps: VecDeque<Instant>,
    last_failure: Option<Instant>,
    total_requests: u64,
    total_failures: u64,
    total_successes: u64,
}

impl CircuitState {
    fn new() -> Self {
        Self {
            status: Status::Closed,
            failure_timestamps: VecDeque::new(),
            last_failure: None,
            total_requests: 0,
            total_failures: 0,
            total_successes: 0,
        }
    }
}

/// 熔断器状态枚举
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Status {
    /// 关闭状态
    Closed,
    /// 打开状态
    Open,
    /// 半开状态
    HalfOpen,
}

/// 熔断器统计信息
#[derive(Clone, Debug, Default)]
pub struct CircuitStats {
    pub is_open: bool,
    pub failure_count: u32,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
}

/// 投递目标熔断器
///
/// 按Webhook目标URL隔离故障端点，防止重试风暴拖垮投递池
#[derive(Clone)]
pub struct CircuitBreaker {
    states: Arc<RwLock<HashMap<String, CircuitState>>>,
    config: CircuitConfig,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            config: CircuitConfig::default(),
        }
    }

    pub fn with_config(config: CircuitConfig) -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// 检查目标的熔断器是否打开
    ///
    /// # 参数
    ///
    /// * `destination` - 目标URL
    ///
    /// # 返回值
    ///
    /// 如果熔断器打开则返回true，否则返回false
    pub fn is_open(&self, destination: &str) -> bool {
        let mut states = self.states.write().unwrap();
        let state = states
            .entry(destination.to_string())
            .or_insert_with(CircuitState::new);

        match state.status {
            Status::Closed => false,
            Status::Open => {
                if let Some(last_failure) = state.last_failure {
                    if last_failure.elapsed() > self.config.recovery_timeout {
                        state.status = Status::HalfOpen;
                        self.update_status_metric(destination, Status::HalfOpen);
                        return false;
                    }
                }
                counter!("webhook_circuit_rejected_total", "destination" => destination.to_string())
                    .increment(1);
                true
            }
            Status::HalfOpen => false,
        }
    }

    /// 记录投递成功
    pub fn record_success(&self, destination: &str) {
        let mut states = self.states.write().unwrap();
        if let Some(state) = states.get_mut(destination) {
            state.total_requests += 1;
            state.total_successes += 1;

            if state.status == Status::HalfOpen {
                state.status = Status::Closed;
                state.failure_timestamps.clear();
                self.update_status_metric(destination, Status::Closed);
            }
        }
    }

    /// 记录投递失败
    pub fn record_failure(&self, destination: &str) {
        let mut states = self.states.write().unwrap();
        let state = states
            .entry(destination.to_string())
            .or_insert_with(CircuitState::new);

        let now = Instant::now();
        state.total_requests += 1;
        state.total_failures += 1;
        state.last_failure = Some(now);
        state.failure_timestamps.push_back(now);

        // 移除超出时间窗口的失败记录
        while let Some(front) = state.failure_timestamps.front() {
            if now.duration_since(*front) > self.config.failure_window {
                state.failure_timestamps.pop_front();
            } else {
                break;
            }
        }

        match state.status {
            Status::Closed => {
                if state.failure_timestamps.len() >= self.config.failure_threshold as usize {
                    state.status = Status::Open;
                    self.update_status_metric(destination, Status::Open);
                }
            }
            Status::HalfOpen => {
                state.status = Status::Open;
                self.update_status_metric(destination, Status::Open);
            }
            Status::Open => {}
        }
    }

    /// 获取目标的熔断统计信息
    pub fn get_stats(&self, destination: &str) -> CircuitStats {
        let states = self.states.read().unwrap();
        if let Some(state) = states.get(destination) {
            CircuitStats {
                is_open: state.status == Status::Open,
                failure_count: state.failure_timestamps.len() as u32,
                total_requests: state.total_requests,
                total_failures: state.total_failures,
                total_successes: state.total_successes,
            }
        } else {
            CircuitStats::default()
        }
    }

    fn update_status_metric(&self, destination: &str, status: Status) {
        let val = match status {
            Status::Closed => 0.0,
            Status::Open => 1.0,
            Status::HalfOpen => 0.5,
        };
        gauge!("webhook_circuit_status", "destination" => destination.to_string()).set(val);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::with_config(CircuitConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_secs(30),
            failure_window: Duration::from_secs(60),
        });
        let dest = "http://example.com/hook";

        assert!(!breaker.is_open(dest));
        breaker.record_failure(dest);
        breaker.record_failure(dest);
        assert!(!breaker.is_open(dest));
        breaker.record_failure(dest);
        assert!(breaker.is_open(dest));
    }

    #[test]
    fn test_half_open_recovers_on_success() {
        let breaker = CircuitBreaker::with_config(CircuitConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_millis(0),
            failure_window: Duration::from_secs(60),
        });
        let dest = "http://example.com/hook";

        breaker.record_failure(dest);
        // 恢复超时为0，下一次检查转入半开
        assert!(!breaker.is_open(dest));
        breaker.record_success(dest);
        assert!(!breaker.is_open(dest));
        assert!(!breaker.get_stats(dest).is_open);
    }

    #[test]
    fn test_destinations_are_isolated() {
        let breaker = CircuitBreaker::with_config(CircuitConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(30),
            failure_window: Duration::from_secs(60),
        });
        breaker.record_failure("http://a.example.com");
        assert!(breaker.is_open("http://a.example.com"));
        assert!(!breaker.is_open("http://b.example.com"));
    }
}
