// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 会话（session）：用户绑定的WhatsApp会话及其状态机
/// - API密钥（api_key）：会话级编程接口凭证
/// - 钱包（wallet）：预付费余额与交易记录
/// - 订阅（subscription）：档位限额与用量计数
/// - 自动化日志（automation_log）：外发尝试的审计与限流数据源
/// - 网络钩子（webhook）：事件订阅、投递日志与网关事件
/// - 限流（rate_limit）：每用户限流设置与窗口
/// - 投递跟踪（delivery）：消息送达/已读回执
///
/// 这些模型构成了系统的数据基础，定义了业务概念的
/// 结构和行为，是领域驱动设计的核心组成部分。
pub mod api_key;
pub mod automation_log;
pub mod delivery;
pub mod rate_limit;
pub mod session;
pub mod subscription;
pub mod wallet;
pub mod webhook;
