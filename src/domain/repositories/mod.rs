// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 仓库接口定义了数据持久化的抽象契约，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 会话仓库（session_repository）：会话行与连接事件
/// - API密钥仓库（api_key_repository）：编程接口凭证
/// - 钱包仓库（wallet_repository）：余额与交易记录（事务内借贷）
/// - 订阅仓库（subscription_repository）：档位限额检查与用量累加
/// - 自动化日志仓库（automation_log_repository）：外发审计与限流计数
/// - Webhook仓库（webhook_repository）：事件订阅与累计统计
/// - Webhook日志仓库（webhook_log_repository）：逐次投递记录
/// - 投递跟踪仓库（delivery_repository）：送达/已读回执
/// - 限流设置仓库（rate_limit_repository）：每用户窗口限额
/// - 账号强度仓库（strength_repository）：强度指标
/// - 存储仓库（storage_repository）：认证目录的对象存储镜像
///
/// 这些接口确保了领域层不依赖于具体的数据存储技术，
/// 提高了系统的可测试性和可维护性.
pub mod api_key_repository;
pub mod automation_log_repository;
pub mod delivery_repository;
pub mod rate_limit_repository;
pub mod session_repository;
pub mod storage_repository;
pub mod strength_repository;
pub mod subscription_repository;
pub mod wallet_repository;
pub mod webhook_log_repository;
pub mod webhook_repository;
