// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::wallet::{WalletTransaction, WalletTransactionType};

#[derive(Error, Debug)]
pub enum WalletRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },
    #[error("Wallet not found for user: {0}")]
    WalletNotFound(Uuid),
}

/// 钱包仓库特质
///
/// 余额读取-校验-扣减-记账必须在同一个数据库事务中完成，
/// Postgres后端对钱包行加 `FOR UPDATE` 锁
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// 读取余额；钱包不存在时以初始额度创建
    async fn get_balance(&self, user_id: Uuid) -> Result<i64, WalletRepositoryError>;

    /// 扣减余额并写入一条借记交易
    ///
    /// 余额不足时在任何变动发生之前失败
    async fn deduct_wallet_balance(
        &self,
        user_id: Uuid,
        amount: i64,
        session_id: Option<&str>,
        description: String,
        reference_id: Option<String>,
    ) -> Result<i64, WalletRepositoryError>;

    /// 增加余额并写入一条贷记交易，返回新余额
    async fn credit_wallet_balance(
        &self,
        user_id: Uuid,
        amount: i64,
        session_id: Option<&str>,
        transaction_type: WalletTransactionType,
        description: String,
        reference_id: Option<String>,
    ) -> Result<i64, WalletRepositoryError>;

    /// 查询交易历史（按时间倒序）
    async fn get_transaction_history(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<WalletTransaction>, WalletRepositoryError>;
}
