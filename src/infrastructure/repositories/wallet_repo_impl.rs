// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::wallet::{WalletTransaction, WalletTransactionType};
use crate::domain::repositories::wallet_repository::{WalletRepository, WalletRepositoryError};
use crate::infrastructure::database::entities::{wallet, wallet_transaction};

/// 钱包仓库实现
///
/// 借贷操作在单个数据库事务内完成读取-校验-更新-记账；
/// Postgres后端对钱包行加排他锁作为最终仲裁
pub struct WalletRepositoryImpl {
    db: Arc<DatabaseConnection>,
    /// 首次使用时的初始余额
    initial_balance: i64,
}

impl WalletRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>, initial_balance: i64) -> Self {
        Self {
            db,
            initial_balance,
        }
    }

    /// 在事务内读取（必要时初始化）钱包行
    async fn load_or_create(
        &self,
        txn: &DatabaseTransaction,
        user_id: Uuid,
    ) -> Result<wallet::Model, WalletRepositoryError> {
        let mut query = wallet::Entity::find().filter(wallet::Column::UserId.eq(user_id));
        if self.db.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        let existing = query
            .one(txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        if let Some(model) = existing {
            return Ok(model);
        }

        let now = Utc::now().fixed_offset();
        let model = wallet::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            balance: Set(self.initial_balance),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = model
            .insert(txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        // 初始额度同样以交易记录入账，保证余额守恒可对账
        let initial_txn = wallet_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            session_id: Set(None),
            transaction_type: Set(WalletTransactionType::Initial.to_string()),
            amount: Set(self.initial_balance),
            balance_before: Set(0),
            balance_after: Set(self.initial_balance),
            description: Set("Initial wallet balance".to_string()),
            reference_id: Set(None),
            created_at: Set(now),
        };
        initial_txn
            .insert(txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        Ok(inserted)
    }

    async fn write_transaction_row(
        txn: &DatabaseTransaction,
        user_id: Uuid,
        session_id: Option<&str>,
        transaction_type: WalletTransactionType,
        amount: i64,
        balance_before: i64,
        balance_after: i64,
        description: String,
        reference_id: Option<String>,
    ) -> Result<(), WalletRepositoryError> {
        let row = wallet_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            session_id: Set(session_id.map(|s| s.to_string())),
            transaction_type: Set(transaction_type.to_string()),
            amount: Set(amount),
            balance_before: Set(balance_before),
            balance_after: Set(balance_after),
            description: Set(description),
            reference_id: Set(reference_id),
            created_at: Set(Utc::now().fixed_offset()),
        };
        row.insert(txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for WalletRepositoryImpl {
    async fn get_balance(&self, user_id: Uuid) -> Result<i64, WalletRepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;
        let model = self.load_or_create(&txn, user_id).await?;
        txn.commit()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;
        Ok(model.balance)
    }

    async fn deduct_wallet_balance(
        &self,
        user_id: Uuid,
        amount: i64,
        session_id: Option<&str>,
        description: String,
        reference_id: Option<String>,
    ) -> Result<i64, WalletRepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        let model = self.load_or_create(&txn, user_id).await?;
        if model.balance < amount {
            // 校验失败在任何变动之前返回，事务随drop回滚
            return Err(WalletRepositoryError::InsufficientBalance {
                available: model.balance,
                required: amount,
            });
        }

        let balance_before = model.balance;
        let balance_after = balance_before - amount;
        let mut active: wallet::ActiveModel = model.into();
        active.balance = Set(balance_after);
        active.updated_at = Set(Utc::now().fixed_offset());
        active
            .update(&txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        Self::write_transaction_row(
            &txn,
            user_id,
            session_id,
            WalletTransactionType::Debit,
            amount,
            balance_before,
            balance_after,
            description,
            reference_id,
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;
        Ok(balance_after)
    }

    async fn credit_wallet_balance(
        &self,
        user_id: Uuid,
        amount: i64,
        session_id: Option<&str>,
        transaction_type: WalletTransactionType,
        description: String,
        reference_id: Option<String>,
    ) -> Result<i64, WalletRepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        let model = self.load_or_create(&txn, user_id).await?;
        let balance_before = model.balance;
        let balance_after = balance_before + amount;
        let mut active: wallet::ActiveModel = model.into();
        active.balance = Set(balance_after);
        active.updated_at = Set(Utc::now().fixed_offset());
        active
            .update(&txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        Self::write_transaction_row(
            &txn,
            user_id,
            session_id,
            transaction_type,
            amount,
            balance_before,
            balance_after,
            description,
            reference_id,
        )
        .await?;

        txn.commit()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;
        Ok(balance_after)
    }

    async fn get_transaction_history(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<WalletTransaction>, WalletRepositoryError> {
        let mut query = wallet_transaction::Entity::find()
            .filter(wallet_transaction::Column::UserId.eq(user_id))
            .order_by_desc(wallet_transaction::Column::CreatedAt);
        if let Some(limit) = limit {
            query = query.limit(limit as u64);
        }
        let rows = query
            .all(self.db.as_ref())
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|t| WalletTransaction {
                id: t.id,
                user_id: t.user_id,
                session_id: t.session_id,
                transaction_type: t
                    .transaction_type
                    .parse()
                    .unwrap_or(WalletTransactionType::Credit),
                amount: t.amount,
                balance_before: t.balance_before,
                balance_after: t.balance_after,
                description: t.description,
                reference_id: t.reference_id,
                created_at: t.created_at.into(),
            })
            .collect())
    }
}
