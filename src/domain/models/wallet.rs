// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 钱包实体
///
/// 每个用户一条记录，余额以伊拉克第纳尔（IQD）计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 钱包交易记录
///
/// 余额只允许通过写入交易记录的借记/贷记操作变动
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    /// 关联的会话（发送类交易才有）
    pub session_id: Option<String>,
    pub transaction_type: WalletTransactionType,
    /// 交易金额（始终为正数，方向由类型决定）
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: String,
    /// 对账引用，退款交易以 `refund_` 前缀指向原始扣费
    pub reference_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 钱包交易类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletTransactionType {
    /// 首次使用时的初始额度
    Initial,
    /// 扣费
    Debit,
    /// 充值或退款
    Credit,
}

impl std::fmt::Display for WalletTransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletTransactionType::Initial => write!(f, "initial"),
            WalletTransactionType::Debit => write!(f, "debit"),
            WalletTransactionType::Credit => write!(f, "credit"),
        }
    }
}

impl std::str::FromStr for WalletTransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(WalletTransactionType::Initial),
            "debit" => Ok(WalletTransactionType::Debit),
            "credit" => Ok(WalletTransactionType::Credit),
            other => Err(format!("unknown wallet transaction type: {}", other)),
        }
    }
}

/// 计算充值赠送金额
///
/// 阶梯式赠送：金额越大赠送比例越高
///
/// # 参数
///
/// * `amount` - 充值金额（IQD）
///
/// # 返回值
///
/// 赠送金额（IQD）
pub fn calculate_topup_bonus(amount: i64) -> i64 {
    let percent = if amount >= 250_000 {
        20
    } else if amount >= 100_000 {
        15
    } else if amount >= 50_000 {
        10
    } else if amount >= 25_000 {
        5
    } else {
        0
    };
    amount * percent / 100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topup_bonus_tiers() {
        assert_eq!(calculate_topup_bonus(10_000), 0);
        assert_eq!(calculate_topup_bonus(25_000), 1_250);
        assert_eq!(calculate_topup_bonus(50_000), 5_000);
        assert_eq!(calculate_topup_bonus(100_000), 15_000);
        assert_eq!(calculate_topup_bonus(250_000), 50_000);
    }
}
