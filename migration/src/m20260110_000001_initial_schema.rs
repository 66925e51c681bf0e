// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

/// 数据库初始模式迁移
///
/// 创建网关的全部基础表：会话、API密钥、钱包、订阅、自动化日志、
/// Webhook、投递跟踪以及账号强度指标
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    /// 应用数据库迁移
    ///
    /// # 参数
    ///
    /// * `manager` - 数据库模式管理器
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 迁移成功
    /// * `Err(DbErr)` - 迁移失败
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. sessions (no dependencies)
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Sessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Sessions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Sessions::PhoneNumber).string())
                    .col(ColumnDef::new(Sessions::Status).string().not_null())
                    .col(ColumnDef::new(Sessions::QrCode).text())
                    .col(ColumnDef::new(Sessions::LastActivity).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Sessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Sessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_user_status")
                    .table(Sessions::Table)
                    .col(Sessions::UserId)
                    .col(Sessions::Status)
                    .to_owned(),
            )
            .await?;

        // 2. api_keys
        manager
            .create_table(
                Table::create()
                    .table(ApiKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiKeys::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiKeys::Key).string().not_null().unique_key())
                    .col(ColumnDef::new(ApiKeys::Secret).string().not_null())
                    .col(ColumnDef::new(ApiKeys::UserId).uuid().not_null())
                    .col(ColumnDef::new(ApiKeys::SessionId).string().not_null())
                    .col(
                        ColumnDef::new(ApiKeys::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(ApiKeys::LastUsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ApiKeys::UsageCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ApiKeys::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_keys_session")
                    .table(ApiKeys::Table)
                    .col(ApiKeys::SessionId)
                    .to_owned(),
            )
            .await?;

        // 3. wallets
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Wallets::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Wallets::UserId).uuid().not_null().unique_key())
                    .col(
                        ColumnDef::new(Wallets::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Wallets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Wallets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 4. wallet_transactions
        manager
            .create_table(
                Table::create()
                    .table(WalletTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletTransactions::UserId).uuid().not_null())
                    .col(ColumnDef::new(WalletTransactions::SessionId).string())
                    .col(
                        ColumnDef::new(WalletTransactions::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::BalanceBefore)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletTransactions::Description)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletTransactions::ReferenceId).string())
                    .col(
                        ColumnDef::new(WalletTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_txn_user")
                    .table(WalletTransactions::Table)
                    .col(WalletTransactions::UserId)
                    .col(WalletTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 5. subscriptions
        manager
            .create_table(
                Table::create()
                    .table(Subscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subscriptions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subscriptions::UserId).uuid().not_null())
                    .col(ColumnDef::new(Subscriptions::Tier).string().not_null())
                    .col(
                        ColumnDef::new(Subscriptions::MessagesUsed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::NumbersUsed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Subscriptions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Subscriptions::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Subscriptions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_user_active")
                    .table(Subscriptions::Table)
                    .col(Subscriptions::UserId)
                    .col(Subscriptions::IsActive)
                    .to_owned(),
            )
            .await?;

        // 6. rate_limit_settings
        manager
            .create_table(
                Table::create()
                    .table(RateLimitSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RateLimitSettings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RateLimitSettings::UserId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(RateLimitSettings::PerMinute)
                            .integer()
                            .not_null()
                            .default(10),
                    )
                    .col(
                        ColumnDef::new(RateLimitSettings::PerHour)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(RateLimitSettings::PerDay)
                            .integer()
                            .not_null()
                            .default(1000),
                    )
                    .col(
                        ColumnDef::new(RateLimitSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 7. automation_logs
        manager
            .create_table(
                Table::create()
                    .table(AutomationLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AutomationLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AutomationLogs::UserId).uuid().not_null())
                    .col(ColumnDef::new(AutomationLogs::SessionId).string().not_null())
                    .col(
                        ColumnDef::new(AutomationLogs::MessageType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AutomationLogs::Recipient).string())
                    .col(ColumnDef::new(AutomationLogs::Recipients).json())
                    .col(ColumnDef::new(AutomationLogs::Message).text().not_null())
                    .col(ColumnDef::new(AutomationLogs::Status).string().not_null())
                    .col(ColumnDef::new(AutomationLogs::ErrorMessage).text())
                    .col(
                        ColumnDef::new(AutomationLogs::MessageCount)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(AutomationLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_automation_logs_user_created")
                    .table(AutomationLogs::Table)
                    .col(AutomationLogs::UserId)
                    .col(AutomationLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 8. webhooks
        manager
            .create_table(
                Table::create()
                    .table(Webhooks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Webhooks::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Webhooks::UserId).uuid().not_null())
                    .col(ColumnDef::new(Webhooks::SessionId).string().not_null())
                    .col(ColumnDef::new(Webhooks::WebhookType).string().not_null())
                    .col(ColumnDef::new(Webhooks::Url).text().not_null())
                    .col(ColumnDef::new(Webhooks::SuccessWebhookUrl).text())
                    .col(ColumnDef::new(Webhooks::FailureWebhookUrl).text())
                    .col(ColumnDef::new(Webhooks::CustomPayload).json())
                    .col(ColumnDef::new(Webhooks::Headers).json())
                    .col(
                        ColumnDef::new(Webhooks::MaxRetries)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(
                        ColumnDef::new(Webhooks::RetryDelaySeconds)
                            .integer()
                            .not_null()
                            .default(5),
                    )
                    .col(
                        ColumnDef::new(Webhooks::RetryOnFailure)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Webhooks::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Webhooks::TotalCalls)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Webhooks::SuccessCalls)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Webhooks::FailedCalls)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Webhooks::LastCalledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Webhooks::LastSuccessAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Webhooks::LastFailureAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Webhooks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Webhooks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_webhooks_scope")
                    .table(Webhooks::Table)
                    .col(Webhooks::UserId)
                    .col(Webhooks::SessionId)
                    .col(Webhooks::WebhookType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 9. webhook_logs
        manager
            .create_table(
                Table::create()
                    .table(WebhookLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebhookLogs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WebhookLogs::WebhookId).uuid().not_null())
                    .col(ColumnDef::new(WebhookLogs::EventType).string().not_null())
                    .col(ColumnDef::new(WebhookLogs::Payload).json().not_null())
                    .col(ColumnDef::new(WebhookLogs::ResponseStatus).integer())
                    .col(ColumnDef::new(WebhookLogs::ResponseBody).text())
                    .col(ColumnDef::new(WebhookLogs::Success).boolean().not_null())
                    .col(ColumnDef::new(WebhookLogs::ErrorMessage).text())
                    .col(
                        ColumnDef::new(WebhookLogs::AttemptNumber)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(WebhookLogs::IsRetry)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WebhookLogs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_webhook_logs_webhook")
                    .table(WebhookLogs::Table)
                    .col(WebhookLogs::WebhookId)
                    .col(WebhookLogs::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 10. delivery_tracking
        manager
            .create_table(
                Table::create()
                    .table(DeliveryTracking::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryTracking::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeliveryTracking::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(DeliveryTracking::SessionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryTracking::MessageId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(DeliveryTracking::Recipient).string().not_null())
                    .col(ColumnDef::new(DeliveryTracking::Status).string().not_null())
                    .col(ColumnDef::new(DeliveryTracking::DeliveredAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(DeliveryTracking::ReadAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(DeliveryTracking::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DeliveryTracking::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 11. connection_events
        manager
            .create_table(
                Table::create()
                    .table(ConnectionEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConnectionEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConnectionEvents::SessionId).string().not_null())
                    .col(ColumnDef::new(ConnectionEvents::UserId).uuid().not_null())
                    .col(ColumnDef::new(ConnectionEvents::EventType).string().not_null())
                    .col(ColumnDef::new(ConnectionEvents::Details).json())
                    .col(
                        ColumnDef::new(ConnectionEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_connection_events_session")
                    .table(ConnectionEvents::Table)
                    .col(ConnectionEvents::SessionId)
                    .col(ConnectionEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // 12. account_strength
        manager
            .create_table(
                Table::create()
                    .table(AccountStrength::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountStrength::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccountStrength::UserId).uuid().not_null())
                    .col(ColumnDef::new(AccountStrength::SessionId).string().not_null())
                    .col(
                        ColumnDef::new(AccountStrength::StrengthScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AccountStrength::TotalMessages)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AccountStrength::TotalContacts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(AccountStrength::LastStrengthenedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(AccountStrength::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_account_strength_scope")
                    .table(AccountStrength::Table)
                    .col(AccountStrength::UserId)
                    .col(AccountStrength::SessionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    /// 回滚数据库迁移
    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccountStrength::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ConnectionEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DeliveryTracking::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WebhookLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Webhooks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AutomationLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RateLimitSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalletTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiKeys::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
    UserId,
    PhoneNumber,
    Status,
    QrCode,
    LastActivity,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ApiKeys {
    Table,
    Id,
    Key,
    Secret,
    UserId,
    SessionId,
    IsActive,
    LastUsedAt,
    UsageCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Wallets {
    Table,
    Id,
    UserId,
    Balance,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WalletTransactions {
    Table,
    Id,
    UserId,
    SessionId,
    TransactionType,
    Amount,
    BalanceBefore,
    BalanceAfter,
    Description,
    ReferenceId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Subscriptions {
    Table,
    Id,
    UserId,
    Tier,
    MessagesUsed,
    NumbersUsed,
    IsActive,
    StartedAt,
    ExpiresAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RateLimitSettings {
    Table,
    Id,
    UserId,
    PerMinute,
    PerHour,
    PerDay,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AutomationLogs {
    Table,
    Id,
    UserId,
    SessionId,
    MessageType,
    Recipient,
    Recipients,
    Message,
    Status,
    ErrorMessage,
    MessageCount,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Webhooks {
    Table,
    Id,
    UserId,
    SessionId,
    WebhookType,
    Url,
    SuccessWebhookUrl,
    FailureWebhookUrl,
    CustomPayload,
    Headers,
    MaxRetries,
    RetryDelaySeconds,
    RetryOnFailure,
    IsActive,
    TotalCalls,
    SuccessCalls,
    FailedCalls,
    LastCalledAt,
    LastSuccessAt,
    LastFailureAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WebhookLogs {
    Table,
    Id,
    WebhookId,
    EventType,
    Payload,
    ResponseStatus,
    ResponseBody,
    Success,
    ErrorMessage,
    AttemptNumber,
    IsRetry,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DeliveryTracking {
    Table,
    Id,
    UserId,
    SessionId,
    MessageId,
    Recipient,
    Status,
    DeliveredAt,
    ReadAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ConnectionEvents {
    Table,
    Id,
    SessionId,
    UserId,
    EventType,
    Details,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AccountStrength {
    Table,
    Id,
    UserId,
    SessionId,
    StrengthScore,
    TotalMessages,
    TotalContacts,
    LastStrengthenedAt,
    UpdatedAt,
}
