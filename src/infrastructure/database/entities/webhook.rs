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

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "webhooks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: String,
    pub webhook_type: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub success_webhook_url: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub failure_webhook_url: Option<String>,
    pub custom_payload: Option<Json>,
    pub headers: Option<Json>,
    pub max_retries: i32,
    pub retry_delay_seconds: i32,
    pub retry_on_failure: bool,
    pub is_active: bool,
    pub total_calls: i64,
    pub success_calls: i64,
    pub failed_calls: i64,
    pub last_called_at: Option<ChronoDateTimeWithTimeZone>,
    pub last_success_at: Option<ChronoDateTimeWithTimeZone>,
    pub last_failure_at: Option<ChronoDateTimeWithTimeZone>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
