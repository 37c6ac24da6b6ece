//! `SeaORM` Entity for the chart of accounts.
//!
//! `current_balance` is a denormalized cache written only by the posting
//! engine: a non-negative magnitude plus the `balance_type` side flag
//! ("Dr" or "Cr"). The entry log remains authoritative.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub current_balance: Decimal,
    pub balance_type: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
