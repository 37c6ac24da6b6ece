//! `SeaORM` Entity for stock transaction headers.
//!
//! Movement records are immutable once written; corrections are new
//! compensating movements.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub record_no: String,
    pub transaction_date: Date,
    pub transaction_type: String,
    pub description: Option<String>,
    pub user_id: Option<Uuid>,
    pub ref_sales_invoice_id: Option<Uuid>,
    pub ref_purchase_order_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_transaction_items::Entity")]
    StockTransactionItems,
}

impl Related<super::stock_transaction_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransactionItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
