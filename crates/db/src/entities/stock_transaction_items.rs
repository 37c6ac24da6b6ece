//! `SeaORM` Entity for stock transaction items.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_transaction_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub stock_transaction_id: Uuid,
    pub product_id: Uuid,
    /// Signed: positive for IN, negative for OUT.
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub quantity_change: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub price_at_transaction: Decimal,
    pub uom_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_transactions::Entity",
        from = "Column::StockTransactionId",
        to = "super::stock_transactions::Column::Id"
    )]
    StockTransactions,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id"
    )]
    Products,
}

impl Related<super::stock_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransactions.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
