//! `SeaORM` Entity for sales invoices.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub customer_id: Option<Uuid>,
    pub user_id: Uuid,
    pub invoice_date: Date,
    /// SALE, RETURN, or EXCHANGE.
    pub transaction_type: String,
    pub is_cash_customer: bool,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub grand_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub additional_discount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub additional_expenses: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub net_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub amount_received: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub change_returned: Decimal,
    /// DRAFT or COMPLETED.
    pub invoice_status: String,
    pub remarks: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id"
    )]
    Customers,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::sales_invoice_items::Entity")]
    SalesInvoiceItems,
}

impl Related<super::sales_invoice_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesInvoiceItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
