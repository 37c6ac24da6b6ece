//! `SeaORM` Entity for products.
//!
//! `current_stock` is only ever changed under a `SELECT ... FOR UPDATE`
//! row lock held by the inventory mutator.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub uom_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((18, 4)))")]
    pub current_stock: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub cost_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((18, 2)))")]
    pub selling_price: Decimal,
    pub deleted_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::units_of_measure::Entity",
        from = "Column::UomId",
        to = "super::units_of_measure::Column::Id"
    )]
    UnitsOfMeasure,
}

impl Related<super::units_of_measure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UnitsOfMeasure.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
