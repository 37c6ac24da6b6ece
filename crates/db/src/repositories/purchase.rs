//! Purchase repository: order creation and the receive orchestrator.
//!
//! Orders are created as DRAFT with computed totals and no side
//! effects. `receive` runs the whole goods receipt as one transaction:
//! IN movement through the inventory mutator, Dr Inventory / Cr supplier
//! posting, and the DRAFT to RECEIVED status flip. Receiving twice is a
//! conflict, not a second receipt.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use tillbook_core::inventory::{InventoryError, MovementDirection, MovementLine};
use tillbook_core::ledger::{DocumentRef, PostingInput};
use tillbook_core::sales::line_total;
use tillbook_core::sequence::voucher_for_order;
use tillbook_shared::types::{PageRequest, PageResponse};

use crate::entities::{products, purchase_order_items, purchase_orders, suppliers};
use crate::repositories::ledger::{LedgerError, LedgerRepository, first_active_account_by_type};
use crate::repositories::stock::{
    MovementInput, MovementReference, StockError, StockRepository,
};
use crate::repositories::user;

const ACCOUNT_TYPE_INVENTORY: &str = "Inventory";

const STATUS_DRAFT: &str = "DRAFT";
const STATUS_RECEIVED: &str = "RECEIVED";

/// Error types for purchase order operations.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// Order number already taken.
    #[error("Order number already exists: {0}")]
    DuplicateOrderNumber(String),

    /// Order not found.
    #[error("Purchase order not found: {0}")]
    NotFound(Uuid),

    /// Supplier missing or soft-deleted.
    #[error("Supplier not found: {0}")]
    SupplierNotFound(Uuid),

    /// Order was already received.
    #[error("Purchase order already received: {0}")]
    AlreadyReceived(String),

    /// No active Inventory account to debit.
    #[error("Inventory account not found; add an active account with type 'Inventory'")]
    InventoryAccountMissing,

    /// Product problem while building lines.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Stock movement failed.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// Posting failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// One requested order line.
#[derive(Debug, Clone)]
pub struct PurchaseItemInput {
    /// Product ordered.
    pub product_id: Uuid,
    /// Positive quantity.
    pub quantity: Decimal,
    /// Agreed unit price.
    pub unit_price: Decimal,
    /// Unit of measure override; defaults to the product's unit.
    pub uom_id: Option<Uuid>,
}

/// Input for creating a purchase order.
#[derive(Debug, Clone)]
pub struct CreatePurchaseOrderInput {
    /// Human-readable order number, unique.
    pub order_number: String,
    /// Supplier being ordered from.
    pub supplier_id: Uuid,
    /// Business date.
    pub order_date: NaiveDate,
    /// Free-text remarks.
    pub remarks: Option<String>,
    /// Username of the operator, if known.
    pub acting_user: Option<String>,
    /// Line items.
    pub items: Vec<PurchaseItemInput>,
}

/// Filter options for listing purchase orders.
#[derive(Debug, Clone, Default)]
pub struct PurchaseListFilter {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to one supplier.
    pub supplier_id: Option<Uuid>,
}

/// An order header with its items in sort order.
#[derive(Debug, Clone)]
pub struct OrderWithItems {
    /// The header row.
    pub order: purchase_orders::Model,
    /// The item rows.
    pub items: Vec<purchase_order_items::Model>,
}

/// Purchase repository: orders and goods receipt.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    db: DatabaseConnection,
}

impl PurchaseRepository {
    /// Creates a new purchase repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a purchase order in DRAFT status.
    ///
    /// No stock or ledger side effects; those happen on receive.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOrderNumber`, `SupplierNotFound`,
    /// `ProductNotFound`, or a database error.
    pub async fn create(
        &self,
        input: CreatePurchaseOrderInput,
    ) -> Result<OrderWithItems, PurchaseError> {
        let txn = self.db.begin().await?;

        let exists = purchase_orders::Entity::find()
            .filter(purchase_orders::Column::OrderNumber.eq(&input.order_number))
            .count(&txn)
            .await?;
        if exists > 0 {
            return Err(PurchaseError::DuplicateOrderNumber(input.order_number));
        }

        suppliers::Entity::find_by_id(input.supplier_id)
            .one(&txn)
            .await?
            .filter(|s| s.deleted_at.is_none())
            .ok_or(PurchaseError::SupplierNotFound(input.supplier_id))?;

        let operator = match &input.acting_user {
            Some(username) => user::find_active_by_username(&txn, username).await?,
            None => None,
        };

        let now = Utc::now().into();
        let order_id = Uuid::new_v4();
        let mut total_amount = Decimal::ZERO;
        let mut item_models = Vec::with_capacity(input.items.len());

        for (index, item) in input.items.iter().enumerate() {
            let product = products::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .filter(|p| p.deleted_at.is_none())
                .ok_or(InventoryError::ProductNotFound(item.product_id))?;

            let total = line_total(item.quantity, item.unit_price);
            total_amount += total;

            item_models.push(purchase_order_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                line_total: Set(total),
                uom_id: Set(item.uom_id.unwrap_or(product.uom_id)),
                sort_order: Set(i32::try_from(index).unwrap_or(i32::MAX)),
                created_at: Set(now),
            });
        }

        let order = purchase_orders::ActiveModel {
            id: Set(order_id),
            order_number: Set(input.order_number.clone()),
            supplier_id: Set(input.supplier_id),
            user_id: Set(operator.map(|u| u.id)),
            order_date: Set(input.order_date),
            total_amount: Set(total_amount),
            status: Set(STATUS_DRAFT.to_string()),
            remarks: Set(input.remarks.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(item_models.len());
        for model in item_models {
            items.push(model.insert(&txn).await?);
        }

        txn.commit().await?;
        Ok(OrderWithItems { order, items })
    }

    /// Receives a purchase order: IN movement, Dr Inventory / Cr supplier
    /// posting, status flip to RECEIVED, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyReceived` when the order is not in DRAFT,
    /// `InventoryAccountMissing` when no active Inventory account exists,
    /// or an error from the movement or posting; nothing is persisted on
    /// failure.
    pub async fn receive(
        &self,
        order_id: Uuid,
        acting_user: Option<&str>,
    ) -> Result<OrderWithItems, PurchaseError> {
        let txn = self.db.begin().await?;

        let order = purchase_orders::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or(PurchaseError::NotFound(order_id))?;
        if order.status == STATUS_RECEIVED {
            return Err(PurchaseError::AlreadyReceived(order.order_number));
        }

        let items = purchase_order_items::Entity::find()
            .filter(purchase_order_items::Column::PurchaseOrderId.eq(order_id))
            .order_by_asc(purchase_order_items::Column::SortOrder)
            .all(&txn)
            .await?;

        let operator = match acting_user {
            Some(username) => user::find_active_by_username(&txn, username).await?,
            None => None,
        };

        let lines: Vec<MovementLine> = items
            .iter()
            .map(|item| MovementLine {
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_transaction: item.unit_price,
                uom_id: Some(item.uom_id),
            })
            .collect();

        StockRepository::apply_movement_in(
            &txn,
            &MovementInput {
                direction: MovementDirection::In,
                transaction_date: order.order_date,
                description: Some(format!("Purchase, Order # {}", order.order_number)),
                user_id: operator.as_ref().map(|u| u.id),
                lines,
                reference: MovementReference::Purchase { order_id },
            },
        )
        .await?;

        let inventory = first_active_account_by_type(&txn, ACCOUNT_TYPE_INVENTORY)
            .await?
            .ok_or(PurchaseError::InventoryAccountMissing)?;

        let supplier = suppliers::Entity::find_by_id(order.supplier_id)
            .one(&txn)
            .await?
            .ok_or(PurchaseError::SupplierNotFound(order.supplier_id))?;

        LedgerRepository::post_in(
            &txn,
            &PostingInput {
                voucher_no: voucher_for_order(&order.order_number),
                date: order.order_date,
                description: Some(format!("Purchase, Order # {}", order.order_number)),
                debit_account_id: inventory.id,
                credit_account_id: supplier.account_id,
                amount: order.total_amount,
                ref_type: Some(DocumentRef::Purchase),
                ref_id: Some(order_id),
                created_by: operator.map(|u| u.id),
            },
        )
        .await?;

        let order_number = order.order_number.clone();
        let mut active = order.into_active_model();
        active.status = Set(STATUS_RECEIVED.to_string());
        active.updated_at = Set(Utc::now().into());
        let order = active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            order_number = %order_number,
            total_amount = %order.total_amount,
            "received purchase order"
        );

        Ok(OrderWithItems { order, items })
    }

    /// Fetches one order with its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a database error.
    pub async fn get(&self, id: Uuid) -> Result<OrderWithItems, PurchaseError> {
        let order = purchase_orders::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(PurchaseError::NotFound(id))?;

        let items = purchase_order_items::Entity::find()
            .filter(purchase_order_items::Column::PurchaseOrderId.eq(id))
            .order_by_asc(purchase_order_items::Column::SortOrder)
            .all(&self.db)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    /// Lists order headers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: PurchaseListFilter,
        page: PageRequest,
    ) -> Result<PageResponse<purchase_orders::Model>, PurchaseError> {
        let page = page.normalized();

        let mut query = purchase_orders::Entity::find();
        if let Some(from) = filter.from {
            query = query.filter(purchase_orders::Column::OrderDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(purchase_orders::Column::OrderDate.lte(to));
        }
        if let Some(supplier_id) = filter.supplier_id {
            query = query.filter(purchase_orders::Column::SupplierId.eq(supplier_id));
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_desc(purchase_orders::Column::OrderDate)
            .order_by_desc(purchase_orders::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.size, total))
    }
}
