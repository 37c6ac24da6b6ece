//! Stock repository: the inventory mutator.
//!
//! `apply_movement_in` locks each affected product row with
//! `SELECT ... FOR UPDATE` before reading `current_stock`, so the
//! availability check and the update are atomic per product. Movement
//! headers and items are immutable once written.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use tillbook_core::inventory::{
    InventoryError, MovementDirection, MovementLine, check_availability, validate_line,
};
use tillbook_core::sequence::{sale_record_number, stock_record_number};
use tillbook_shared::types::{PageRequest, PageResponse};

use crate::entities::{products, stock_transaction_items, stock_transactions};

/// Error types for stock operations.
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    /// A movement precondition failed (bad quantity, missing product,
    /// insufficient stock).
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Movement record not found.
    #[error("Stock transaction not found: {0}")]
    MovementNotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// The document a movement originates from, which also decides the
/// record number shape.
#[derive(Debug, Clone)]
pub enum MovementReference {
    /// Manual stock in/out from the stock screen.
    Manual,
    /// Movement caused by a sales invoice.
    Sale {
        /// The invoice row.
        invoice_id: Uuid,
        /// Human-readable invoice number, embedded in the record number.
        invoice_number: String,
        /// Whether the sale document moves stock back in.
        is_return: bool,
    },
    /// Movement caused by receiving a purchase order.
    Purchase {
        /// The purchase order row.
        order_id: Uuid,
    },
}

/// Input for one stock movement.
#[derive(Debug, Clone)]
pub struct MovementInput {
    /// IN or OUT; supplies the sign for every line.
    pub direction: MovementDirection,
    /// Business date of the movement.
    pub transaction_date: NaiveDate,
    /// Free-text description; defaults to "Stock In"/"Stock Out".
    pub description: Option<String>,
    /// User the movement is attributed to.
    pub user_id: Option<Uuid>,
    /// Lines, all with positive quantities.
    pub lines: Vec<MovementLine>,
    /// Originating document.
    pub reference: MovementReference,
}

/// A movement header with its items.
#[derive(Debug, Clone)]
pub struct StockMovement {
    /// The header row.
    pub header: stock_transactions::Model,
    /// The item rows, one per input line.
    pub items: Vec<stock_transaction_items::Model>,
}

/// Filter options for listing movements.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to one direction.
    pub direction: Option<MovementDirection>,
    /// Restrict to movements touching one product.
    pub product_id: Option<Uuid>,
}

/// Stock repository: movements and movement history.
#[derive(Debug, Clone)]
pub struct StockRepository {
    db: DatabaseConnection,
}

impl StockRepository {
    /// Creates a new stock repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies a stock movement in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if any line fails validation or the stock check;
    /// no stock changes and no movement record survive a failure.
    pub async fn apply_movement(&self, input: MovementInput) -> Result<StockMovement, StockError> {
        let txn = self.db.begin().await?;
        let movement = Self::apply_movement_in(&txn, &input).await?;
        txn.commit().await?;
        Ok(movement)
    }

    /// Applies a stock movement inside an already-open transaction.
    ///
    /// Locks each product row, checks availability for OUT lines, updates
    /// `current_stock`, and writes the immutable header and items. The
    /// record number is regenerated until unique before insert.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError` variants for validation and stock-level
    /// failures, or a database error.
    pub async fn apply_movement_in(
        txn: &DatabaseTransaction,
        input: &MovementInput,
    ) -> Result<StockMovement, StockError> {
        for line in &input.lines {
            validate_line(line)?;
        }

        let record_no = Self::unique_record_no(txn, input).await?;
        let now = Utc::now().into();

        let (ref_sales_invoice_id, ref_purchase_order_id) = match &input.reference {
            MovementReference::Manual => (None, None),
            MovementReference::Sale { invoice_id, .. } => (Some(*invoice_id), None),
            MovementReference::Purchase { order_id } => (None, Some(*order_id)),
        };

        let default_description = match input.direction {
            MovementDirection::In => "Stock In",
            MovementDirection::Out => "Stock Out",
        };

        let header = stock_transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            record_no: Set(record_no),
            transaction_date: Set(input.transaction_date),
            transaction_type: Set(input.direction.type_code().to_string()),
            description: Set(Some(
                input
                    .description
                    .clone()
                    .unwrap_or_else(|| default_description.to_string()),
            )),
            user_id: Set(input.user_id),
            ref_sales_invoice_id: Set(ref_sales_invoice_id),
            ref_purchase_order_id: Set(ref_purchase_order_id),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;

        let mut items = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let product = products::Entity::find_by_id(line.product_id)
                .lock_exclusive()
                .one(txn)
                .await?
                .filter(|p| p.deleted_at.is_none())
                .ok_or(InventoryError::ProductNotFound(line.product_id))?;

            check_availability(
                input.direction,
                &product.code,
                product.current_stock,
                line.quantity,
            )?;

            let change = input.direction.signed_change(line.quantity);
            let new_stock = product.current_stock + change;
            let uom_id = line.uom_id.unwrap_or(product.uom_id);

            let mut active = product.into_active_model();
            active.current_stock = Set(new_stock);
            active.updated_at = Set(Utc::now().into());
            active.update(txn).await?;

            let item = stock_transaction_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                stock_transaction_id: Set(header.id),
                product_id: Set(line.product_id),
                quantity_change: Set(change),
                price_at_transaction: Set(line.price_at_transaction),
                uom_id: Set(Some(uom_id)),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;

            items.push(item);
        }

        tracing::info!(
            record_no = %header.record_no,
            direction = input.direction.type_code(),
            lines = items.len(),
            "applied stock movement"
        );

        Ok(StockMovement { header, items })
    }

    /// Generates a record number and regenerates on collision.
    async fn unique_record_no(
        txn: &DatabaseTransaction,
        input: &MovementInput,
    ) -> Result<String, StockError> {
        loop {
            let candidate = match &input.reference {
                MovementReference::Sale {
                    invoice_number,
                    is_return,
                    ..
                } => sale_record_number(*is_return, invoice_number, Uuid::new_v4()),
                MovementReference::Manual | MovementReference::Purchase { .. } => {
                    stock_record_number(input.direction.record_prefix(), Uuid::new_v4())
                }
            };

            let taken = stock_transactions::Entity::find()
                .filter(stock_transactions::Column::RecordNo.eq(&candidate))
                .count(txn)
                .await?;
            if taken == 0 {
                return Ok(candidate);
            }
        }
    }

    /// Fetches one movement with its items.
    ///
    /// # Errors
    ///
    /// Returns `MovementNotFound` for an unknown id, or a database error.
    pub async fn get_movement(&self, id: Uuid) -> Result<StockMovement, StockError> {
        let header = stock_transactions::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StockError::MovementNotFound(id))?;

        let items = stock_transaction_items::Entity::find()
            .filter(stock_transaction_items::Column::StockTransactionId.eq(id))
            .order_by_asc(stock_transaction_items::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(StockMovement { header, items })
    }

    /// Lists movement headers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_movements(
        &self,
        filter: MovementFilter,
        page: PageRequest,
    ) -> Result<PageResponse<stock_transactions::Model>, StockError> {
        let page = page.normalized();

        let mut query = stock_transactions::Entity::find();
        if let Some(from) = filter.from {
            query = query.filter(stock_transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(stock_transactions::Column::TransactionDate.lte(to));
        }
        if let Some(direction) = filter.direction {
            query = query
                .filter(stock_transactions::Column::TransactionType.eq(direction.type_code()));
        }
        if let Some(product_id) = filter.product_id {
            // One header per match even when several lines share a product.
            query = query
                .inner_join(stock_transaction_items::Entity)
                .filter(stock_transaction_items::Column::ProductId.eq(product_id))
                .distinct();
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_desc(stock_transactions::Column::TransactionDate)
            .order_by_desc(stock_transactions::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.size, total))
    }
}
