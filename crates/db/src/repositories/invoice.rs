//! Invoice repository: the sale orchestrator.
//!
//! `create_invoice` runs the whole sale as one database transaction:
//! duplicate-number check, line pricing, invoice persist, stock movement
//! through the inventory mutator, and the receivable/revenue posting for
//! credit sales. A failure at any step rolls everything back, so no
//! invoice without its movement and no movement without its invoice.
//!
//! Edits to existing invoices recompute the stored totals but never
//! retrigger stock or ledger side effects.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tillbook_core::inventory::{InventoryError, MovementDirection, MovementLine};
use tillbook_core::ledger::{DocumentRef, PostingInput};
use tillbook_core::sales::{invoice_totals, line_total};
use tillbook_core::sequence::{invoice_day_prefix, next_invoice_number, voucher_for_invoice};
use tillbook_shared::types::{PageRequest, PageResponse};

use crate::entities::{customers, products, sales_invoice_items, sales_invoices};
use crate::repositories::ledger::{LedgerError, LedgerRepository, first_active_account_by_type};
use crate::repositories::stock::{
    MovementInput, MovementReference, StockError, StockRepository,
};
use crate::repositories::user;

const ACCOUNT_TYPE_REVENUE: &str = "Revenue";

const STATUS_DRAFT: &str = "DRAFT";
const STATUS_COMPLETED: &str = "COMPLETED";

/// Error types for invoice operations.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    /// Invoice number already taken.
    #[error("Invoice number already exists: {0}")]
    DuplicateInvoiceNumber(String),

    /// Invoice not found by id.
    #[error("Invoice not found: {0}")]
    NotFound(Uuid),

    /// Invoice not found by number.
    #[error("Invoice not found: {0}")]
    NotFoundByNumber(String),

    /// Invoice line item not found.
    #[error("Invoice item not found: {0}")]
    ItemNotFound(Uuid),

    /// Customer missing or soft-deleted.
    #[error("Customer not found: {0}")]
    CustomerNotFound(Uuid),

    /// Acting user unknown.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// No active Revenue account to credit.
    #[error("Sales revenue account not found; add an active account with type 'Revenue'")]
    RevenueAccountMissing,

    /// Product or quantity problem while building lines.
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

/// Kind of sale document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SaleKind {
    /// Normal sale, stock moves OUT.
    Sale,
    /// Return, stock moves back IN.
    Return,
    /// Exchange, treated as a return for stock purposes.
    Exchange,
}

impl SaleKind {
    /// The stored transaction-type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Return => "RETURN",
            Self::Exchange => "EXCHANGE",
        }
    }

    /// Whether this document moves stock IN rather than OUT.
    #[must_use]
    pub const fn moves_stock_in(self) -> bool {
        matches!(self, Self::Return | Self::Exchange)
    }
}

/// One requested invoice line.
#[derive(Debug, Clone)]
pub struct InvoiceItemInput {
    /// Product sold.
    pub product_id: Uuid,
    /// Positive quantity.
    pub quantity: Decimal,
    /// Price override; defaults to the product's selling price.
    pub unit_price: Option<Decimal>,
    /// Unit of measure override; defaults to the product's unit.
    pub uom_id: Option<Uuid>,
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    /// Explicit invoice number; generated from the day sequence when
    /// absent.
    pub invoice_number: Option<String>,
    /// Business date.
    pub invoice_date: NaiveDate,
    /// SALE, RETURN, or EXCHANGE.
    pub kind: SaleKind,
    /// Credit customer; ignored for cash sales.
    pub customer_id: Option<Uuid>,
    /// Walk-in cash sale with no receivable.
    pub is_cash_customer: bool,
    /// Persist as DRAFT: no stock movement, no posting.
    pub save_as_draft: bool,
    /// Header discount applied after line totals.
    pub additional_discount: Decimal,
    /// Header expenses added after line totals.
    pub additional_expenses: Decimal,
    /// Cash received at the till.
    pub amount_received: Decimal,
    /// Change handed back.
    pub change_returned: Decimal,
    /// Free-text remarks.
    pub remarks: Option<String>,
    /// Username of the operator.
    pub acting_user: String,
    /// Line items.
    pub items: Vec<InvoiceItemInput>,
}

/// Header updates; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoiceInput {
    /// New business date.
    pub invoice_date: Option<NaiveDate>,
    /// New header discount.
    pub additional_discount: Option<Decimal>,
    /// New header expenses.
    pub additional_expenses: Option<Decimal>,
    /// New amount received.
    pub amount_received: Option<Decimal>,
    /// New change returned.
    pub change_returned: Option<Decimal>,
    /// New remarks.
    pub remarks: Option<String>,
}

/// Line item updates; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateItemInput {
    /// New quantity.
    pub quantity: Option<Decimal>,
    /// New unit price.
    pub unit_price: Option<Decimal>,
}

/// Filter options for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceListFilter {
    /// Inclusive start date.
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
    /// Restrict to one customer.
    pub customer_id: Option<Uuid>,
}

/// An invoice header with its items in sort order.
#[derive(Debug, Clone)]
pub struct InvoiceWithItems {
    /// The header row.
    pub invoice: sales_invoices::Model,
    /// The item rows.
    pub items: Vec<sales_invoice_items::Model>,
}

/// Invoice repository: sale orchestration and sales history.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a sale: invoice, stock movement, and posting, all in one
    /// transaction.
    ///
    /// Drafts persist the invoice only. RETURN and EXCHANGE documents
    /// move stock IN, so the availability check cannot fail for them.
    /// The posting runs only for completed invoices with a credit
    /// customer and a positive net total.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails; nothing is persisted in that
    /// case.
    pub async fn create_invoice(
        &self,
        input: CreateInvoiceInput,
    ) -> Result<InvoiceWithItems, InvoiceError> {
        let txn = self.db.begin().await?;

        let operator = user::find_active_by_username(&txn, &input.acting_user)
            .await?
            .ok_or_else(|| InvoiceError::UserNotFound(input.acting_user.clone()))?;

        let invoice_number = match &input.invoice_number {
            Some(number) => {
                let exists = sales_invoices::Entity::find()
                    .filter(sales_invoices::Column::InvoiceNumber.eq(number))
                    .count(&txn)
                    .await?;
                if exists > 0 {
                    return Err(InvoiceError::DuplicateInvoiceNumber(number.clone()));
                }
                number.clone()
            }
            None => next_number_for_date(&txn, input.invoice_date).await?,
        };

        let customer = match (input.customer_id, input.is_cash_customer) {
            (Some(id), false) => Some(
                customers::Entity::find_by_id(id)
                    .one(&txn)
                    .await?
                    .filter(|c| c.deleted_at.is_none())
                    .ok_or(InvoiceError::CustomerNotFound(id))?,
            ),
            _ => None,
        };

        let now = Utc::now().into();
        let invoice_id = Uuid::new_v4();
        let mut item_models = Vec::with_capacity(input.items.len());
        let mut movement_lines = Vec::with_capacity(input.items.len());
        let mut line_totals = Vec::with_capacity(input.items.len());

        for (index, item) in input.items.iter().enumerate() {
            let product = products::Entity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .filter(|p| p.deleted_at.is_none())
                .ok_or(InventoryError::ProductNotFound(item.product_id))?;

            let unit_price = item.unit_price.unwrap_or(product.selling_price);
            let total = line_total(item.quantity, unit_price);
            let uom_id = item.uom_id.unwrap_or(product.uom_id);

            line_totals.push(total);
            movement_lines.push(MovementLine {
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_transaction: unit_price,
                uom_id: Some(uom_id),
            });

            item_models.push(sales_invoice_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                sales_invoice_id: Set(invoice_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(unit_price),
                line_total: Set(total),
                uom_id: Set(uom_id),
                sort_order: Set(i32::try_from(index).unwrap_or(i32::MAX)),
                created_at: Set(now),
            });
        }

        let totals = invoice_totals(
            &line_totals,
            input.additional_discount,
            input.additional_expenses,
        );

        let invoice = sales_invoices::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(invoice_number.clone()),
            customer_id: Set(customer.as_ref().map(|c| c.id)),
            user_id: Set(operator.id),
            invoice_date: Set(input.invoice_date),
            transaction_type: Set(input.kind.as_str().to_string()),
            is_cash_customer: Set(input.is_cash_customer),
            grand_total: Set(totals.grand_total),
            additional_discount: Set(input.additional_discount),
            additional_expenses: Set(input.additional_expenses),
            net_total: Set(totals.net_total),
            amount_received: Set(input.amount_received),
            change_returned: Set(input.change_returned),
            invoice_status: Set(if input.save_as_draft {
                STATUS_DRAFT.to_string()
            } else {
                STATUS_COMPLETED.to_string()
            }),
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

        if !input.save_as_draft {
            let is_return = input.kind.moves_stock_in();
            let direction = if is_return {
                MovementDirection::In
            } else {
                MovementDirection::Out
            };
            let movement_label = if is_return { "Return" } else { "Sale" };

            StockRepository::apply_movement_in(
                &txn,
                &MovementInput {
                    direction,
                    transaction_date: input.invoice_date,
                    description: Some(format!("{movement_label}, Invoice # {invoice_number}")),
                    user_id: Some(operator.id),
                    lines: movement_lines,
                    reference: MovementReference::Sale {
                        invoice_id,
                        invoice_number: invoice_number.clone(),
                        is_return,
                    },
                },
            )
            .await?;

            if let Some(customer) = &customer {
                if totals.net_total > Decimal::ZERO {
                    let revenue = first_active_account_by_type(&txn, ACCOUNT_TYPE_REVENUE)
                        .await?
                        .ok_or(InvoiceError::RevenueAccountMissing)?;

                    LedgerRepository::post_in(
                        &txn,
                        &PostingInput {
                            voucher_no: voucher_for_invoice(&invoice_number),
                            date: input.invoice_date,
                            description: Some(format!("Sale, Invoice # {invoice_number}")),
                            debit_account_id: customer.account_id,
                            credit_account_id: revenue.id,
                            amount: totals.net_total,
                            ref_type: Some(DocumentRef::Sale),
                            ref_id: Some(invoice_id),
                            created_by: Some(operator.id),
                        },
                    )
                    .await?;
                }
            }
        }

        txn.commit().await?;

        tracing::info!(
            invoice_number = %invoice.invoice_number,
            net_total = %invoice.net_total,
            status = %invoice.invoice_status,
            "recorded sales invoice"
        );

        Ok(InvoiceWithItems { invoice, items })
    }

    /// Previews the next sequential invoice number for a date.
    ///
    /// The number is not reserved; the unique index on `invoice_number`
    /// resolves races at insert time.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn next_invoice_number(&self, date: NaiveDate) -> Result<String, InvoiceError> {
        next_number_for_date(&self.db, date).await
    }

    /// Fetches one invoice with its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a database error.
    pub async fn get(&self, id: Uuid) -> Result<InvoiceWithItems, InvoiceError> {
        let invoice = sales_invoices::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;

        let items = self.items_of(invoice.id).await?;
        Ok(InvoiceWithItems { invoice, items })
    }

    /// Fetches one invoice by its exact number.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundByNumber` when no invoice matches, or a database
    /// error.
    pub async fn find_by_number(&self, number: &str) -> Result<InvoiceWithItems, InvoiceError> {
        let number = number.trim();
        let invoice = sales_invoices::Entity::find()
            .filter(sales_invoices::Column::InvoiceNumber.eq(number))
            .one(&self.db)
            .await?
            .ok_or_else(|| InvoiceError::NotFoundByNumber(number.to_string()))?;

        let items = self.items_of(invoice.id).await?;
        Ok(InvoiceWithItems { invoice, items })
    }

    /// Lists invoice headers, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(
        &self,
        filter: InvoiceListFilter,
        page: PageRequest,
    ) -> Result<PageResponse<sales_invoices::Model>, InvoiceError> {
        let page = page.normalized();

        let mut query = sales_invoices::Entity::find();
        if let Some(from) = filter.from {
            query = query.filter(sales_invoices::Column::InvoiceDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(sales_invoices::Column::InvoiceDate.lte(to));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(sales_invoices::Column::CustomerId.eq(customer_id));
        }

        let total = query.clone().count(&self.db).await?;
        let data = query
            .order_by_desc(sales_invoices::Column::InvoiceDate)
            .order_by_desc(sales_invoices::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(data, page.page, page.size, total))
    }

    /// Updates header fields and recomputes the stored totals.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id, or a database error.
    pub async fn update_header(
        &self,
        id: Uuid,
        update: UpdateInvoiceInput,
    ) -> Result<InvoiceWithItems, InvoiceError> {
        let txn = self.db.begin().await?;

        let invoice = sales_invoices::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(InvoiceError::NotFound(id))?;

        let mut active = invoice.into_active_model();
        if let Some(date) = update.invoice_date {
            active.invoice_date = Set(date);
        }
        if let Some(discount) = update.additional_discount {
            active.additional_discount = Set(discount);
        }
        if let Some(expenses) = update.additional_expenses {
            active.additional_expenses = Set(expenses);
        }
        if let Some(received) = update.amount_received {
            active.amount_received = Set(received);
        }
        if let Some(change) = update.change_returned {
            active.change_returned = Set(change);
        }
        if let Some(remarks) = update.remarks {
            active.remarks = Set(Some(remarks));
        }
        let invoice = active.update(&txn).await?;

        let result = Self::recompute_totals(&txn, invoice).await?;
        txn.commit().await?;
        Ok(result)
    }

    /// Adds a line item and recomputes the stored totals.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `ProductNotFound`, or a database error.
    pub async fn add_item(
        &self,
        invoice_id: Uuid,
        item: InvoiceItemInput,
    ) -> Result<InvoiceWithItems, InvoiceError> {
        let txn = self.db.begin().await?;

        let invoice = sales_invoices::Entity::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        let product = products::Entity::find_by_id(item.product_id)
            .one(&txn)
            .await?
            .filter(|p| p.deleted_at.is_none())
            .ok_or(InventoryError::ProductNotFound(item.product_id))?;

        let next_sort = sales_invoice_items::Entity::find()
            .filter(sales_invoice_items::Column::SalesInvoiceId.eq(invoice_id))
            .order_by_desc(sales_invoice_items::Column::SortOrder)
            .one(&txn)
            .await?
            .map_or(0, |last| last.sort_order + 1);

        let unit_price = item.unit_price.unwrap_or(product.selling_price);
        sales_invoice_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            sales_invoice_id: Set(invoice_id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            unit_price: Set(unit_price),
            line_total: Set(line_total(item.quantity, unit_price)),
            uom_id: Set(item.uom_id.unwrap_or(product.uom_id)),
            sort_order: Set(next_sort),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;

        let result = Self::recompute_totals(&txn, invoice).await?;
        txn.commit().await?;
        Ok(result)
    }

    /// Updates a line's quantity or price and recomputes the totals.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `ItemNotFound`, or a database error.
    pub async fn update_item(
        &self,
        invoice_id: Uuid,
        item_id: Uuid,
        update: UpdateItemInput,
    ) -> Result<InvoiceWithItems, InvoiceError> {
        let txn = self.db.begin().await?;

        let invoice = sales_invoices::Entity::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        let item = sales_invoice_items::Entity::find_by_id(item_id)
            .filter(sales_invoice_items::Column::SalesInvoiceId.eq(invoice_id))
            .one(&txn)
            .await?
            .ok_or(InvoiceError::ItemNotFound(item_id))?;

        let quantity = update.quantity.unwrap_or(item.quantity);
        let unit_price = update.unit_price.unwrap_or(item.unit_price);

        let mut active = item.into_active_model();
        active.quantity = Set(quantity);
        active.unit_price = Set(unit_price);
        active.line_total = Set(line_total(quantity, unit_price));
        active.update(&txn).await?;

        let result = Self::recompute_totals(&txn, invoice).await?;
        txn.commit().await?;
        Ok(result)
    }

    /// Removes a line item and recomputes the totals.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `ItemNotFound`, or a database error.
    pub async fn remove_item(
        &self,
        invoice_id: Uuid,
        item_id: Uuid,
    ) -> Result<InvoiceWithItems, InvoiceError> {
        let txn = self.db.begin().await?;

        let invoice = sales_invoices::Entity::find_by_id(invoice_id)
            .one(&txn)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;

        let item = sales_invoice_items::Entity::find_by_id(item_id)
            .filter(sales_invoice_items::Column::SalesInvoiceId.eq(invoice_id))
            .one(&txn)
            .await?
            .ok_or(InvoiceError::ItemNotFound(item_id))?;
        item.delete(&txn).await?;

        let result = Self::recompute_totals(&txn, invoice).await?;
        txn.commit().await?;
        Ok(result)
    }

    /// Recomputes grand and net totals from the current items.
    async fn recompute_totals(
        txn: &DatabaseTransaction,
        invoice: sales_invoices::Model,
    ) -> Result<InvoiceWithItems, InvoiceError> {
        let items = sales_invoice_items::Entity::find()
            .filter(sales_invoice_items::Column::SalesInvoiceId.eq(invoice.id))
            .order_by_asc(sales_invoice_items::Column::SortOrder)
            .all(txn)
            .await?;

        let line_totals: Vec<Decimal> = items.iter().map(|i| i.line_total).collect();
        let totals = invoice_totals(
            &line_totals,
            invoice.additional_discount,
            invoice.additional_expenses,
        );

        let mut active = invoice.into_active_model();
        active.grand_total = Set(totals.grand_total);
        active.net_total = Set(totals.net_total);
        active.updated_at = Set(Utc::now().into());
        let invoice = active.update(txn).await?;

        Ok(InvoiceWithItems { invoice, items })
    }

    async fn items_of(&self, invoice_id: Uuid) -> Result<Vec<sales_invoice_items::Model>, DbErr> {
        sales_invoice_items::Entity::find()
            .filter(sales_invoice_items::Column::SalesInvoiceId.eq(invoice_id))
            .order_by_asc(sales_invoice_items::Column::SortOrder)
            .all(&self.db)
            .await
    }
}

/// Reads the greatest number for the day prefix and derives the next.
async fn next_number_for_date<C: ConnectionTrait>(
    conn: &C,
    date: NaiveDate,
) -> Result<String, InvoiceError> {
    let prefix = invoice_day_prefix(date);
    let last = sales_invoices::Entity::find()
        .filter(sales_invoices::Column::InvoiceNumber.starts_with(&prefix))
        .order_by_desc(sales_invoices::Column::InvoiceNumber)
        .one(conn)
        .await?;

    Ok(next_invoice_number(
        date,
        last.as_ref().map(|i| i.invoice_number.as_str()),
    ))
}
