//! Initial database migration.
//!
//! Creates all tables and indexes for the posting and inventory engine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: MASTER DATA
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(UNITS_OF_MEASURE_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(CUSTOMERS_SQL).await?;
        db.execute_unprepared(SUPPLIERS_SQL).await?;
        db.execute_unprepared(PRODUCTS_SQL).await?;

        // ============================================================
        // PART 2: LEDGER
        // ============================================================
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;

        // ============================================================
        // PART 3: STOCK MOVEMENTS
        // ============================================================
        db.execute_unprepared(STOCK_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(STOCK_TRANSACTION_ITEMS_SQL).await?;

        // ============================================================
        // PART 4: SALES & PURCHASES
        // ============================================================
        db.execute_unprepared(SALES_INVOICES_SQL).await?;
        db.execute_unprepared(SALES_INVOICE_ITEMS_SQL).await?;
        db.execute_unprepared(PURCHASE_ORDERS_SQL).await?;
        db.execute_unprepared(PURCHASE_ORDER_ITEMS_SQL).await?;

        // ============================================================
        // PART 5: INDEXES
        // ============================================================
        db.execute_unprepared(INDEXES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    username VARCHAR(100) NOT NULL UNIQUE,
    full_name VARCHAR(255),
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const UNITS_OF_MEASURE_SQL: &str = r"
CREATE TABLE units_of_measure (
    id UUID PRIMARY KEY,
    name VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    account_code VARCHAR(50) NOT NULL UNIQUE,
    account_name VARCHAR(255) NOT NULL,
    account_type VARCHAR(50) NOT NULL,
    current_balance DECIMAL(18, 2) NOT NULL DEFAULT 0,
    balance_type VARCHAR(2) NOT NULL DEFAULT 'Dr',
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_balance_type CHECK (balance_type IN ('Dr', 'Cr'))
);
";

const CUSTOMERS_SQL: &str = r"
CREATE TABLE customers (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const SUPPLIERS_SQL: &str = r"
CREATE TABLE suppliers (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const PRODUCTS_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY,
    code VARCHAR(100) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    uom_id UUID NOT NULL REFERENCES units_of_measure(id),
    current_stock DECIMAL(18, 4) NOT NULL DEFAULT 0,
    cost_price DECIMAL(18, 2) NOT NULL DEFAULT 0,
    selling_price DECIMAL(18, 2) NOT NULL DEFAULT 0,
    deleted_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    entry_seq BIGINT NOT NULL GENERATED ALWAYS AS IDENTITY,
    voucher_no VARCHAR(100) NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    transaction_date DATE NOT NULL,
    description TEXT,
    debit_amount DECIMAL(18, 2) NOT NULL DEFAULT 0,
    credit_amount DECIMAL(18, 2) NOT NULL DEFAULT 0,
    ref_type VARCHAR(20),
    ref_id UUID,
    created_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_one_sided CHECK (
        (debit_amount > 0 AND credit_amount = 0) OR
        (credit_amount > 0 AND debit_amount = 0)
    )
);
";

const STOCK_TRANSACTIONS_SQL: &str = r"
CREATE TABLE stock_transactions (
    id UUID PRIMARY KEY,
    record_no VARCHAR(100) NOT NULL UNIQUE,
    transaction_date DATE NOT NULL,
    transaction_type VARCHAR(20) NOT NULL,
    description TEXT,
    user_id UUID REFERENCES users(id),
    ref_sales_invoice_id UUID,
    ref_purchase_order_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_stock_txn_type CHECK (transaction_type IN ('STOCK_IN', 'STOCK_OUT'))
);
";

const STOCK_TRANSACTION_ITEMS_SQL: &str = r"
CREATE TABLE stock_transaction_items (
    id UUID PRIMARY KEY,
    stock_transaction_id UUID NOT NULL REFERENCES stock_transactions(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity_change DECIMAL(18, 4) NOT NULL,
    price_at_transaction DECIMAL(18, 2) NOT NULL DEFAULT 0,
    uom_id UUID REFERENCES units_of_measure(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const SALES_INVOICES_SQL: &str = r"
CREATE TABLE sales_invoices (
    id UUID PRIMARY KEY,
    invoice_number VARCHAR(100) NOT NULL UNIQUE,
    customer_id UUID REFERENCES customers(id),
    user_id UUID NOT NULL REFERENCES users(id),
    invoice_date DATE NOT NULL,
    transaction_type VARCHAR(20) NOT NULL DEFAULT 'SALE',
    is_cash_customer BOOLEAN NOT NULL DEFAULT FALSE,
    grand_total DECIMAL(18, 2) NOT NULL DEFAULT 0,
    additional_discount DECIMAL(18, 2) NOT NULL DEFAULT 0,
    additional_expenses DECIMAL(18, 2) NOT NULL DEFAULT 0,
    net_total DECIMAL(18, 2) NOT NULL DEFAULT 0,
    amount_received DECIMAL(18, 2) NOT NULL DEFAULT 0,
    change_returned DECIMAL(18, 2) NOT NULL DEFAULT 0,
    invoice_status VARCHAR(20) NOT NULL DEFAULT 'COMPLETED',
    remarks TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_invoice_txn_type CHECK (transaction_type IN ('SALE', 'RETURN', 'EXCHANGE')),
    CONSTRAINT chk_invoice_status CHECK (invoice_status IN ('DRAFT', 'COMPLETED'))
);
";

const SALES_INVOICE_ITEMS_SQL: &str = r"
CREATE TABLE sales_invoice_items (
    id UUID PRIMARY KEY,
    sales_invoice_id UUID NOT NULL REFERENCES sales_invoices(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity DECIMAL(18, 4) NOT NULL,
    unit_price DECIMAL(18, 2) NOT NULL,
    line_total DECIMAL(18, 2) NOT NULL,
    uom_id UUID NOT NULL REFERENCES units_of_measure(id),
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const PURCHASE_ORDERS_SQL: &str = r"
CREATE TABLE purchase_orders (
    id UUID PRIMARY KEY,
    order_number VARCHAR(100) NOT NULL UNIQUE,
    supplier_id UUID NOT NULL REFERENCES suppliers(id),
    user_id UUID REFERENCES users(id),
    order_date DATE NOT NULL,
    total_amount DECIMAL(18, 2) NOT NULL DEFAULT 0,
    status VARCHAR(20) NOT NULL DEFAULT 'DRAFT',
    remarks TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT chk_po_status CHECK (status IN ('DRAFT', 'RECEIVED'))
);
";

const PURCHASE_ORDER_ITEMS_SQL: &str = r"
CREATE TABLE purchase_order_items (
    id UUID PRIMARY KEY,
    purchase_order_id UUID NOT NULL REFERENCES purchase_orders(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity DECIMAL(18, 4) NOT NULL,
    unit_price DECIMAL(18, 2) NOT NULL,
    line_total DECIMAL(18, 2) NOT NULL,
    uom_id UUID NOT NULL REFERENCES units_of_measure(id),
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const INDEXES_SQL: &str = r"
-- Replay order for the ledger report engine
CREATE INDEX idx_ledger_entries_account_date_seq
    ON ledger_entries(account_id, transaction_date, entry_seq);
CREATE INDEX idx_ledger_entries_date ON ledger_entries(transaction_date);
CREATE INDEX idx_ledger_entries_voucher ON ledger_entries(voucher_no);

CREATE INDEX idx_stock_transactions_date ON stock_transactions(transaction_date);
CREATE INDEX idx_stock_transaction_items_txn ON stock_transaction_items(stock_transaction_id);
CREATE INDEX idx_stock_transaction_items_product ON stock_transaction_items(product_id);

-- Day-prefix scans for the invoice number sequencer
CREATE INDEX idx_sales_invoices_number_pattern
    ON sales_invoices(invoice_number text_pattern_ops);
CREATE INDEX idx_sales_invoices_date ON sales_invoices(invoice_date);
CREATE INDEX idx_sales_invoice_items_invoice ON sales_invoice_items(sales_invoice_id);

CREATE INDEX idx_purchase_orders_date ON purchase_orders(order_date);
CREATE INDEX idx_purchase_orders_supplier ON purchase_orders(supplier_id);
CREATE INDEX idx_purchase_order_items_order ON purchase_order_items(purchase_order_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS purchase_order_items CASCADE;
DROP TABLE IF EXISTS purchase_orders CASCADE;
DROP TABLE IF EXISTS sales_invoice_items CASCADE;
DROP TABLE IF EXISTS sales_invoices CASCADE;
DROP TABLE IF EXISTS stock_transaction_items CASCADE;
DROP TABLE IF EXISTS stock_transactions CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS products CASCADE;
DROP TABLE IF EXISTS suppliers CASCADE;
DROP TABLE IF EXISTS customers CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS units_of_measure CASCADE;
DROP TABLE IF EXISTS users CASCADE;
";
