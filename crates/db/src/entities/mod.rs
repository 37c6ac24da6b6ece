//! `SeaORM` entity definitions.

pub mod accounts;
pub mod customers;
pub mod ledger_entries;
pub mod products;
pub mod purchase_order_items;
pub mod purchase_orders;
pub mod sales_invoice_items;
pub mod sales_invoices;
pub mod stock_transaction_items;
pub mod stock_transactions;
pub mod suppliers;
pub mod units_of_measure;
pub mod users;
