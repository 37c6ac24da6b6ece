//! End-to-end orchestrator tests: sales and purchase receipts.
//!
//! Skipped when no `DATABASE_URL` (or `TILLBOOK__DATABASE__URL`) is set.

use std::collections::HashSet;
use std::env;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use tokio::sync::Barrier;
use uuid::Uuid;

use tillbook_core::inventory::InventoryError;
use tillbook_db::entities::{
    accounts, customers, ledger_entries, products, sales_invoices, stock_transactions, suppliers,
    units_of_measure, users,
};
use tillbook_db::migration::{Migrator, MigratorTrait};
use tillbook_db::repositories::{
    CreateInvoiceInput, CreatePurchaseOrderInput, InvoiceError, InvoiceItemInput,
    InvoiceRepository, PurchaseError, PurchaseItemInput, PurchaseRepository, SaleKind, StockError,
};

fn database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .or_else(|_| env::var("TILLBOOK__DATABASE__URL"))
        .ok()
}

async fn connect_or_skip() -> Option<DatabaseConnection> {
    let Some(url) = database_url() else {
        eprintln!("skipping: DATABASE_URL not set");
        return None;
    };
    let db = tillbook_db::connect(&url).await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    Some(db)
}

struct Fixture {
    operator: users::Model,
    product: products::Model,
    customer: customers::Model,
    customer_account: accounts::Model,
}

async fn seed_account(db: &DatabaseConnection, account_type: &str) -> accounts::Model {
    let now = Utc::now().into();
    accounts::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_code: Set(format!("A-{}", Uuid::new_v4().simple())),
        account_name: Set(format!("{account_type} account")),
        account_type: Set(account_type.to_string()),
        current_balance: Set(Decimal::ZERO),
        balance_type: Set("Dr".to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert account")
}

async fn seed_fixture(db: &DatabaseConnection, stock: Decimal) -> Fixture {
    let now = Utc::now().into();

    let operator = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(format!("till-{}", Uuid::new_v4().simple())),
        full_name: Set(Some("Till Operator".to_string())),
        deleted_at: Set(None),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert user");

    let uom = units_of_measure::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Each".to_string()),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert uom");

    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(format!("SKU-{}", Uuid::new_v4().simple())),
        name: Set("Flow Test Product".to_string()),
        uom_id: Set(uom.id),
        current_stock: Set(stock),
        cost_price: Set(dec!(6)),
        selling_price: Set(dec!(10)),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert product");

    let customer_account = seed_account(db, "Receivable").await;
    // Ensure at least one active Revenue account exists for postings.
    seed_account(db, "Revenue").await;

    let customer = customers::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Flow Test Customer".to_string()),
        account_id: Set(customer_account.id),
        deleted_at: Set(None),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert customer");

    Fixture {
        operator,
        product,
        customer,
        customer_account,
    }
}

fn sale_input(fixture: &Fixture, quantity: Decimal) -> CreateInvoiceInput {
    CreateInvoiceInput {
        invoice_number: None,
        invoice_date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
        kind: SaleKind::Sale,
        customer_id: None,
        is_cash_customer: true,
        save_as_draft: false,
        additional_discount: Decimal::ZERO,
        additional_expenses: Decimal::ZERO,
        amount_received: Decimal::ZERO,
        change_returned: Decimal::ZERO,
        remarks: None,
        acting_user: fixture.operator.username.clone(),
        items: vec![InvoiceItemInput {
            product_id: fixture.product.id,
            quantity,
            unit_price: None,
            uom_id: None,
        }],
    }
}

#[tokio::test]
async fn test_cash_sale_moves_stock_without_posting() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let fixture = seed_fixture(&db, dec!(10)).await;
    let repo = InvoiceRepository::new(db.clone());

    let sale = repo
        .create_invoice(sale_input(&fixture, dec!(3)))
        .await
        .expect("sale");

    assert_eq!(sale.invoice.invoice_status, "COMPLETED");
    assert_eq!(sale.invoice.grand_total, dec!(30));
    assert_eq!(sale.invoice.net_total, dec!(30));
    assert_eq!(sale.items.len(), 1);

    let product = products::Entity::find_by_id(fixture.product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.current_stock, dec!(7));

    let movement = stock_transactions::Entity::find()
        .filter(stock_transactions::Column::RefSalesInvoiceId.eq(sale.invoice.id))
        .one(&db)
        .await
        .expect("query")
        .expect("movement");
    assert_eq!(movement.transaction_type, "STOCK_OUT");
    assert!(
        movement
            .record_no
            .starts_with(&format!("ST-OUT-{}-", sale.invoice.invoice_number))
    );

    // Cash sale: no receivable, no posting.
    let postings = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::RefId.eq(sale.invoice.id))
        .all(&db)
        .await
        .expect("query");
    assert!(postings.is_empty());
}

#[tokio::test]
async fn test_credit_sale_posts_receivable_against_revenue() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let fixture = seed_fixture(&db, dec!(10)).await;
    let repo = InvoiceRepository::new(db.clone());

    let mut input = sale_input(&fixture, dec!(2));
    input.customer_id = Some(fixture.customer.id);
    input.is_cash_customer = false;
    input.additional_expenses = dec!(5);

    let sale = repo.create_invoice(input).await.expect("sale");
    assert_eq!(sale.invoice.net_total, dec!(25));

    let postings = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::RefId.eq(sale.invoice.id))
        .all(&db)
        .await
        .expect("query");
    assert_eq!(postings.len(), 2);

    let debit = postings
        .iter()
        .find(|e| e.debit_amount > Decimal::ZERO)
        .expect("debit leg");
    let credit = postings
        .iter()
        .find(|e| e.credit_amount > Decimal::ZERO)
        .expect("credit leg");
    assert_eq!(debit.account_id, fixture.customer_account.id);
    assert_eq!(debit.debit_amount, dec!(25));
    assert_eq!(credit.credit_amount, dec!(25));

    // The credited account is resolved as the first active Revenue
    // account, which may predate this fixture; only its type is stable.
    let credited = accounts::Entity::find_by_id(credit.account_id)
        .one(&db)
        .await
        .expect("query")
        .expect("account");
    assert_eq!(credited.account_type, "Revenue");

    let expected_voucher = format!(
        "VOU-{}",
        sale.invoice
            .invoice_number
            .strip_prefix("INV-")
            .expect("generated number")
    );
    assert_eq!(debit.voucher_no, expected_voucher);
}

#[tokio::test]
async fn test_failed_sale_persists_nothing() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let fixture = seed_fixture(&db, dec!(1)).await;
    let repo = InvoiceRepository::new(db.clone());

    let mut input = sale_input(&fixture, dec!(5));
    input.invoice_number = Some(format!("INV-FAIL-{}", Uuid::new_v4().simple()));
    let number = input.invoice_number.clone().unwrap();

    let err = repo.create_invoice(input).await.expect_err("must fail");
    assert!(matches!(
        err,
        InvoiceError::Stock(StockError::Inventory(InventoryError::InsufficientStock { .. }))
    ));

    // The invoice insert preceded the stock check inside the same
    // transaction; the rollback must erase it.
    let leftover = sales_invoices::Entity::find()
        .filter(sales_invoices::Column::InvoiceNumber.eq(&number))
        .one(&db)
        .await
        .expect("query");
    assert!(leftover.is_none());

    let product = products::Entity::find_by_id(fixture.product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.current_stock, dec!(1));
}

#[tokio::test]
async fn test_duplicate_invoice_number_rejected() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let fixture = seed_fixture(&db, dec!(10)).await;
    let repo = InvoiceRepository::new(db.clone());

    let number = format!("INV-DUP-{}", Uuid::new_v4().simple());
    let mut first = sale_input(&fixture, dec!(1));
    first.invoice_number = Some(number.clone());
    repo.create_invoice(first).await.expect("first sale");

    let mut second = sale_input(&fixture, dec!(1));
    second.invoice_number = Some(number.clone());
    let err = repo.create_invoice(second).await.expect_err("must fail");
    assert!(matches!(
        err,
        InvoiceError::DuplicateInvoiceNumber(n) if n == number
    ));
}

#[tokio::test]
async fn test_draft_sale_touches_no_stock() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let fixture = seed_fixture(&db, dec!(2)).await;
    let repo = InvoiceRepository::new(db.clone());

    // Draft quantity exceeds stock on purpose: drafts skip the check.
    let mut input = sale_input(&fixture, dec!(50));
    input.save_as_draft = true;

    let draft = repo.create_invoice(input).await.expect("draft");
    assert_eq!(draft.invoice.invoice_status, "DRAFT");

    let product = products::Entity::find_by_id(fixture.product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.current_stock, dec!(2));

    let movement = stock_transactions::Entity::find()
        .filter(stock_transactions::Column::RefSalesInvoiceId.eq(draft.invoice.id))
        .one(&db)
        .await
        .expect("query");
    assert!(movement.is_none());
}

#[tokio::test]
async fn test_return_moves_stock_back_in() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let fixture = seed_fixture(&db, dec!(0)).await;
    let repo = InvoiceRepository::new(db.clone());

    // Zero stock cannot block a return.
    let mut input = sale_input(&fixture, dec!(4));
    input.kind = SaleKind::Return;

    let sale = repo.create_invoice(input).await.expect("return");

    let product = products::Entity::find_by_id(fixture.product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.current_stock, dec!(4));

    let movement = stock_transactions::Entity::find()
        .filter(stock_transactions::Column::RefSalesInvoiceId.eq(sale.invoice.id))
        .one(&db)
        .await
        .expect("query")
        .expect("movement");
    assert_eq!(movement.transaction_type, "STOCK_IN");
}

#[tokio::test]
async fn test_next_invoice_number_advances_after_sale() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    // A private date keeps the day sequence isolated from other tests.
    let date = NaiveDate::from_ymd_opt(2031, 3, 7).unwrap();
    let fixture = seed_fixture(&db, dec!(10)).await;
    let repo = InvoiceRepository::new(db.clone());

    let first = repo.next_invoice_number(date).await.expect("preview");
    assert!(first.starts_with("INV-20310307-"));
    let first_counter: u32 = first["INV-20310307-".len()..].parse().expect("counter");

    let mut input = sale_input(&fixture, dec!(1));
    input.invoice_date = date;
    let sale = repo.create_invoice(input).await.expect("sale");
    assert_eq!(sale.invoice.invoice_number, first);

    let second = repo.next_invoice_number(date).await.expect("preview");
    assert_eq!(second, format!("INV-20310307-{:04}", first_counter + 1));
}

#[tokio::test]
async fn test_concurrent_auto_numbering_stays_distinct() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    const WRITERS: usize = 8;

    // A private date keeps the day sequence isolated from other tests.
    let date = NaiveDate::from_ymd_opt(2032, 6, 19).unwrap();
    let fixture = seed_fixture(&db, dec!(100)).await;
    let repo = InvoiceRepository::new(db.clone());

    let barrier = Arc::new(Barrier::new(WRITERS));
    let mut handles = Vec::with_capacity(WRITERS);
    for _ in 0..WRITERS {
        let repo = repo.clone();
        let barrier = Arc::clone(&barrier);
        let mut input = sale_input(&fixture, dec!(1));
        input.invoice_date = date;
        input.save_as_draft = true;

        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            // A loser of the unique-index race retries and draws a fresh
            // number; the retry budget bounds how often that may happen.
            for _ in 0..WRITERS {
                match repo.create_invoice(input.clone()).await {
                    Ok(sale) => return sale.invoice.invoice_number,
                    Err(InvoiceError::Database(e))
                        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            panic!("retry budget exhausted");
        }));
    }

    let mut numbers = Vec::with_capacity(WRITERS);
    for handle in handles {
        numbers.push(handle.await.expect("writer task"));
    }

    let distinct: HashSet<&String> = numbers.iter().collect();
    assert_eq!(distinct.len(), WRITERS);
    for number in &numbers {
        assert!(number.starts_with("INV-20320619-"));
    }
}

#[tokio::test]
async fn test_purchase_receive_is_once_only() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let fixture = seed_fixture(&db, dec!(1)).await;
    // The orchestrator needs an Inventory account and a supplier account.
    seed_account(&db, "Inventory").await;
    let supplier_account = seed_account(&db, "Payable").await;
    let supplier = suppliers::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Flow Test Supplier".to_string()),
        account_id: Set(supplier_account.id),
        deleted_at: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&db)
    .await
    .expect("insert supplier");

    let repo = PurchaseRepository::new(db.clone());
    let order = repo
        .create(CreatePurchaseOrderInput {
            order_number: format!("PO-{}", Uuid::new_v4().simple()),
            supplier_id: supplier.id,
            order_date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
            remarks: None,
            acting_user: Some(fixture.operator.username.clone()),
            items: vec![PurchaseItemInput {
                product_id: fixture.product.id,
                quantity: dec!(12),
                unit_price: dec!(6),
                uom_id: None,
            }],
        })
        .await
        .expect("create order");
    assert_eq!(order.order.status, "DRAFT");
    assert_eq!(order.order.total_amount, dec!(72));

    let received = repo
        .receive(order.order.id, Some(&fixture.operator.username))
        .await
        .expect("receive");
    assert_eq!(received.order.status, "RECEIVED");

    let product = products::Entity::find_by_id(fixture.product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.current_stock, dec!(13));

    let postings = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::RefId.eq(order.order.id))
        .all(&db)
        .await
        .expect("query");
    assert_eq!(postings.len(), 2);
    let debit = postings
        .iter()
        .find(|e| e.debit_amount > Decimal::ZERO)
        .expect("debit leg");
    let debited = accounts::Entity::find_by_id(debit.account_id)
        .one(&db)
        .await
        .expect("query")
        .expect("account");
    assert_eq!(debited.account_type, "Inventory");
    assert_eq!(debit.debit_amount, dec!(72));
    assert_eq!(debit.voucher_no, format!("PO-{}", order.order.order_number));

    let err = repo
        .receive(order.order.id, None)
        .await
        .expect_err("second receive must fail");
    assert!(matches!(
        err,
        PurchaseError::AlreadyReceived(n) if n == order.order.order_number
    ));
}
