//! Posting engine and report engine tests against a live database.
//!
//! Skipped when no `DATABASE_URL` (or `TILLBOOK__DATABASE__URL`) is set.

use std::env;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use tillbook_core::ledger::{BalanceSide, PostingError, PostingInput};
use tillbook_db::entities::{accounts, ledger_entries};
use tillbook_db::migration::{Migrator, MigratorTrait};
use tillbook_db::repositories::{LedgerError, LedgerRepository};
use tillbook_shared::types::PageRequest;

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

async fn seed_account(db: &DatabaseConnection, account_type: &str) -> accounts::Model {
    let now = Utc::now().into();
    accounts::ActiveModel {
        id: Set(Uuid::new_v4()),
        account_code: Set(format!("T-{}", Uuid::new_v4().simple())),
        account_name: Set(format!("{account_type} test account")),
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

fn posting(
    debit: Uuid,
    credit: Uuid,
    amount: Decimal,
    date: NaiveDate,
    voucher: &str,
) -> PostingInput {
    PostingInput {
        voucher_no: voucher.to_string(),
        date,
        description: Some("test posting".to_string()),
        debit_account_id: debit,
        credit_account_id: credit,
        amount,
        ref_type: None,
        ref_id: None,
        created_by: None,
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
}

#[tokio::test]
async fn test_post_writes_balanced_pair_and_refreshes_cache() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let cash = seed_account(&db, "Cash").await;
    let revenue = seed_account(&db, "Revenue").await;
    let repo = LedgerRepository::new(db.clone());

    let posted = repo
        .post(posting(cash.id, revenue.id, dec!(150), day(15), "VOU-T-1"))
        .await
        .expect("post");

    assert_eq!(posted.debit.account_id, cash.id);
    assert_eq!(posted.debit.debit_amount, dec!(150));
    assert_eq!(posted.debit.credit_amount, Decimal::ZERO);
    assert_eq!(posted.credit.account_id, revenue.id);
    assert_eq!(posted.credit.credit_amount, dec!(150));
    assert!(posted.credit.entry_seq > posted.debit.entry_seq);

    let cash_after = accounts::Entity::find_by_id(cash.id)
        .one(&db)
        .await
        .expect("query")
        .expect("account");
    assert_eq!(cash_after.current_balance, dec!(150));
    assert_eq!(cash_after.balance_type, "Dr");

    let revenue_after = accounts::Entity::find_by_id(revenue.id)
        .one(&db)
        .await
        .expect("query")
        .expect("account");
    assert_eq!(revenue_after.current_balance, dec!(150));
    assert_eq!(revenue_after.balance_type, "Cr");
}

#[tokio::test]
async fn test_post_rejects_same_account_without_writing() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let account = seed_account(&db, "Cash").await;
    let repo = LedgerRepository::new(db.clone());

    let err = repo
        .post(posting(account.id, account.id, dec!(10), day(15), "VOU-T-2"))
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        LedgerError::Posting(PostingError::SameAccount)
    ));

    let count = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::AccountId.eq(account.id))
        .all(&db)
        .await
        .expect("query")
        .len();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn test_post_rejects_inactive_account() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let active = seed_account(&db, "Cash").await;
    let inactive = seed_account(&db, "Revenue").await;
    let mut dormant: accounts::ActiveModel = inactive.clone().into();
    dormant.is_active = Set(false);
    dormant.update(&db).await.expect("deactivate");

    let repo = LedgerRepository::new(db.clone());
    let err = repo
        .post(posting(active.id, inactive.id, dec!(10), day(15), "VOU-T-3"))
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        LedgerError::Posting(PostingError::AccountInactive(id)) if id == inactive.id
    ));
}

#[tokio::test]
async fn test_ledger_report_running_balance_and_opening() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let cash = seed_account(&db, "Cash").await;
    let revenue = seed_account(&db, "Revenue").await;
    let expense = seed_account(&db, "Expense").await;
    let repo = LedgerRepository::new(db.clone());

    // Before the window: cash opens at 100 Dr.
    repo.post(posting(cash.id, revenue.id, dec!(100), day(1), "VOU-T-4a"))
        .await
        .expect("post");
    // Inside the window: 100 Dr in, then 130 Cr out.
    repo.post(posting(cash.id, revenue.id, dec!(100), day(10), "VOU-T-4b"))
        .await
        .expect("post");
    repo.post(posting(expense.id, cash.id, dec!(130), day(12), "VOU-T-4c"))
        .await
        .expect("post");

    let result = repo
        .ledger_report(cash.id, day(5), day(20), PageRequest::default())
        .await
        .expect("report");
    let report = result.report;

    assert_eq!(report.opening_balance, dec!(100));
    assert_eq!(report.opening_balance_type, BalanceSide::Debit);
    assert_eq!(report.total_elements, 2);
    assert_eq!(report.entries[0].running_balance, dec!(200));
    assert_eq!(report.entries[0].balance_type, BalanceSide::Debit);
    assert_eq!(report.entries[1].running_balance, dec!(70));
    assert_eq!(report.entries[1].balance_type, BalanceSide::Debit);
    assert_eq!(report.closing_balance, dec!(70));
    assert_eq!(report.closing_balance_type, BalanceSide::Debit);
    assert_eq!(report.total_debit, dec!(100));
    assert_eq!(report.total_credit, dec!(130));
}

#[tokio::test]
async fn test_report_for_unknown_account() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let repo = LedgerRepository::new(db);
    let missing = Uuid::new_v4();
    let err = repo
        .ledger_report(missing, day(1), day(20), PageRequest::default())
        .await
        .expect_err("must fail");
    assert!(matches!(err, LedgerError::AccountNotFound(id) if id == missing));
}

#[tokio::test]
async fn test_trial_balance_columns_stay_equal() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let cash = seed_account(&db, "Cash").await;
    let revenue = seed_account(&db, "Revenue").await;
    let repo = LedgerRepository::new(db.clone());

    repo.post(posting(cash.id, revenue.id, dec!(75), day(14), "VOU-T-5a"))
        .await
        .expect("post");
    repo.post(posting(cash.id, revenue.id, dec!(25), day(15), "VOU-T-5b"))
        .await
        .expect("post");

    let tb = repo.trial_balance(day(31)).await.expect("trial balance");

    // Every posting is a balanced pair, so the grand totals match no
    // matter what other tests have written.
    assert_eq!(tb.total_debit, tb.total_credit);

    let cash_row = tb
        .rows
        .iter()
        .find(|r| r.account_id == cash.id)
        .expect("cash row");
    assert_eq!(cash_row.debit, dec!(100));
    assert_eq!(cash_row.credit, Decimal::ZERO);

    // Zero-sum accounts never show up.
    assert!(tb.rows.iter().all(|r| {
        r.debit != Decimal::ZERO || r.credit != Decimal::ZERO
    }));
}
