//! Concurrent access tests for the inventory mutator.
//!
//! Two simultaneous OUT movements that together exceed the available
//! stock must resolve to exactly one success and one
//! `InsufficientStock`, with the final stock reflecting only the winner.
//!
//! These tests need a live Postgres database; they skip when no
//! `DATABASE_URL` (or `TILLBOOK__DATABASE__URL`) is set.

use std::env;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tokio::sync::Barrier;
use uuid::Uuid;

use tillbook_core::inventory::{InventoryError, MovementDirection, MovementLine};
use tillbook_db::entities::{products, units_of_measure};
use tillbook_db::migration::{Migrator, MigratorTrait};
use tillbook_db::repositories::{MovementInput, MovementReference, StockError, StockRepository};

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

async fn seed_product(db: &DatabaseConnection, stock: rust_decimal::Decimal) -> products::Model {
    let now = Utc::now().into();

    let uom = units_of_measure::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Each".to_string()),
        created_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert uom");

    products::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(format!("SKU-{}", Uuid::new_v4().simple())),
        name: Set("Concurrent Test Product".to_string()),
        uom_id: Set(uom.id),
        current_stock: Set(stock),
        cost_price: Set(dec!(5)),
        selling_price: Set(dec!(8)),
        deleted_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("insert product")
}

fn out_movement(product_id: Uuid, quantity: rust_decimal::Decimal) -> MovementInput {
    MovementInput {
        direction: MovementDirection::Out,
        transaction_date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
        description: None,
        user_id: None,
        lines: vec![MovementLine {
            product_id,
            quantity,
            price_at_transaction: dec!(8),
            uom_id: None,
        }],
        reference: MovementReference::Manual,
    }
}

#[tokio::test]
async fn test_concurrent_stock_out_one_wins() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    // 10 units in stock, two concurrent OUTs of 6 each: only one fits.
    let product = seed_product(&db, dec!(10)).await;
    let repo = StockRepository::new(db.clone());
    let barrier = Arc::new(Barrier::new(2));

    let mut handles = Vec::new();
    for _ in 0..2 {
        let repo = repo.clone();
        let barrier = Arc::clone(&barrier);
        let product_id = product.id;
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            repo.apply_movement(out_movement(product_id, dec!(6))).await
        }));
    }

    let mut successes = 0;
    let mut shortfalls = 0;
    for handle in handles {
        match handle.await.expect("task join") {
            Ok(_) => successes += 1,
            Err(StockError::Inventory(InventoryError::InsufficientStock {
                available,
                requested,
                ..
            })) => {
                assert_eq!(available, dec!(4));
                assert_eq!(requested, dec!(6));
                shortfalls += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(shortfalls, 1);

    let after = products::Entity::find_by_id(product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(after.current_stock, dec!(4));
}

#[tokio::test]
async fn test_stock_out_shortfall_leaves_no_trace() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let product = seed_product(&db, dec!(3)).await;
    let repo = StockRepository::new(db.clone());

    let err = repo
        .apply_movement(out_movement(product.id, dec!(5)))
        .await
        .expect_err("must fail");
    match err {
        StockError::Inventory(InventoryError::InsufficientStock {
            product_code,
            available,
            requested,
        }) => {
            assert_eq!(product_code, product.code);
            assert_eq!(available, dec!(3));
            assert_eq!(requested, dec!(5));
        }
        other => panic!("unexpected error: {other}"),
    }

    let after = products::Entity::find_by_id(product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(after.current_stock, dec!(3));
}

#[tokio::test]
async fn test_stock_in_records_signed_change() {
    let Some(db) = connect_or_skip().await else {
        return;
    };

    let product = seed_product(&db, dec!(1)).await;
    let repo = StockRepository::new(db.clone());

    let movement = repo
        .apply_movement(MovementInput {
            direction: MovementDirection::In,
            transaction_date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
            description: Some("Opening stock".to_string()),
            user_id: None,
            lines: vec![MovementLine {
                product_id: product.id,
                quantity: dec!(9),
                price_at_transaction: dec!(5),
                uom_id: None,
            }],
            reference: MovementReference::Manual,
        })
        .await
        .expect("stock in");

    assert!(movement.header.record_no.starts_with("ST-IN-"));
    assert_eq!(movement.header.transaction_type, "STOCK_IN");
    assert_eq!(movement.items.len(), 1);
    assert_eq!(movement.items[0].quantity_change, dec!(9));

    let after = products::Entity::find_by_id(product.id)
        .one(&db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(after.current_stock, dec!(10));
}
