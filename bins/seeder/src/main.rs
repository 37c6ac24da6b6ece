//! Database seeder for Tillbook development and testing.
//!
//! Seeds the base chart of accounts, a default unit of measure, an
//! operator user, and a handful of demo products, customers, and
//! suppliers so a fresh database can take a sale immediately.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use tillbook_db::entities::{accounts, customers, products, suppliers, units_of_measure, users};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = tillbook_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding chart of accounts...");
    seed_base_accounts(&db).await;

    println!("Seeding unit of measure...");
    let uom_id = seed_default_uom(&db).await;

    println!("Seeding operator user...");
    seed_operator(&db).await;

    println!("Seeding demo products...");
    seed_products(&db, uom_id).await;

    println!("Seeding demo customers...");
    seed_customers(&db).await;

    println!("Seeding demo suppliers...");
    seed_suppliers(&db).await;

    println!("Seeding complete!");
}

/// Inserts an account if no account with the same code exists.
///
/// Returns the id of the existing or newly created row.
async fn ensure_account(
    db: &DatabaseConnection,
    code: &str,
    name: &str,
    account_type: &str,
) -> Uuid {
    if let Some(existing) = accounts::Entity::find()
        .filter(accounts::Column::AccountCode.eq(code))
        .one(db)
        .await
        .ok()
        .flatten()
    {
        println!("  Account {code} already exists, skipping...");
        return existing.id;
    }

    let id = Uuid::new_v4();
    let account = accounts::ActiveModel {
        id: Set(id),
        account_code: Set(code.to_string()),
        account_name: Set(name.to_string()),
        account_type: Set(account_type.to_string()),
        current_balance: Set(Decimal::ZERO),
        balance_type: Set("Dr".to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
        updated_at: Set(Utc::now().into()),
    };

    if let Err(e) = account.insert(db).await {
        eprintln!("Failed to insert account {code}: {e}");
    } else {
        println!("  Created account {code} ({name})");
    }

    id
}

/// Seeds the accounts the posting orchestrators depend on.
///
/// Sales post against the first active Revenue account and purchase
/// receipts against the first active Inventory account, so both must
/// exist before any document completes.
async fn seed_base_accounts(db: &DatabaseConnection) {
    ensure_account(db, "CASH01", "Cash in Hand", "Cash").await;
    ensure_account(db, "REV001", "Sales Revenue", "Revenue").await;
    ensure_account(db, "INV001", "Inventory on Hand", "Inventory").await;
}

/// Seeds the default "Each" unit and returns its id.
async fn seed_default_uom(db: &DatabaseConnection) -> Uuid {
    if let Some(existing) = units_of_measure::Entity::find()
        .filter(units_of_measure::Column::Name.eq("Each"))
        .one(db)
        .await
        .ok()
        .flatten()
    {
        println!("  Unit 'Each' already exists, skipping...");
        return existing.id;
    }

    let id = Uuid::new_v4();
    let uom = units_of_measure::ActiveModel {
        id: Set(id),
        name: Set("Each".to_string()),
        created_at: Set(Utc::now().into()),
    };

    if let Err(e) = uom.insert(db).await {
        eprintln!("Failed to insert unit of measure: {e}");
    } else {
        println!("  Created unit 'Each'");
    }

    id
}

/// Seeds the default operator user.
async fn seed_operator(db: &DatabaseConnection) {
    if users::Entity::find()
        .filter(users::Column::Username.eq("admin"))
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Operator 'admin' already exists, skipping...");
        return;
    }

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set("admin".to_string()),
        full_name: Set(Some("Administrator".to_string())),
        deleted_at: Set(None),
        created_at: Set(Utc::now().into()),
    };

    if let Err(e) = user.insert(db).await {
        eprintln!("Failed to insert operator: {e}");
    } else {
        println!("  Created operator 'admin'");
    }
}

/// Seeds a few demo products with opening stock.
async fn seed_products(db: &DatabaseConnection, uom_id: Uuid) {
    let demo = [
        ("SKU-0001", "Espresso Beans 1kg", dec!(40), dec!(9.50), dec!(15.00)),
        ("SKU-0002", "Filter Paper Pack", dec!(120), dec!(1.20), dec!(2.50)),
        ("SKU-0003", "Ceramic Mug", dec!(60), dec!(3.00), dec!(7.00)),
    ];

    let mut inserted = 0;
    for (code, name, stock, cost, selling) in demo {
        if products::Entity::find()
            .filter(products::Column::Code.eq(code))
            .one(db)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            println!("  Product {code} already exists, skipping...");
            continue;
        }

        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            uom_id: Set(uom_id),
            current_stock: Set(stock),
            cost_price: Set(cost),
            selling_price: Set(selling),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        };

        if let Err(e) = product.insert(db).await {
            eprintln!("Failed to insert product {code}: {e}");
        } else {
            inserted += 1;
        }
    }

    println!("  Inserted {inserted} products");
}

/// Seeds demo credit customers, each with its own receivable account.
async fn seed_customers(db: &DatabaseConnection) {
    let demo = [
        ("Riverside Cafe", "AR-1001"),
        ("Hilltop Deli", "AR-1002"),
    ];

    let mut inserted = 0;
    for (name, account_code) in demo {
        if customers::Entity::find()
            .filter(customers::Column::Name.eq(name))
            .one(db)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            println!("  Customer {name} already exists, skipping...");
            continue;
        }

        let account_id = ensure_account(db, account_code, name, "Receivable").await;

        let customer = customers::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            account_id: Set(account_id),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = customer.insert(db).await {
            eprintln!("Failed to insert customer {name}: {e}");
        } else {
            inserted += 1;
        }
    }

    println!("  Inserted {inserted} customers");
}

/// Seeds demo suppliers, each with its own payable account.
async fn seed_suppliers(db: &DatabaseConnection) {
    let demo = [
        ("Bean Importers Ltd", "AP-2001"),
        ("Paper Goods Co", "AP-2002"),
    ];

    let mut inserted = 0;
    for (name, account_code) in demo {
        if suppliers::Entity::find()
            .filter(suppliers::Column::Name.eq(name))
            .one(db)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            println!("  Supplier {name} already exists, skipping...");
            continue;
        }

        let account_id = ensure_account(db, account_code, name, "Payable").await;

        let supplier = suppliers::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            account_id: Set(account_id),
            deleted_at: Set(None),
            created_at: Set(Utc::now().into()),
        };

        if let Err(e) = supplier.insert(db).await {
            eprintln!("Failed to insert supplier {name}: {e}");
        } else {
            inserted += 1;
        }
    }

    println!("  Inserted {inserted} suppliers");
}
