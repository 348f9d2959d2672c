//! Shared test utilities for the economy engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults. Money helpers take whole
//! cents so fixtures stay exact.

use crate::{
    config::{
        database::{create_connection, create_tables},
        economy::EconomySettings,
    },
    core::{account, service::EconomyService},
    entities::{self, Account, Container, catalog_item, container, drop_table_entry},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, DatabaseConnection, Set, prelude::*, sea_query::Expr,
};
use std::{path::PathBuf, time::Duration};

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// is pinned to a single connection. Concurrent transactions in tests queue on
/// it and run one after another.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Creates a service with default settings over a fresh test database.
pub async fn setup_test_service() -> Result<EconomyService> {
    Ok(EconomyService::new(
        setup_test_db().await?,
        EconomySettings::default(),
    ))
}

/// A file-backed store shared by several pooled connections.
///
/// Transactions run on separate connections and contend for the `SQLite`
/// write lock, so lost races surface as busy errors and version conflicts the
/// way they do in production. The database files are removed on drop.
pub struct SharedTestStore {
    /// Service over the shared pool
    pub service: EconomyService,
    path: PathBuf,
}

impl Drop for SharedTestStore {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", self.path.display()));
        }
    }
}

/// Creates a [`SharedTestStore`] in the system temp directory.
///
/// # Settings
/// * `max_connections`: 5
/// * `max_attempts`: 20, with backoff from 5ms up to 200ms
/// * `store_timeout_ms`: 10 000
pub async fn setup_shared_test_service() -> Result<SharedTestStore> {
    let path = std::env::temp_dir().join(format!("skin_economy_{}.sqlite", Uuid::new_v4()));
    let settings = EconomySettings {
        max_connections: 5,
        max_attempts: 20,
        retry_backoff_ms: 5,
        max_backoff_ms: 200,
        store_timeout_ms: 10_000,
        ..EconomySettings::default()
    };
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = create_connection(&url, &settings).await?;
    create_tables(&db).await?;
    Ok(SharedTestStore {
        service: EconomyService::new(db, settings),
        path,
    })
}

/// Installs a test-writer tracing subscriber. Safe to call more than once.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("skin_economy=debug"))
        .with_test_writer()
        .try_init();
}

/// An amount given in cents.
#[must_use]
pub fn cents(amount: i64) -> Decimal {
    Decimal::new(amount, 2)
}

/// Opens an account with the given starting balance in cents.
pub async fn create_test_account(
    db: &DatabaseConnection,
    balance_cents: i64,
) -> Result<entities::account::Model> {
    account::open_account(db, Uuid::new_v4(), cents(balance_cents), Utc::now()).await
}

/// Creates a catalog skin valued between `min_cents` and `max_cents`.
///
/// # Defaults
/// * `weapon_type`: "Rifle"
/// * `image_url`, `description`: empty
pub async fn create_test_catalog_item(
    db: &DatabaseConnection,
    name: &str,
    rarity: &str,
    min_cents: i64,
    max_cents: i64,
) -> Result<catalog_item::Model> {
    catalog_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        weapon_type: Set("Rifle".to_string()),
        rarity: Set(rarity.to_string()),
        min_value: Set(cents(min_cents)),
        max_value: Set(cents(max_cents)),
        image_url: Set(String::new()),
        description: Set(String::new()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates an active container whose drop table lists `contents` in order.
pub async fn create_test_container(
    db: &DatabaseConnection,
    name: &str,
    price_cents: i64,
    contents: &[(Uuid, f64)],
) -> Result<container::Model> {
    let container = container::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        price: Set(cents(price_cents)),
        is_active: Set(true),
        image_url: Set(String::new()),
        description: Set(String::new()),
    }
    .insert(db)
    .await?;

    for (position, (item_id, weight)) in contents.iter().enumerate() {
        drop_table_entry::ActiveModel {
            container_id: Set(container.id),
            catalog_item_id: Set(*item_id),
            weight: Set(*weight),
            position: Set(i32::try_from(position).map_err(|_| Error::Config {
                message: "too many drop table entries".to_string(),
            })?),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    Ok(container)
}

/// Marks a container inactive.
pub async fn deactivate_container(db: &DatabaseConnection, container_id: Uuid) -> Result<()> {
    Container::update_many()
        .col_expr(container::Column::IsActive, Expr::value(false))
        .filter(container::Column::Id.eq(container_id))
        .exec(db)
        .await?;
    Ok(())
}

/// A container stocked with three skins of increasing rarity.
pub struct TestCase {
    /// The stocked container
    pub container: container::Model,
    /// Its skins, in drop table order
    pub skins: Vec<catalog_item::Model>,
}

impl TestCase {
    /// Ids of every skin the case can drop.
    pub fn skin_ids(&self) -> Vec<Uuid> {
        self.skins.iter().map(|skin| skin.id).collect()
    }
}

/// Creates a "Test Case" container at the given price.
///
/// # Contents
/// * "Common Skin" (Mil-Spec, 1.00 - 5.00), weight 80
/// * "Rare Skin" (Classified, 10.00 - 40.00), weight 15
/// * "Covert Skin" (Covert, 50.00 - 200.00), weight 5
pub async fn create_test_case(db: &DatabaseConnection, price_cents: i64) -> Result<TestCase> {
    let skins = vec![
        create_test_catalog_item(db, "Common Skin", "Mil-Spec", 100, 500).await?,
        create_test_catalog_item(db, "Rare Skin", "Classified", 1_000, 4_000).await?,
        create_test_catalog_item(db, "Covert Skin", "Covert", 5_000, 20_000).await?,
    ];
    let contents = [(skins[0].id, 80.0), (skins[1].id, 15.0), (skins[2].id, 5.0)];
    let container = create_test_container(db, "Test Case", price_cents, &contents).await?;
    Ok(TestCase { container, skins })
}

/// Test database, an account holding 100.00 and a test case priced 25.00.
pub async fn setup_with_case() -> Result<(DatabaseConnection, entities::account::Model, TestCase)> {
    let db = setup_test_db().await?;
    let account = create_test_account(&db, 10_000).await?;
    let case = create_test_case(&db, 2_500).await?;
    Ok((db, account, case))
}

/// Stored balance, bypassing the service.
pub async fn balance_of(db: &DatabaseConnection, account_id: Uuid) -> Result<Decimal> {
    account::get_balance(db, account_id).await
}

/// Sets the frozen flag directly.
pub async fn freeze_account(db: &DatabaseConnection, account_id: Uuid) -> Result<()> {
    Account::update_many()
        .col_expr(entities::account::Column::IsFrozen, Expr::value(true))
        .filter(entities::account::Column::Id.eq(account_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Overwrites a balance without a ledger entry, breaking reconciliation.
pub async fn corrupt_balance(
    db: &DatabaseConnection,
    account_id: Uuid,
    balance: Decimal,
) -> Result<()> {
    Account::update_many()
        .col_expr(entities::account::Column::Balance, Expr::value(balance))
        .filter(entities::account::Column::Id.eq(account_id))
        .exec(db)
        .await?;
    Ok(())
}
