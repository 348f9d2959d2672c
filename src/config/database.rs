//! Database configuration module for the economy engine.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL.

use crate::config::economy::EconomySettings;
use crate::entities::{
    Account, CatalogItem, Container, DropTableEntry, InventoryItem, LedgerEntry, OwnedContainer,
};
use crate::errors::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::time::Duration;
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/skin_economy.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection pool sized and timed by the economy settings.
///
/// The acquire timeout doubles as the store's standard timeout: a request that
/// cannot get a connection in time fails with a transient error.
#[instrument(skip(settings))]
pub async fn create_connection(
    database_url: &str,
    settings: &EconomySettings,
) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_millis(settings.store_timeout_ms))
        .sqlx_logging(false);

    debug!("Connecting to {}", database_url);
    Database::connect(options).await.map_err(Into::into)
}

/// Creates all economy tables from the entity definitions.
///
/// Referenced tables are created before the tables holding foreign keys to them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(Account),
        schema.create_table_from_entity(CatalogItem),
        schema.create_table_from_entity(Container),
        schema.create_table_from_entity(DropTableEntry),
        schema.create_table_from_entity(OwnedContainer),
        schema.create_table_from_entity(InventoryItem),
        schema.create_table_from_entity(LedgerEntry),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }

    info!("Economy tables ensured");
    Ok(())
}
