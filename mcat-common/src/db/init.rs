//! Database initialization
//!
//! Creates the database file on first run and brings every table up to the
//! schema declared in code. Safe to call on every startup.

use crate::catalog::ENTITIES;
use crate::db::schema::{ensure_table, ColumnDefinition};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Maximum pooled connections; each request holds at most one at a time
const MAX_CONNECTIONS: u32 = 10;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Applied to every pooled connection, not just the first
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create or update every table (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    ensure_table(pool, "users", &users_columns()).await?;
    ensure_table(pool, "settings", &settings_columns()).await?;

    for descriptor in ENTITIES {
        ensure_table(pool, descriptor.table, &descriptor.columns()).await?;
    }

    Ok(())
}

fn users_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("id", "INTEGER").primary_key(),
        ColumnDefinition::new("username", "TEXT").not_null().unique(),
        ColumnDefinition::new("email", "TEXT").not_null().unique(),
        ColumnDefinition::new("full_name", "TEXT"),
        ColumnDefinition::new("hashed_password", "TEXT").not_null(),
        ColumnDefinition::new("disabled", "INTEGER").not_null().default("0"),
        ColumnDefinition::new("created_at", "TIMESTAMP")
            .not_null()
            .default("CURRENT_TIMESTAMP"),
    ]
}

/// Stores application key/value pairs such as the token signing secret
fn settings_columns() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("key", "TEXT").not_null().unique(),
        ColumnDefinition::new("value", "TEXT"),
        ColumnDefinition::new("updated_at", "TIMESTAMP")
            .not_null()
            .default("CURRENT_TIMESTAMP"),
    ]
}
