//! Declarative table schemas
//!
//! Tables are described by a list of [`ColumnDefinition`]s. On startup each
//! table is created if missing, then any column added to the definition
//! since the table was created is appended with `ALTER TABLE ADD COLUMN`.
//!
//! ```rust,ignore
//! let columns = vec![
//!     ColumnDefinition::new("id", "INTEGER").primary_key(),
//!     ColumnDefinition::new("title", "TEXT").not_null(),
//! ];
//! ensure_table(&pool, "albums", &columns).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// INTEGER PRIMARY KEY AUTOINCREMENT
    pub primary_key: bool,
    /// UNIQUE constraint
    pub unique: bool,
    /// DEFAULT value (raw SQL)
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    /// Mark column as auto-incrementing PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark column as UNIQUE
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set DEFAULT value
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause as used in CREATE TABLE / ADD COLUMN
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY AUTOINCREMENT");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }

    /// SQLite cannot add PRIMARY KEY or UNIQUE columns, NOT NULL without a
    /// default, or a non-constant default
    fn can_add_later(&self) -> bool {
        let constant_default = self
            .default_value
            .as_deref()
            .map_or(true, |d| !d.to_uppercase().starts_with("CURRENT_"));
        !self.primary_key
            && !self.unique
            && constant_default
            && (!self.not_null || self.default_value.is_some())
    }
}

/// CREATE TABLE IF NOT EXISTS statement for a column list
pub fn create_table_sql(table_name: &str, columns: &[ColumnDefinition]) -> String {
    let body: Vec<String> = columns.iter().map(ColumnDefinition::to_sql).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        table_name,
        body.join(",\n    ")
    )
}

/// Create the table if needed and add columns missing from an older table
pub async fn ensure_table(
    pool: &SqlitePool,
    table_name: &str,
    columns: &[ColumnDefinition],
) -> Result<()> {
    sqlx::query(&create_table_sql(table_name, columns))
        .execute(pool)
        .await?;

    let existing = existing_columns(pool, table_name).await?;
    for column in columns {
        if existing.iter().any(|name| name == &column.name) {
            continue;
        }
        if !column.can_add_later() {
            warn!(
                "Table '{}' lacks column '{}' which cannot be added in place",
                table_name, column.name
            );
            continue;
        }
        let sql = format!("ALTER TABLE {} ADD COLUMN {}", table_name, column.to_sql());
        sqlx::query(&sql).execute(pool).await?;
        info!("Added column '{}' to table '{}'", column.name, table_name);
    }

    Ok(())
}

/// Column names of an existing table, in declaration order
pub async fn existing_columns(pool: &SqlitePool, table_name: &str) -> Result<Vec<String>> {
    let query = format!("PRAGMA table_info({})", table_name);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut columns: Vec<(i64, String)> = rows
        .iter()
        .map(|row| (row.get::<i64, _>("cid"), row.get::<String, _>("name")))
        .collect();
    columns.sort_by_key(|(cid, _)| *cid);

    Ok(columns.into_iter().map(|(_, name)| name).collect())
}
