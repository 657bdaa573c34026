//! SQL access for catalog tables
//!
//! All statements are assembled from descriptor identifiers, which are
//! compile-time constants; user input only ever travels as bound values.

use super::{EntityDescriptor, FieldKind, FieldValue, Record};
use crate::attachments::StoredAttachment;
use crate::Result;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{query::Query, Row, Sqlite, SqliteExecutor};

fn select_columns(d: &EntityDescriptor) -> String {
    let mut columns = vec![d.id_column];
    columns.extend(d.fields.iter().map(|f| f.column));
    columns.push("attachment_key");
    columns.push("attachment_name");
    columns.join(", ")
}

fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [FieldValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            FieldValue::Text(s) => query.bind(s.as_str()),
            FieldValue::Integer(i) => query.bind(*i),
        };
    }
    query
}

fn record_from_row(d: &EntityDescriptor, row: &SqliteRow) -> Result<Record> {
    let id: i64 = row.try_get(0)?;
    let mut values = Vec::with_capacity(d.fields.len());
    for (i, spec) in d.fields.iter().enumerate() {
        let value = match spec.kind {
            FieldKind::Text => FieldValue::Text(row.try_get(i + 1)?),
            FieldKind::Integer => FieldValue::Integer(row.try_get(i + 1)?),
        };
        values.push(value);
    }
    let key: Option<String> = row.try_get(d.fields.len() + 1)?;
    let original_name: Option<String> = row.try_get(d.fields.len() + 2)?;

    Ok(Record {
        id,
        values,
        attachment: key.map(|key| StoredAttachment { key, original_name }),
    })
}

/// Escape LIKE wildcards so the query matches literally
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Every row, ordered by id
pub async fn list_all<'e>(
    executor: impl SqliteExecutor<'e>,
    d: &EntityDescriptor,
) -> Result<Vec<Record>> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_columns(d),
        d.table,
        d.id_column
    );
    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(|row| record_from_row(d, row)).collect()
}

/// One row by id
pub async fn find_by_id<'e>(
    executor: impl SqliteExecutor<'e>,
    d: &EntityDescriptor,
    id: i64,
) -> Result<Option<Record>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?",
        select_columns(d),
        d.table,
        d.id_column
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
    row.as_ref().map(|row| record_from_row(d, row)).transpose()
}

/// Rows whose search column contains `query` (SQLite LIKE, ASCII case-insensitive)
pub async fn search<'e>(
    executor: impl SqliteExecutor<'e>,
    d: &EntityDescriptor,
    query: &str,
) -> Result<Vec<Record>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} LIKE ? ESCAPE '\\' ORDER BY {}",
        select_columns(d),
        d.table,
        d.search_column,
        d.id_column
    );
    let rows = sqlx::query(&sql)
        .bind(like_pattern(query))
        .fetch_all(executor)
        .await?;
    rows.iter().map(|row| record_from_row(d, row)).collect()
}

/// Insert a row and return it with its generated id
pub async fn insert<'e>(
    executor: impl SqliteExecutor<'e>,
    d: &EntityDescriptor,
    values: Vec<FieldValue>,
    attachment: Option<StoredAttachment>,
) -> Result<Record> {
    let columns: Vec<&str> = d.fields.iter().map(|f| f.column).collect();
    let placeholders = vec!["?"; columns.len() + 2].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}, attachment_key, attachment_name) VALUES ({})",
        d.table,
        columns.join(", "),
        placeholders
    );

    let (key, name) = match &attachment {
        Some(a) => (Some(a.key.as_str()), a.original_name.as_deref()),
        None => (None, None),
    };
    let id = bind_values(sqlx::query(&sql), &values)
        .bind(key)
        .bind(name)
        .execute(executor)
        .await?
        .last_insert_rowid();

    Ok(Record {
        id,
        values,
        attachment,
    })
}

/// Overwrite every field and the attachment columns of an existing row
///
/// Returns false when no row has this id.
pub async fn update<'e>(
    executor: impl SqliteExecutor<'e>,
    d: &EntityDescriptor,
    id: i64,
    values: &[FieldValue],
    attachment: Option<&StoredAttachment>,
) -> Result<bool> {
    let assignments: Vec<String> = d
        .fields
        .iter()
        .map(|f| format!("{} = ?", f.column))
        .collect();
    let sql = format!(
        "UPDATE {} SET {}, attachment_key = ?, attachment_name = ? WHERE {} = ?",
        d.table,
        assignments.join(", "),
        d.id_column
    );

    let result = bind_values(sqlx::query(&sql), values)
        .bind(attachment.map(|a| a.key.as_str()))
        .bind(attachment.and_then(|a| a.original_name.as_deref()))
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Clear the attachment columns of a row, leaving its fields untouched
pub async fn detach_attachment<'e>(
    executor: impl SqliteExecutor<'e>,
    d: &EntityDescriptor,
    id: i64,
) -> Result<bool> {
    let sql = format!(
        "UPDATE {} SET attachment_key = NULL, attachment_name = NULL WHERE {} = ?",
        d.table, d.id_column
    );
    let result = sqlx::query(&sql).bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a row; returns false when no row has this id
pub async fn delete<'e>(
    executor: impl SqliteExecutor<'e>,
    d: &EntityDescriptor,
    id: i64,
) -> Result<bool> {
    let sql = format!("DELETE FROM {} WHERE {} = ?", d.table, d.id_column);
    let result = sqlx::query(&sql).bind(id).execute(executor).await?;
    Ok(result.rows_affected() > 0)
}

/// Delete every row of a table
pub async fn clear<'e>(executor: impl SqliteExecutor<'e>, d: &EntityDescriptor) -> Result<u64> {
    let sql = format!("DELETE FROM {}", d.table);
    let result = sqlx::query(&sql).execute(executor).await?;
    Ok(result.rows_affected())
}

/// Number of rows in the table
pub async fn count<'e>(executor: impl SqliteExecutor<'e>, d: &EntityDescriptor) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", d.table);
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(executor).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Hits"), "%Hits%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn test_select_columns() {
        assert_eq!(
            select_columns(&super::super::SONG),
            "id, name, genre, attachment_key, attachment_name"
        );
    }
}
