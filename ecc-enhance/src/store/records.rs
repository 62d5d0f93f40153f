//! Record repository
//!
//! Every function works on a plain connection so the same code runs on a
//! pooled connection or inside an import transaction. Column names in the
//! generated SQL only ever come from the static field allow-lists in
//! [`EntityKind::fields`]; values are always bound.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::entity::{EntityKind, FieldMap, Record};

fn select_columns(kind: EntityKind) -> String {
    format!("id, {}", kind.fields().join(", "))
}

fn record_from_row(kind: EntityKind, row: &SqliteRow) -> Result<Record, sqlx::Error> {
    let mut fields = FieldMap::new();
    for field in kind.fields() {
        let value: String = row.try_get(*field)?;
        fields.insert((*field).to_string(), value);
    }
    Ok(Record {
        id: row.try_get("id")?,
        fields,
    })
}

/// Allow-listed (column, value) pairs present in `fields`, in storage order
fn known_columns<'a>(kind: EntityKind, fields: &'a FieldMap) -> Vec<(&'static str, &'a str)> {
    kind.fields()
        .iter()
        .filter_map(|field| fields.get(*field).map(|value| (*field, value.as_str())))
        .collect()
}

/// First record (lowest id) whose natural key equals `key` exactly
pub async fn find_by_key(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    key: &str,
) -> Result<Option<Record>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ? ORDER BY id LIMIT 1",
        select_columns(kind),
        kind.table(),
        kind.natural_key()
    );
    let row = sqlx::query(&sql).bind(key).fetch_optional(&mut *conn).await?;
    row.map(|row| record_from_row(kind, &row)).transpose()
}

pub async fn get(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: i64,
) -> Result<Option<Record>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?",
        select_columns(kind),
        kind.table()
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;
    row.map(|row| record_from_row(kind, &row)).transpose()
}

/// Insert a record; fields not supplied take the column default ("")
pub async fn insert(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    fields: &FieldMap,
) -> Result<i64, sqlx::Error> {
    let columns = known_columns(kind, fields);

    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", kind.table())
    } else {
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            kind.table(),
            names.join(", "),
            placeholders
        )
    };

    let mut query = sqlx::query(&sql);
    for (_, value) in &columns {
        query = query.bind(*value);
    }
    let result = query.execute(&mut *conn).await?;

    Ok(result.last_insert_rowid())
}

/// Overwrite exactly the supplied fields. Returns false if `id` is absent.
pub async fn update_fields(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: i64,
    fields: &FieldMap,
) -> Result<bool, sqlx::Error> {
    let columns = known_columns(kind, fields);
    if columns.is_empty() {
        return Ok(get(conn, kind, id).await?.is_some());
    }

    let assignments: Vec<String> = columns
        .iter()
        .map(|(name, _)| format!("{} = ?", name))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?",
        kind.table(),
        assignments.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in &columns {
        query = query.bind(*value);
    }
    let result = query.bind(id).execute(&mut *conn).await?;

    Ok(result.rows_affected() > 0)
}

/// Returns false if `id` is absent
pub async fn delete(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
    let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(conn: &mut SqliteConnection, kind: EntityKind) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
    let (total,): (i64,) = sqlx::query_as(&sql).fetch_one(&mut *conn).await?;
    Ok(total)
}

pub async fn list_page(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    limit: i64,
    offset: i64,
) -> Result<Vec<Record>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id LIMIT ? OFFSET ?",
        select_columns(kind),
        kind.table()
    );
    let rows = sqlx::query(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(|row| record_from_row(kind, row)).collect()
}

/// Every record of a category in id order
pub async fn list_all(
    conn: &mut SqliteConnection,
    kind: EntityKind,
) -> Result<Vec<Record>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id",
        select_columns(kind),
        kind.table()
    );
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    rows.iter().map(|row| record_from_row(kind, row)).collect()
}
