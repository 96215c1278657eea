//! Ad-hoc read-only SQL over the cache file.

use crate::StorageError;
use alloy_primitives::Bytes;
use quarry_types::Value;
use rusqlite::{Connection, types::ValueRef};

/// Column names and rows returned by a raw SQL statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawQueryResult {
    /// Result column names, in statement order.
    pub columns: Vec<String>,
    /// Result rows; each row has one value per column.
    pub rows: Vec<Vec<Value>>,
}

/// Runs a single read-only statement and collects its rows.
pub(crate) fn run(conn: &Connection, sql: &str) -> Result<RawQueryResult, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        return Err(StorageError::ReadOnly);
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(to_value(row.get_ref(i)?));
        }
        rows.push(values);
    }
    Ok(RawQueryResult { columns, rows })
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(Bytes::copy_from_slice(b)),
    }
}
