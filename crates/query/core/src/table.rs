//! Tabular query results.

use quarry_storage::RawQueryResult;
use quarry_types::{Record, Records, Value};
use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeSeq};
use std::fmt;
use tabled::{builder::Builder, settings::Style};

/// The result of a query: named columns and rows of [`Value`]s.
///
/// Displays as a table and serializes to JSON as an array of objects keyed
/// by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl QueryTable {
    /// Creates a table from columns and rows. Every row must have one value
    /// per column.
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Projects `records` onto `columns`.
    ///
    /// Columns a record does not have are filled with [`Value::Null`].
    pub fn from_records(records: &Records, columns: Vec<String>) -> Self {
        let rows = match records {
            Records::Blocks(blocks) => project(blocks, &columns),
            Records::Transactions(txs) => project(txs, &columns),
            Records::ContractEvents(events) => project(events, &columns),
        };
        Self { columns, rows }
    }

    /// The column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The rows, each with one value per column.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the values of the named column, or `None` if there is no such
    /// column.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

fn project<R: Record>(records: &[R], columns: &[String]) -> Vec<Vec<Value>> {
    records
        .iter()
        .map(|record| {
            columns.iter().map(|c| record.value(c).unwrap_or(Value::Null)).collect()
        })
        .collect()
}

impl From<RawQueryResult> for QueryTable {
    fn from(result: RawQueryResult) -> Self {
        Self::new(result.columns, result.rows)
    }
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().cloned());
        for row in &self.rows {
            builder.push_record(row.iter().map(ToString::to_string));
        }
        let mut table = builder.build();
        table.with(Style::modern());
        write!(f, "{table}")
    }
}

impl Serialize for QueryTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Row { columns: &self.columns, values: row })?;
        }
        seq.end()
    }
}

struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl Serialize for Row<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_providers_alloy::test_utils::block;

    fn table() -> QueryTable {
        let records = Records::Blocks(vec![block(1), block(2)]);
        QueryTable::from_records(&records, vec!["number".into(), "num_transactions".into()])
    }

    #[test]
    fn test_projection() {
        let table = table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.columns(), ["number", "num_transactions"]);
        assert_eq!(table.column("number").unwrap(), vec![&Value::from(1u64), &Value::from(2u64)]);
        assert!(table.column("hash").is_none());
    }

    #[test]
    fn test_json_is_array_of_objects() {
        let json = serde_json::to_value(table()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "number": 1, "num_transactions": 1 },
                { "number": 2, "num_transactions": 2 },
            ])
        );
    }

    #[test]
    fn test_display_contains_header_and_cells() {
        let rendered = table().to_string();
        assert!(rendered.contains("num_transactions"));
        assert!(rendered.lines().count() >= 4);
    }
}
