//! The `--format` flag.

use clap::ValueEnum;
use quarry_query::QueryTable;

/// How tabular results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// A text table.
    #[default]
    Table,
    /// A JSON array with one object per row.
    Json,
}

impl OutputFormat {
    /// Renders `table` in this format.
    pub fn render(self, table: &QueryTable) -> anyhow::Result<String> {
        Ok(match self {
            Self::Table => table.to_string(),
            Self::Json => serde_json::to_string_pretty(table)?,
        })
    }
}
