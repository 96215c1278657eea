//! The [`QuerySpec`] value object.

use crate::{BlockRange, EntityKind};
use std::{convert::Infallible, str::FromStr};

/// The columns requested by a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Columns {
    /// Every default column of the entity kind (`*`).
    #[default]
    All,
    /// An explicit list of column names, in output order.
    Named(Vec<String>),
}

impl Columns {
    /// Resolves the requested columns against the kind's schema.
    ///
    /// Returns the first unknown column name as the error value.
    pub fn resolve(&self, kind: &EntityKind) -> Result<Vec<String>, String> {
        match self {
            Self::All => Ok(kind.default_columns()),
            Self::Named(names) => {
                let available = kind.columns();
                names
                    .iter()
                    .map(|name| {
                        if available.contains(name) { Ok(name.clone()) } else { Err(name.clone()) }
                    })
                    .collect()
            }
        }
    }
}

impl FromStr for Columns {
    type Err = Infallible;

    /// Parses `*` (or an empty string) as [`Columns::All`] and a comma
    /// separated list as [`Columns::Named`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::All);
        }
        Ok(Self::Named(
            s.split(',').map(str::trim).filter(|c| !c.is_empty()).map(String::from).collect(),
        ))
    }
}

/// Describes a slice of chain data to fetch.
///
/// A [`QuerySpec`] lives for a single call: it is built by the caller, handed
/// to the query manager and dropped once the result is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// What to fetch.
    pub kind: EntityKind,
    /// Which columns to return.
    pub columns: Columns,
    /// The block interval, inclusive start and exclusive stop.
    pub range: BlockRange,
    /// An optional row filter expression, applied after fetching.
    pub filter: Option<String>,
    /// Keep only every `step`-th block counted from the range start.
    pub step: u64,
}

impl QuerySpec {
    /// Creates a spec returning every column of `kind` over `range`.
    pub const fn new(kind: EntityKind, range: BlockRange) -> Self {
        Self { kind, columns: Columns::All, range, filter: None, step: 1 }
    }

    /// Sets the requested columns.
    pub fn with_columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Sets the row filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the block step. A step of zero is treated as one.
    pub const fn with_step(mut self, step: u64) -> Self {
        self.step = if step == 0 { 1 } else { step };
        self
    }

    /// Returns `true` if a record at `block_number` survives the step.
    pub const fn keeps_block(&self, block_number: u64) -> bool {
        self.step <= 1 || (block_number.saturating_sub(self.range.start)) % self.step == 0
    }
}
