//! Conversions between chain primitives and their SQLite column encodings.
//!
//! Hashes and addresses are stored as lowercase `0x` hex text and 256-bit
//! integers as decimal text, so that the cache stays readable from ad-hoc
//! SQL. Decoding failures surface as conversion errors, which the crate
//! reports as cache corruption.

use alloy_primitives::{Address, B256, U256};
use rusqlite::{Row, types::Type};
use std::{error::Error, fmt::LowerHex, str::FromStr};

pub(crate) fn hex<T: LowerHex>(value: &T) -> String {
    format!("{value:#x}")
}

pub(crate) fn conversion_error(
    col: usize,
    err: impl Into<Box<dyn Error + Send + Sync + 'static>>,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, Type::Text, err.into())
}

fn parse_text<T>(row: &Row<'_>, col: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    let text: String = row.get(col)?;
    text.parse().map_err(|e| conversion_error(col, e))
}

fn parse_optional_text<T>(row: &Row<'_>, col: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(col)?;
    text.map(|t| t.parse().map_err(|e| conversion_error(col, e))).transpose()
}

pub(crate) fn b256(row: &Row<'_>, col: usize) -> rusqlite::Result<B256> {
    parse_text(row, col)
}

pub(crate) fn address(row: &Row<'_>, col: usize) -> rusqlite::Result<Address> {
    parse_text(row, col)
}

pub(crate) fn optional_address(row: &Row<'_>, col: usize) -> rusqlite::Result<Option<Address>> {
    parse_optional_text(row, col)
}

pub(crate) fn u256(row: &Row<'_>, col: usize) -> rusqlite::Result<U256> {
    let text: String = row.get(col)?;
    U256::from_str_radix(&text, 10).map_err(|e| conversion_error(col, e))
}

pub(crate) fn optional_u256(row: &Row<'_>, col: usize) -> rusqlite::Result<Option<U256>> {
    let text: Option<String> = row.get(col)?;
    text.map(|t| U256::from_str_radix(&t, 10).map_err(|e| conversion_error(col, e))).transpose()
}

pub(crate) fn optional_u128(row: &Row<'_>, col: usize) -> rusqlite::Result<Option<u128>> {
    parse_optional_text(row, col)
}
