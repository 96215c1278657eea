//! Dynamically typed table cells.

use alloy_primitives::{Address, B256, Bytes, I256, U256, hex};
use serde::{Serialize, Serializer};
use std::{cmp::Ordering, fmt};

/// A single cell of a query result.
///
/// Values compare across numeric variants, so a filter literal parsed as
/// [`Value::Int`] can be compared against a [`Value::Uint`] column. Hex-like
/// values ([`Value::Address`], [`Value::Hash`], [`Value::Bytes`]) compare
/// against text case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned 256-bit integer.
    Uint(U256),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// A 20-byte account address.
    Address(Address),
    /// A 32-byte hash.
    Hash(B256),
    /// Arbitrary JSON, used for decoded event arguments.
    Json(serde_json::Value),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as an unsigned 256-bit integer, if it is a
    /// non-negative number.
    pub fn as_u256(&self) -> Option<U256> {
        match self.as_numeric()? {
            Numeric::NonNegative(n) => Some(n),
            Numeric::Negative(_) => None,
        }
    }

    /// Returns the value as a signed 256-bit integer, if it is a number that
    /// fits.
    pub fn as_i256(&self) -> Option<I256> {
        match self.as_numeric()? {
            Numeric::NonNegative(n) => I256::try_from(n).ok(),
            Numeric::Negative(n) => Some(n),
        }
    }

    fn as_numeric(&self) -> Option<Numeric> {
        match self {
            Self::Int(n) => Numeric::from_i64(*n),
            Self::Uint(n) => Some(Numeric::NonNegative(*n)),
            Self::Text(s) | Self::Json(serde_json::Value::String(s)) => parse_numeric(s),
            Self::Json(serde_json::Value::Number(n)) => match n.as_u64() {
                Some(n) => Some(Numeric::NonNegative(U256::from(n))),
                None => Numeric::from_i64(n.as_i64()?),
            },
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Uint(n) => n.to_string().parse().ok(),
            Self::Float(f) => Some(*f),
            Self::Json(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// Returns a lowercase textual form used for string-like comparison.
    fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.to_lowercase()),
            Self::Address(a) => Some(format!("{a:#x}")),
            Self::Hash(h) => Some(format!("{h:#x}")),
            Self::Bytes(b) => Some(format!("0x{}", hex::encode(b))),
            Self::Json(serde_json::Value::String(s)) => Some(s.to_lowercase()),
            _ => None,
        }
    }

    /// Compares two values, returning `None` when they are not comparable.
    ///
    /// [`Value::Null`] equals only itself and is not ordered against anything.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Json(serde_json::Value::Bool(a)), Self::Bool(b)) |
            (Self::Bool(a), Self::Json(serde_json::Value::Bool(b))) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(_), _) | (_, Self::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ if self.is_number() || other.is_number() => {
                Some(self.as_numeric()?.cmp(&other.as_numeric()?))
            }
            _ => match (self.as_numeric(), other.as_numeric()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => Some(self.as_text()?.cmp(&other.as_text()?)),
            },
        }
    }

    const fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Uint(_) | Self::Json(serde_json::Value::Number(_)))
    }
}

/// A number split by sign, so that negative values order below every
/// unsigned one regardless of magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Numeric {
    Negative(I256),
    NonNegative(U256),
}

impl Numeric {
    fn from_i64(n: i64) -> Option<Self> {
        match u64::try_from(n) {
            Ok(n) => Some(Self::NonNegative(U256::from(n))),
            Err(_) => I256::try_from(n).ok().map(Self::Negative),
        }
    }
}

impl Ord for Numeric {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Negative(a), Self::Negative(b)) => a.cmp(b),
            (Self::NonNegative(a), Self::NonNegative(b)) => a.cmp(b),
            (Self::Negative(_), Self::NonNegative(_)) => Ordering::Less,
            (Self::NonNegative(_), Self::Negative(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parses decimal text, `-`-prefixed decimal text or `0x` hex text.
fn parse_numeric(s: &str) -> Option<Numeric> {
    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return U256::from_str_radix(digits, 16).ok().map(Numeric::NonNegative);
    }
    if s.starts_with('-') {
        let n = I256::from_dec_str(s).ok()?;
        return Some(if n.is_negative() {
            Numeric::Negative(n)
        } else {
            Numeric::NonNegative(n.unsigned_abs())
        });
    }
    U256::from_str_radix(s, 10).ok().map(Numeric::NonNegative)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Uint(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Address(a) => write!(f, "{a}"),
            Self::Hash(h) => write!(f, "{h:#x}"),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Uint(n) => match u64::try_from(*n) {
                Ok(n) => serializer.serialize_u64(n),
                Err(_) => serializer.collect_str(n),
            },
            Self::Float(n) => serializer.serialize_f64(*n),
            Self::Json(v) => v.serialize(serializer),
            other => serializer.collect_str(other),
        }
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint(U256::from(n))
    }
}

impl From<U256> for Value {
    fn from(n: U256) -> Self {
        Self::Uint(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Self::Address(a)
    }
}

impl From<B256> for Value {
    fn from(h: B256) -> Self {
        Self::Hash(h)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
