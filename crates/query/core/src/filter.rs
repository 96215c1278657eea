//! Row filter expressions.
//!
//! A filter compares columns against literals and combines the comparisons
//! with boolean operators:
//!
//! ```text
//! gas_used > 21000 and (receiver == 0xdac17f958d2ee523a2206206994597c13d831ec7 or not status)
//! ```
//!
//! Comparison operators are `==`, `!=`, `<`, `<=`, `>` and `>=`. Boolean
//! operators are `and`, `or` and `not`, or their symbolic forms `&&`, `||`
//! and `!`. A bare column is true when its value is `true`. Literals are
//! decimal or `0x` hex numbers, quoted strings, `true`, `false` and `null`.

use alloy_primitives::{I256, U256};
use quarry_types::{Record, Value};
use std::{cmp::Ordering, fmt};

/// An error parsing a filter expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A character that starts no token.
    #[error("unexpected character `{ch}` at position {pos}")]
    UnexpectedChar {
        /// Byte offset of the character.
        pos: usize,
        /// The offending character.
        ch: char,
    },
    /// A string literal without its closing quote.
    #[error("unterminated string starting at position {0}")]
    UnterminatedString(usize),
    /// A numeric literal that does not parse.
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    /// A token in a position the grammar does not allow.
    #[error("unexpected `{found}` at position {pos}, expected {expected}")]
    UnexpectedToken {
        /// Byte offset of the token.
        pos: usize,
        /// The offending token.
        found: String,
        /// What the parser was looking for.
        expected: &'static str,
    },
    /// The expression ended early.
    #[error("unexpected end of filter, expected {0}")]
    UnexpectedEnd(&'static str),
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CmpOp {
    fn matches(self, ordering: Option<Ordering>) -> bool {
        match self {
            Self::Eq => ordering == Some(Ordering::Equal),
            Self::Ne => ordering != Some(Ordering::Equal),
            Self::Lt => ordering == Some(Ordering::Less),
            Self::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Self::Gt => ordering == Some(Ordering::Greater),
            Self::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// `column op literal`
    Compare {
        /// The column name.
        column: String,
        /// The operator.
        op: CmpOp,
        /// The literal to compare against.
        value: Value,
    },
    /// A bare column, true when the column holds `true`.
    Truthy(String),
    /// Both sides hold.
    And(Box<Self>, Box<Self>),
    /// Either side holds.
    Or(Box<Self>, Box<Self>),
    /// The inner expression does not hold.
    Not(Box<Self>),
}

impl FilterExpr {
    /// Parses a filter expression.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let tokens = lex(input)?;
        let mut parser = Parser { tokens, cursor: 0 };
        let expr = parser.or()?;
        match parser.peek() {
            None => Ok(expr),
            Some((pos, token)) => Err(FilterError::UnexpectedToken {
                pos: *pos,
                found: token.to_string(),
                expected: "end of filter",
            }),
        }
    }

    /// Returns every column the expression reads, in order of appearance.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Compare { column, .. } | Self::Truthy(column) => out.push(column),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_columns(out);
                rhs.collect_columns(out);
            }
            Self::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Evaluates the expression against a record.
    ///
    /// Columns the record does not have evaluate as [`Value::Null`].
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            Self::Compare { column, op, value } => {
                let actual = record.value(column).unwrap_or(Value::Null);
                op.matches(actual.compare(value))
            }
            Self::Truthy(column) => matches!(
                record.value(column),
                Some(Value::Bool(true) | Value::Json(serde_json::Value::Bool(true)))
            ),
            Self::And(lhs, rhs) => lhs.matches(record) && rhs.matches(record),
            Self::Or(lhs, rhs) => lhs.matches(record) || rhs.matches(record),
            Self::Not(inner) => !inner.matches(record),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(Value),
    Cmp(CmpOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => f.write_str(name),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Cmp(op) => f.write_str(op.symbol()),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Not => f.write_str("not"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
        }
    }
}

fn lex(input: &str) -> Result<Vec<(usize, Token)>, FilterError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        let token = match ch {
            '(' | ')' | '&' | '|' | '=' | '!' | '<' | '>' => {
                chars.next();
                let next = chars.peek().map(|&(_, c)| c);
                let (token, consumed_next) = match (ch, next) {
                    ('(', _) => (Token::LParen, false),
                    (')', _) => (Token::RParen, false),
                    ('&', Some('&')) => (Token::And, true),
                    ('|', Some('|')) => (Token::Or, true),
                    ('=', Some('=')) => (Token::Cmp(CmpOp::Eq), true),
                    ('!', Some('=')) => (Token::Cmp(CmpOp::Ne), true),
                    ('!', _) => (Token::Not, false),
                    ('<', Some('=')) => (Token::Cmp(CmpOp::Le), true),
                    ('<', _) => (Token::Cmp(CmpOp::Lt), false),
                    ('>', Some('=')) => (Token::Cmp(CmpOp::Ge), true),
                    ('>', _) => (Token::Cmp(CmpOp::Gt), false),
                    _ => return Err(FilterError::UnexpectedChar { pos, ch }),
                };
                if consumed_next {
                    chars.next();
                }
                token
            }
            '"' | '\'' => {
                chars.next();
                let mut text = String::new();
                loop {
                    match chars.next() {
                        Some((_, c)) if c == ch => break,
                        Some((_, c)) => text.push(c),
                        None => return Err(FilterError::UnterminatedString(pos)),
                    }
                }
                Token::Literal(Value::Text(text))
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    let sign = c == '-' && word.is_empty();
                    if c.is_ascii_alphanumeric() || c == '.' || c == '_' || sign {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Literal(parse_number(&word)?)
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::Literal(Value::Bool(true)),
                    "false" => Token::Literal(Value::Bool(false)),
                    "null" => Token::Literal(Value::Null),
                    _ => Token::Ident(word),
                }
            }
            ch => return Err(FilterError::UnexpectedChar { pos, ch }),
        };
        tokens.push((pos, token));
    }
    Ok(tokens)
}

fn parse_number(word: &str) -> Result<Value, FilterError> {
    let invalid = || FilterError::InvalidNumber(word.to_string());
    let digits = word.replace('_', "");

    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        // Hex literals double as addresses and hashes; keep the text so they
        // compare both numerically and against hex columns.
        return Ok(Value::Text(format!("0x{}", hex.to_ascii_lowercase())));
    }
    if digits.starts_with('-') {
        if let Ok(n) = digits.parse() {
            return Ok(Value::Int(n));
        }
        // Wider than 64 bits; text compares numerically against columns.
        return I256::from_dec_str(&digits)
            .map(|_| Value::Text(digits.clone()))
            .map_err(|_| invalid());
    }
    if digits.contains('.') {
        return digits.parse().map(Value::Float).map_err(|_| invalid());
    }
    U256::from_str_radix(&digits, 10).map(Value::Uint).map_err(|_| invalid())
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self, expected: &'static str) -> Result<(usize, Token), FilterError> {
        let token =
            self.tokens.get(self.cursor).cloned().ok_or(FilterError::UnexpectedEnd(expected))?;
        self.cursor += 1;
        Ok(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek().is_some_and(|(_, t)| t == token) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<FilterExpr, FilterError> {
        let mut expr = self.and()?;
        while self.eat(&Token::Or) {
            expr = FilterExpr::Or(Box::new(expr), Box::new(self.and()?));
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<FilterExpr, FilterError> {
        let mut expr = self.unary()?;
        while self.eat(&Token::And) {
            expr = FilterExpr::And(Box::new(expr), Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<FilterExpr, FilterError> {
        if self.eat(&Token::Not) {
            return Ok(FilterExpr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<FilterExpr, FilterError> {
        const EXPECTED: &str = "a column or `(`";
        match self.next(EXPECTED)? {
            (_, Token::LParen) => {
                let expr = self.or()?;
                match self.next("`)`")? {
                    (_, Token::RParen) => Ok(expr),
                    (pos, token) => Err(FilterError::UnexpectedToken {
                        pos,
                        found: token.to_string(),
                        expected: "`)`",
                    }),
                }
            }
            (_, Token::Ident(column)) => {
                let op = match self.peek() {
                    Some((_, Token::Cmp(op))) => *op,
                    _ => return Ok(FilterExpr::Truthy(column)),
                };
                self.cursor += 1;
                match self.next("a literal")? {
                    (_, Token::Literal(value)) => Ok(FilterExpr::Compare { column, op, value }),
                    (pos, token) => Err(FilterError::UnexpectedToken {
                        pos,
                        found: token.to_string(),
                        expected: "a literal",
                    }),
                }
            }
            (pos, token) => Err(FilterError::UnexpectedToken {
                pos,
                found: token.to_string(),
                expected: EXPECTED,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};
    use quarry_types::{ContractEventRecord, TransactionRecord};
    use rstest::rstest;

    fn tx() -> TransactionRecord {
        TransactionRecord {
            hash: B256::repeat_byte(1),
            block_number: 100,
            transaction_index: 3,
            sender: Address::repeat_byte(0xab),
            receiver: None,
            value: U256::from(10).pow(U256::from(18)),
            nonce: 9,
            gas_limit: 50_000,
            gas_price: Some(2_000_000_000),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            gas_used: Some(21_000),
            status: Some(true),
        }
    }

    #[rstest]
    #[case("gas_used == 21000", true)]
    #[case("gas_used != 21000", false)]
    #[case("gas_used > 21_000", false)]
    #[case("gas_used >= 21000 && nonce < 10", true)]
    #[case("nonce <= 8 || block_number == 100", true)]
    #[case("not (nonce == 9)", false)]
    #[case("!status", false)]
    #[case("status", true)]
    #[case("status == true and receiver == null", true)]
    #[case("receiver != null", false)]
    #[case("value >= 1000000000000000000", true)]
    #[case("gas_used == 0x5208", true)]
    #[case("sender == 0xABABABABABABABABABABABABABABABABABABABAB", true)]
    #[case("sender == '0xabababababababababababababababababababab'", true)]
    #[case("sender != 0xabababababababababababababababababababab", false)]
    #[case("nonce > -1", true)]
    #[case("gas_price > 1.5", true)]
    #[case("missing == 1", false)]
    #[case("(nonce == 1 or nonce == 9) and (transaction_index == 3)", true)]
    fn test_evaluation(#[case] filter: &str, #[case] expected: bool) {
        let expr = FilterExpr::parse(filter).unwrap();
        assert_eq!(expr.matches(&tx()), expected, "{filter}");
    }

    fn swap() -> ContractEventRecord {
        let mut event_arguments = serde_json::Map::new();
        event_arguments.insert("amount0".to_string(), serde_json::json!(-3));
        event_arguments
            .insert("amount1".to_string(), serde_json::json!("-100000000000000000000000000000"));
        ContractEventRecord {
            transaction_hash: B256::repeat_byte(2),
            log_index: 0,
            block_number: 7,
            transaction_index: 0,
            contract_address: Address::repeat_byte(0x42),
            event_name: "Swap".to_string(),
            event_selector: B256::repeat_byte(3),
            event_arguments,
        }
    }

    #[rstest]
    #[case("amount0 < 0", true)]
    #[case("amount0 > -5", true)]
    #[case("amount0 != 0", true)]
    #[case("amount0 == -3", true)]
    #[case("amount0 >= 0", false)]
    #[case("amount1 < -99999999999999999999999999999", true)]
    #[case("amount1 < -9223372036854775808", true)]
    #[case("amount1 < -200000000000000000000000000000", false)]
    #[case("amount1 > -200000000000000000000000000000", true)]
    fn test_signed_event_arguments(#[case] filter: &str, #[case] expected: bool) {
        let expr = FilterExpr::parse(filter).unwrap();
        assert_eq!(expr.matches(&swap()), expected, "{filter}");
    }

    #[test]
    fn test_precedence() {
        // `and` binds tighter than `or`.
        let expr = FilterExpr::parse("nonce == 1 or nonce == 9 and gas_used == 1").unwrap();
        assert!(matches!(expr, FilterExpr::Or(..)));
        assert!(!expr.matches(&tx()));
    }

    #[test]
    fn test_columns() {
        let expr = FilterExpr::parse("a == 1 and (b > 2 or not c)").unwrap();
        assert_eq!(expr.columns(), vec!["a", "b", "c"]);
    }

    #[rstest]
    #[case("", FilterError::UnexpectedEnd("a column or `(`"))]
    #[case("nonce ==", FilterError::UnexpectedEnd("a literal"))]
    #[case("(nonce == 1", FilterError::UnexpectedEnd("`)`"))]
    #[case("nonce = 1", FilterError::UnexpectedChar { pos: 6, ch: '=' })]
    #[case("nonce == 'abc", FilterError::UnterminatedString(9))]
    #[case("nonce == 0xzz", FilterError::InvalidNumber("0xzz".to_string()))]
    fn test_parse_errors(#[case] filter: &str, #[case] expected: FilterError) {
        assert_eq!(FilterExpr::parse(filter).unwrap_err(), expected);
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        assert!(matches!(
            FilterExpr::parse("nonce == 1 2"),
            Err(FilterError::UnexpectedToken { pos: 11, .. })
        ));
    }
}
