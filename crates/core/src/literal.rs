//! Canonical `@"..."` Literal Forms
//!
//! The parser recognizes the quoted-literal syntax; the runtime owns the
//! canonical interpretations, so they are implemented here where the value
//! types live. Four forms exist:
//!
//! - Date: `@"YYYY-MM-DD"`
//! - Time: `@"HH:MM:SS"` or `@"HH:MM:SS.mmm"`
//! - Date-time: `@"YYYY-MM-DD HH:MM:SS[.mmm]"` (space or `T` separator)
//! - Money: `@"$[-]D.CC"` in the caller's default currency
//!
//! [`parse_tagged_literal`] dispatches on the body shape: a leading `$`
//! means money, a `:` means a time is present, otherwise a date.

use crate::calendar::{Date, DateTime, Time};
use crate::money::Money;

/// Error from parsing a canonical literal body.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralError {
    InvalidDate(String),
    InvalidTime(String),
    InvalidDateTime(String),
    InvalidMoney(String),
}

impl std::fmt::Display for LiteralError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralError::InvalidDate(s) => write!(f, "invalid date literal: {:?}", s),
            LiteralError::InvalidTime(s) => write!(f, "invalid time literal: {:?}", s),
            LiteralError::InvalidDateTime(s) => {
                write!(f, "invalid date-time literal: {:?}", s)
            }
            LiteralError::InvalidMoney(s) => write!(f, "invalid money literal: {:?}", s),
        }
    }
}

impl std::error::Error for LiteralError {}

/// A parsed canonical literal.
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedLiteral {
    Date(Date),
    Time(Time),
    DateTime(DateTime),
    Money(Money),
}

/// Parse the body of an `@"..."` literal (quotes and `@` already stripped).
///
/// `default_currency` is applied to money literals, which carry no currency
/// of their own.
pub fn parse_tagged_literal(
    body: &str,
    default_currency: &str,
) -> Result<TaggedLiteral, LiteralError> {
    if body.starts_with('$') {
        return Money::parse_literal(body, default_currency).map(TaggedLiteral::Money);
    }
    match body.contains(':') {
        true if body.contains('-') => DateTime::parse_literal(body).map(TaggedLiteral::DateTime),
        true => Time::parse_literal(body).map(TaggedLiteral::Time),
        false => Date::parse_literal(body).map(TaggedLiteral::Date),
    }
}
