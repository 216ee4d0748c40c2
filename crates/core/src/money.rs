//! Fixed-Point Money
//!
//! Money is a signed integer amount in sub-units plus a currency code. The
//! scale is fixed at 10,000 sub-units per whole unit for every currency;
//! display precision is a separate concern handled by the formatter. Keeping
//! the scale currency-independent makes addition and subtraction exact and
//! makes the 10,000 factor the single conversion constant between numbers
//! and money.
//!
//! Cross-currency arithmetic is refused, never converted: there is no
//! exchange-rate table in the core.

use crate::literal::LiteralError;

/// Sub-units per whole currency unit. Fixed for all currencies.
pub const SUBUNITS_PER_UNIT: i64 = 10_000;

/// Fixed-point money amount with its currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Money {
    /// Signed amount in 1/10,000ths of a unit
    pub amount: i64,
    /// Currency code, e.g. "USD". Compared byte-for-byte.
    pub currency: String,
}

impl Money {
    pub fn new(amount: i64, currency: impl Into<String>) -> Money {
        Money {
            amount,
            currency: currency.into(),
        }
    }

    /// Build from whole units and cents (hundredths), e.g. `123` and `45`
    /// for $123.45. Cents carry the sign of the whole amount.
    pub fn from_units(units: i64, cents: i64, currency: impl Into<String>) -> Money {
        let sign = if units < 0 || cents < 0 { -1 } else { 1 };
        let amount = units.abs() * SUBUNITS_PER_UNIT + cents.abs() * (SUBUNITS_PER_UNIT / 100);
        Money {
            amount: sign * amount,
            currency: currency.into(),
        }
    }

    /// The amount as a real number of whole units.
    pub fn to_number(&self) -> f64 {
        self.amount as f64 / SUBUNITS_PER_UNIT as f64
    }

    /// True when `other` is denominated in the same currency.
    pub fn same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Parse the canonical literal body `$[-]D.CC` in the given currency.
    ///
    /// Fractional digits beyond the second are truncated toward zero:
    /// `$1.999` is 1.99 and `$-1.999` is -1.99. A missing fraction is
    /// allowed (`$5` is 5.00); more than zero but fewer than two fractional
    /// digits are padded (`$5.5` is 5.50).
    pub fn parse_literal(text: &str, currency: &str) -> Result<Money, LiteralError> {
        let bad = || LiteralError::InvalidMoney(text.to_string());
        let body = text.strip_prefix('$').ok_or_else(bad)?;
        let (negative, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };
        let (units_text, frac_text) = match body.split_once('.') {
            Some((u, f)) => (u, f),
            None => (body, ""),
        };
        if units_text.is_empty() || !units_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        if !frac_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let units: i64 = units_text.parse().map_err(|_| bad())?;
        // Truncation toward zero: only the first two fractional digits count.
        let cents: i64 = match frac_text.len() {
            0 => 0,
            1 => frac_text.parse::<i64>().map_err(|_| bad())? * 10,
            _ => frac_text[..2].parse().map_err(|_| bad())?,
        };
        let amount = units * SUBUNITS_PER_UNIT + cents * (SUBUNITS_PER_UNIT / 100);
        Ok(Money {
            amount: if negative { -amount } else { amount },
            currency: currency.to_string(),
        })
    }
}

impl std::fmt::Display for Money {
    /// Canonical literal form: sign, whole units, two cent digits, then any
    /// nonzero sub-cent digits, then the currency code.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let abs = self.amount.unsigned_abs();
        let units = abs / SUBUNITS_PER_UNIT as u64;
        let sub = abs % SUBUNITS_PER_UNIT as u64;
        let sign = if self.amount < 0 { "-" } else { "" };
        if sub % 100 == 0 {
            write!(f, "${}{}.{:02} {}", sign, units, sub / 100, self.currency)
        } else {
            write!(f, "${}{}.{:04} {}", sign, units, sub, self.currency)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units() {
        let m = Money::from_units(123, 45, "USD");
        assert_eq!(m.amount, 1_234_500);
        assert_eq!(m.currency, "USD");

        let m = Money::from_units(-10, 0, "USD");
        assert_eq!(m.amount, -100_000);
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Money::from_units(123, 45, "USD").to_number(), 123.45);
        assert_eq!(Money::new(-15_000, "EUR").to_number(), -1.5);
    }

    #[test]
    fn test_parse_literal_basic() {
        let m = Money::parse_literal("$123.45", "USD").unwrap();
        assert_eq!(m.amount, 1_234_500);
        assert_eq!(m.currency, "USD");

        let m = Money::parse_literal("$-10.00", "USD").unwrap();
        assert_eq!(m.amount, -100_000);
    }

    #[test]
    fn test_parse_literal_fraction_shapes() {
        // No fraction, one digit, padded.
        assert_eq!(Money::parse_literal("$5", "USD").unwrap().amount, 50_000);
        assert_eq!(Money::parse_literal("$5.5", "USD").unwrap().amount, 55_000);
    }

    #[test]
    fn test_parse_literal_truncates_toward_zero() {
        assert_eq!(
            Money::parse_literal("$1.999", "USD").unwrap().amount,
            19_900
        );
        assert_eq!(
            Money::parse_literal("$-1.999", "USD").unwrap().amount,
            -19_900
        );
    }

    #[test]
    fn test_parse_literal_rejects_garbage() {
        assert!(Money::parse_literal("12.34", "USD").is_err());
        assert!(Money::parse_literal("$", "USD").is_err());
        assert!(Money::parse_literal("$1.2.3", "USD").is_err());
        assert!(Money::parse_literal("$abc", "USD").is_err());
        assert!(Money::parse_literal("$1,000", "USD").is_err());
    }

    #[test]
    fn test_display_round_trips_cents() {
        assert_eq!(Money::from_units(123, 45, "USD").to_string(), "$123.45 USD");
        assert_eq!(Money::new(-19_900, "USD").to_string(), "$-1.99 USD");
        // Sub-cent precision shows all four digits.
        assert_eq!(Money::new(12_345, "USD").to_string(), "$1.2345 USD");
    }
}
