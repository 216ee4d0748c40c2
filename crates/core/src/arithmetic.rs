//! Business Arithmetic
//!
//! Pure functions over store handles. Every function reads its operands,
//! computes an owned result value, and allocates it through the store; no
//! operand is ever mutated.
//!
//! # Money Scaling
//!
//! Numbers entering money arithmetic are scaled by the fixed 10,000
//! sub-unit factor. Scaling multiplications round to the nearest sub-unit
//! so that decimal inputs expressible in sub-units (the common business
//! case) stay exact.
//!
//! # Failure Rules
//!
//! - Scalar operands outside the defined combinations: `TypeMismatch`.
//! - Compound or reactive operands (list, record, function, trigger,
//!   constraint): `InvalidOperator` - no arithmetic exists for those kinds.
//! - Mixed currencies: `CurrencyMismatch`. Zero divisors: `DivisionByZero`.

use crate::error::ValueError;
use crate::money::{Money, SUBUNITS_PER_UNIT};
use crate::store::ValueStore;
use crate::value::{Ratio, Value, ValueId};

/// Scale a real number to money sub-units, rounding to nearest.
fn to_subunits(n: f64) -> i64 {
    (n * SUBUNITS_PER_UNIT as f64).round() as i64
}

/// Scale a sub-unit amount by a real factor, rounding to nearest.
fn scale_amount(amount: i64, factor: f64) -> i64 {
    (amount as f64 * factor).round() as i64
}

fn no_rule(op: &str, a: &Value, b: &Value) -> ValueError {
    let compound = |v: &Value| {
        matches!(
            v,
            Value::List(_)
                | Value::Record(_)
                | Value::Function(_)
                | Value::Trigger(_)
                | Value::Constraint(_)
        )
    };
    if compound(a) || compound(b) {
        ValueError::InvalidOperator(format!(
            "'{}' is not defined for {} and {}",
            op,
            a.kind(),
            b.kind()
        ))
    } else {
        ValueError::TypeMismatch(format!("cannot {} {} and {}", op, a.kind(), b.kind()))
    }
}

/// `left + right`.
pub fn add(
    store: &mut ValueStore,
    left: ValueId,
    right: ValueId,
) -> Result<ValueId, ValueError> {
    let result = match (store.get(left), store.get(right)) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
        (Value::Number(n), Value::Money(m)) | (Value::Money(m), Value::Number(n)) => {
            Value::Money(Money::new(m.amount + to_subunits(*n), m.currency.clone()))
        }
        (Value::Money(a), Value::Money(b)) => {
            if !a.same_currency(b) {
                return Err(ValueError::CurrencyMismatch {
                    left: a.currency.clone(),
                    right: b.currency.clone(),
                });
            }
            Value::Money(Money::new(a.amount + b.amount, a.currency.clone()))
        }
        (Value::Percent(a), Value::Percent(b)) => Value::Percent(a + b),
        (a, b) => return Err(no_rule("add", a, b)),
    };
    store_result(store, result)
}

/// `left - right`.
pub fn subtract(
    store: &mut ValueStore,
    left: ValueId,
    right: ValueId,
) -> Result<ValueId, ValueError> {
    let result = match (store.get(left), store.get(right)) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a - b),
        (Value::Money(m), Value::Number(n)) => {
            Value::Money(Money::new(m.amount - to_subunits(*n), m.currency.clone()))
        }
        (Value::Number(n), Value::Money(m)) => {
            Value::Money(Money::new(to_subunits(*n) - m.amount, m.currency.clone()))
        }
        (Value::Money(a), Value::Money(b)) => {
            if !a.same_currency(b) {
                return Err(ValueError::CurrencyMismatch {
                    left: a.currency.clone(),
                    right: b.currency.clone(),
                });
            }
            Value::Money(Money::new(a.amount - b.amount, a.currency.clone()))
        }
        (Value::Percent(a), Value::Percent(b)) => Value::Percent(a - b),
        (a, b) => return Err(no_rule("subtract", a, b)),
    };
    store_result(store, result)
}

/// `left * right`.
pub fn multiply(
    store: &mut ValueStore,
    left: ValueId,
    right: ValueId,
) -> Result<ValueId, ValueError> {
    let result = match (store.get(left), store.get(right)) {
        (Value::Number(a), Value::Number(b)) => Value::Number(a * b),
        (Value::Money(m), Value::Number(n)) | (Value::Number(n), Value::Money(m)) => {
            Value::Money(Money::new(scale_amount(m.amount, *n), m.currency.clone()))
        }
        (Value::Money(m), Value::Percent(p)) | (Value::Percent(p), Value::Money(m)) => {
            Value::Money(Money::new(
                scale_amount(m.amount, p / 100.0),
                m.currency.clone(),
            ))
        }
        (Value::Percent(a), Value::Percent(b)) => Value::Percent(a * b / 100.0),
        (Value::Ratio(a), Value::Ratio(b)) => {
            // Denominators are nonzero by construction, and the product of
            // two nonzero doubles is nonzero (overflow to inf aside).
            match Ratio::new(a.numerator * b.numerator, a.denominator * b.denominator) {
                Some(r) => Value::Ratio(r),
                None => {
                    return Err(ValueError::DivisionByZero(
                        "ratio product denominator underflowed to zero".to_string(),
                    ));
                }
            }
        }
        (a, b) => return Err(no_rule("multiply", a, b)),
    };
    store_result(store, result)
}

/// `left / right`.
pub fn divide(
    store: &mut ValueStore,
    left: ValueId,
    right: ValueId,
) -> Result<ValueId, ValueError> {
    let result = match (store.get(left), store.get(right)) {
        (Value::Number(a), Value::Number(b)) => {
            if *b == 0.0 {
                return Err(ValueError::DivisionByZero(format!("{} / 0", a)));
            }
            Value::Number(a / b)
        }
        (Value::Money(m), Value::Number(n)) => {
            if *n == 0.0 {
                return Err(ValueError::DivisionByZero(format!("{} / 0", m)));
            }
            Value::Money(Money::new(scale_amount(m.amount, 1.0 / n), m.currency.clone()))
        }
        (Value::Money(a), Value::Money(b)) => {
            if !a.same_currency(b) {
                return Err(ValueError::CurrencyMismatch {
                    left: a.currency.clone(),
                    right: b.currency.clone(),
                });
            }
            if b.amount == 0 {
                return Err(ValueError::DivisionByZero(format!("{} / {}", a, b)));
            }
            // Same-currency division cancels the unit: a plain ratio.
            Value::Number(a.amount as f64 / b.amount as f64)
        }
        (Value::Ratio(a), Value::Ratio(b)) => {
            if b.numerator == 0.0 {
                return Err(ValueError::DivisionByZero(
                    "division by a zero-numerator ratio".to_string(),
                ));
            }
            match Ratio::new(a.numerator * b.denominator, a.denominator * b.numerator) {
                Some(r) => Value::Ratio(r),
                None => {
                    return Err(ValueError::DivisionByZero(
                        "ratio quotient denominator underflowed to zero".to_string(),
                    ));
                }
            }
        }
        (a, b) => return Err(no_rule("divide", a, b)),
    };
    store_result(store, result)
}

/// Arithmetic negation: number, money, percentage, ratio.
pub fn negate(store: &mut ValueStore, operand: ValueId) -> Result<ValueId, ValueError> {
    let result = match store.get(operand) {
        Value::Number(n) => Value::Number(-n),
        Value::Money(m) => Value::Money(Money::new(-m.amount, m.currency.clone())),
        Value::Percent(p) => Value::Percent(-p),
        Value::Ratio(r) => Value::Ratio(Ratio {
            numerator: -r.numerator,
            denominator: r.denominator,
        }),
        other => {
            return Err(ValueError::InvalidOperator(format!(
                "negation is not defined for {}",
                other.kind()
            )));
        }
    };
    store_result(store, result)
}

/// Logical negation: boolean only.
pub fn logical_not(store: &mut ValueStore, operand: ValueId) -> Result<ValueId, ValueError> {
    let result = match store.get(operand) {
        Value::Boolean(b) => Value::Boolean(!b),
        other => {
            return Err(ValueError::TypeMismatch(format!(
                "'not' expects a boolean, got {}",
                other.kind()
            )));
        }
    };
    store_result(store, result)
}

fn store_result(store: &mut ValueStore, value: Value) -> Result<ValueId, ValueError> {
    match value {
        Value::Number(n) => store.number(n),
        Value::Money(m) => store.money(m),
        Value::Percent(p) => store.percent(p),
        Value::Ratio(r) => store.ratio(r),
        Value::Boolean(b) => store.boolean(b),
        // Arithmetic only produces the kinds above.
        other => unreachable!("arithmetic produced {}", other.kind()),
    }
}
