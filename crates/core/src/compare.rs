//! Three-Way Comparison and Equality
//!
//! Comparison is total within the combinations it defines and a
//! `TypeMismatch` outside them. Numbers, money, and percentages compare on
//! a common real axis (money lifted by its fixed sub-unit scale), so
//! `2 < $3.00` and `$50.00 == 50` hold. Calendar kinds compare
//! lexicographically on their components, text by byte order, booleans
//! with `true > false`, and the two absence markers compare equal only to
//! themselves.
//!
//! Equality is comparison-equals-zero. Strict equality propagates
//! `CurrencyMismatch`; [`equals_loose`] maps it to `false` for callers that
//! explicitly opt in. [`structurally_equal`] extends equality over lists
//! and records for the assignment protocol's no-change short-circuit, where
//! an algebra failure just means "not the same value".

use crate::error::ValueError;
use crate::store::ValueStore;
use crate::value::{Value, ValueId};
use std::cmp::Ordering;

/// Lift a scalar onto the shared real axis, when it has one.
fn as_real(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Money(m) => Some(m.to_number()),
        Value::Percent(p) => Some(*p),
        _ => None,
    }
}

fn real_ordering(a: f64, b: f64) -> Ordering {
    // Totality over the comparable kinds; NaN payloads compare equal to
    // themselves so the ordering stays reflexive.
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Three-way comparison of two values.
pub fn compare(store: &ValueStore, left: ValueId, right: ValueId) -> Result<Ordering, ValueError> {
    let (a, b) = (store.get(left), store.get(right));
    match (a, b) {
        (Value::Money(x), Value::Money(y)) => {
            if !x.same_currency(y) {
                return Err(ValueError::CurrencyMismatch {
                    left: x.currency.clone(),
                    right: y.currency.clone(),
                });
            }
            Ok(x.amount.cmp(&y.amount))
        }
        (Value::Date(x), Value::Date(y)) => Ok(x.cmp(y)),
        (Value::Time(x), Value::Time(y)) => Ok(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Ok(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Ok(x.as_bytes().cmp(y.as_bytes())),
        (Value::Ratio(x), Value::Ratio(y)) => Ok(real_ordering(x.to_number(), y.to_number())),
        (Value::Boolean(x), Value::Boolean(y)) => Ok(x.cmp(y)),
        (Value::Unknown, Value::Unknown) => Ok(Ordering::Equal),
        (Value::Nil, Value::Nil) => Ok(Ordering::Equal),
        _ => match (as_real(a), as_real(b)) {
            (Some(x), Some(y)) => Ok(real_ordering(x, y)),
            _ => Err(ValueError::TypeMismatch(format!(
                "cannot compare {} and {}",
                a.kind(),
                b.kind()
            ))),
        },
    }
}

/// Strict equality: comparison equals zero, errors propagate.
pub fn equals(store: &ValueStore, left: ValueId, right: ValueId) -> Result<bool, ValueError> {
    Ok(compare(store, left, right)? == Ordering::Equal)
}

/// Loose equality: a currency mismatch is `false` rather than an error.
/// Other failures still propagate.
pub fn equals_loose(store: &ValueStore, left: ValueId, right: ValueId) -> Result<bool, ValueError> {
    match compare(store, left, right) {
        Ok(ord) => Ok(ord == Ordering::Equal),
        Err(ValueError::CurrencyMismatch { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Structural equality over every kind, for change detection.
///
/// Scalars use [`compare`]; lists match elementwise; records match on local
/// fields and parents recursively. Kinds the algebra cannot relate (and
/// function/trigger/constraint values, which compare by payload identity)
/// are simply unequal - never an error.
pub fn structurally_equal(store: &ValueStore, left: ValueId, right: ValueId) -> bool {
    if left == right {
        return true;
    }
    match (store.get(left), store.get(right)) {
        (Value::List(xs), Value::List(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(x, y)| structurally_equal(store, *x, *y))
        }
        (Value::Record(x), Value::Record(y)) => {
            if x.len() != y.len() {
                return false;
            }
            let parents_match = match (x.parent, y.parent) {
                (None, None) => true,
                (Some(p), Some(q)) => structurally_equal(store, p, q),
                _ => false,
            };
            parents_match
                && x.fields().all(|(name, xv)| match y.get(name) {
                    Some(yv) => structurally_equal(store, xv, yv),
                    None => false,
                })
        }
        (Value::Function(x), Value::Function(y)) => x == y,
        (Value::Trigger(x), Value::Trigger(y)) => x == y,
        (Value::Constraint(x), Value::Constraint(y)) => x == y,
        _ => matches!(compare(store, left, right), Ok(Ordering::Equal)),
    }
}
