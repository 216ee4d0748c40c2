//! Kind Conversions
//!
//! Explicit conversions between the scalar kinds. Each function allocates
//! the converted value and fails with `TypeMismatch` for source kinds it
//! does not accept. Number-to-money takes the caller's default currency;
//! there is no ambient currency in the core.

use crate::calendar::DateTime;
use crate::error::ValueError;
use crate::money::{Money, SUBUNITS_PER_UNIT};
use crate::store::ValueStore;
use crate::value::{Value, ValueId};

/// number → money in `default_currency`; money passes through unchanged
/// (currency preserved).
pub fn to_money(
    store: &mut ValueStore,
    value: ValueId,
    default_currency: &str,
) -> Result<ValueId, ValueError> {
    match store.get(value) {
        Value::Money(m) => {
            let m = m.clone();
            store.money(m)
        }
        Value::Number(n) => {
            let amount = (n * SUBUNITS_PER_UNIT as f64).round() as i64;
            store.money(Money::new(amount, default_currency))
        }
        other => Err(ValueError::TypeMismatch(format!(
            "cannot convert {} to money",
            other.kind()
        ))),
    }
}

/// money/percentage/ratio → number; number passes through.
pub fn to_number(store: &mut ValueStore, value: ValueId) -> Result<ValueId, ValueError> {
    match store.get(value) {
        Value::Number(n) => {
            let n = *n;
            store.number(n)
        }
        Value::Money(m) => {
            let n = m.to_number();
            store.number(n)
        }
        Value::Percent(p) => {
            let p = *p;
            store.number(p)
        }
        Value::Ratio(r) => {
            let n = r.to_number();
            store.number(n)
        }
        other => Err(ValueError::TypeMismatch(format!(
            "cannot convert {} to number",
            other.kind()
        ))),
    }
}

/// number → percentage (identity on the stored double).
pub fn to_percent(store: &mut ValueStore, value: ValueId) -> Result<ValueId, ValueError> {
    match store.get(value) {
        Value::Percent(p) => {
            let p = *p;
            store.percent(p)
        }
        Value::Number(n) => {
            let n = *n;
            store.percent(n)
        }
        other => Err(ValueError::TypeMismatch(format!(
            "cannot convert {} to percentage",
            other.kind()
        ))),
    }
}

/// date → date_time at midnight; date_time passes through.
pub fn to_date_time(store: &mut ValueStore, value: ValueId) -> Result<ValueId, ValueError> {
    match store.get(value) {
        Value::DateTime(dt) => {
            let dt = *dt;
            store.date_time(dt)
        }
        Value::Date(d) => {
            let dt = DateTime::from_date(*d);
            store.date_time(dt)
        }
        other => Err(ValueError::TypeMismatch(format!(
            "cannot convert {} to date_time",
            other.kind()
        ))),
    }
}

/// date_time → date (projection); date passes through.
pub fn to_date(store: &mut ValueStore, value: ValueId) -> Result<ValueId, ValueError> {
    match store.get(value) {
        Value::Date(d) => {
            let d = *d;
            store.date(d)
        }
        Value::DateTime(dt) => {
            let d = dt.date;
            store.date(d)
        }
        other => Err(ValueError::TypeMismatch(format!(
            "cannot convert {} to date",
            other.kind()
        ))),
    }
}

/// date_time → time (projection); time passes through.
pub fn to_time(store: &mut ValueStore, value: ValueId) -> Result<ValueId, ValueError> {
    match store.get(value) {
        Value::Time(t) => {
            let t = *t;
            store.time(t)
        }
        Value::DateTime(dt) => {
            let t = dt.time;
            store.time(t)
        }
        other => Err(ValueError::TypeMismatch(format!(
            "cannot convert {} to time",
            other.kind()
        ))),
    }
}
