//! Serialization of Tally Values
//!
//! Runtime values hold arena handles and AST references, which are not
//! directly serializable. `TypedValue` is an owned mirror of the data
//! kinds: it can leave the runtime, cross a process boundary as JSON, and
//! be re-imported into another store. Function, trigger, and constraint
//! values are refused - code is not data.
//!
//! The module also owns the compact literal formatter used by logs,
//! observability payloads, and embedder display: scalar values render in
//! their canonical literal notation where one exists (`@"2024-03-30"`,
//! `$1.99 USD`, `42%`), lists in brackets, records in braces with the
//! parent chain appended after `<`.

use crate::calendar::{Date, DateTime, Time};
use crate::error::ValueError;
use crate::money::Money;
use crate::store::ValueStore;
use crate::value::{Ratio, Value, ValueId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Error during conversion to or from the serializable mirror.
#[derive(Debug)]
pub enum SerializeError {
    /// Functions cannot be serialized - code is not data
    FunctionNotSerializable,
    /// Triggers cannot be serialized - code is not data
    TriggerNotSerializable,
    /// Constraints cannot be serialized - code is not data
    ConstraintNotSerializable,
    /// Component values out of range (e.g. month 13) in incoming data
    InvalidData(String),
    /// JSON encoding/decoding error
    Json(serde_json::Error),
    /// The receiving store refused an allocation
    Store(ValueError),
}

impl std::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializeError::FunctionNotSerializable => {
                write!(f, "functions cannot be serialized - code is not data")
            }
            SerializeError::TriggerNotSerializable => {
                write!(f, "triggers cannot be serialized - code is not data")
            }
            SerializeError::ConstraintNotSerializable => {
                write!(f, "constraints cannot be serialized - code is not data")
            }
            SerializeError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            SerializeError::Json(e) => write!(f, "JSON error: {}", e),
            SerializeError::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl std::error::Error for SerializeError {}

impl From<serde_json::Error> for SerializeError {
    fn from(e: serde_json::Error) -> Self {
        SerializeError::Json(e)
    }
}

impl From<ValueError> for SerializeError {
    fn from(e: ValueError) -> Self {
        SerializeError::Store(e)
    }
}

/// Owned, serializable mirror of the data kinds.
///
/// Records use `BTreeMap` (not the store's insertion-ordered pairs) so the
/// same logical record always serializes to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValue {
    Number(f64),
    Text(String),
    Money { amount: i64, currency: String },
    Time { hour: u8, minute: u8, second: u8, millisecond: u16 },
    Date { year: i32, month: u8, day: u8 },
    DateTime(Box<(TypedValue, TypedValue)>),
    Percent(f64),
    Ratio { numerator: f64, denominator: f64 },
    Boolean(bool),
    Unknown,
    Nil,
    List(Vec<TypedValue>),
    Record {
        fields: BTreeMap<String, TypedValue>,
        parent: Option<Box<TypedValue>>,
    },
}

impl TypedValue {
    /// Project a store value into the mirror.
    pub fn from_value(store: &ValueStore, id: ValueId) -> Result<TypedValue, SerializeError> {
        match store.get(id) {
            Value::Number(n) => Ok(TypedValue::Number(*n)),
            Value::Text(s) => Ok(TypedValue::Text(s.clone())),
            Value::Money(m) => Ok(TypedValue::Money {
                amount: m.amount,
                currency: m.currency.clone(),
            }),
            Value::Time(t) => Ok(TypedValue::Time {
                hour: t.hour,
                minute: t.minute,
                second: t.second,
                millisecond: t.millisecond,
            }),
            Value::Date(d) => Ok(TypedValue::Date {
                year: d.year,
                month: d.month,
                day: d.day,
            }),
            Value::DateTime(dt) => {
                let date = TypedValue::Date {
                    year: dt.date.year,
                    month: dt.date.month,
                    day: dt.date.day,
                };
                let time = TypedValue::Time {
                    hour: dt.time.hour,
                    minute: dt.time.minute,
                    second: dt.time.second,
                    millisecond: dt.time.millisecond,
                };
                Ok(TypedValue::DateTime(Box::new((date, time))))
            }
            Value::Percent(p) => Ok(TypedValue::Percent(*p)),
            Value::Ratio(r) => Ok(TypedValue::Ratio {
                numerator: r.numerator,
                denominator: r.denominator,
            }),
            Value::Boolean(b) => Ok(TypedValue::Boolean(*b)),
            Value::Unknown => Ok(TypedValue::Unknown),
            Value::Nil => Ok(TypedValue::Nil),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(TypedValue::from_value(store, *item)?);
                }
                Ok(TypedValue::List(out))
            }
            Value::Record(data) => {
                let mut fields = BTreeMap::new();
                for (name, field) in data.fields() {
                    fields.insert(name.to_string(), TypedValue::from_value(store, field)?);
                }
                let parent = match data.parent {
                    Some(p) => Some(Box::new(TypedValue::from_value(store, p)?)),
                    None => None,
                };
                Ok(TypedValue::Record { fields, parent })
            }
            Value::Function(_) => Err(SerializeError::FunctionNotSerializable),
            Value::Trigger(_) => Err(SerializeError::TriggerNotSerializable),
            Value::Constraint(_) => Err(SerializeError::ConstraintNotSerializable),
        }
    }

    /// Import the mirror into a store, validating component ranges that the
    /// wire format cannot enforce.
    pub fn into_store(&self, store: &mut ValueStore) -> Result<ValueId, SerializeError> {
        match self {
            TypedValue::Number(n) => Ok(store.number(*n)?),
            TypedValue::Text(s) => Ok(store.text(s.clone())?),
            TypedValue::Money { amount, currency } => {
                Ok(store.money(Money::new(*amount, currency.clone()))?)
            }
            TypedValue::Time {
                hour,
                minute,
                second,
                millisecond,
            } => {
                let time = Time::new(*hour, *minute, *second, *millisecond).ok_or_else(|| {
                    SerializeError::InvalidData(format!(
                        "time out of range: {:02}:{:02}:{:02}.{:03}",
                        hour, minute, second, millisecond
                    ))
                })?;
                Ok(store.time(time)?)
            }
            TypedValue::Date { year, month, day } => {
                let date = Date::new(*year, *month, *day).ok_or_else(|| {
                    SerializeError::InvalidData(format!(
                        "date out of range: {}-{}-{}",
                        year, month, day
                    ))
                })?;
                Ok(store.date(date)?)
            }
            TypedValue::DateTime(parts) => {
                let date_id = parts.0.into_store(store)?;
                let time_id = parts.1.into_store(store)?;
                match (store.get(date_id), store.get(time_id)) {
                    (Value::Date(d), Value::Time(t)) => {
                        Ok(store.date_time(DateTime::new(*d, *t))?)
                    }
                    _ => Err(SerializeError::InvalidData(
                        "date_time halves must be a date and a time".to_string(),
                    )),
                }
            }
            TypedValue::Percent(p) => Ok(store.percent(*p)?),
            TypedValue::Ratio {
                numerator,
                denominator,
            } => {
                let ratio = Ratio::new(*numerator, *denominator).ok_or_else(|| {
                    SerializeError::InvalidData("ratio denominator is zero".to_string())
                })?;
                Ok(store.ratio(ratio)?)
            }
            TypedValue::Boolean(b) => Ok(store.boolean(*b)?),
            TypedValue::Unknown => Ok(store.unknown()?),
            TypedValue::Nil => Ok(store.nil()?),
            TypedValue::List(items) => {
                let mut ids = Vec::with_capacity(items.len());
                for item in items {
                    ids.push(item.into_store(store)?);
                }
                Ok(store.list(ids)?)
            }
            TypedValue::Record { fields, parent } => {
                let parent_id = match parent {
                    Some(p) => Some(p.into_store(store)?),
                    None => None,
                };
                let record = store.record(parent_id)?;
                for (name, field) in fields {
                    let field_id = field.into_store(store)?;
                    match store.get_mut(record) {
                        Value::Record(data) => {
                            data.set(name, field_id);
                        }
                        _ => unreachable!("record handle changed kind"),
                    }
                }
                Ok(record)
            }
        }
    }

    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<TypedValue, SerializeError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Render a value in compact literal notation.
pub fn format_value(store: &ValueStore, id: ValueId) -> String {
    let mut buf = String::new();
    write_value(store, id, &mut buf);
    buf
}

fn write_value(store: &ValueStore, id: ValueId, buf: &mut String) {
    match store.get(id) {
        Value::Number(n) => write_number(*n, buf),
        Value::Text(s) => write_text(s, buf),
        Value::Money(m) => buf.push_str(&m.to_string()),
        Value::Time(t) => {
            buf.push_str(&format!("@\"{}\"", t));
        }
        Value::Date(d) => {
            buf.push_str(&format!("@\"{}\"", d));
        }
        Value::DateTime(dt) => {
            buf.push_str(&format!("@\"{}\"", dt));
        }
        Value::Percent(p) => {
            write_number(*p, buf);
            buf.push('%');
        }
        Value::Ratio(r) => {
            write_number(r.numerator, buf);
            buf.push('/');
            write_number(r.denominator, buf);
        }
        Value::Boolean(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Unknown => buf.push_str("unknown"),
        Value::Nil => buf.push_str("nil"),
        Value::List(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                write_value(store, *item, buf);
            }
            buf.push(']');
        }
        Value::Record(data) => {
            buf.push('{');
            for (i, (name, field)) in data.fields().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                buf.push_str(name);
                buf.push_str(": ");
                write_value(store, field, buf);
            }
            buf.push('}');
            if let Some(parent) = data.parent {
                buf.push_str(" < ");
                write_value(store, parent, buf);
            }
        }
        Value::Function(f) => {
            buf.push_str("<function ");
            buf.push_str(&f.name);
            buf.push('>');
        }
        Value::Trigger(t) => {
            buf.push_str("<trigger ");
            buf.push_str(&t.name);
            buf.push('>');
        }
        Value::Constraint(c) => {
            buf.push_str("<constraint ");
            buf.push_str(&c.name);
            buf.push('>');
        }
    }
}

/// Integral doubles print without a fraction; everything else prints with
/// Rust's shortest round-trip representation.
fn write_number(n: f64, buf: &mut String) {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        buf.push_str(&format!("{}", n as i64));
    } else {
        buf.push_str(&n.to_string());
    }
}

fn write_text(s: &str, buf: &mut String) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            c if c.is_control() => buf.push_str(&format!("\\u{:04x}", c as u32)),
            c => buf.push(c),
        }
    }
    buf.push('"');
}
