//! Value: What the language talks about
//!
//! A single tagged sum carrying every kind the language can observe: the
//! business scalars (money, calendar types, percentages, ratios), plain
//! numbers/text/booleans, the two absence markers, and the compound and
//! reactive kinds. Compound values never hold pointers to other values;
//! they hold [`ValueId`] handles into the [`ValueStore`](crate::ValueStore)
//! arena, so a `Value` is cheap to move and the arena stays the single
//! owner of every live value.
//!
//! AST bodies referenced by functions, triggers, and constraints live in a
//! separate node arena owned by the runtime; this crate only sees opaque
//! [`NodeId`] handles into it. Captured environments are likewise opaque
//! [`FrameId`] handles into the runtime's frame arena.

use crate::calendar::{Date, DateTime, Time};
use crate::money::Money;

/// Opaque handle to a value in the [`ValueStore`](crate::ValueStore) arena.
///
/// Handles are stable for the lifetime of the runtime instance that
/// allocated them and are only meaningful against that instance's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub(crate) u32);

impl ValueId {
    /// Raw index of the handle, for diagnostics only.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Opaque handle to an AST node in the runtime's node arena.
///
/// The core crate never dereferences these; it only stores them inside
/// function, trigger, and constraint values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Opaque handle to an environment frame in the runtime's frame arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub u32);

/// Ratio of two doubles. The denominator is nonzero by construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratio {
    pub numerator: f64,
    pub denominator: f64,
}

impl Ratio {
    /// Build a ratio, rejecting a zero denominator.
    pub fn new(numerator: f64, denominator: f64) -> Option<Ratio> {
        if denominator == 0.0 {
            None
        } else {
            Some(Ratio {
                numerator,
                denominator,
            })
        }
    }

    /// The real number the ratio denotes.
    pub fn to_number(self) -> f64 {
        self.numerator / self.denominator
    }
}

/// Record payload: named fields plus an optional parent record.
///
/// Lookup falls through to the parent chain on a miss; writes always stay
/// local to the record they address. The chain is finite and acyclic by
/// construction (a record can only adopt a parent that already exists, and
/// deep copies clone the whole chain).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordData {
    fields: Vec<(String, ValueId)>,
    pub parent: Option<ValueId>,
}

impl RecordData {
    pub fn new(parent: Option<ValueId>) -> Self {
        RecordData {
            fields: Vec::new(),
            parent,
        }
    }

    /// Local field lookup. Does not consult the parent chain; the store
    /// owns chain traversal because it needs access to other values.
    pub fn get(&self, name: &str) -> Option<ValueId> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }

    /// Set a local field, replacing any existing binding of the same name.
    /// Returns the prior handle when one was replaced.
    pub fn set(&mut self, name: &str, value: ValueId) -> Option<ValueId> {
        for (k, v) in self.fields.iter_mut() {
            if k == name {
                return Some(std::mem::replace(v, value));
            }
        }
        self.fields.push((name.to_string(), value));
        None
    }

    /// Remove a local field, returning its handle if it was present.
    pub fn remove(&mut self, name: &str) -> Option<ValueId> {
        let idx = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Iterate local fields. Insertion order is an implementation detail
    /// and not observable through the language.
    pub fn fields(&self) -> impl Iterator<Item = (&str, ValueId)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Function payload: a named, parameterized body with an optional captured
/// environment frame.
///
/// The parameter list has no duplicates by construction; calling with the
/// wrong argument count is a runtime error raised by the evaluator, not a
/// lookup failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    pub name: String,
    pub params: Vec<String>,
    pub body: NodeId,
    pub env: Option<FrameId>,
}

impl FunctionData {
    /// Check the no-duplicate-parameter invariant. Returns the offending
    /// name on violation so constructors can report it.
    pub fn duplicate_param(params: &[String]) -> Option<&str> {
        for (i, p) in params.iter().enumerate() {
            if params[..i].iter().any(|q| q == p) {
                return Some(p);
            }
        }
        None
    }
}

/// The lifecycle event a trigger is attached to.
///
/// Only `DataChanged` participates in the moment scheduler's change-driven
/// fan-out; the other kinds fire at their fixed lifecycle points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Fired at a moment boundary when a watched name changed
    DataChanged,
    /// Fired at every moment boundary regardless of changes
    Timer,
    /// Fired once, at the first moment after start
    Startup,
    /// Fired when the runtime stops
    Shutdown,
    /// Fired only by an explicit `fire_custom` call
    Custom,
}

/// Trigger payload: a boolean condition and an action, both AST handles.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerData {
    pub name: String,
    pub event: TriggerEvent,
    pub condition: NodeId,
    pub action: NodeId,
}

/// Constraint payload: a boolean condition and an optional healing action.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintData {
    pub name: String,
    pub condition: NodeId,
    pub healing: Option<NodeId>,
}

/// A value of the language.
///
/// Scalars carry their payload inline. `List` and `Record` hold handles, so
/// structural operations (deep copy, structural equality) go through the
/// store. `Function`, `Trigger`, and `Constraint` are first-class values:
/// they travel through the same arena and the same handles as data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// IEEE-754 double
    Number(f64),

    /// UTF-8 text, owned by the store
    Text(String),

    /// Fixed-point money: 10,000 sub-units per whole unit, any currency
    Money(Money),

    /// Clock time of day, millisecond resolution
    Time(Time),

    /// Calendar date (proleptic Gregorian)
    Date(Date),

    /// Combined date and time
    DateTime(DateTime),

    /// Percentage, stored in percent units (42.0 means 42%)
    Percent(f64),

    /// Ratio of two doubles, denominator nonzero
    Ratio(Ratio),

    /// Boolean
    Boolean(bool),

    /// No value has been observed yet
    Unknown,

    /// Explicit absence
    Nil,

    /// Ordered sequence of value handles
    List(Vec<ValueId>),

    /// Keyed fields with single-parent inheritance
    Record(RecordData),

    /// First-class function
    Function(FunctionData),

    /// Reactive trigger (condition + action)
    Trigger(TriggerData),

    /// Reactive constraint (condition + optional healing)
    Constraint(ConstraintData),
}

impl Value {
    /// Short kind name used in error messages and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Money(_) => "money",
            Value::Time(_) => "time",
            Value::Date(_) => "date",
            Value::DateTime(_) => "date_time",
            Value::Percent(_) => "percentage",
            Value::Ratio(_) => "ratio",
            Value::Boolean(_) => "boolean",
            Value::Unknown => "unknown",
            Value::Nil => "nil",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Function(_) => "function",
            Value::Trigger(_) => "trigger",
            Value::Constraint(_) => "constraint",
        }
    }

    /// True for the two absence markers.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Unknown | Value::Nil)
    }
}
