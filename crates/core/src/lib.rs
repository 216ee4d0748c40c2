//! Tally Core: the value model of a reactive business-expression language
//!
//! Key design principles:
//! - Value: what the language talks about (money, dates, records, triggers)
//! - ValueStore: the arena that owns every live value and hands out stable
//!   opaque handles
//! - Algebra: pure functions over handles (arithmetic, comparison,
//!   conversion) with the business rules - fixed-point money, calendar
//!   math, percentage scaling - in one place
//!
//! The evaluator and the reactive machinery live in `tally-runtime`; this
//! crate knows nothing about ASTs beyond opaque node handles.

pub mod arithmetic;
pub mod calendar;
pub mod compare;
pub mod convert;
pub mod error;
pub mod literal;
pub mod money;
pub mod serialize;
pub mod store;
pub mod value;

pub use calendar::{Date, DateTime, Time, days_in_month, is_leap_year};
pub use error::ValueError;
pub use literal::{LiteralError, TaggedLiteral, parse_tagged_literal};
pub use money::{Money, SUBUNITS_PER_UNIT};
pub use serialize::{SerializeError, TypedValue, format_value};
pub use store::{StoreStats, ValueStore};
pub use value::{
    ConstraintData, FrameId, FunctionData, NodeId, Ratio, RecordData, TriggerData, TriggerEvent,
    Value, ValueId,
};
