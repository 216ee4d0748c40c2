//! Tally Runtime: reactive interpreter for a business-expression language
//!
//! Key design principles:
//! - One owner: the [`Runtime`] façade holds the value store, node arena,
//!   environment, dependency indexes, change log, and reactive registries
//!   as sibling fields; the evaluator, constraint engine, and scheduler
//!   are `impl Runtime` blocks, never separately-owned objects.
//! - One write path: every binding change - language `=`, declarations,
//!   the `assign`/`define` API - goes through the assignment protocol,
//!   which enforces constraints synchronously and feeds the change log.
//! - Batched reactions: triggers fire at fixed wall-clock moment
//!   boundaries, at most once per moment each, driven by the drained
//!   change log and the dependency index.

pub mod ast;
pub mod changelog;
pub mod config;
pub mod constraint;
pub mod deps;
pub mod env;
pub mod error;
pub mod eval;
pub mod events;
pub mod names;
pub mod runtime;
pub mod scheduler;

pub use ast::{Ast, BinOp, Node, SourcePos, UnOp};
pub use changelog::{ChangeLog, ChangeSet};
pub use config::{OptionsError, RuntimeOptions};
pub use deps::DependencyIndex;
pub use env::Environment;
pub use error::{ErrorKind, RuntimeError};
pub use events::{EventKind, RuntimeEvent};
pub use names::{AffectedName, affected_name, referenced_names};
pub use runtime::{Runtime, StopHandle};
pub use scheduler::SchedulerStats;

// The value model re-exported for embedders that only depend on this crate.
pub use tally_core::{
    Date, DateTime, LiteralError, Money, NodeId, Ratio, TaggedLiteral, Time, TriggerEvent, Value,
    ValueError, ValueId, ValueStore,
};
