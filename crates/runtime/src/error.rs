//! Runtime Error Handling
//!
//! One error type for everything that can go wrong during evaluation,
//! registration, and reactive enforcement. The kind is a closed enum so
//! drivers can branch on it (and map it to exit codes); the message is
//! prose; the position is attached whenever the failing node carried one.

use crate::ast::SourcePos;
use tally_core::ValueError;

/// The distinct failure kinds the runtime can signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Value algebra and store
    TypeMismatch,
    InvalidOperator,
    DivisionByZero,
    CurrencyMismatch,
    ResourceExhausted,

    // Evaluator
    UndefinedName,
    ArgumentMismatch,
    InvalidCallTarget,
    InvalidAssignmentTarget,
    IndexOutOfRange,
    ReturnOutsideFunction,

    // Constraint engine
    ConstraintViolation,
    HealingOverflow,

    // Registration APIs
    InvalidValue,
}

impl ErrorKind {
    /// Stable lower-snake name used in logs and event payloads.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::InvalidOperator => "invalid_operator",
            ErrorKind::DivisionByZero => "division_by_zero",
            ErrorKind::CurrencyMismatch => "currency_mismatch",
            ErrorKind::ResourceExhausted => "resource_exhausted",
            ErrorKind::UndefinedName => "undefined_name",
            ErrorKind::ArgumentMismatch => "argument_mismatch",
            ErrorKind::InvalidCallTarget => "invalid_call_target",
            ErrorKind::InvalidAssignmentTarget => "invalid_assignment_target",
            ErrorKind::IndexOutOfRange => "index_out_of_range",
            ErrorKind::ReturnOutsideFunction => "return_outside_function",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::HealingOverflow => "healing_overflow",
            ErrorKind::InvalidValue => "invalid_value",
        }
    }
}

/// A runtime failure: kind, message, and the offending source position
/// when one exists.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: Option<SourcePos>,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> RuntimeError {
        RuntimeError {
            kind,
            message: message.into(),
            pos: None,
        }
    }

    /// Attach a position unless the error already carries one (the
    /// innermost position wins as errors propagate outward).
    pub fn at(mut self, pos: &SourcePos) -> RuntimeError {
        if self.pos.is_none() && !pos.is_synthetic() {
            self.pos = Some(pos.clone());
        }
        self
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pos {
            Some(pos) => write!(f, "{} at {}: {}", self.kind.name(), pos, self.message),
            None => write!(f, "{}: {}", self.kind.name(), self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ValueError> for RuntimeError {
    fn from(e: ValueError) -> Self {
        let kind = match &e {
            ValueError::TypeMismatch(_) => ErrorKind::TypeMismatch,
            ValueError::InvalidOperator(_) => ErrorKind::InvalidOperator,
            ValueError::DivisionByZero(_) => ErrorKind::DivisionByZero,
            ValueError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            ValueError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
        };
        RuntimeError::new(kind, e.to_string())
    }
}
