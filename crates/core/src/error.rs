//! Core Error Handling
//!
//! Failures produced by the value store and the value algebra. Each variant
//! carries enough context to render a useful message without holding any
//! handle into the store, so errors can outlive the evaluation that raised
//! them.

/// Error produced by the value store or the value algebra.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Operands do not fit any rule of the attempted operation
    TypeMismatch(String),
    /// The operator has no defined behavior for the value kind at all
    InvalidOperator(String),
    /// Division (or ratio inversion) with a zero divisor
    DivisionByZero(String),
    /// Money operation across two different currencies
    CurrencyMismatch { left: String, right: String },
    /// The value arena is out of handle space
    ResourceExhausted(String),
}

impl std::fmt::Display for ValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            ValueError::InvalidOperator(msg) => write!(f, "invalid operator: {}", msg),
            ValueError::DivisionByZero(msg) => write!(f, "division by zero: {}", msg),
            ValueError::CurrencyMismatch { left, right } => {
                write!(f, "currency mismatch: {} vs {}", left, right)
            }
            ValueError::ResourceExhausted(msg) => write!(f, "resource exhausted: {}", msg),
        }
    }
}

impl std::error::Error for ValueError {}
