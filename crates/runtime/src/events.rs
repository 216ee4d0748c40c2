//! Observability Events
//!
//! Structured notifications about reactive activity: trigger firings and
//! errors, constraint violations, healing attempts, and budget deferrals.
//! Hooks are observation-only - nothing downstream of a hook can change
//! what the runtime does, and a runtime without a hook installs no
//! overhead beyond constructing the events it would have sent.
//!
//! Events serialize to JSON (payloads are already `serde_json::Value`) so
//! test harnesses and embedder logs can capture them verbatim.

use serde::Serialize;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A trigger's condition held and its action ran
    TriggerFired,
    /// A trigger's condition or action failed; the moment continued
    TriggerError,
    /// A constraint rejected an assignment
    ConstraintViolation,
    /// A constraint's healing action was invoked
    HealingInvoked,
    /// Healing ran but the condition still did not hold
    HealingFailed,
    /// The per-moment budget ran out; remaining triggers were deferred
    MomentDeferred,
}

/// One observability event.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeEvent {
    /// Index of the moment during which the event happened
    pub moment_index: u64,
    pub kind: EventKind,
    /// The trigger, constraint, or binding the event is about
    pub subject_name: String,
    /// Kind-specific detail
    pub payload: serde_json::Value,
}

impl RuntimeEvent {
    pub fn new(moment_index: u64, kind: EventKind, subject_name: impl Into<String>) -> Self {
        RuntimeEvent {
            moment_index,
            kind,
            subject_name: subject_name.into(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Callback receiving every event. Installed through the runtime façade.
pub type EventSink = Box<dyn FnMut(&RuntimeEvent)>;
