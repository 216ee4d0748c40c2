//! Trigger Scheduler - The Moment Loop
//!
//! Time is sliced into fixed wall-clock moments (default 333 ms). Between
//! boundaries the evaluator runs and the change log accumulates; at each
//! boundary the scheduler drains the log, computes the affected triggers
//! through the dependency index, and fires each one at most once.
//!
//! ## Drift
//!
//! Boundaries advance by exactly one moment duration, never to "now".
//! A late tick therefore fires the overdue moment and leaves the boundary
//! where it belongs; repeated pumps catch up one moment at a time instead
//! of silently stretching moments.
//!
//! ## Determinism
//!
//! The clock never reads time itself. [`Runtime::pump`] takes the caller's
//! `Instant`, which makes moment processing fully deterministic under test;
//! [`Runtime::run`] is the thin wall-clock layer that feeds real time into
//! the same path and sleeps between polls.

use crate::events::EventKind;
use crate::eval::Flow;
use crate::runtime::{RegisteredTrigger, Runtime};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tally_core::{TriggerEvent, Value};

/// Lifecycle counters for diagnostics. All monotonically increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Completed moments
    pub moments: u64,
    /// Trigger actions that ran to completion
    pub triggers_fired: u64,
    /// Trigger conditions or actions that failed
    pub trigger_errors: u64,
    /// Trigger evaluations pushed to a later moment by the budget
    pub deferrals: u64,
}

/// Drift-free moment boundary tracking.
#[derive(Debug)]
pub(crate) struct MomentClock {
    last_boundary: Option<Instant>,
    duration: Duration,
}

impl MomentClock {
    pub(crate) fn new(duration: Duration) -> MomentClock {
        MomentClock {
            last_boundary: None,
            duration,
        }
    }

    /// Begin counting moments from `now`.
    pub(crate) fn start(&mut self, now: Instant) {
        self.last_boundary = Some(now);
    }

    pub(crate) fn halt(&mut self) {
        self.last_boundary = None;
    }

    /// True when a full moment has elapsed since the last boundary.
    pub(crate) fn due(&self, now: Instant) -> bool {
        match self.last_boundary {
            Some(last) => now.checked_duration_since(last).is_some_and(|d| d >= self.duration),
            None => false,
        }
    }

    /// Advance by exactly one duration (not to "now", to avoid drift).
    pub(crate) fn advance(&mut self) {
        if let Some(last) = self.last_boundary {
            self.last_boundary = Some(last + self.duration);
        }
    }
}

impl Runtime {
    /// Process at most one moment boundary against the caller's clock.
    /// Returns true when a boundary fired. Callers that fell behind can
    /// pump repeatedly to catch up one moment per call.
    pub fn pump(&mut self, now: Instant) -> bool {
        if !self.started || !self.clock.due(now) {
            return false;
        }
        self.clock.advance();
        self.fire_moment();
        true
    }

    /// Wall-clock loop: pump with real time, sleep between polls, exit
    /// when a [`StopHandle`](crate::runtime::StopHandle) requests it. The
    /// flag is only checked between ticks; a trigger in progress always
    /// finishes.
    pub fn run(&mut self) {
        if !self.started {
            return;
        }
        tracing::debug!(moment_millis = self.options.moment_millis, "moment loop starting");
        while !self.stop_flag.load(Ordering::Relaxed) {
            if !self.pump(Instant::now()) {
                std::thread::sleep(self.options.poll_interval());
            }
        }
        if self.started {
            self.stop();
        }
    }

    /// One moment boundary: drain changes, fire affected triggers once
    /// each, advance the counter.
    pub(crate) fn fire_moment(&mut self) {
        let index = self.stats.moments;
        let changed = self.changes.drain();
        let carried = std::mem::take(&mut self.deferred);
        let startup = self.startup_pending;
        self.startup_pending = false;

        // Affected set, registration order, each trigger at most once.
        let mut affected: Vec<RegisteredTrigger> = Vec::new();
        for trigger in &self.triggers {
            if trigger.eligible_from > index {
                continue;
            }
            let due = carried.contains(&trigger.handle)
                || match trigger.event {
                    TriggerEvent::Timer => true,
                    TriggerEvent::Startup => startup,
                    TriggerEvent::DataChanged => {
                        !trigger.names.is_empty()
                            && (changed.touched_all
                                || trigger.names.iter().any(|n| changed.contains(n)))
                    }
                    TriggerEvent::Shutdown | TriggerEvent::Custom => false,
                };
            if due && !affected.iter().any(|t| t.handle == trigger.handle) {
                affected.push(trigger.clone());
            }
        }

        tracing::trace!(
            moment = index,
            changed = changed.names.len(),
            affected = affected.len(),
            "moment boundary"
        );

        let budget = self.options.moment_budget;
        let mut evaluated: u32 = 0;
        let mut pending = affected.into_iter();
        for trigger in pending.by_ref() {
            if budget.is_some_and(|b| evaluated >= b) {
                // Out of budget: this trigger and the rest carry over.
                self.defer_trigger(trigger);
                break;
            }
            evaluated += 1;
            self.run_trigger(&trigger);
        }
        for trigger in pending {
            self.defer_trigger(trigger);
        }

        self.stats.moments += 1;
    }

    fn defer_trigger(&mut self, trigger: RegisteredTrigger) {
        self.stats.deferrals += 1;
        self.emit(
            EventKind::MomentDeferred,
            &trigger.name,
            serde_json::Value::Null,
        );
        self.deferred.push(trigger.handle);
    }

    /// Evaluate one trigger: condition exactly once, action when the
    /// condition is boolean true. Failures are reported to the hook and
    /// never abort the moment.
    pub(crate) fn run_trigger(&mut self, trigger: &RegisteredTrigger) {
        let global = self.env.global();
        let outcome: Result<bool, String> = match self.eval(trigger.condition, global) {
            Ok(Flow::Value(v)) => match self.store.get(v) {
                Value::Boolean(b) => Ok(*b),
                other => Err(format!("condition must be a boolean, got {}", other.kind())),
            },
            Ok(Flow::Return(_)) => Err("return outside function in condition".to_string()),
            Err(err) => Err(err.to_string()),
        };
        let holds = match outcome {
            Ok(holds) => holds,
            Err(message) => {
                self.trigger_error(&trigger.name, &message);
                return;
            }
        };
        if !holds {
            return;
        }
        match self.eval(trigger.action, global) {
            Ok(_) => {
                self.stats.triggers_fired += 1;
                self.emit(
                    EventKind::TriggerFired,
                    &trigger.name,
                    serde_json::Value::Null,
                );
            }
            Err(err) => self.trigger_error(&trigger.name, &err.to_string()),
        }
    }

    fn trigger_error(&mut self, name: &str, message: &str) {
        self.stats.trigger_errors += 1;
        tracing::debug!(trigger = %name, error = %message, "trigger failed");
        self.emit(
            EventKind::TriggerError,
            name,
            serde_json::json!({ "error": message }),
        );
    }

    /// Fire every shutdown-kind trigger. Called from `stop()`.
    pub(crate) fn fire_shutdown_triggers(&mut self) {
        let shutdown: Vec<RegisteredTrigger> = self
            .triggers
            .iter()
            .filter(|t| t.event == TriggerEvent::Shutdown)
            .cloned()
            .collect();
        for trigger in shutdown {
            self.run_trigger(&trigger);
        }
    }

    /// Fire custom-kind triggers registered under `name`, immediately.
    /// Returns true when at least one matched.
    pub fn fire_custom(&mut self, name: &str) -> bool {
        let matching: Vec<RegisteredTrigger> = self
            .triggers
            .iter()
            .filter(|t| t.event == TriggerEvent::Custom && t.name == name)
            .cloned()
            .collect();
        for trigger in &matching {
            self.run_trigger(trigger);
        }
        !matching.is_empty()
    }

    /// Drive the runtime with a manual clock until `deadline`, firing every
    /// boundary in between. Test and embedder convenience over `pump`.
    pub fn pump_until(&mut self, deadline: Instant) -> u32 {
        let mut fired = 0;
        while self.pump(deadline) {
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_due_and_advance() {
        let mut clock = MomentClock::new(Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(!clock.due(t0));

        clock.start(t0);
        assert!(!clock.due(t0));
        assert!(!clock.due(t0 + Duration::from_millis(99)));
        assert!(clock.due(t0 + Duration::from_millis(100)));

        clock.advance();
        assert!(!clock.due(t0 + Duration::from_millis(150)));
        assert!(clock.due(t0 + Duration::from_millis(200)));
    }

    #[test]
    fn test_clock_advances_by_duration_not_to_now() {
        let mut clock = MomentClock::new(Duration::from_millis(100));
        let t0 = Instant::now();
        clock.start(t0);

        // A very late tick: three moments behind.
        let late = t0 + Duration::from_millis(350);
        assert!(clock.due(late));
        clock.advance();
        // Still behind: the boundary moved to t0+100, not to `late`.
        assert!(clock.due(late));
        clock.advance();
        assert!(clock.due(late));
        clock.advance();
        assert!(!clock.due(late));
    }

    #[test]
    fn test_halted_clock_is_never_due() {
        let mut clock = MomentClock::new(Duration::from_millis(1));
        let t0 = Instant::now();
        clock.start(t0);
        clock.halt();
        assert!(!clock.due(t0 + Duration::from_secs(10)));
    }
}
