//! Runtime Façade
//!
//! The single owner of every runtime component: the value store, the node
//! arena, the environment, the two dependency indexes, the change log, the
//! reactive registries, the moment clock, and the observability hook. The
//! evaluator, constraint engine, and scheduler are implemented as sibling
//! `impl Runtime` blocks in their own modules, so every cross-component
//! reference flows through this one owner and no component ever holds a
//! pointer to another.
//!
//! Embedders and the parser glue build nodes directly into the runtime's
//! arena (`ast_mut`), so `execute` receives a root handle into storage the
//! runtime already owns.

use crate::ast::Ast;
use crate::changelog::ChangeLog;
use crate::config::RuntimeOptions;
use crate::deps::DependencyIndex;
use crate::env::Environment;
use crate::error::{ErrorKind, RuntimeError};
use crate::eval::Flow;
use crate::events::{EventKind, EventSink, RuntimeEvent};
use crate::names::{AffectedName, referenced_names};
use crate::scheduler::{MomentClock, SchedulerStats};
use crate::constraint::WriteSlot;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tally_core::{
    LiteralError, NodeId, StoreStats, TaggedLiteral, TriggerEvent, Value, ValueId, ValueStore,
    format_value, parse_tagged_literal,
};

/// A registered trigger, denormalized from its value payload so the
/// scheduler never re-reads the store on the hot path.
#[derive(Debug, Clone)]
pub(crate) struct RegisteredTrigger {
    pub handle: ValueId,
    pub name: String,
    pub event: TriggerEvent,
    pub condition: NodeId,
    pub action: NodeId,
    /// Names extracted from condition and action at registration time
    pub names: Vec<String>,
    /// First moment index this trigger participates in
    pub eligible_from: u64,
}

/// A registered constraint, denormalized like [`RegisteredTrigger`].
#[derive(Debug, Clone)]
pub(crate) struct RegisteredConstraint {
    pub handle: ValueId,
    pub name: String,
    pub condition: NodeId,
    pub healing: Option<NodeId>,
}

/// Cross-thread stop request for [`Runtime::run`]. The flag is polled
/// between ticks; it never interrupts a statement in progress.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// The reactive runtime instance.
pub struct Runtime {
    pub(crate) store: ValueStore,
    pub(crate) ast: Ast,
    pub(crate) env: Environment,
    pub(crate) trigger_deps: DependencyIndex,
    pub(crate) constraint_deps: DependencyIndex,
    pub(crate) changes: ChangeLog,
    pub(crate) triggers: Vec<RegisteredTrigger>,
    pub(crate) constraints: Vec<RegisteredConstraint>,
    pub(crate) options: RuntimeOptions,
    pub(crate) clock: MomentClock,
    pub(crate) stats: SchedulerStats,
    pub(crate) sink: Option<EventSink>,
    pub(crate) stop_flag: Arc<AtomicBool>,
    pub(crate) started: bool,
    pub(crate) startup_pending: bool,
    pub(crate) healing_nesting: u32,
    /// Triggers the budget pushed out of their moment
    pub(crate) deferred: Vec<ValueId>,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new(RuntimeOptions::default())
    }
}

impl Runtime {
    pub fn new(options: RuntimeOptions) -> Runtime {
        let clock = MomentClock::new(options.moment_duration());
        Runtime {
            store: ValueStore::new(),
            ast: Ast::new(),
            env: Environment::new(),
            trigger_deps: DependencyIndex::new(),
            constraint_deps: DependencyIndex::new(),
            changes: ChangeLog::new(),
            triggers: Vec::new(),
            constraints: Vec::new(),
            options,
            clock,
            stats: SchedulerStats::default(),
            sink: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            started: false,
            startup_pending: false,
            healing_nesting: 0,
            deferred: Vec::new(),
        }
    }

    // Component access for embedders and the parser glue.

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn store_stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn store(&self) -> &ValueStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ValueStore {
        &mut self.store
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn ast_mut(&mut self) -> &mut Ast {
        &mut self.ast
    }

    /// Render a value in compact literal notation.
    pub fn display(&self, value: ValueId) -> String {
        format_value(&self.store, value)
    }

    /// Parse the body of an `@"..."` literal with this runtime's default
    /// currency applied to money forms. Used by the parser glue so literal
    /// semantics stay inside the runtime.
    pub fn parse_literal(&self, body: &str) -> Result<TaggedLiteral, LiteralError> {
        parse_tagged_literal(body, &self.options.default_currency)
    }

    /// Install the observability hook, replacing any previous one.
    pub fn on_event(&mut self, hook: impl FnMut(&RuntimeEvent) + 'static) {
        self.sink = Some(Box::new(hook));
    }

    pub(crate) fn emit(&mut self, kind: EventKind, subject: &str, payload: serde_json::Value) {
        if let Some(sink) = self.sink.as_mut() {
            let event = RuntimeEvent::new(self.stats.moments, kind, subject).with_payload(payload);
            sink(&event);
        }
    }

    // Reactive registration.

    /// Register a trigger value. Idempotent per handle. Fails with
    /// `InvalidValue` when the handle is not a trigger.
    pub fn register_trigger(&mut self, handle: ValueId) -> Result<(), RuntimeError> {
        let data = match self.store.get(handle) {
            Value::Trigger(data) => data.clone(),
            other => {
                return Err(RuntimeError::new(
                    ErrorKind::InvalidValue,
                    format!("expected a trigger value, got {}", other.kind()),
                ));
            }
        };
        if self.triggers.iter().any(|t| t.handle == handle) {
            return Ok(());
        }

        let mut names = referenced_names(&self.ast, data.condition);
        for name in referenced_names(&self.ast, data.action) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        self.trigger_deps.register(&names, handle);

        // Mid-run registrations sit out the moment in progress.
        let eligible_from = if self.started { self.stats.moments + 1 } else { 0 };
        tracing::debug!(trigger = %data.name, watched = names.len(), "trigger registered");
        self.triggers.push(RegisteredTrigger {
            handle,
            name: data.name,
            event: data.event,
            condition: data.condition,
            action: data.action,
            names,
            eligible_from,
        });
        Ok(())
    }

    /// Remove every trigger registered under `name`. Returns whether any
    /// was present.
    pub fn unregister_trigger(&mut self, name: &str) -> bool {
        let handles: Vec<ValueId> = self
            .triggers
            .iter()
            .filter(|t| t.name == name)
            .map(|t| t.handle)
            .collect();
        for handle in &handles {
            self.trigger_deps.unregister(*handle);
        }
        self.triggers.retain(|t| t.name != name);
        self.deferred.retain(|h| !handles.contains(h));
        !handles.is_empty()
    }

    /// Register a constraint value. The constraint must hold in the
    /// current state; registration does not invoke healing.
    pub fn register_constraint(&mut self, handle: ValueId) -> Result<(), RuntimeError> {
        let data = match self.store.get(handle) {
            Value::Constraint(data) => data.clone(),
            other => {
                return Err(RuntimeError::new(
                    ErrorKind::InvalidValue,
                    format!("expected a constraint value, got {}", other.kind()),
                ));
            }
        };
        if self.constraints.iter().any(|c| c.handle == handle) {
            return Ok(());
        }

        let global = self.env.global();
        if !self.condition_holds(data.condition, global) {
            return Err(RuntimeError::new(
                ErrorKind::ConstraintViolation,
                format!("constraint '{}' does not hold in the current state", data.name),
            ));
        }

        let mut names = referenced_names(&self.ast, data.condition);
        if let Some(healing) = data.healing {
            for name in referenced_names(&self.ast, healing) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        self.constraint_deps.register(&names, handle);
        tracing::debug!(constraint = %data.name, watched = names.len(), "constraint registered");
        self.constraints.push(RegisteredConstraint {
            handle,
            name: data.name,
            condition: data.condition,
            healing: data.healing,
        });
        Ok(())
    }

    /// Remove every constraint registered under `name`. Returns whether
    /// any was present.
    pub fn unregister_constraint(&mut self, name: &str) -> bool {
        let handles: Vec<ValueId> = self
            .constraints
            .iter()
            .filter(|c| c.name == name)
            .map(|c| c.handle)
            .collect();
        for handle in &handles {
            self.constraint_deps.unregister(*handle);
        }
        self.constraints.retain(|c| c.name != name);
        !handles.is_empty()
    }

    // Execution.

    /// Evaluate the tree rooted at `root` in the global environment,
    /// returning the top-level value.
    pub fn execute(&mut self, root: NodeId) -> Result<ValueId, RuntimeError> {
        match self.eval(root, self.env.global())? {
            Flow::Value(value) => Ok(value),
            Flow::Return(_) => Err(RuntimeError::new(
                ErrorKind::ReturnOutsideFunction,
                "return outside a function at the top level",
            )),
        }
    }

    /// Constraint-checked write to an existing global binding.
    pub fn assign(&mut self, name: &str, value: ValueId) -> Result<(), RuntimeError> {
        let global = self.env.global();
        match self.env.defining_frame(global, name) {
            Some(frame) => self.protected_write(
                WriteSlot::Env {
                    frame,
                    name: name.to_string(),
                },
                AffectedName::Exact(name.to_string()),
                value,
                global,
            ),
            None => Err(RuntimeError::new(
                ErrorKind::UndefinedName,
                format!("undefined name '{}'", name),
            )),
        }
    }

    /// Constraint-checked definition of a global binding (creates the name
    /// when absent).
    pub fn define(&mut self, name: &str, value: ValueId) -> Result<(), RuntimeError> {
        let global = self.env.global();
        self.protected_write(
            WriteSlot::Env {
                frame: global,
                name: name.to_string(),
            },
            AffectedName::Exact(name.to_string()),
            value,
            global,
        )
    }

    /// Read a global binding.
    pub fn lookup(&self, name: &str) -> Option<ValueId> {
        self.env.lookup(self.env.global(), name)
    }

    // Lifecycle.

    /// Start the moment clock at the real "now". Startup triggers fire at
    /// the first boundary after this.
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    /// Start with a caller-supplied clock origin (deterministic tests).
    pub fn start_at(&mut self, now: Instant) {
        self.stop_flag.store(false, Ordering::Relaxed);
        self.clock.start(now);
        self.started = true;
        self.startup_pending = true;
        tracing::debug!("runtime started");
    }

    /// Stop the runtime: shutdown triggers fire, the clock halts, and any
    /// `run` loop exits at its next poll.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.stop_flag.store(true, Ordering::Relaxed);
        self.fire_shutdown_triggers();
        self.clock.halt();
        self.started = false;
        tracing::debug!("runtime stopped");
    }

    /// A handle other threads can use to request that `run` exit.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_flag),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}
