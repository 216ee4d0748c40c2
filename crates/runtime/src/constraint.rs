//! Constraint Engine - Synchronous Enforcement on Every Write
//!
//! Every binding change in the system funnels through
//! [`Runtime::protected_write`]: the single place that knows how to read,
//! tentatively commit, validate, and roll back a write. The sequence is:
//!
//! 1. Skip entirely when the new value is structurally equal to the
//!    current binding - no observable change, no enforcement, no change
//!    log entry.
//! 2. Commit tentatively.
//! 3. Re-evaluate every constraint watching the affected name, in
//!    registration order. A false condition invokes the healing action if
//!    one exists, then re-checks once.
//! 4. On failure, restore the prior binding exactly (removing it when the
//!    write created it) and signal `ConstraintViolation`.
//! 5. On success, mark the change log.
//!
//! Healing actions assign through the same protocol, so enforcement
//! recurses; the nesting counter bounds that recursion and converts
//! runaway healing into `HealingOverflow`.

use crate::error::{ErrorKind, RuntimeError};
use crate::eval::Flow;
use crate::events::EventKind;
use crate::names::AffectedName;
use crate::runtime::Runtime;
use tally_core::{FrameId, NodeId, Value, ValueId, compare};

/// The storage location a write addresses.
#[derive(Debug, Clone)]
pub(crate) enum WriteSlot {
    /// A name in an environment frame (exactly that frame, no chain walk)
    Env { frame: FrameId, name: String },
    /// A local field of a record (writes never touch the parent chain)
    RecordField { record: ValueId, field: String },
    /// An element of a list
    ListItem { list: ValueId, index: usize },
}

impl Runtime {
    fn slot_read(&self, slot: &WriteSlot) -> Option<ValueId> {
        match slot {
            WriteSlot::Env { frame, name } => self.env.get_local(*frame, name),
            WriteSlot::RecordField { record, field } => match self.store.get(*record) {
                Value::Record(data) => data.get(field),
                _ => None,
            },
            WriteSlot::ListItem { list, index } => match self.store.get(*list) {
                Value::List(items) => items.get(*index).copied(),
                _ => None,
            },
        }
    }

    fn slot_write(&mut self, slot: &WriteSlot, value: ValueId) {
        match slot {
            WriteSlot::Env { frame, name } => {
                self.env.define(*frame, name, value);
            }
            WriteSlot::RecordField { record, field } => {
                if let Value::Record(data) = self.store.get_mut(*record) {
                    data.set(field, value);
                }
            }
            WriteSlot::ListItem { list, index } => {
                if let Value::List(items) = self.store.get_mut(*list) {
                    items[*index] = value;
                }
            }
        }
    }

    fn slot_restore(&mut self, slot: &WriteSlot, prior: Option<ValueId>) {
        match prior {
            Some(value) => self.slot_write(slot, value),
            None => match slot {
                WriteSlot::Env { frame, name } => {
                    self.env.remove(*frame, name);
                }
                WriteSlot::RecordField { record, field } => {
                    if let Value::Record(data) = self.store.get_mut(*record) {
                        data.remove(field);
                    }
                }
                // List writes always replace an existing element.
                WriteSlot::ListItem { .. } => {}
            },
        }
    }

    /// The assignment protocol. `frame` is the environment the write
    /// happened in; constraint conditions and healing actions evaluate
    /// there.
    pub(crate) fn protected_write(
        &mut self,
        slot: WriteSlot,
        affected: AffectedName,
        value: ValueId,
        frame: FrameId,
    ) -> Result<(), RuntimeError> {
        let prior = self.slot_read(&slot);
        if let Some(current) = prior
            && compare::structurally_equal(&self.store, value, current)
        {
            return Ok(());
        }

        self.slot_write(&slot, value);
        match self.enforce_constraints(&affected, frame) {
            Ok(()) => {
                match &affected {
                    AffectedName::Exact(name) => self.changes.mark(name),
                    AffectedName::Unknown => self.changes.mark_all(),
                }
                Ok(())
            }
            Err(err) => {
                self.slot_restore(&slot, prior);
                Err(err)
            }
        }
    }

    /// Re-evaluate every constraint watching `affected`, registration
    /// order. The write is already tentatively committed.
    fn enforce_constraints(
        &mut self,
        affected: &AffectedName,
        frame: FrameId,
    ) -> Result<(), RuntimeError> {
        let watching: Vec<ValueId> = match affected {
            AffectedName::Exact(name) => self.constraint_deps.watchers(name).to_vec(),
            // Pessimistic fan-out: a write without a static name may have
            // touched anything, so every constraint runs.
            AffectedName::Unknown => self.constraints.iter().map(|c| c.handle).collect(),
        };

        for handle in watching {
            let Some(entry) = self.constraints.iter().find(|c| c.handle == handle) else {
                continue;
            };
            let (name, condition, healing) = (entry.name.clone(), entry.condition, entry.healing);

            if self.condition_holds(condition, frame) {
                continue;
            }

            if let Some(healing) = healing {
                self.emit(EventKind::HealingInvoked, &name, serde_json::Value::Null);
                self.run_healing(healing, frame)?;
                if self.condition_holds(condition, frame) {
                    continue;
                }
                self.emit(EventKind::HealingFailed, &name, serde_json::Value::Null);
            }

            let binding = match affected {
                AffectedName::Exact(n) => serde_json::Value::String(n.clone()),
                AffectedName::Unknown => serde_json::Value::Null,
            };
            self.emit(
                EventKind::ConstraintViolation,
                &name,
                serde_json::json!({ "binding": binding }),
            );
            tracing::debug!(constraint = %name, "constraint violated, rolling back");
            return Err(RuntimeError::new(
                ErrorKind::ConstraintViolation,
                format!("constraint '{}' does not hold", name),
            ));
        }
        Ok(())
    }

    /// Evaluate a healing action under the recursion ceiling. Healing that
    /// assigns re-enters enforcement through `protected_write`; the nesting
    /// counter is what keeps mutually-healing constraints from spinning
    /// forever.
    fn run_healing(&mut self, healing: NodeId, frame: FrameId) -> Result<(), RuntimeError> {
        if self.healing_nesting >= self.options.healing_depth {
            return Err(RuntimeError::new(
                ErrorKind::HealingOverflow,
                format!(
                    "healing recursion exceeded depth {}",
                    self.options.healing_depth
                ),
            ));
        }
        self.healing_nesting += 1;
        let result = self.eval(healing, frame);
        self.healing_nesting -= 1;
        match result {
            // Overflow from a nested healing chain propagates unchanged;
            // any other healing failure just means the constraint was not
            // healed and the re-check below will fail it.
            Err(err) if err.kind == ErrorKind::HealingOverflow => Err(err),
            _ => Ok(()),
        }
    }

    /// True iff the condition evaluates to boolean `true`. Errors and
    /// non-boolean results count as "does not hold".
    pub(crate) fn condition_holds(&mut self, condition: NodeId, frame: FrameId) -> bool {
        match self.eval(condition, frame) {
            Ok(Flow::Value(v)) => matches!(self.store.get(v), Value::Boolean(true)),
            Ok(Flow::Return(_)) => false,
            Err(err) => {
                tracing::trace!(error = %err, "condition evaluation failed");
                false
            }
        }
    }
}
