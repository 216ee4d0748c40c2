//! Dependency Index - Watched Names to Reactive Handles
//!
//! One index instance per reactive family (the runtime keeps one for
//! triggers and one for constraints). Each watched name maps to the
//! handles registered under it, kept in registration order. Registration
//! is idempotent per (name, handle) pair; de-registration sweeps the
//! handle out of every name's set. The sweeps are O(names), which is fine:
//! registration churn is rare next to lookups, and a flat map with ordered
//! vectors keeps the hot path (`watchers`) allocation-free.

use std::collections::HashMap;
use tally_core::ValueId;

#[derive(Debug, Default)]
pub struct DependencyIndex {
    by_name: HashMap<String, Vec<ValueId>>,
}

impl DependencyIndex {
    pub fn new() -> DependencyIndex {
        DependencyIndex::default()
    }

    /// File `handle` under every name in `names`. Re-registering the same
    /// handle under the same name is a no-op.
    pub fn register(&mut self, names: &[String], handle: ValueId) {
        for name in names {
            let entry = self.by_name.entry(name.clone()).or_default();
            if !entry.contains(&handle) {
                entry.push(handle);
            }
        }
    }

    /// Remove `handle` from every name's set.
    pub fn unregister(&mut self, handle: ValueId) {
        for entry in self.by_name.values_mut() {
            entry.retain(|h| *h != handle);
        }
        self.by_name.retain(|_, entry| !entry.is_empty());
    }

    /// The handles watching `name`, in registration order.
    pub fn watchers(&self, name: &str) -> &[ValueId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when `handle` is filed under at least one name.
    pub fn is_registered(&self, handle: ValueId) -> bool {
        self.by_name.values().any(|entry| entry.contains(&handle))
    }
}
