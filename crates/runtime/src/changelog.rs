//! Change Log - Names Changed in the Current Moment
//!
//! An insertion-ordered set of names whose bindings changed since the last
//! moment boundary, plus a pessimistic "everything" flag for writes whose
//! target has no static name. The evaluator marks only after a write has
//! committed; the scheduler drains the whole set at each boundary.

/// The drained contents of one moment's change log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    /// Changed names, in first-change order
    pub names: Vec<String>,
    /// True when a write without a static name happened: every watcher is
    /// treated as affected
    pub touched_all: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && !self.touched_all
    }

    pub fn contains(&self, name: &str) -> bool {
        self.touched_all || self.names.iter().any(|n| n == name)
    }
}

#[derive(Debug, Default)]
pub struct ChangeLog {
    current: ChangeSet,
}

impl ChangeLog {
    pub fn new() -> ChangeLog {
        ChangeLog::default()
    }

    /// Record that `name`'s binding changed.
    pub fn mark(&mut self, name: &str) {
        if !self.current.names.iter().any(|n| n == name) {
            self.current.names.push(name.to_string());
        }
    }

    /// Record a committed write with no static name.
    pub fn mark_all(&mut self) {
        self.current.touched_all = true;
    }

    /// Take the current set, leaving the log empty for the next moment.
    pub fn drain(&mut self) -> ChangeSet {
        std::mem::take(&mut self.current)
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
