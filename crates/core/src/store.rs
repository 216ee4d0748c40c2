//! Value Store - Arena Ownership of Every Live Value
//!
//! A slot vector addressed by opaque [`ValueId`] indices. The store owns
//! every value for the lifetime of the runtime instance: handles never
//! dangle and never move, and release happens en bloc when the store is
//! dropped. No per-value reclamation happens during a program (arena
//! semantics); the trade is memory for handle stability, which the
//! reactive layer depends on when it stashes handles in registries and
//! change journals.
//!
//! Constructors are typed per kind and never produce a partially
//! initialized value; when the arena runs out of handle space they fail
//! with `ResourceExhausted` instead of panicking. String payloads (text
//! bytes, currency codes, record keys) are moved into store-owned storage
//! at construction.

use crate::calendar::{Date, DateTime, Time};
use crate::error::ValueError;
use crate::money::Money;
use crate::value::{
    ConstraintData, FunctionData, NodeId, Ratio, RecordData, TriggerData, TriggerEvent, Value,
    ValueId,
};

/// Default slot cap: the full 32-bit handle space.
const DEFAULT_CAPACITY: usize = u32::MAX as usize;

/// Live-arena statistics for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of values currently allocated
    pub live: usize,
    /// High-water mark of allocations over the store's lifetime
    pub high_water: usize,
}

/// Arena owning every value, addressed by stable opaque handles.
#[derive(Debug)]
pub struct ValueStore {
    slots: Vec<Value>,
    capacity: usize,
    high_water: usize,
}

impl Default for ValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueStore {
    pub fn new() -> ValueStore {
        ValueStore {
            slots: Vec::new(),
            capacity: DEFAULT_CAPACITY,
            high_water: 0,
        }
    }

    /// A store refusing to grow beyond `capacity` values. Used by embedders
    /// that want a hard memory ceiling.
    pub fn with_capacity_limit(capacity: usize) -> ValueStore {
        ValueStore {
            slots: Vec::new(),
            capacity: capacity.min(DEFAULT_CAPACITY),
            high_water: 0,
        }
    }

    fn alloc(&mut self, value: Value) -> Result<ValueId, ValueError> {
        if self.slots.len() >= self.capacity {
            return Err(ValueError::ResourceExhausted(format!(
                "value arena is full ({} slots)",
                self.capacity
            )));
        }
        let id = ValueId(self.slots.len() as u32);
        self.slots.push(value);
        self.high_water = self.high_water.max(self.slots.len());
        Ok(id)
    }

    /// Read a value. Handles are only produced by this store, so an
    /// out-of-range index is a bug in the caller, not a recoverable error.
    pub fn get(&self, id: ValueId) -> &Value {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: ValueId) -> &mut Value {
        &mut self.slots[id.index()]
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            live: self.slots.len(),
            high_water: self.high_water,
        }
    }

    // Typed constructors, one per kind.

    pub fn number(&mut self, value: f64) -> Result<ValueId, ValueError> {
        self.alloc(Value::Number(value))
    }

    pub fn text(&mut self, value: impl Into<String>) -> Result<ValueId, ValueError> {
        self.alloc(Value::Text(value.into()))
    }

    pub fn money(&mut self, money: Money) -> Result<ValueId, ValueError> {
        self.alloc(Value::Money(money))
    }

    pub fn time(&mut self, time: Time) -> Result<ValueId, ValueError> {
        self.alloc(Value::Time(time))
    }

    pub fn date(&mut self, date: Date) -> Result<ValueId, ValueError> {
        self.alloc(Value::Date(date))
    }

    pub fn date_time(&mut self, dt: DateTime) -> Result<ValueId, ValueError> {
        self.alloc(Value::DateTime(dt))
    }

    pub fn percent(&mut self, value: f64) -> Result<ValueId, ValueError> {
        self.alloc(Value::Percent(value))
    }

    pub fn ratio(&mut self, ratio: Ratio) -> Result<ValueId, ValueError> {
        self.alloc(Value::Ratio(ratio))
    }

    pub fn boolean(&mut self, value: bool) -> Result<ValueId, ValueError> {
        self.alloc(Value::Boolean(value))
    }

    pub fn unknown(&mut self) -> Result<ValueId, ValueError> {
        self.alloc(Value::Unknown)
    }

    pub fn nil(&mut self) -> Result<ValueId, ValueError> {
        self.alloc(Value::Nil)
    }

    pub fn list(&mut self, items: Vec<ValueId>) -> Result<ValueId, ValueError> {
        self.alloc(Value::List(items))
    }

    pub fn record(&mut self, parent: Option<ValueId>) -> Result<ValueId, ValueError> {
        if let Some(p) = parent
            && !matches!(self.get(p), Value::Record(_))
        {
            return Err(ValueError::TypeMismatch(format!(
                "record parent must be a record, got {}",
                self.get(p).kind()
            )));
        }
        self.alloc(Value::Record(RecordData::new(parent)))
    }

    /// Construct a function value, enforcing the no-duplicate-parameter
    /// invariant.
    pub fn function(
        &mut self,
        name: impl Into<String>,
        params: Vec<String>,
        body: NodeId,
        env: Option<crate::value::FrameId>,
    ) -> Result<ValueId, ValueError> {
        if let Some(dup) = FunctionData::duplicate_param(&params) {
            return Err(ValueError::TypeMismatch(format!(
                "duplicate parameter name: {}",
                dup
            )));
        }
        self.alloc(Value::Function(FunctionData {
            name: name.into(),
            params,
            body,
            env,
        }))
    }

    pub fn trigger(
        &mut self,
        name: impl Into<String>,
        event: TriggerEvent,
        condition: NodeId,
        action: NodeId,
    ) -> Result<ValueId, ValueError> {
        self.alloc(Value::Trigger(TriggerData {
            name: name.into(),
            event,
            condition,
            action,
        }))
    }

    pub fn constraint(
        &mut self,
        name: impl Into<String>,
        condition: NodeId,
        healing: Option<NodeId>,
    ) -> Result<ValueId, ValueError> {
        self.alloc(Value::Constraint(ConstraintData {
            name: name.into(),
            condition,
            healing,
        }))
    }

    /// Record-field lookup that walks the parent chain. Returns the handle
    /// bound to the first record in the chain defining `field`.
    pub fn record_lookup(&self, record: ValueId, field: &str) -> Option<ValueId> {
        let mut cursor = Some(record);
        while let Some(id) = cursor {
            match self.get(id) {
                Value::Record(data) => match data.get(field) {
                    Some(v) => return Some(v),
                    None => cursor = data.parent,
                },
                _ => return None,
            }
        }
        None
    }

    /// Deep copy: a structurally independent tree. Lists copy their
    /// elements; records copy their fields and their whole parent chain, so
    /// later mutation of the original parent cannot leak into the copy.
    /// Function, trigger, and constraint values copy their payloads but
    /// keep sharing AST handles, which are immutable.
    pub fn deep_copy(&mut self, id: ValueId) -> Result<ValueId, ValueError> {
        let value = self.get(id).clone();
        match value {
            Value::List(items) => {
                let mut copied = Vec::with_capacity(items.len());
                for item in items {
                    copied.push(self.deep_copy(item)?);
                }
                self.list(copied)
            }
            Value::Record(data) => {
                let parent = match data.parent {
                    Some(p) => Some(self.deep_copy(p)?),
                    None => None,
                };
                let mut copied = RecordData::new(parent);
                for (name, field) in data.fields() {
                    let name = name.to_string();
                    let field_copy = self.deep_copy(field)?;
                    copied.set(&name, field_copy);
                }
                self.alloc(Value::Record(copied))
            }
            scalar => self.alloc(scalar),
        }
    }
}
