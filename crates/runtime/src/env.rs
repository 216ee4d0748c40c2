//! Environment - Lexically Nested Name Bindings
//!
//! A chain of frames held in an arena, addressed by [`FrameId`] handles.
//! `define` writes the innermost frame; `lookup` and `assign` walk outward
//! along the parent links. Frames are arena-retained rather than popped:
//! function values capture their defining frame by handle, so a frame's
//! lifetime is "as long as anything can still reach it", which the arena
//! makes trivially true. A frame that nothing references is logically
//! released; its slots are simply never consulted again.

use std::collections::HashMap;
use tally_core::{FrameId, ValueId};

#[derive(Debug, Default)]
struct Frame {
    slots: HashMap<String, ValueId>,
    parent: Option<FrameId>,
}

/// The frame arena plus the distinguished global frame.
#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A fresh environment containing only the global frame.
    pub fn new() -> Environment {
        Environment {
            frames: vec![Frame::default()],
        }
    }

    /// The outermost frame, parent of every chain.
    pub fn global(&self) -> FrameId {
        FrameId(0)
    }

    /// Open a new innermost frame chained to `parent`.
    pub fn push_frame(&mut self, parent: FrameId) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame {
            slots: HashMap::new(),
            parent: Some(parent),
        });
        id
    }

    fn frame(&self, id: FrameId) -> &Frame {
        &self.frames[id.0 as usize]
    }

    fn frame_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.0 as usize]
    }

    /// Bind `name` in exactly the given frame, shadowing any outer binding.
    /// Returns the prior binding of that frame, if any.
    pub fn define(&mut self, frame: FrameId, name: &str, value: ValueId) -> Option<ValueId> {
        self.frame_mut(frame).slots.insert(name.to_string(), value)
    }

    /// Resolve `name`, walking outward from `frame`.
    pub fn lookup(&self, frame: FrameId, name: &str) -> Option<ValueId> {
        let mut cursor = Some(frame);
        while let Some(id) = cursor {
            let frame = self.frame(id);
            if let Some(value) = frame.slots.get(name) {
                return Some(*value);
            }
            cursor = frame.parent;
        }
        None
    }

    /// The frame that actually defines `name`, walking outward from
    /// `frame`. This is what assignment and rollback address.
    pub fn defining_frame(&self, frame: FrameId, name: &str) -> Option<FrameId> {
        let mut cursor = Some(frame);
        while let Some(id) = cursor {
            let frame = self.frame(id);
            if frame.slots.contains_key(name) {
                return Some(id);
            }
            cursor = frame.parent;
        }
        None
    }

    /// Overwrite `name` in the frame that defines it. Returns the prior
    /// binding, or `None` when no frame in the chain defines the name (the
    /// caller turns that into `UndefinedName`).
    pub fn assign(&mut self, frame: FrameId, name: &str, value: ValueId) -> Option<ValueId> {
        let target = self.defining_frame(frame, name)?;
        self.frame_mut(target).slots.insert(name.to_string(), value)
    }

    /// Remove `name` from exactly the given frame. Used by rollback when
    /// the failed write created the binding.
    pub fn remove(&mut self, frame: FrameId, name: &str) -> Option<ValueId> {
        self.frame_mut(frame).slots.remove(name)
    }

    /// Read `name` from exactly the given frame, ignoring the chain.
    pub fn get_local(&self, frame: FrameId, name: &str) -> Option<ValueId> {
        self.frame(frame).slots.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::ValueStore;

    fn handles(n: usize) -> Vec<ValueId> {
        let mut store = ValueStore::new();
        (0..n).map(|_| store.nil().unwrap()).collect()
    }

    #[test]
    fn test_lookup_walks_outward() {
        let mut env = Environment::new();
        let global = env.global();
        let inner = env.push_frame(global);
        let ids = handles(1);
        env.define(global, "x", ids[0]);
        assert_eq!(env.lookup(inner, "x"), Some(ids[0]));
        assert_eq!(env.lookup(inner, "y"), None);
    }

    #[test]
    fn test_define_shadows() {
        let mut env = Environment::new();
        let global = env.global();
        let inner = env.push_frame(global);
        let ids = handles(2);
        env.define(global, "x", ids[0]);
        env.define(inner, "x", ids[1]);
        assert_eq!(env.lookup(inner, "x"), Some(ids[1]));
        assert_eq!(env.lookup(global, "x"), Some(ids[0]));
    }

    #[test]
    fn test_assign_writes_defining_frame() {
        let mut env = Environment::new();
        let global = env.global();
        let inner = env.push_frame(global);
        let ids = handles(2);
        env.define(global, "x", ids[0]);
        assert_eq!(env.assign(inner, "x", ids[1]), Some(ids[0]));
        // The write landed in the global frame, not the inner one.
        assert_eq!(env.get_local(inner, "x"), None);
        assert_eq!(env.get_local(global, "x"), Some(ids[1]));
    }

    #[test]
    fn test_assign_unbound_name_is_none() {
        let mut env = Environment::new();
        let global = env.global();
        let ids = handles(1);
        assert_eq!(env.assign(global, "ghost", ids[0]), None);
    }

    #[test]
    fn test_remove_only_touches_named_frame() {
        let mut env = Environment::new();
        let global = env.global();
        let inner = env.push_frame(global);
        let ids = handles(1);
        env.define(global, "x", ids[0]);
        assert_eq!(env.remove(inner, "x"), None);
        assert_eq!(env.lookup(inner, "x"), Some(ids[0]));
        assert_eq!(env.remove(global, "x"), Some(ids[0]));
        assert_eq!(env.lookup(inner, "x"), None);
    }
}
