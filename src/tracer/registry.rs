//! Identity registry
//!
//! The runtime hands out *raw* frame ids that it recycles (they are
//! stack slot indices), and object references whose addresses mean
//! nothing across time. The registry turns both into stable small
//! integers:
//!
//! - Frames are canonicalized over `(raw id, activation counter)`. The
//!   counter for a raw id is bumped only after a return from that raw
//!   frame has been *observed in a trace entry*, so the just-returned
//!   activation keeps its id for the `return` entry itself and the next
//!   activation of the same slot gets a fresh id.
//! - Objects are stamped with a hidden tag (`heap_id` on [`JsObject`])
//!   on first encounter; the tag is invisible to user code and survives
//!   for the object's lifetime, so the same live object keeps one id
//!   across the whole trace.

use crate::memory::object::ObjRef;
use rustc_hash::FxHashMap;

/// Canonical frame-id allocator.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    /// raw id → completed activations (bumped after an observed return)
    call_count: FxHashMap<u64, u32>,
    /// canonical key (`"<raw>"` or `"<raw>_<N>"`) → stable small id
    canonical: FxHashMap<String, u32>,
    next: u32,
}

impl FrameRegistry {
    pub fn new() -> Self {
        FrameRegistry {
            call_count: FxHashMap::default(),
            canonical: FxHashMap::default(),
            next: 1,
        }
    }

    /// Stable id for the current activation of `raw`.
    pub fn canonical_id(&mut self, raw: u64) -> u32 {
        let key = match self.call_count.get(&raw) {
            Some(&count) if count >= 1 => format!("{}_{}", raw, count),
            _ => raw.to_string(),
        };
        if let Some(&id) = self.canonical.get(&key) {
            return id;
        }
        let id = self.next;
        self.next += 1;
        self.canonical.insert(key, id);
        id
    }

    /// Record an observed return from `raw`. Must be called *after* the
    /// trace entry for the return has been produced.
    pub fn note_return(&mut self, raw: u64) {
        *self.call_count.entry(raw).or_insert(0) += 1;
    }
}

/// Object-id allocator; ids live in the objects' hidden tags.
#[derive(Debug)]
pub struct ObjectRegistry {
    next: u32,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        ObjectRegistry { next: 1 }
    }

    /// Id for this object, stamping the hidden tag on first encounter.
    pub fn id_of(&mut self, obj: &ObjRef) -> u32 {
        if let Some(id) = obj.borrow().heap_id.get() {
            return id;
        }
        let id = self.next;
        self.next += 1;
        obj.borrow().heap_id.set(Some(id));
        id
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}
