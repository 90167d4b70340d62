//! Ring of recently seen objects, addressable by a one-byte opcode.
//!
//! The serializer and deserializer add the same objects at the same points
//! of the walk (a root reference, or the end of a new object), so the ring
//! contents agree on both sides without ever being stored.

use ember_heap::ObjectId;

/// Number of entries in the ring.
pub const HOT_OBJECTS_SIZE: usize = 8;

/// Fixed-size ring of recently seen objects.
#[derive(Debug, Default)]
pub struct HotObjects {
    entries: [Option<ObjectId>; HOT_OBJECTS_SIZE],
    next: usize,
}

impl HotObjects {
    /// Creates an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id`, evicting the oldest entry when full.
    pub fn add(&mut self, id: ObjectId) {
        self.entries[self.next] = Some(id);
        self.next = (self.next + 1) % HOT_OBJECTS_SIZE;
    }

    /// Slot holding `id`, if it is hot.
    pub fn find(&self, id: ObjectId) -> Option<usize> {
        self.entries.iter().position(|entry| *entry == Some(id))
    }

    /// Object in slot `index`.
    pub fn get(&self, index: usize) -> Option<ObjectId> {
        self.entries.get(index).copied().flatten()
    }
}
