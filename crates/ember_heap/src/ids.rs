//! Object identities.
//!
//! An [`ObjectId`] names the space an object lives in plus its dense index
//! within that space's arena.

use std::fmt;

use crate::arena::ArenaId;

/// Dense index of an object inside one space's arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ObjectIndex(u32);

impl ObjectIndex {
    /// Creates an index from a raw `u32`.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

impl ArenaId for ObjectIndex {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

/// The space that owns an object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Space {
    /// Process-wide immutable objects: common roots and shared pages.
    ReadOnly,
    /// The host's live object graph.
    Main,
    /// A private arena owned by one background reconstruction.
    Local,
}

/// Opaque, copyable identity of a heap object.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    space: Space,
    index: ObjectIndex,
}

impl ObjectId {
    /// Creates an ID for the object at `index` in `space`.
    pub fn new(space: Space, index: u32) -> Self {
        Self {
            space,
            index: ObjectIndex(index),
        }
    }

    pub(crate) fn from_index(space: Space, index: ObjectIndex) -> Self {
        Self { space, index }
    }

    /// The owning space.
    pub fn space(self) -> Space {
        self.space
    }

    /// Index within the owning space.
    pub fn index(self) -> ObjectIndex {
        self.index
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.space {
            Space::ReadOnly => "ro",
            Space::Main => "main",
            Space::Local => "local",
        };
        write!(f, "{tag}#{}", self.index.0)
    }
}
