//! The process-wide read-only space.
//!
//! Holds the common roots followed by shared immutable objects, organized in
//! fixed-capacity pages. Cache payloads refer to shared objects by
//! (page, offset) and never copy them. The space is built once, frozen behind
//! an `Arc`, and shared by the main heap and every background arena.

use std::collections::HashMap;
use std::sync::Arc;

use crate::arena::Arena;
use crate::error::HeapError;
use crate::ids::{ObjectId, ObjectIndex, Space};
use crate::kind::StructuralKind;
use crate::layout;
use crate::object::{HeapObject, Value};
use crate::roots::RootIndex;

/// Number of object slots per read-only page.
pub const PAGE_CAPACITY: usize = 8;

/// Machine code of the shared interpreter entry trampoline.
const TRAMPOLINE_BODY: &[u8] = &[0x55, 0x48, 0x89, 0xE5, 0xFF, 0x67, 0x10, 0xC3];

/// Strings every host interns into the shared region.
const STANDARD_STRINGS: &[&str] = &[
    "length",
    "name",
    "prototype",
    "constructor",
    "arguments",
    "default",
    "use strict",
    "anonymous",
];

/// Location of a shared object: page index and offset within the page.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SharedLocation {
    /// Page index.
    pub page: u32,
    /// Offset within the page.
    pub offset: u32,
}

/// Frozen read-only space.
#[derive(Debug)]
pub struct ReadOnlySpace {
    objects: Arena<ObjectIndex, HeapObject>,
    strings: HashMap<String, ObjectId>,
}

impl ReadOnlySpace {
    /// Builds the standard space: roots plus the common shared strings.
    pub fn standard() -> Arc<Self> {
        let mut builder = ReadOnlySpaceBuilder::new();
        for text in STANDARD_STRINGS {
            builder.add_string(text);
        }
        builder.finish()
    }

    /// The object backing a root.
    pub fn root(&self, root: RootIndex) -> ObjectId {
        ObjectId::new(Space::ReadOnly, root.index() as u32)
    }

    /// The root an object is, if any.
    pub fn root_index_of(&self, id: ObjectId) -> Option<RootIndex> {
        if id.space() != Space::ReadOnly {
            return None;
        }
        RootIndex::from_index(id.index().as_raw() as usize)
    }

    /// Returns the read-only object with this ID.
    pub fn get(&self, id: ObjectId) -> Option<&HeapObject> {
        if id.space() != Space::ReadOnly {
            return None;
        }
        self.objects.try_get(id.index())
    }

    /// Shared location of an object, or `None` if it is not in this space.
    pub fn location_of(&self, id: ObjectId) -> Option<SharedLocation> {
        self.get(id)?;
        let index = id.index().as_raw() as usize;
        Some(SharedLocation {
            page: (index / PAGE_CAPACITY) as u32,
            offset: (index % PAGE_CAPACITY) as u32,
        })
    }

    /// Resolves a shared location back to an object.
    pub fn resolve(&self, location: SharedLocation) -> Option<ObjectId> {
        if location.offset as usize >= PAGE_CAPACITY {
            return None;
        }
        let index = (location.page as usize)
            .checked_mul(PAGE_CAPACITY)?
            .checked_add(location.offset as usize)?;
        if index >= self.objects.len() {
            return None;
        }
        Some(ObjectId::new(Space::ReadOnly, index as u32))
    }

    /// Looks up an interned shared string.
    pub fn find_string(&self, text: &str) -> Option<ObjectId> {
        self.strings.get(text).copied()
    }

    /// Number of pages in use.
    pub fn page_count(&self) -> usize {
        self.objects.len().div_ceil(PAGE_CAPACITY)
    }

    /// Number of objects, roots included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Always `false`: the roots are present in every space.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Builder that allocates the roots and then appends shared objects.
pub struct ReadOnlySpaceBuilder {
    objects: Arena<ObjectIndex, HeapObject>,
    strings: HashMap<String, ObjectId>,
}

impl ReadOnlySpaceBuilder {
    /// Starts a space containing only the common roots.
    ///
    /// # Panics
    ///
    /// Panics if a root lands at an index other than its table position.
    pub fn new() -> Self {
        let mut objects: Arena<ObjectIndex, HeapObject> = Arena::new();
        for root in RootIndex::ALL {
            let index = objects.alloc(root_object(root));
            assert_eq!(
                index.as_raw() as usize,
                root.index(),
                "root table out of order at {}",
                root.name()
            );
        }
        Self {
            objects,
            strings: HashMap::new(),
        }
    }

    /// Interns a shared string, returning the existing one on repeats.
    pub fn add_string(&mut self, text: &str) -> ObjectId {
        if let Some(id) = self.strings.get(text) {
            return *id;
        }
        let index = self.objects.alloc(HeapObject::string(text));
        let id = ObjectId::from_index(Space::ReadOnly, index);
        self.strings.insert(text.to_string(), id);
        id
    }

    /// Adds an arbitrary shared object. It may only reference read-only objects.
    pub fn add(&mut self, object: HeapObject) -> Result<ObjectId, HeapError> {
        for value in object.slots() {
            if let Some(target) = value.as_object() {
                if target.space() != Space::ReadOnly
                    || self.objects.try_get(target.index()).is_none()
                {
                    return Err(HeapError::ForeignObject(target));
                }
            }
        }
        let index = self.objects.alloc(object);
        Ok(ObjectId::from_index(Space::ReadOnly, index))
    }

    /// Freezes the space.
    pub fn finish(self) -> Arc<ReadOnlySpace> {
        Arc::new(ReadOnlySpace {
            objects: self.objects,
            strings: self.strings,
        })
    }
}

impl Default for ReadOnlySpaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn root_object(root: RootIndex) -> HeapObject {
    let oddball = |discriminator: i32| {
        let mut slots = vec![Value::Smi(0); layout::oddball::SLOT_COUNT];
        slots[layout::oddball::KIND] = Value::Smi(discriminator);
        slots
    };
    let (kind, slots, raw) = match root {
        RootIndex::Undefined
        | RootIndex::Null
        | RootIndex::True
        | RootIndex::False
        | RootIndex::TheHole
        | RootIndex::Uninitialized => (
            StructuralKind::Oddball,
            oddball(root.index() as i32),
            Vec::new(),
        ),
        RootIndex::EmptyString => (StructuralKind::String, Vec::new(), Vec::new()),
        RootIndex::EmptyFixedArray => (StructuralKind::FixedArray, Vec::new(), Vec::new()),
        RootIndex::EmptyByteArray => (StructuralKind::ByteArray, Vec::new(), Vec::new()),
        RootIndex::InterpreterEntryTrampoline => {
            (StructuralKind::Code, Vec::new(), TRAMPOLINE_BODY.to_vec())
        }
    };
    HeapObject::new(kind, slots, raw).expect("root layouts are well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_occupy_first_slots() {
        let space = ReadOnlySpace::standard();
        for root in RootIndex::ALL {
            let id = space.root(root);
            assert_eq!(space.root_index_of(id), Some(root));
            assert!(space.get(id).is_some());
        }
        assert_eq!(
            space.get(space.root(RootIndex::EmptyString)).unwrap().as_str(),
            Some("")
        );
        assert_eq!(
            space
                .get(space.root(RootIndex::InterpreterEntryTrampoline))
                .unwrap()
                .kind(),
            StructuralKind::Code
        );
    }

    #[test]
    fn shared_strings_are_not_roots() {
        let space = ReadOnlySpace::standard();
        let length = space.find_string("length").unwrap();
        assert_eq!(space.root_index_of(length), None);
        assert_eq!(space.get(length).unwrap().as_str(), Some("length"));
    }

    #[test]
    fn location_roundtrip_across_pages() {
        let space = ReadOnlySpace::standard();
        assert!(space.page_count() >= 2);
        for raw in 0..space.len() as u32 {
            let id = ObjectId::new(Space::ReadOnly, raw);
            let loc = space.location_of(id).unwrap();
            assert!((loc.offset as usize) < PAGE_CAPACITY);
            assert_eq!(space.resolve(loc), Some(id));
        }
    }

    #[test]
    fn resolve_rejects_out_of_range() {
        let space = ReadOnlySpace::standard();
        assert_eq!(
            space.resolve(SharedLocation {
                page: 0,
                offset: PAGE_CAPACITY as u32
            }),
            None
        );
        assert_eq!(
            space.resolve(SharedLocation {
                page: 1000,
                offset: 0
            }),
            None
        );
    }

    #[test]
    fn non_read_only_ids_have_no_location() {
        let space = ReadOnlySpace::standard();
        assert_eq!(space.location_of(ObjectId::new(Space::Main, 0)), None);
        assert_eq!(space.root_index_of(ObjectId::new(Space::Main, 0)), None);
    }

    #[test]
    fn add_string_dedupes() {
        let mut builder = ReadOnlySpaceBuilder::new();
        let a = builder.add_string("x");
        let b = builder.add_string("x");
        assert_eq!(a, b);
    }

    #[test]
    fn add_rejects_foreign_references() {
        let mut builder = ReadOnlySpaceBuilder::new();
        let arr = HeapObject::new(
            StructuralKind::FixedArray,
            vec![Value::Ref(ObjectId::new(Space::Main, 0))],
            Vec::new(),
        )
        .unwrap();
        assert!(matches!(
            builder.add(arr),
            Err(HeapError::ForeignObject(_))
        ));
    }

    #[test]
    fn independent_builds_are_identical() {
        let a = ReadOnlySpace::standard();
        let b = ReadOnlySpace::standard();
        assert_eq!(a.len(), b.len());
        assert_eq!(a.find_string("prototype"), b.find_string("prototype"));
    }
}
