//! Private arenas for background reconstruction.

use std::sync::Arc;

use crate::access::{GraphAccess, GraphBuilder};
use crate::arena::Arena;
use crate::error::HeapError;
use crate::ids::{ObjectId, ObjectIndex, Space};
use crate::kind::StructuralKind;
use crate::object::{HeapObject, Value};
use crate::read_only::ReadOnlySpace;

/// An arena that can be filled on any thread and later adopted by a [`Heap`].
///
/// Local objects may reference each other and the read-only space, never
/// the main heap, so building one needs no access to the live graph.
///
/// [`Heap`]: crate::Heap
#[derive(Debug)]
pub struct LocalHeap {
    read_only: Arc<ReadOnlySpace>,
    objects: Arena<ObjectIndex, HeapObject>,
    limit: Option<usize>,
}

impl LocalHeap {
    /// Creates an empty arena over `read_only`, optionally capped at `limit` objects.
    pub fn new(read_only: Arc<ReadOnlySpace>, limit: Option<usize>) -> Self {
        Self {
            read_only,
            objects: Arena::new(),
            limit,
        }
    }

    /// Number of local objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Allocates a fully formed object.
    pub fn alloc(&mut self, object: HeapObject) -> Result<ObjectId, HeapError> {
        if let Some(limit) = self.limit {
            if self.objects.len() >= limit {
                return Err(HeapError::AllocationExhausted { limit });
            }
        }
        for value in object.slots() {
            self.check_value(*value)?;
        }
        let index = self.objects.alloc(object);
        Ok(ObjectId::from_index(Space::Local, index))
    }

    pub(crate) fn shares_read_only(&self, other: &Arc<ReadOnlySpace>) -> bool {
        Arc::ptr_eq(&self.read_only, other)
    }

    pub(crate) fn into_objects(self) -> impl Iterator<Item = HeapObject> {
        self.objects.into_values()
    }

    fn check_value(&self, value: Value) -> Result<(), HeapError> {
        match value.as_object() {
            Some(id) if id.space() == Space::Main => Err(HeapError::ForeignObject(id)),
            _ => Ok(()),
        }
    }
}

impl GraphAccess for LocalHeap {
    fn read_only(&self) -> &ReadOnlySpace {
        &self.read_only
    }

    fn object(&self, id: ObjectId) -> &HeapObject {
        let found = match id.space() {
            Space::ReadOnly => self.read_only.get(id),
            Space::Local => self.objects.try_get(id.index()),
            Space::Main => None,
        };
        found.unwrap_or_else(|| panic!("{id:?} is not visible from a local heap"))
    }
}

impl GraphBuilder for LocalHeap {
    fn read_only(&self) -> &ReadOnlySpace {
        &self.read_only
    }

    fn allocate_by_kind(
        &mut self,
        kind: StructuralKind,
        slot_count: usize,
        raw: Vec<u8>,
    ) -> Result<ObjectId, HeapError> {
        let object = HeapObject::blank(kind, slot_count, raw)?;
        self.alloc(object)
    }

    fn set_field(&mut self, object: ObjectId, field: usize, value: Value) -> Result<(), HeapError> {
        match object.space() {
            Space::ReadOnly => return Err(HeapError::ImmutableObject(object)),
            Space::Main => return Err(HeapError::ForeignObject(object)),
            Space::Local => {}
        }
        self.check_value(value)?;
        let target = self
            .objects
            .try_get_mut(object.index())
            .ok_or(HeapError::UnknownObject(object))?;
        let slot = target
            .slots_mut()
            .get_mut(field)
            .ok_or(HeapError::SlotOutOfRange {
                object,
                slot: field,
            })?;
        *slot = value;
        Ok(())
    }
}
