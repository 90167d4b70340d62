//! The main heap: the host's live object graph.

use std::sync::Arc;

use ember_source::{compute_line_ends, LineIndex};

use crate::access::{GraphAccess, GraphBuilder};
use crate::arena::Arena;
use crate::error::HeapError;
use crate::ids::{ObjectId, ObjectIndex, Space};
use crate::kind::StructuralKind;
use crate::layout;
use crate::local::LocalHeap;
use crate::object::{HeapObject, Value};
use crate::read_only::ReadOnlySpace;
use crate::registry::ArtifactRegistry;
use crate::roots::RootIndex;

/// Maps IDs of an adopted [`LocalHeap`] to their new main-heap IDs.
#[derive(Debug, Clone, Copy)]
pub struct Relocation {
    base: u32,
}

impl Relocation {
    /// Translates a local ID; IDs in other spaces are returned unchanged.
    pub fn apply(self, id: ObjectId) -> ObjectId {
        match id.space() {
            Space::Local => ObjectId::new(Space::Main, self.base + id.index().as_raw()),
            _ => id,
        }
    }

    fn apply_value(self, value: Value) -> Value {
        match value {
            Value::Ref(id) => Value::Ref(self.apply(id)),
            smi => smi,
        }
    }
}

/// The live object graph plus the registry of live scripts.
#[derive(Debug)]
pub struct Heap {
    read_only: Arc<ReadOnlySpace>,
    objects: Arena<ObjectIndex, HeapObject>,
    registry: ArtifactRegistry,
    limit: Option<usize>,
}

impl Heap {
    /// Creates an empty heap over a read-only space.
    pub fn new(read_only: Arc<ReadOnlySpace>) -> Self {
        Self {
            read_only,
            objects: Arena::new(),
            registry: ArtifactRegistry::new(),
            limit: None,
        }
    }

    /// Creates an empty heap that refuses to grow past `limit` objects.
    pub fn with_limit(read_only: Arc<ReadOnlySpace>, limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new(read_only)
        }
    }

    /// The shared read-only space.
    pub fn read_only_space(&self) -> &Arc<ReadOnlySpace> {
        &self.read_only
    }

    /// The object backing a root.
    pub fn root(&self, root: RootIndex) -> ObjectId {
        self.read_only.root(root)
    }

    /// Number of objects in the main space.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the main space is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the object if it is visible from this heap.
    pub fn try_object(&self, id: ObjectId) -> Option<&HeapObject> {
        match id.space() {
            Space::ReadOnly => self.read_only.get(id),
            Space::Main => self.objects.try_get(id.index()),
            Space::Local => None,
        }
    }

    /// The registry of live scripts.
    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Adds a script to the live registry.
    pub fn register_script(&mut self, script: ObjectId) {
        self.registry.register(script);
    }

    /// Allocates a fully formed object in the main space.
    pub fn alloc(&mut self, object: HeapObject) -> Result<ObjectId, HeapError> {
        self.reserve(1)?;
        for value in object.slots() {
            check_value(*value)?;
        }
        let index = self.objects.alloc(object);
        Ok(ObjectId::from_index(Space::Main, index))
    }

    /// Moves every object of a local arena into the main space.
    ///
    /// Either all objects are adopted or none are: capacity is checked up
    /// front, and the exclusive borrow keeps readers from observing a
    /// partial merge.
    pub fn adopt(&mut self, local: LocalHeap) -> Result<Relocation, HeapError> {
        if !local.shares_read_only(&self.read_only) {
            return Err(HeapError::ForeignReadOnlySpace);
        }
        self.reserve(local.len())?;
        let relocation = Relocation {
            base: self.objects.len() as u32,
        };
        for mut object in local.into_objects() {
            for slot in object.slots_mut() {
                *slot = relocation.apply_value(*slot);
            }
            self.objects.alloc(object);
        }
        Ok(relocation)
    }

    /// Reads a string object.
    pub fn string(&self, id: ObjectId) -> Option<&str> {
        self.try_object(id)?.as_str()
    }

    /// Reads slot `field` of `object`.
    pub fn field(&self, object: ObjectId, field: usize) -> Result<Value, HeapError> {
        self.try_object(object)
            .ok_or(HeapError::UnknownObject(object))?
            .slot(field)
            .ok_or(HeapError::SlotOutOfRange {
                object,
                slot: field,
            })
    }

    /// Returns the script an artifact belongs to, looking through a debug overlay.
    pub fn script_of(&self, artifact: ObjectId) -> Result<ObjectId, HeapError> {
        self.expect_kind(artifact, StructuralKind::Artifact)?;
        let holder = self.ref_field(artifact, layout::artifact::SCRIPT_OR_OVERLAY)?;
        match self.try_object(holder).map(HeapObject::kind) {
            Some(StructuralKind::DebugOverlay) => {
                self.ref_field(holder, layout::debug_overlay::SCRIPT)
            }
            _ => {
                self.expect_kind(holder, StructuralKind::Script)?;
                Ok(holder)
            }
        }
    }

    /// Every artifact compiled from `script`, in registration order.
    pub fn script_artifacts(&self, script: ObjectId) -> Result<Vec<ObjectId>, HeapError> {
        self.expect_kind(script, StructuralKind::Script)?;
        let list = self.ref_field(script, layout::script::ARTIFACTS)?;
        self.expect_kind(list, StructuralKind::FixedArray)?;
        let slots = self.try_object(list).map(HeapObject::slots).unwrap_or(&[]);
        Ok(slots.iter().filter_map(|v| v.as_object()).collect())
    }

    /// Returns the script's line-end table, computing and storing it on first use.
    pub fn ensure_line_ends(&mut self, script: ObjectId) -> Result<LineIndex, HeapError> {
        self.expect_kind(script, StructuralKind::Script)?;
        if let Some(existing) = self.field(script, layout::script::LINE_ENDS)?.as_object() {
            if let Some(table) = self.try_object(existing) {
                if table.kind() == StructuralKind::FixedArray {
                    let ends = table
                        .slots()
                        .iter()
                        .filter_map(|v| v.as_smi())
                        .map(|v| v as u32)
                        .collect();
                    return Ok(LineIndex::from_line_ends(ends));
                }
            }
        }
        let source = self.ref_field(script, layout::script::SOURCE)?;
        self.expect_kind(source, StructuralKind::String)?;
        let ends = compute_line_ends(self.string(source).unwrap_or_default());
        let slots = ends.iter().map(|&e| Value::Smi(e as i32)).collect();
        let table = self.alloc(HeapObject::new(StructuralKind::FixedArray, slots, Vec::new())?)?;
        self.set_field(script, layout::script::LINE_ENDS, Value::Ref(table))?;
        Ok(LineIndex::from_line_ends(ends))
    }

    /// Converts a source position on `script` to 1-based (line, column).
    pub fn line_column(
        &mut self,
        script: ObjectId,
        position: u32,
    ) -> Result<Option<(u32, u32)>, HeapError> {
        Ok(self.ensure_line_ends(script)?.line_col(position))
    }

    pub(crate) fn ref_field(&self, object: ObjectId, field: usize) -> Result<ObjectId, HeapError> {
        self.field(object, field)?
            .as_object()
            .ok_or(HeapError::SlotOutOfRange {
                object,
                slot: field,
            })
    }

    pub(crate) fn expect_kind(
        &self,
        object: ObjectId,
        expected: StructuralKind,
    ) -> Result<(), HeapError> {
        let found = self
            .try_object(object)
            .ok_or(HeapError::UnknownObject(object))?
            .kind();
        if found == expected {
            Ok(())
        } else {
            Err(HeapError::UnexpectedKind {
                object,
                expected,
                found,
            })
        }
    }

    fn reserve(&self, count: usize) -> Result<(), HeapError> {
        match self.limit {
            Some(limit) if self.objects.len() + count > limit => {
                Err(HeapError::AllocationExhausted { limit })
            }
            _ => Ok(()),
        }
    }
}

fn check_value(value: Value) -> Result<(), HeapError> {
    match value.as_object() {
        Some(id) if id.space() == Space::Local => Err(HeapError::ForeignObject(id)),
        _ => Ok(()),
    }
}

impl GraphAccess for Heap {
    fn read_only(&self) -> &ReadOnlySpace {
        &self.read_only
    }

    fn object(&self, id: ObjectId) -> &HeapObject {
        self.try_object(id)
            .unwrap_or_else(|| panic!("{id:?} is not visible from the main heap"))
    }
}

impl GraphBuilder for Heap {
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
            Space::Local => return Err(HeapError::ForeignObject(object)),
            Space::Main => {}
        }
        check_value(value)?;
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
