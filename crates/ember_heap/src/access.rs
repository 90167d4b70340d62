//! The graph access interface the cache codec consumes.

use crate::error::HeapError;
use crate::ids::ObjectId;
use crate::kind::StructuralKind;
use crate::object::{HeapObject, Value};
use crate::read_only::{ReadOnlySpace, SharedLocation};

/// Read access to an object graph, used by the serializer.
pub trait GraphAccess {
    /// The read-only space this graph is built against.
    fn read_only(&self) -> &ReadOnlySpace;

    /// Returns the object with this ID.
    ///
    /// # Panics
    ///
    /// Panics if the ID does not name an object reachable from this graph.
    fn object(&self, id: ObjectId) -> &HeapObject;

    /// Structural kind of an object.
    fn kind_of(&self, id: ObjectId) -> StructuralKind {
        self.object(id).kind()
    }

    /// Visits every slot of an object in order.
    fn for_each_reference(&self, id: ObjectId, visit: &mut dyn FnMut(usize, Value)) {
        for (index, value) in self.object(id).slots().iter().enumerate() {
            visit(index, *value);
        }
    }

    /// Location of the object in the shared region, if it lives there.
    fn shared_location(&self, id: ObjectId) -> Option<SharedLocation> {
        self.read_only().location_of(id)
    }

    /// Untagged body bytes of an object.
    fn raw_data(&self, id: ObjectId) -> &[u8] {
        self.object(id).raw()
    }
}

/// Write access to an object graph, used by the deserializer.
pub trait GraphBuilder {
    /// The read-only space this graph is built against.
    fn read_only(&self) -> &ReadOnlySpace;

    /// Allocates a blank object of `kind` with `slot_count` slots and the given body.
    fn allocate_by_kind(
        &mut self,
        kind: StructuralKind,
        slot_count: usize,
        raw: Vec<u8>,
    ) -> Result<ObjectId, HeapError>;

    /// Stores `value` into slot `field` of `object`.
    fn set_field(&mut self, object: ObjectId, field: usize, value: Value)
        -> Result<(), HeapError>;
}
