//! Error types for heap operations.

use crate::ids::ObjectId;
use crate::kind::StructuralKind;

/// Errors raised by the reference host when an allocation or store is refused.
#[derive(Debug, thiserror::Error)]
pub enum HeapError {
    /// The space has reached its object limit.
    #[error("allocation exhausted: limit of {limit} objects reached")]
    AllocationExhausted {
        /// The configured object limit.
        limit: usize,
    },

    /// The target lives in the read-only space.
    #[error("object {0:?} is immutable")]
    ImmutableObject(ObjectId),

    /// The object belongs to a space this heap may not reference.
    #[error("object {0:?} belongs to a foreign space")]
    ForeignObject(ObjectId),

    /// A local arena built against a different read-only space was adopted.
    #[error("arena was built against a different read-only space")]
    ForeignReadOnlySpace,

    /// No object exists with this ID.
    #[error("no object {0:?}")]
    UnknownObject(ObjectId),

    /// A slot index past the end of the object.
    #[error("slot {slot} out of range for {object:?}")]
    SlotOutOfRange {
        /// The target object.
        object: ObjectId,
        /// The requested slot.
        slot: usize,
    },

    /// The object does not have the kind the operation needs.
    #[error("{object:?} is a {found}, expected a {expected}")]
    UnexpectedKind {
        /// The object inspected.
        object: ObjectId,
        /// The kind the operation needs.
        expected: StructuralKind,
        /// The kind actually found.
        found: StructuralKind,
    },

    /// Slots or body do not match the kind's layout.
    #[error("malformed {kind}: {reason}")]
    BadShape {
        /// The kind being constructed.
        kind: StructuralKind,
        /// Description of the mismatch.
        reason: String,
    },
}
