//! Reference host object model for the Ember code cache.
//!
//! Objects live in three spaces: the process-wide [`ReadOnlySpace`] (common
//! roots plus shared, page-organized immutable objects), the main [`Heap`],
//! and private [`LocalHeap`] arenas used by background reconstruction. The
//! cache codec only touches objects through the [`GraphAccess`] and
//! [`GraphBuilder`] traits, so any host that implements them can be cached.

#![warn(missing_docs)]

pub mod access;
pub mod arena;
pub mod error;
pub mod factory;
pub mod heap;
pub mod ids;
pub mod kind;
pub mod layout;
pub mod local;
pub mod object;
pub mod read_only;
pub mod registry;
pub mod roots;

pub use access::{GraphAccess, GraphBuilder};
pub use error::HeapError;
pub use heap::{Heap, Relocation};
pub use ids::{ObjectId, ObjectIndex, Space};
pub use kind::{Portability, StructuralKind};
pub use local::LocalHeap;
pub use object::{HeapObject, Value};
pub use read_only::{ReadOnlySpace, ReadOnlySpaceBuilder, SharedLocation, PAGE_CAPACITY};
pub use registry::ArtifactRegistry;
pub use roots::RootIndex;
