//! Compiled-artifact code cache.
//!
//! This crate turns the object graph of a compiled script into a portable
//! blob and restores it later, possibly in another process of the same
//! build. A blob is a fixed [`BlobHeader`] followed by a payload of opcodes
//! produced by the [`Serializer`]. Before a payload is replayed, the
//! [`SanityChecker`] verifies that the blob was made by this build, under
//! these code-shape flags, for a source of this length. Anything that fails
//! a check is a [`CacheMiss`] and the caller compiles from source instead.
//!
//! [`CodeCache`] is the entry point. Loads run synchronously with
//! [`CodeCache::deserialize`], or in two phases with
//! [`CodeCache::start_background`] when the source text arrives later than
//! the blob.

#![warn(missing_docs)]

pub mod background;
pub mod build;
pub mod cached_data;
pub mod deserializer;
pub mod error;
pub mod header;
pub mod hot_objects;
pub mod opcodes;
pub mod pipeline;
pub mod projection;
pub mod sanity;
pub mod serializer;
pub mod stats;

pub use background::{BackgroundDeserialize, OffloadedResult};
pub use build::{BuildIdentity, FORMAT_VERSION};
pub use cached_data::CachedData;
pub use deserializer::{Deserializer, Reconstructed};
pub use error::{CacheMiss, ContractViolation, ReconstructionFailure, Rejection, SerializeError};
pub use header::{BlobHeader, HEADER_SIZE};
pub use pipeline::CodeCache;
pub use sanity::{SanityChecker, SanityState};
pub use serializer::{Serializer, MAX_NESTING_DEPTH};
pub use stats::RejectionStats;
