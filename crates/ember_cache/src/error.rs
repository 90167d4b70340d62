//! Error types for cache operations.
//!
//! Every failure on the load path is a cache miss: the caller recompiles
//! from source. Only [`ContractViolation`] is fatal, because it means the
//! caller asked to persist state that can never be restored.

use ember_heap::{HeapError, ObjectId, StructuralKind};

/// Why a blob was refused before reconstruction started.
///
/// Variants are ordered by the check that discovers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum Rejection {
    /// The blob is shorter than a header.
    #[error("blob is too short to hold a header")]
    InvalidHeader,

    /// The magic number does not match this build's root table.
    #[error("magic number mismatch")]
    MagicMismatch,

    /// The blob was produced by a different build.
    #[error("version hash mismatch")]
    VersionMismatch,

    /// The blob was compiled under different code-shape flags.
    #[error("flag hash mismatch")]
    FlagsMismatch,

    /// The header claims more payload than the blob holds.
    #[error("payload length exceeds blob size")]
    LengthMismatch,

    /// The payload does not match the stored checksum.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The blob was compiled from a different source.
    #[error("source fingerprint mismatch")]
    SourceMismatch,
}

impl Rejection {
    /// Every reason, in check order.
    pub const ALL: [Rejection; 7] = [
        Rejection::InvalidHeader,
        Rejection::MagicMismatch,
        Rejection::VersionMismatch,
        Rejection::FlagsMismatch,
        Rejection::LengthMismatch,
        Rejection::ChecksumMismatch,
        Rejection::SourceMismatch,
    ];

    /// Dense index, usable as a histogram bucket.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for reasons found without the source text.
    pub fn is_structural(self) -> bool {
        self != Rejection::SourceMismatch
    }
}

/// Reconstruction of an accepted blob failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconstructionFailure {
    /// The target arena refused to grow.
    #[error("allocation limit of {limit} objects exhausted")]
    AllocationExhausted {
        /// The configured object limit.
        limit: usize,
    },

    /// The payload passed the header checks but does not decode.
    #[error("malformed payload at offset {offset}: {reason}")]
    MalformedPayload {
        /// Byte offset within the payload.
        offset: usize,
        /// Description of the problem.
        reason: String,
    },
}

impl ReconstructionFailure {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn from_heap(offset: usize, error: HeapError) -> Self {
        match error {
            HeapError::AllocationExhausted { limit } => Self::AllocationExhausted { limit },
            other => Self::malformed(offset, other.to_string()),
        }
    }
}

/// A failed cache lookup. The caller falls back to compiling from source.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheMiss {
    /// A sanity check refused the blob.
    #[error("code cache rejected: {0}")]
    Rejected(#[from] Rejection),

    /// The blob was accepted but could not be reconstructed.
    #[error("code cache reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionFailure),
}

impl CacheMiss {
    /// The rejection reason, if a sanity check caused the miss.
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            CacheMiss::Rejected(reason) => Some(*reason),
            CacheMiss::Reconstruction(_) => None,
        }
    }
}

/// The serializer declined to produce a blob.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    /// The script contains an asm module, which is never cached.
    #[error("script contains an asm module")]
    ContainsAsmModule,

    /// The graph nests deeper than the deserializer accepts.
    #[error("object graph nests deeper than {limit} levels")]
    NestingTooDeep {
        /// The nesting limit.
        limit: usize,
    },

    /// The root is not an artifact.
    #[error("cannot serialize a {found} as a code cache root")]
    UnexpectedRoot {
        /// Kind of the object passed as root.
        found: StructuralKind,
    },

    /// The artifact does not reach a script with source text.
    #[error("artifact {artifact:?} is not attached to a script with source text")]
    DetachedArtifact {
        /// The artifact being serialized.
        artifact: ObjectId,
    },

    /// The source text is too long to fingerprint.
    #[error("source of {length} characters is too long to cache")]
    SourceTooLarge {
        /// Length of the source in characters.
        length: usize,
    },

    /// The graph reaches a second script; a blob carries exactly one.
    #[error("graph reaches script {found:?} besides {expected:?}")]
    ForeignScript {
        /// The first script emitted.
        expected: ObjectId,
        /// The other script.
        found: ObjectId,
    },

    /// A payload integer could not be encoded.
    #[error("payload encoding error: {reason}")]
    Encoding {
        /// Description of the encoding failure.
        reason: String,
    },
}

/// A serialization request over state that can never be cached.
///
/// The serializer panics with this value's message: it indicates a bug in
/// the caller, not bad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    /// Executable code reached the payload.
    #[error("code object {0:?} cannot be serialized")]
    CodeObject(ObjectId),

    /// A closure, context, or other environment-bound object reached the payload.
    #[error("environment-bound {kind} {object:?} cannot be serialized")]
    NonPortableObject {
        /// The offending object.
        object: ObjectId,
        /// Its kind.
        kind: StructuralKind,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_heap::Space;

    #[test]
    fn rejection_order_matches_check_order() {
        let mut sorted = Rejection::ALL;
        sorted.sort();
        assert_eq!(sorted, Rejection::ALL);
        assert_eq!(Rejection::InvalidHeader.index(), 0);
        assert_eq!(Rejection::SourceMismatch.index(), 6);
        assert!(!Rejection::SourceMismatch.is_structural());
        assert!(Rejection::ChecksumMismatch.is_structural());
    }

    #[test]
    fn heap_errors_map_to_failures() {
        let exhausted =
            ReconstructionFailure::from_heap(3, HeapError::AllocationExhausted { limit: 4 });
        assert_eq!(
            exhausted,
            ReconstructionFailure::AllocationExhausted { limit: 4 }
        );

        let other = ReconstructionFailure::from_heap(
            9,
            HeapError::UnknownObject(ObjectId::new(Space::Local, 2)),
        );
        assert!(matches!(
            other,
            ReconstructionFailure::MalformedPayload { offset: 9, .. }
        ));
    }

    #[test]
    fn cache_miss_display() {
        let miss = CacheMiss::from(Rejection::FlagsMismatch);
        assert_eq!(miss.rejection(), Some(Rejection::FlagsMismatch));
        assert!(miss.to_string().contains("flag hash mismatch"));

        let miss = CacheMiss::from(ReconstructionFailure::malformed(12, "bad opcode"));
        assert_eq!(miss.rejection(), None);
        assert!(miss.to_string().contains("offset 12"));
    }

    #[test]
    fn contract_violation_display() {
        let v = ContractViolation::NonPortableObject {
            object: ObjectId::new(Space::Main, 3),
            kind: StructuralKind::Closure,
        };
        assert!(v.to_string().contains("environment-bound closure"));
    }
}
