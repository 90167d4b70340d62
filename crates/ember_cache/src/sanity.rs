//! Blob sanity checks.
//!
//! A blob moves through [`SanityState`] from `NotChecked` to either
//! `FullyValid` or `Rejected`. The structural half needs no source text, so
//! it can run on a worker thread; the source half runs once the text is
//! known. A rejected blob never reaches the deserializer.

use ember_source::SourceFingerprint;

use crate::build::BuildIdentity;
use crate::error::Rejection;
use crate::header::{compute_checksum, magic_number, BlobHeader, HEADER_SIZE};

/// Progress of a blob through the checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityState {
    /// No check has run.
    NotChecked,
    /// Header, lengths, and checksum are valid; the source is unchecked.
    StructurallyValid,
    /// Every check passed.
    FullyValid,
    /// A check failed.
    Rejected(Rejection),
}

impl SanityState {
    /// The rejection reason, if any.
    pub fn rejection(self) -> Option<Rejection> {
        match self {
            SanityState::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    /// Converts to a result: `Ok` unless rejected.
    pub fn into_result(self) -> Result<(), Rejection> {
        self.rejection().map_or(Ok(()), Err)
    }
}

/// Runs the checks against the identity of the loading build.
#[derive(Debug, Clone, Copy)]
pub struct SanityChecker {
    identity: BuildIdentity,
    verify_checksum: bool,
}

impl SanityChecker {
    /// Creates a checker for `identity`.
    pub fn new(identity: BuildIdentity, verify_checksum: bool) -> Self {
        Self {
            identity,
            verify_checksum,
        }
    }

    /// Checks everything that does not depend on the source.
    pub fn check_structure(&self, blob: &[u8]) -> SanityState {
        match self.structure(blob) {
            Ok(()) => SanityState::StructurallyValid,
            Err(reason) => SanityState::Rejected(reason),
        }
    }

    /// Checks the stored fingerprint against the source's.
    ///
    /// A source without a fingerprint never matches.
    pub fn check_source(&self, blob: &[u8], expected: Option<SourceFingerprint>) -> SanityState {
        match BlobHeader::decode(blob) {
            None => SanityState::Rejected(Rejection::InvalidHeader),
            Some(header) if expected != Some(header.fingerprint()) => {
                SanityState::Rejected(Rejection::SourceMismatch)
            }
            Some(_) => SanityState::FullyValid,
        }
    }

    /// Structure, then source, stopping at the first failure.
    pub fn check_full(&self, blob: &[u8], expected: Option<SourceFingerprint>) -> SanityState {
        match self.check_structure(blob) {
            SanityState::StructurallyValid => self.check_source(blob, expected),
            other => other,
        }
    }

    /// Finishes checking a blob whose structure was checked earlier.
    ///
    /// A prior rejection is returned unchanged: this step can only add a
    /// source mismatch.
    pub fn check_partial(
        &self,
        prior: SanityState,
        blob: &[u8],
        expected: Option<SourceFingerprint>,
    ) -> SanityState {
        match prior {
            SanityState::Rejected(_) => prior,
            SanityState::StructurallyValid | SanityState::FullyValid => {
                self.check_source(blob, expected)
            }
            SanityState::NotChecked => self.check_full(blob, expected),
        }
    }

    fn structure(&self, blob: &[u8]) -> Result<(), Rejection> {
        let header = BlobHeader::decode(blob).ok_or(Rejection::InvalidHeader)?;
        if header.magic != magic_number() {
            return Err(Rejection::MagicMismatch);
        }
        if header.version_hash != self.identity.version_hash {
            return Err(Rejection::VersionMismatch);
        }
        if header.flag_hash != self.identity.flag_hash {
            return Err(Rejection::FlagsMismatch);
        }
        let available = blob.len() - HEADER_SIZE;
        let payload_length = header.payload_length as usize;
        if payload_length > available {
            return Err(Rejection::LengthMismatch);
        }
        if self.verify_checksum {
            let payload = &blob[HEADER_SIZE..HEADER_SIZE + payload_length];
            if compute_checksum(&blob[..HEADER_SIZE], payload) != header.checksum {
                return Err(Rejection::ChecksumMismatch);
            }
        }
        Ok(())
    }
}

/// The payload bytes of a blob that passed [`SanityChecker::check_structure`].
pub(crate) fn payload_of(blob: &[u8]) -> &[u8] {
    let length = BlobHeader::decode(blob).map_or(0, |h| h.payload_length as usize);
    blob.get(HEADER_SIZE..HEADER_SIZE + length).unwrap_or(&[])
}
