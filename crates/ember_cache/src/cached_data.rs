//! Container for blob bytes.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::Rejection;
use crate::header::ALIGNMENT;

/// The bytes of a cache blob plus the verdict of the last load attempt.
///
/// Bytes handed in by a host are of unknown origin: nothing about them is
/// trusted until the sanity checks pass. A borrowed buffer that is not
/// 8-byte aligned is copied so the payload can be read in place.
#[derive(Debug, Clone)]
pub struct CachedData<'a> {
    bytes: Cow<'a, [u8]>,
    rejection: Option<Rejection>,
}

impl CachedData<'static> {
    /// Takes ownership of `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Cow::Owned(bytes),
            rejection: None,
        }
    }
}

impl<'a> CachedData<'a> {
    /// Wraps bytes owned by the caller, copying them if they are misaligned.
    pub fn borrowed(bytes: &'a [u8]) -> Self {
        let bytes = if bytes.as_ptr() as usize % ALIGNMENT == 0 {
            Cow::Borrowed(bytes)
        } else {
            Cow::Owned(bytes.to_vec())
        };
        Self {
            bytes,
            rejection: None,
        }
    }

    /// The blob bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the blob in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for an empty blob.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns `true` if this container owns its buffer.
    pub fn owns_data(&self) -> bool {
        matches!(self.bytes, Cow::Owned(_))
    }

    /// Returns `true` once a load attempt has rejected the blob.
    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// Why the blob was rejected, if it was.
    pub fn rejection(&self) -> Option<Rejection> {
        self.rejection
    }

    /// Records a rejection. The first reason sticks.
    pub fn mark_rejected(&mut self, reason: Rejection) {
        self.rejection.get_or_insert(reason);
    }

    /// Copies the bytes into a buffer that can be shared with a worker thread.
    pub fn to_shared(&self) -> Arc<[u8]> {
        Arc::from(self.as_bytes())
    }

    /// Detaches from the caller's buffer.
    pub fn into_owned(self) -> CachedData<'static> {
        CachedData {
            bytes: Cow::Owned(self.bytes.into_owned()),
            rejection: self.rejection,
        }
    }

    /// Consumes the container, returning the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_container() {
        let data = CachedData::new(vec![1, 2, 3]);
        assert!(data.owns_data());
        assert_eq!(data.len(), 3);
        assert!(!data.is_rejected());
        assert_eq!(data.into_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn misaligned_borrow_is_copied() {
        let bytes = vec![7u8; 32];
        let base = bytes.as_ptr() as usize;
        let aligned_at = (ALIGNMENT - base % ALIGNMENT) % ALIGNMENT;

        let aligned = CachedData::borrowed(&bytes[aligned_at..]);
        assert!(!aligned.owns_data());

        let misaligned = CachedData::borrowed(&bytes[aligned_at + 1..]);
        assert!(misaligned.owns_data());
        assert_eq!(misaligned.as_bytes(), &bytes[aligned_at + 1..]);
    }

    #[test]
    fn first_rejection_sticks() {
        let mut data = CachedData::new(Vec::new());
        data.mark_rejected(Rejection::FlagsMismatch);
        data.mark_rejected(Rejection::SourceMismatch);
        assert_eq!(data.rejection(), Some(Rejection::FlagsMismatch));
        assert!(data.into_owned().is_rejected());
    }

    #[test]
    fn shared_copy_matches() {
        let data = CachedData::new(vec![9; 16]);
        assert_eq!(&*data.to_shared(), data.as_bytes());
    }
}
