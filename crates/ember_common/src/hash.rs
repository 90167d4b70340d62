//! Content hashing for cache keys, header hashes, and blob checksums.

use serde::{Deserialize, Serialize};
use std::fmt;
use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content hash computed using XXH3.
///
/// Two inputs with the same `ContentHash` are assumed to be identical. Used
/// for build identities and anywhere a wide, collision-resistant key is
/// wanted. Hosts persist it next to stored blobs to catch edits the length
/// fingerprint cannot see.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Folds the 128-bit hash down to the 32 bits stored in blob headers.
    pub fn fold32(&self) -> u32 {
        self.0
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .fold(0, |acc, word| acc ^ word)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Streaming 32-bit digest over several discontiguous byte ranges.
///
/// Used for blob checksums, which cover the header prefix and the payload
/// without concatenating them first.
pub struct Digest32 {
    state: Xxh3,
}

impl Digest32 {
    /// Starts a new digest.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Feeds more bytes into the digest.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(data);
        self
    }

    /// Returns the 64-bit XXH3 result folded to 32 bits.
    pub fn finish(&self) -> u32 {
        fold_digest(self.state.digest())
    }
}

impl Default for Digest32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Folds a 64-bit digest into 32 bits by xoring the halves.
pub fn fold_digest(digest: u64) -> u32 {
    ((digest >> 32) as u32) ^ (digest as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"hello world");
        let b = ContentHash::from_bytes(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.fold32(), b.fold32());
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_bytes(b"hello");
        let b = ContentHash::from_bytes(b"world");
        assert_ne!(a, b);
        assert_ne!(a.fold32(), b.fold32());
    }

    #[test]
    fn display_format() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 32, "Display should be 32 hex chars");
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_abbreviated() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h:?}");
        assert!(s.starts_with("ContentHash("));
        assert!(s.ends_with(")"));
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::from_bytes(b"serde test");
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn digest_split_matches_contiguous() {
        let mut split = Digest32::new();
        split.update(b"header-").update(b"payload");
        let mut whole = Digest32::new();
        whole.update(b"header-payload");
        assert_eq!(split.finish(), whole.finish());
    }

    #[test]
    fn digest_detects_single_byte_change() {
        let mut a = Digest32::new();
        a.update(b"payload bytes");
        let mut b = Digest32::new();
        b.update(b"payload bytez");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn fold_digest_xors_halves() {
        assert_eq!(fold_digest(0x0000_0001_0000_0002), 3);
        assert_eq!(fold_digest(0xFFFF_FFFF_FFFF_FFFF), 0);
    }
}
