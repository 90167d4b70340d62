//! Fixed-layout blob header.
//!
//! Six little-endian `u32` fields, 24 bytes, so the payload that follows
//! starts on an 8-byte boundary:
//!
//! ```text
//! magic | version_hash | source_hash | flag_hash | payload_length | checksum
//! ```
//!
//! The checksum covers the five fields before it plus the payload.

use ember_common::Digest32;
use ember_heap::RootIndex;
use ember_source::SourceFingerprint;

use crate::build::BuildIdentity;

/// Size of the encoded header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Alignment of the payload and of the padded payload length.
pub const ALIGNMENT: usize = 8;

/// Offset of the checksum field; everything before it is checksummed.
pub const CHECKSUM_OFFSET: usize = 20;

const MAGIC_BASE: u32 = 0xC0DE_0000;

/// Magic number for this build's root table.
pub fn magic_number() -> u32 {
    MAGIC_BASE ^ RootIndex::COUNT as u32
}

/// The decoded header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    /// Format marker, see [`magic_number`].
    pub magic: u32,
    /// Build version hash.
    pub version_hash: u32,
    /// Raw source fingerprint.
    pub source_hash: u32,
    /// Code-shape flag hash.
    pub flag_hash: u32,
    /// Number of payload bytes following the header.
    pub payload_length: u32,
    /// Checksum, or zero when checksums are disabled.
    pub checksum: u32,
}

impl BlobHeader {
    /// Builds a header for `payload` with the checksum left at zero.
    pub fn new(identity: BuildIdentity, fingerprint: SourceFingerprint, payload: &[u8]) -> Self {
        Self {
            magic: magic_number(),
            version_hash: identity.version_hash,
            source_hash: fingerprint.as_raw(),
            flag_hash: identity.flag_hash,
            payload_length: payload.len() as u32,
            checksum: 0,
        }
    }

    /// Encodes the header.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let fields = [
            self.magic,
            self.version_hash,
            self.source_hash,
            self.flag_hash,
            self.payload_length,
            self.checksum,
        ];
        for (chunk, field) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    /// Decodes a header from the start of `bytes`, or `None` if it is too short.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_SIZE)?;
        let field = |index: usize| {
            let start = index * 4;
            u32::from_le_bytes([
                header[start],
                header[start + 1],
                header[start + 2],
                header[start + 3],
            ])
        };
        Some(Self {
            magic: field(0),
            version_hash: field(1),
            source_hash: field(2),
            flag_hash: field(3),
            payload_length: field(4),
            checksum: field(5),
        })
    }

    /// The source fingerprint stored in this header.
    pub fn fingerprint(&self) -> SourceFingerprint {
        SourceFingerprint::from_raw(self.source_hash)
    }
}

/// Checksum over the header bytes preceding the checksum field and the payload.
pub fn compute_checksum(header: &[u8], payload: &[u8]) -> u32 {
    let prefix = &header[..CHECKSUM_OFFSET.min(header.len())];
    Digest32::new().update(prefix).update(payload).finish()
}

/// Assembles a complete blob: header followed by `payload`.
pub fn assemble(
    identity: BuildIdentity,
    fingerprint: SourceFingerprint,
    payload: &[u8],
    with_checksum: bool,
) -> Vec<u8> {
    let mut header = BlobHeader::new(identity, fingerprint, payload);
    if with_checksum {
        header.checksum = compute_checksum(&header.encode(), payload);
    }
    let mut blob = Vec::with_capacity(HEADER_SIZE + payload.len());
    blob.extend_from_slice(&header.encode());
    blob.extend_from_slice(payload);
    blob
}
