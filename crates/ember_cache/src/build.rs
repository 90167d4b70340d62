//! Identity of the build that produces and consumes blobs.

use ember_common::ContentHash;
use ember_config::CodeShapeFlags;
use ember_heap::RootIndex;

/// Current payload format version. Increment on any change to the header
/// layout or the payload encoding.
pub const FORMAT_VERSION: u32 = 1;

/// The two header hashes that tie a blob to a build and its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildIdentity {
    /// Hash of the crate version, format version, and root table.
    pub version_hash: u32,
    /// Hash of the canonical code-shape flags.
    pub flag_hash: u32,
}

impl BuildIdentity {
    /// Identity of the running build under `flags`.
    pub fn current(flags: &CodeShapeFlags) -> Self {
        Self {
            version_hash: current_version_hash(),
            flag_hash: flags.hash(),
        }
    }

    /// An explicit identity, for hosts that version their builds themselves.
    pub fn new(version_hash: u32, flag_hash: u32) -> Self {
        Self {
            version_hash,
            flag_hash,
        }
    }
}

/// Version hash of the running build.
pub fn current_version_hash() -> u32 {
    let stamp = format!(
        "ember {} format {} roots {:08x}",
        env!("CARGO_PKG_VERSION"),
        FORMAT_VERSION,
        RootIndex::table_fingerprint()
    );
    ContentHash::from_bytes(stamp.as_bytes()).fold32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_hash_is_stable() {
        assert_eq!(current_version_hash(), current_version_hash());
    }

    #[test]
    fn flags_change_identity() {
        let base = BuildIdentity::current(&CodeShapeFlags::default());
        let flags = CodeShapeFlags {
            native_stack_frames: true,
            ..CodeShapeFlags::default()
        };
        let other = BuildIdentity::current(&flags);
        assert_eq!(base.version_hash, other.version_hash);
        assert_ne!(base.flag_hash, other.flag_hash);
    }
}
