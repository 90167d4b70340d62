//! The cheap source binding stored in blob headers.

use std::fmt;

use crate::source::OriginOptions;

/// Length of the source text combined with the module flag in bit 31.
///
/// This is deliberately not a content hash: two different texts of the same
/// length and origin produce the same fingerprint. Callers that need a
/// content match key their cache lookups on [`Source::content_hash`]
/// as well.
///
/// [`Source::content_hash`]: crate::Source::content_hash
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceFingerprint(u32);

impl SourceFingerprint {
    /// Bit that marks module sources.
    pub const MODULE_FLAG: u32 = 1 << 31;

    /// Builds the fingerprint from a character length and origin options.
    ///
    /// Returns `None` if `length` does not fit below the module flag bit.
    pub fn new(length: usize, origin: OriginOptions) -> Option<Self> {
        let length = u32::try_from(length)
            .ok()
            .filter(|len| len & Self::MODULE_FLAG == 0)?;
        let module = if origin.is_module {
            Self::MODULE_FLAG
        } else {
            0
        };
        Some(Self(length | module))
    }

    /// Wraps a raw value read from a blob header.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw header value.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    /// Source length encoded in this fingerprint.
    pub fn length(self) -> u32 {
        self.0 & !Self::MODULE_FLAG
    }

    /// Whether the fingerprint was taken from a module source.
    pub fn is_module(self) -> bool {
        self.0 & Self::MODULE_FLAG != 0
    }
}

impl fmt::Debug for SourceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SourceFingerprint(len={}, module={})",
            self.length(),
            self.is_module()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Source;

    #[test]
    fn classic_script_is_plain_length() {
        let fp = Source::new("let x=1;").fingerprint().unwrap();
        assert_eq!(fp.as_raw(), 8);
        assert!(!fp.is_module());
    }

    #[test]
    fn module_sets_sign_bit() {
        let fp = Source::module("let x=1;").fingerprint().unwrap();
        assert_eq!(fp.as_raw(), 8 | SourceFingerprint::MODULE_FLAG);
        assert_eq!(fp.length(), 8);
        assert!(fp.is_module());
    }

    #[test]
    fn different_lengths_differ() {
        assert_ne!(
            Source::new("let x=1;").fingerprint(),
            Source::new("let x=10;").fingerprint()
        );
    }

    #[test]
    fn same_length_collides() {
        // Length plus module bit only; content is not hashed.
        assert_eq!(
            Source::new("let x=1;").fingerprint(),
            Source::new("let x=2;").fingerprint()
        );
    }

    #[test]
    fn raw_roundtrip() {
        let fp = Source::module("abc").fingerprint().unwrap();
        assert_eq!(SourceFingerprint::from_raw(fp.as_raw()), fp);
    }

    #[test]
    fn oversized_length_has_no_fingerprint() {
        assert_eq!(SourceFingerprint::new(1 << 31, OriginOptions::script()), None);
        assert_eq!(SourceFingerprint::new(usize::MAX, OriginOptions::module()), None);
        let largest = SourceFingerprint::new((1 << 31) - 1, OriginOptions::module()).unwrap();
        assert_eq!(largest.length(), (1 << 31) - 1);
        assert!(largest.is_module());
    }

    #[test]
    fn debug_shows_fields() {
        let fp = Source::module("ab").fingerprint().unwrap();
        assert_eq!(format!("{fp:?}"), "SourceFingerprint(len=2, module=true)");
    }
}
