//! Source text plus the origin metadata a host attaches to it.

use ember_common::ContentHash;
use serde::{Deserialize, Serialize};

use crate::fingerprint::SourceFingerprint;

/// Origin options recorded alongside a source text.
///
/// Only `is_module` feeds the fingerprint. `contains_asm_module` marks
/// scripts whose compiled form is bound to the host and therefore cannot be
/// cached. Serializable so hosts can record it in their blob indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginOptions {
    /// Whether the source was compiled as a module rather than a classic script.
    pub is_module: bool,
    /// Whether compilation produced an asm module.
    pub contains_asm_module: bool,
}

impl OriginOptions {
    const MODULE_BIT: i32 = 1 << 0;
    const ASM_BIT: i32 = 1 << 1;

    /// Options for a classic (non-module) script.
    pub fn script() -> Self {
        Self::default()
    }

    /// Options for a module.
    pub fn module() -> Self {
        Self {
            is_module: true,
            ..Self::default()
        }
    }

    /// Packs the options into the small integer stored on a script object.
    pub fn to_bits(self) -> i32 {
        let mut bits = 0;
        if self.is_module {
            bits |= Self::MODULE_BIT;
        }
        if self.contains_asm_module {
            bits |= Self::ASM_BIT;
        }
        bits
    }

    /// Unpacks options stored by [`OriginOptions::to_bits`]. Unknown bits are ignored.
    pub fn from_bits(bits: i32) -> Self {
        Self {
            is_module: bits & Self::MODULE_BIT != 0,
            contains_asm_module: bits & Self::ASM_BIT != 0,
        }
    }
}

/// An immutable source text handed to the compiler and later to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// The script name or URL, if the host supplied one.
    pub name: Option<String>,
    /// The full text.
    pub text: String,
    /// Origin options recorded at compile time.
    pub origin: OriginOptions,
}

impl Source {
    /// Creates an unnamed classic script source.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            name: None,
            text: text.into(),
            origin: OriginOptions::script(),
        }
    }

    /// Creates an unnamed module source.
    pub fn module(text: impl Into<String>) -> Self {
        Self {
            name: None,
            text: text.into(),
            origin: OriginOptions::module(),
        }
    }

    /// Attaches a script name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Length of the text in characters, the unit used for positions and fingerprints.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Computes the fingerprint stored in blob headers for this source.
    ///
    /// Returns `None` for texts of 2^31 characters or more, which no blob
    /// can describe.
    pub fn fingerprint(&self) -> Option<SourceFingerprint> {
        SourceFingerprint::new(self.char_len(), self.origin)
    }

    /// Full content hash of the text, for callers that key caches on content.
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::from_bytes(self.text.as_bytes())
    }
}
