//! Source text, origin metadata, and the fingerprint that binds a cache blob
//! to the source it was compiled from.
//!
//! This crate provides [`Source`] and [`OriginOptions`], the cheap
//! [`SourceFingerprint`] stored in every blob header, and [`LineIndex`] for
//! converting character positions into line/column coordinates.

#![warn(missing_docs)]

pub mod fingerprint;
pub mod line_index;
pub mod source;

pub use fingerprint::SourceFingerprint;
pub use line_index::{compute_line_ends, LineIndex};
pub use source::{OriginOptions, Source};
