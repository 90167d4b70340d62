//! Shared foundational types used across the Ember code cache.
//!
//! This crate provides content hashing and the 32-bit folded digests used in
//! cache blob headers.

#![warn(missing_docs)]

pub mod hash;

pub use hash::{fold_digest, ContentHash, Digest32};
