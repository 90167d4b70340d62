//! Parsing and validation of `ember.toml` code cache configuration.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`CacheConfig`]: cache behaviour switches plus the canonical set of
//! code-shape flags whose hash is stamped into every cache blob.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
