//! Configuration types deserialized from `ember.toml`.

use ember_common::ContentHash;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// The top-level code cache configuration.
///
/// Both sections are optional; a missing file section yields the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Cache behaviour switches. These never influence the flag hash.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Flags that change the shape of compiled code.
    #[serde(default)]
    pub flags: CodeShapeFlags,
}

/// Switches controlling how blobs are produced, checked, and restored.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Compute a checksum when serializing and verify it when loading.
    #[serde(default = "default_true")]
    pub verify_checksum: bool,
    /// Log the name of every script being serialized.
    #[serde(default)]
    pub trace_serializer: bool,
    /// Log blob sizes and elapsed time for serialize/deserialize.
    #[serde(default)]
    pub profile: bool,
    /// Emit a "deserialize" function event for every restored artifact.
    #[serde(default)]
    pub log_function_events: bool,
    /// Emit a code-creation event per compiled sub-artifact after restoring.
    #[serde(default)]
    pub log_code_creation: bool,
    /// Compute line-end tables right after restoring instead of on first use.
    #[serde(default)]
    pub eager_line_ends: bool,
    /// Route synchronous loads through the background pipeline.
    #[serde(default)]
    pub stress_background_deserialize: bool,
    /// Upper bound on objects a single reconstruction may allocate.
    #[serde(default)]
    pub max_objects: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            trace_serializer: false,
            profile: false,
            log_function_events: false,
            log_code_creation: false,
            eager_line_ends: false,
            stress_background_deserialize: false,
            max_objects: None,
        }
    }
}

/// The canonical set of flags that affect compiled code shape.
///
/// A blob compiled under one flag set must never be replayed under another,
/// so [`CodeShapeFlags::hash`] is stamped into every blob header.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CodeShapeFlags {
    /// Give every restored function its own interpreter entry trampoline so
    /// native profilers can attribute frames.
    #[serde(default)]
    pub native_stack_frames: bool,
    /// Prefer smaller bytecode over faster bytecode.
    #[serde(default)]
    pub optimize_for_size: bool,
    /// Host-defined flags, hashed by name and value.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl CodeShapeFlags {
    /// Renders the flag set as sorted `name=value` lines.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "native_stack_frames={}", self.native_stack_frames);
        let _ = writeln!(out, "optimize_for_size={}", self.optimize_for_size);
        for (name, value) in &self.extra {
            let _ = writeln!(out, "{name}={value}");
        }
        out
    }

    /// Hash of the canonical flag set, as stored in blob headers.
    pub fn hash(&self) -> u32 {
        ContentHash::from_bytes(self.canonical().as_bytes()).fold32()
    }
}
