//! Process-wide registry of live scripts.

use crate::ids::ObjectId;

/// The set of scripts whose artifacts are live in the main heap.
///
/// Restored scripts are registered when a reconstruction is merged; nothing
/// from a rejected or discarded reconstruction ever appears here.
#[derive(Debug, Default, Clone)]
pub struct ArtifactRegistry {
    scripts: Vec<ObjectId>,
}

impl ArtifactRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a script. Registering the same script twice is a no-op.
    pub fn register(&mut self, script: ObjectId) {
        if !self.scripts.contains(&script) {
            self.scripts.push(script);
        }
    }

    /// Registered scripts in registration order.
    pub fn scripts(&self) -> &[ObjectId] {
        &self.scripts
    }

    /// Whether `script` is registered.
    pub fn contains(&self, script: ObjectId) -> bool {
        self.scripts.contains(&script)
    }

    /// Number of registered scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}
