//! Slot layouts for every fixed-shape kind.

/// Oddball: `kind` holds the oddball discriminator as a small integer.
pub mod oddball {
    /// Discriminator (small integer).
    pub const KIND: usize = 0;
    /// Total slots.
    pub const SLOT_COUNT: usize = 1;
}

/// Bytecode: raw body holds instructions.
pub mod bytecode {
    /// Constant pool (fixed array).
    pub const CONSTANT_POOL: usize = 0;
    /// Source position table (byte array).
    pub const SOURCE_POSITIONS: usize = 1;
    /// Total slots.
    pub const SLOT_COUNT: usize = 2;
}

/// Script: the source binding of a compiled graph.
pub mod script {
    /// Source text (string).
    pub const SOURCE: usize = 0;
    /// Script name (string or undefined).
    pub const NAME: usize = 1;
    /// Host-local embedder data.
    pub const CONTEXT_DATA: usize = 2;
    /// Host-defined extension options.
    pub const HOST_OPTIONS: usize = 3;
    /// Derived line-end table (fixed array of small integers, or undefined).
    pub const LINE_ENDS: usize = 4;
    /// Every artifact compiled from this script (fixed array).
    pub const ARTIFACTS: usize = 5;
    /// Packed origin options (small integer).
    pub const ORIGIN: usize = 6;
    /// Total slots.
    pub const SLOT_COUNT: usize = 7;
}

/// Artifact: one compiled unit.
pub mod artifact {
    /// Function name (string).
    pub const NAME: usize = 0;
    /// Owning script, or a debug overlay while the debugger is attached.
    pub const SCRIPT_OR_OVERLAY: usize = 1;
    /// Active body: bytecode, interpreter data, or undefined when not compiled.
    pub const BODY: usize = 2;
    /// Start position in the source (small integer).
    pub const START_POSITION: usize = 3;
    /// End position in the source (small integer).
    pub const END_POSITION: usize = 4;
    /// Flag bits (small integer).
    pub const FLAGS: usize = 5;
    /// Total slots.
    pub const SLOT_COUNT: usize = 6;

    /// Flag bit: the artifact is the script's top-level unit.
    pub const FLAG_TOPLEVEL: i32 = 1 << 0;
}

/// DebugOverlay: debugger state that temporarily replaces an artifact's script slot.
pub mod debug_overlay {
    /// The artifact's real script.
    pub const SCRIPT: usize = 0;
    /// Uninstrumented bytecode.
    pub const ORIGINAL_BODY: usize = 1;
    /// Instrumented bytecode, or undefined.
    pub const INSTRUMENTED_BODY: usize = 2;
    /// Total slots.
    pub const SLOT_COUNT: usize = 3;
}

/// InterpreterData: bytecode paired with a dedicated entry trampoline.
pub mod interpreter_data {
    /// The wrapped bytecode.
    pub const BYTECODE: usize = 0;
    /// Entry trampoline (code).
    pub const TRAMPOLINE: usize = 1;
    /// Total slots.
    pub const SLOT_COUNT: usize = 2;
}

/// Closure: a function instance.
pub mod closure {
    /// The artifact this closure instantiates.
    pub const ARTIFACT: usize = 0;
    /// The live context it is bound to.
    pub const CONTEXT: usize = 1;
    /// Total slots.
    pub const SLOT_COUNT: usize = 2;
}

/// Context: a live scope.
pub mod context {
    /// Enclosing context.
    pub const PREVIOUS: usize = 0;
    /// Scope extension object.
    pub const EXTENSION: usize = 1;
    /// Total slots.
    pub const SLOT_COUNT: usize = 2;
}
