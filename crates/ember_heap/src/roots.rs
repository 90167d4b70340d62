//! The versioned table of common roots.
//!
//! Roots exist identically in every process built from the same sources, so
//! payloads refer to them by index instead of by value. The table order is
//! part of the wire format: appending a root changes [`RootIndex::COUNT`],
//! which feeds both the blob magic number and the build identity.

use ember_common::ContentHash;

/// Index of a common root.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum RootIndex {
    /// `undefined`; also the "absent" placeholder for elided fields.
    Undefined = 0,
    /// `null`.
    Null = 1,
    /// `true`.
    True = 2,
    /// `false`.
    False = 3,
    /// Marker for uninitialized slots.
    TheHole = 4,
    /// Sentinel the host uses for "never set" embedder data.
    Uninitialized = 5,
    /// The empty string; placeholder source of background-restored scripts.
    EmptyString = 6,
    /// The empty fixed array; placeholder for elided host options.
    EmptyFixedArray = 7,
    /// The empty byte array.
    EmptyByteArray = 8,
    /// Shared interpreter entry trampoline, copied for native stack frames.
    InterpreterEntryTrampoline = 9,
}

impl RootIndex {
    /// Number of roots.
    pub const COUNT: usize = 10;

    /// Every root in table order.
    pub const ALL: [RootIndex; Self::COUNT] = [
        Self::Undefined,
        Self::Null,
        Self::True,
        Self::False,
        Self::TheHole,
        Self::Uninitialized,
        Self::EmptyString,
        Self::EmptyFixedArray,
        Self::EmptyByteArray,
        Self::InterpreterEntryTrampoline,
    ];

    /// Position of this root in the table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up a root by table position.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable name of the root.
    pub fn name(self) -> &'static str {
        match self {
            Self::Undefined => "undefined_value",
            Self::Null => "null_value",
            Self::True => "true_value",
            Self::False => "false_value",
            Self::TheHole => "the_hole_value",
            Self::Uninitialized => "uninitialized_symbol",
            Self::EmptyString => "empty_string",
            Self::EmptyFixedArray => "empty_fixed_array",
            Self::EmptyByteArray => "empty_byte_array",
            Self::InterpreterEntryTrampoline => "interpreter_entry_trampoline",
        }
    }

    /// Hash of the table's names in order. Any reordering or rename changes it.
    pub fn table_fingerprint() -> u32 {
        let names: Vec<&str> = Self::ALL.iter().map(|r| r.name()).collect();
        ContentHash::from_bytes(names.join(",").as_bytes()).fold32()
    }
}
