//! The closed set of structural object kinds.

use std::fmt;

use crate::layout;

/// Structural kind of a heap object.
///
/// The discriminant is the stable tag written into cache payloads; never
/// renumber an existing variant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum StructuralKind {
    /// Singleton values such as `undefined` and `true`.
    Oddball = 0,
    /// UTF-8 string data.
    String = 1,
    /// Boxed 64-bit float.
    Number = 2,
    /// Variable-length array of values.
    FixedArray = 3,
    /// Untagged byte storage.
    ByteArray = 4,
    /// Interpreter bytecode with its constant pool.
    Bytecode = 5,
    /// A compiled script and its source binding.
    Script = 6,
    /// A compiled unit: the root of a cached graph, or one of its sub-units.
    Artifact = 7,
    /// Debugger state attached to an artifact.
    DebugOverlay = 8,
    /// Wrapper pairing bytecode with a per-function entry trampoline.
    InterpreterData = 9,
    /// Executable machine code.
    Code = 10,
    /// A function instance bound to a live context.
    Closure = 11,
    /// A live execution context.
    Context = 12,
    /// The global object proxy of a live realm.
    GlobalProxy = 13,
}

/// How the serializer must treat an object of a given kind.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Portability {
    /// Emitted generically.
    Portable,
    /// Never emitted itself; its data payload is emitted in its place.
    Redirect,
    /// Executable code; its presence in a payload is a contract violation.
    CodeObject,
    /// State bound to a live environment; its presence is a contract violation.
    EnvironmentBound,
}

impl StructuralKind {
    /// Every kind, in tag order.
    pub const ALL: [StructuralKind; 14] = [
        Self::Oddball,
        Self::String,
        Self::Number,
        Self::FixedArray,
        Self::ByteArray,
        Self::Bytecode,
        Self::Script,
        Self::Artifact,
        Self::DebugOverlay,
        Self::InterpreterData,
        Self::Code,
        Self::Closure,
        Self::Context,
        Self::GlobalProxy,
    ];

    /// The stable wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Looks up a kind by wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Number of slots every object of this kind has, or `None` for
    /// variable-length kinds.
    pub fn fixed_slot_count(self) -> Option<usize> {
        match self {
            Self::FixedArray => None,
            Self::Oddball => Some(layout::oddball::SLOT_COUNT),
            Self::String | Self::Number | Self::ByteArray | Self::Code | Self::GlobalProxy => {
                Some(0)
            }
            Self::Bytecode => Some(layout::bytecode::SLOT_COUNT),
            Self::Script => Some(layout::script::SLOT_COUNT),
            Self::Artifact => Some(layout::artifact::SLOT_COUNT),
            Self::DebugOverlay => Some(layout::debug_overlay::SLOT_COUNT),
            Self::InterpreterData => Some(layout::interpreter_data::SLOT_COUNT),
            Self::Closure => Some(layout::closure::SLOT_COUNT),
            Self::Context => Some(layout::context::SLOT_COUNT),
        }
    }

    /// Whether objects of this kind carry an untagged byte body.
    pub fn has_raw_body(self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::ByteArray | Self::Bytecode | Self::Code
        )
    }

    /// Serialization class of this kind.
    pub fn portability(self) -> Portability {
        match self {
            Self::Oddball
            | Self::String
            | Self::Number
            | Self::FixedArray
            | Self::ByteArray
            | Self::Bytecode
            | Self::Script
            | Self::Artifact
            | Self::DebugOverlay => Portability::Portable,
            Self::InterpreterData => Portability::Redirect,
            Self::Code => Portability::CodeObject,
            Self::Closure | Self::Context | Self::GlobalProxy => Portability::EnvironmentBound,
        }
    }
}

impl fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Oddball => "oddball",
            Self::String => "string",
            Self::Number => "number",
            Self::FixedArray => "fixed array",
            Self::ByteArray => "byte array",
            Self::Bytecode => "bytecode",
            Self::Script => "script",
            Self::Artifact => "artifact",
            Self::DebugOverlay => "debug overlay",
            Self::InterpreterData => "interpreter data",
            Self::Code => "code",
            Self::Closure => "closure",
            Self::Context => "context",
            Self::GlobalProxy => "global proxy",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_table_order() {
        for (i, kind) in StructuralKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag() as usize, i);
            assert_eq!(StructuralKind::from_tag(kind.tag()), Some(*kind));
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(StructuralKind::from_tag(14), None);
        assert_eq!(StructuralKind::from_tag(0xFF), None);
    }

    #[test]
    fn raw_body_kinds_have_expected_slots() {
        assert_eq!(StructuralKind::String.fixed_slot_count(), Some(0));
        assert_eq!(StructuralKind::Bytecode.fixed_slot_count(), Some(2));
        assert_eq!(StructuralKind::FixedArray.fixed_slot_count(), None);
        assert!(StructuralKind::Bytecode.has_raw_body());
        assert!(!StructuralKind::Script.has_raw_body());
    }

    #[test]
    fn portability_classes() {
        assert_eq!(StructuralKind::Artifact.portability(), Portability::Portable);
        assert_eq!(
            StructuralKind::InterpreterData.portability(),
            Portability::Redirect
        );
        assert_eq!(StructuralKind::Code.portability(), Portability::CodeObject);
        for kind in [
            StructuralKind::Closure,
            StructuralKind::Context,
            StructuralKind::GlobalProxy,
        ] {
            assert_eq!(kind.portability(), Portability::EnvironmentBound);
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(StructuralKind::DebugOverlay.to_string(), "debug overlay");
        assert_eq!(StructuralKind::Code.to_string(), "code");
    }
}
