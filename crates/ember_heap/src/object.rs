//! Heap objects and slot values.

use crate::error::HeapError;
use crate::ids::ObjectId;
use crate::kind::StructuralKind;

/// A slot value: an immediate small integer or a reference.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Value {
    /// Immediate small integer.
    Smi(i32),
    /// Reference to a heap object.
    Ref(ObjectId),
}

impl Value {
    /// Returns the referenced object, if this is a reference.
    pub fn as_object(self) -> Option<ObjectId> {
        match self {
            Self::Ref(id) => Some(id),
            Self::Smi(_) => None,
        }
    }

    /// Returns the small integer, if this is one.
    pub fn as_smi(self) -> Option<i32> {
        match self {
            Self::Smi(v) => Some(v),
            Self::Ref(_) => None,
        }
    }
}

impl From<ObjectId> for Value {
    fn from(id: ObjectId) -> Self {
        Self::Ref(id)
    }
}

/// A heap object: a kind, its tagged slots, and an optional untagged body.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapObject {
    kind: StructuralKind,
    slots: Vec<Value>,
    raw: Vec<u8>,
}

impl HeapObject {
    /// Creates an object after checking that the shape matches `kind`.
    pub fn new(kind: StructuralKind, slots: Vec<Value>, raw: Vec<u8>) -> Result<Self, HeapError> {
        if let Some(expected) = kind.fixed_slot_count() {
            if slots.len() != expected {
                return Err(HeapError::BadShape {
                    kind,
                    reason: format!("expected {expected} slots, got {}", slots.len()),
                });
            }
        }
        if !kind.has_raw_body() && !raw.is_empty() {
            return Err(HeapError::BadShape {
                kind,
                reason: "kind has no raw body".to_string(),
            });
        }
        match kind {
            StructuralKind::String if std::str::from_utf8(&raw).is_err() => {
                return Err(HeapError::BadShape {
                    kind,
                    reason: "string body is not valid UTF-8".to_string(),
                });
            }
            StructuralKind::Number if raw.len() != 8 => {
                return Err(HeapError::BadShape {
                    kind,
                    reason: format!("number body must be 8 bytes, got {}", raw.len()),
                });
            }
            _ => {}
        }
        Ok(Self { kind, slots, raw })
    }

    /// Creates an object of `kind` with `slot_count` zeroed slots.
    pub fn blank(kind: StructuralKind, slot_count: usize, raw: Vec<u8>) -> Result<Self, HeapError> {
        Self::new(kind, vec![Value::Smi(0); slot_count], raw)
    }

    /// Creates a string object.
    pub fn string(text: &str) -> Self {
        Self {
            kind: StructuralKind::String,
            slots: Vec::new(),
            raw: text.as_bytes().to_vec(),
        }
    }

    /// The structural kind.
    pub fn kind(&self) -> StructuralKind {
        self.kind
    }

    /// All tagged slots.
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// The slot at `index`, if present.
    pub fn slot(&self, index: usize) -> Option<Value> {
        self.slots.get(index).copied()
    }

    /// Untagged body bytes.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// The string contents, for string objects.
    pub fn as_str(&self) -> Option<&str> {
        match self.kind {
            StructuralKind::String => std::str::from_utf8(&self.raw).ok(),
            _ => None,
        }
    }

    /// The numeric value, for number objects.
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            StructuralKind::Number => {
                let bytes: [u8; 8] = self.raw.as_slice().try_into().ok()?;
                Some(f64::from_le_bytes(bytes))
            }
            _ => None,
        }
    }

    pub(crate) fn slots_mut(&mut self) -> &mut [Value] {
        &mut self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Space;

    #[test]
    fn value_accessors() {
        let id = ObjectId::new(Space::Main, 1);
        assert_eq!(Value::Ref(id).as_object(), Some(id));
        assert_eq!(Value::Ref(id).as_smi(), None);
        assert_eq!(Value::Smi(-4).as_smi(), Some(-4));
        assert_eq!(Value::from(id), Value::Ref(id));
    }

    #[test]
    fn fixed_shape_enforced() {
        let err = HeapObject::new(StructuralKind::Script, vec![Value::Smi(0)], Vec::new())
            .unwrap_err();
        assert!(matches!(err, HeapError::BadShape { .. }));
    }

    #[test]
    fn raw_body_rejected_on_slot_only_kind() {
        let err = HeapObject::blank(StructuralKind::Artifact, 6, vec![1]).unwrap_err();
        assert!(matches!(err, HeapError::BadShape { .. }));
    }

    #[test]
    fn invalid_utf8_string_rejected() {
        let err = HeapObject::new(StructuralKind::String, vec![], vec![0xFF, 0xFE]).unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn number_body_must_be_eight_bytes() {
        assert!(HeapObject::new(StructuralKind::Number, vec![], vec![0; 4]).is_err());
        let n = HeapObject::new(StructuralKind::Number, vec![], 1.5f64.to_le_bytes().to_vec())
            .unwrap();
        assert_eq!(n.as_number(), Some(1.5));
    }

    #[test]
    fn string_accessor() {
        let s = HeapObject::string("hello");
        assert_eq!(s.as_str(), Some("hello"));
        assert_eq!(s.kind(), StructuralKind::String);
        assert!(s.slots().is_empty());
    }

    #[test]
    fn variable_length_array() {
        let arr = HeapObject::blank(StructuralKind::FixedArray, 5, Vec::new()).unwrap();
        assert_eq!(arr.slots().len(), 5);
        assert_eq!(arr.slot(4), Some(Value::Smi(0)));
        assert_eq!(arr.slot(5), None);
    }
}
