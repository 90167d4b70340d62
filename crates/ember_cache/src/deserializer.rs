//! Graph deserializer.
//!
//! Replays a payload against a [`GraphBuilder`], allocating each new object
//! before reading its slots so back-reference indices match the order the
//! serializer reserved them in.

use ember_heap::{
    GraphBuilder, ObjectId, Portability, RootIndex, SharedLocation, StructuralKind, Value,
};

use crate::error::ReconstructionFailure;
use crate::hot_objects::HotObjects;
use crate::opcodes::{
    hot_object_index, PayloadSource, ATTACHED_REF, BACK_REF, NEW_OBJECT, NOP, READ_ONLY_REF, ROOT,
    SMI,
};
use crate::serializer::MAX_NESTING_DEPTH;

/// Output of a successful replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstructed {
    /// The payload's root object.
    pub root: ObjectId,
    /// Every script the payload created, in creation order.
    pub scripts: Vec<ObjectId>,
    /// Number of objects allocated.
    pub objects: usize,
    /// Every `(object, field)` filled from an attached reference, in write order.
    pub attached_slots: Vec<(ObjectId, usize)>,
}

/// Single-use deserializer writing into a [`GraphBuilder`].
pub struct Deserializer<'a, B: GraphBuilder + ?Sized> {
    builder: &'a mut B,
    source: PayloadSource<'a>,
    attached: Vec<ObjectId>,
    back_refs: Vec<ObjectId>,
    hot: HotObjects,
    scripts: Vec<ObjectId>,
    attached_slots: Vec<(ObjectId, usize)>,
    depth: usize,
}

impl<'a, B: GraphBuilder + ?Sized> Deserializer<'a, B> {
    /// Creates a deserializer for `payload`. `attached[i]` resolves attached reference `i`.
    pub fn new(builder: &'a mut B, payload: &'a [u8], attached: Vec<ObjectId>) -> Self {
        Self {
            builder,
            source: PayloadSource::new(payload),
            attached,
            back_refs: Vec::new(),
            hot: HotObjects::new(),
            scripts: Vec::new(),
            attached_slots: Vec::new(),
            depth: 0,
        }
    }

    /// Replays the whole payload.
    pub fn deserialize(mut self) -> Result<Reconstructed, ReconstructionFailure> {
        let opcode = self.source.get_u8()?;
        let root = self.read_reference(opcode)?;
        while !self.source.at_end() {
            let offset = self.source.position();
            if self.source.get_u8()? != NOP {
                return Err(ReconstructionFailure::malformed(
                    offset,
                    "trailing data after root object",
                ));
            }
        }
        Ok(Reconstructed {
            root,
            scripts: self.scripts,
            objects: self.back_refs.len(),
            attached_slots: self.attached_slots,
        })
    }

    /// Reads the value for slot `field` of `object`.
    fn read_slot(
        &mut self,
        object: ObjectId,
        field: usize,
    ) -> Result<Value, ReconstructionFailure> {
        match self.source.get_u8()? {
            SMI => Ok(Value::Smi(self.source.get_smi()?)),
            opcode => {
                let id = self.read_reference(opcode)?;
                if opcode == ATTACHED_REF {
                    self.attached_slots.push((object, field));
                }
                Ok(Value::Ref(id))
            }
        }
    }

    fn read_reference(&mut self, opcode: u8) -> Result<ObjectId, ReconstructionFailure> {
        let offset = self.source.position().saturating_sub(1);
        if let Some(index) = hot_object_index(opcode) {
            return self.hot.get(index).ok_or_else(|| {
                ReconstructionFailure::malformed(offset, format!("hot object {index} is empty"))
            });
        }
        match opcode {
            NEW_OBJECT => self.read_new_object(),
            ROOT => {
                let index = self.source.get_varint()? as usize;
                let root = RootIndex::from_index(index).ok_or_else(|| {
                    ReconstructionFailure::malformed(offset, format!("unknown root {index}"))
                })?;
                let id = self.builder.read_only().root(root);
                self.hot.add(id);
                Ok(id)
            }
            BACK_REF => {
                let index = self.source.get_varint()? as usize;
                self.back_refs.get(index).copied().ok_or_else(|| {
                    ReconstructionFailure::malformed(
                        offset,
                        format!("back reference {index} out of range"),
                    )
                })
            }
            ATTACHED_REF => {
                let index = self.source.get_varint()? as usize;
                self.attached.get(index).copied().ok_or_else(|| {
                    ReconstructionFailure::malformed(
                        offset,
                        format!("attached reference {index} out of range"),
                    )
                })
            }
            READ_ONLY_REF => {
                let page = self.source.get_varint()?;
                let offset_in_page = self.source.get_varint()?;
                let location = SharedLocation {
                    page,
                    offset: offset_in_page,
                };
                self.builder.read_only().resolve(location).ok_or_else(|| {
                    ReconstructionFailure::malformed(
                        offset,
                        format!("no shared object at {location:?}"),
                    )
                })
            }
            other => Err(ReconstructionFailure::malformed(
                offset,
                format!("unexpected opcode {other:#04x}"),
            )),
        }
    }

    fn read_new_object(&mut self) -> Result<ObjectId, ReconstructionFailure> {
        let offset = self.source.position();
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ReconstructionFailure::malformed(
                offset,
                "object nesting too deep",
            ));
        }
        let tag = self.source.get_u8()?;
        let kind = StructuralKind::from_tag(tag).ok_or_else(|| {
            ReconstructionFailure::malformed(offset, format!("unknown kind tag {tag}"))
        })?;
        if kind.portability() != Portability::Portable {
            return Err(ReconstructionFailure::malformed(
                offset,
                format!("{kind} objects never appear in a payload"),
            ));
        }
        let raw = self.source.get_raw()?.to_vec();
        let slot_count = self.source.get_varint()? as usize;
        // Every slot takes at least one byte.
        if slot_count > self.source.remaining() {
            return Err(ReconstructionFailure::malformed(
                offset,
                format!("{slot_count} slots exceed the remaining payload"),
            ));
        }

        let id = self
            .builder
            .allocate_by_kind(kind, slot_count, raw)
            .map_err(|e| ReconstructionFailure::from_heap(offset, e))?;
        self.back_refs.push(id);
        if kind == StructuralKind::Script {
            self.scripts.push(id);
        }

        self.depth += 1;
        for field in 0..slot_count {
            let value = self.read_slot(id, field)?;
            self.builder
                .set_field(id, field, value)
                .map_err(|e| ReconstructionFailure::from_heap(self.source.position(), e))?;
        }
        self.depth -= 1;

        self.hot.add(id);
        Ok(id)
    }
}
