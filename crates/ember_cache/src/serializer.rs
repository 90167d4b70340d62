//! Graph serializer.
//!
//! Walks the graph reachable from an artifact once, depth first, and writes
//! every reference as the cheapest encoding that applies, in this order:
//! hot object, common root, attached or back reference, shared read-only
//! object, and finally a new object with its projected slots.

use std::collections::HashMap;

use ember_heap::layout::{artifact, debug_overlay, interpreter_data, script};
use ember_heap::{GraphAccess, ObjectId, Portability, StructuralKind, Value};
use ember_source::{OriginOptions, SourceFingerprint};

use crate::error::{ContractViolation, SerializeError};
use crate::header::ALIGNMENT;
use crate::hot_objects::HotObjects;
use crate::opcodes::{
    PayloadSink, ATTACHED_REF, BACK_REF, HOT_OBJECT, NEW_OBJECT, READ_ONLY_REF, ROOT, SMI,
    SOURCE_ATTACHED_INDEX,
};
use crate::projection::project_slots;

/// Deepest object nesting a payload may contain.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Everything about an artifact the header needs, found before the walk.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactSource {
    /// The artifact's script.
    pub script: ObjectId,
    /// The script's source string, sent as an attached reference.
    pub source: ObjectId,
    /// Fingerprint of the source text and origin.
    pub fingerprint: SourceFingerprint,
}

/// Locates the script and source of `root` and checks it may be cached.
pub fn inspect_artifact<G: GraphAccess + ?Sized>(
    graph: &G,
    root: ObjectId,
) -> Result<ArtifactSource, SerializeError> {
    let found = graph.kind_of(root);
    if found != StructuralKind::Artifact {
        return Err(SerializeError::UnexpectedRoot { found });
    }
    let detached = || SerializeError::DetachedArtifact { artifact: root };

    let mut holder = graph
        .object(root)
        .slot(artifact::SCRIPT_OR_OVERLAY)
        .and_then(|v| v.as_object())
        .ok_or_else(detached)?;
    if graph.kind_of(holder) == StructuralKind::DebugOverlay {
        holder = graph
            .object(holder)
            .slot(debug_overlay::SCRIPT)
            .and_then(|v| v.as_object())
            .ok_or_else(detached)?;
    }
    if graph.kind_of(holder) != StructuralKind::Script {
        return Err(detached());
    }

    let script_object = graph.object(holder);
    let origin = OriginOptions::from_bits(
        script_object
            .slot(script::ORIGIN)
            .and_then(|v| v.as_smi())
            .unwrap_or(0),
    );
    if origin.contains_asm_module {
        return Err(SerializeError::ContainsAsmModule);
    }
    let source = script_object
        .slot(script::SOURCE)
        .and_then(|v| v.as_object())
        .ok_or_else(detached)?;
    let text = graph.object(source).as_str().ok_or_else(detached)?;
    let length = text.chars().count();
    let fingerprint = SourceFingerprint::new(length, origin)
        .ok_or(SerializeError::SourceTooLarge { length })?;

    Ok(ArtifactSource {
        script: holder,
        source,
        fingerprint,
    })
}

/// Single-use serializer over one graph.
pub struct Serializer<'g, G: GraphAccess + ?Sized> {
    graph: &'g G,
    sink: PayloadSink,
    back_refs: HashMap<ObjectId, u32>,
    attached: HashMap<ObjectId, u32>,
    hot: HotObjects,
    script: Option<ObjectId>,
    depth: usize,
}

impl<'g, G: GraphAccess + ?Sized> Serializer<'g, G> {
    /// Creates a serializer reading from `graph`.
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            sink: PayloadSink::new(),
            back_refs: HashMap::new(),
            attached: HashMap::new(),
            hot: HotObjects::new(),
            script: None,
            depth: 0,
        }
    }

    /// Marks `source` as attached reference 0: the loader supplies it.
    pub fn attach_source(mut self, source: ObjectId) -> Self {
        self.attached.insert(source, SOURCE_ATTACHED_INDEX);
        self
    }

    /// Serializes everything reachable from `root`, returning the padded payload.
    ///
    /// # Panics
    ///
    /// Panics with a [`ContractViolation`] if the graph reaches executable
    /// code or environment-bound objects.
    pub fn serialize(mut self, root: ObjectId) -> Result<Vec<u8>, SerializeError> {
        self.serialize_object(root)?;
        self.sink.pad(ALIGNMENT);
        Ok(self.sink.into_bytes())
    }

    fn serialize_value(&mut self, value: Value) -> Result<(), SerializeError> {
        match value {
            Value::Smi(n) => {
                self.sink.put_u8(SMI);
                self.sink.put_smi(n)
            }
            Value::Ref(id) => self.serialize_object(id),
        }
    }

    fn serialize_object(&mut self, id: ObjectId) -> Result<(), SerializeError> {
        if let Some(index) = self.hot.find(id) {
            self.sink.put_u8(HOT_OBJECT + index as u8);
            return Ok(());
        }
        let read_only = self.graph.read_only();
        if let Some(root) = read_only.root_index_of(id) {
            self.sink.put_u8(ROOT);
            self.sink.put_varint(root.index() as u32)?;
            self.hot.add(id);
            return Ok(());
        }
        if let Some(&index) = self.attached.get(&id) {
            self.sink.put_u8(ATTACHED_REF);
            return self.sink.put_varint(index);
        }
        if let Some(&index) = self.back_refs.get(&id) {
            self.sink.put_u8(BACK_REF);
            return self.sink.put_varint(index);
        }
        if let Some(location) = self.graph.shared_location(id) {
            self.sink.put_u8(READ_ONLY_REF);
            self.sink.put_varint(location.page)?;
            return self.sink.put_varint(location.offset);
        }

        let kind = self.graph.kind_of(id);
        match kind.portability() {
            Portability::Portable => self.serialize_new_object(id, kind),
            Portability::Redirect => {
                let target = self
                    .graph
                    .object(id)
                    .slot(interpreter_data::BYTECODE)
                    .and_then(|v| v.as_object())
                    .unwrap_or_else(|| panic!("{id:?} has no bytecode to redirect to"));
                self.serialize_object(target)
            }
            Portability::CodeObject => panic!("{}", ContractViolation::CodeObject(id)),
            Portability::EnvironmentBound => panic!(
                "{}",
                ContractViolation::NonPortableObject { object: id, kind }
            ),
        }
    }

    fn serialize_new_object(
        &mut self,
        id: ObjectId,
        kind: StructuralKind,
    ) -> Result<(), SerializeError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(SerializeError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
            });
        }
        if kind == StructuralKind::Script {
            match self.script {
                Some(expected) => {
                    return Err(SerializeError::ForeignScript { expected, found: id })
                }
                None => self.script = Some(id),
            }
        }
        // Reserve the index first so cycles resolve to it.
        let index = self.back_refs.len() as u32;
        self.back_refs.insert(id, index);

        let mut live = Vec::new();
        self.graph
            .for_each_reference(id, &mut |_, value| live.push(value));
        let slots = project_slots(self.graph, kind, &live);

        self.sink.put_u8(NEW_OBJECT);
        self.sink.put_u8(kind.tag());
        self.sink.put_raw(self.graph.raw_data(id))?;
        self.sink.put_varint(slots.len() as u32)?;

        self.depth += 1;
        for value in slots {
            self.serialize_value(value)?;
        }
        self.depth -= 1;

        self.hot.add(id);
        Ok(())
    }
}
