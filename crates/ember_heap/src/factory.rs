//! Constructors for the object graphs a compiler would produce.

use ember_source::Source;

use crate::access::GraphBuilder;
use crate::error::HeapError;
use crate::heap::Heap;
use crate::ids::ObjectId;
use crate::kind::StructuralKind;
use crate::layout;
use crate::object::{HeapObject, Value};
use crate::roots::RootIndex;

impl Heap {
    fn root_value(&self, root: RootIndex) -> Value {
        Value::Ref(self.root(root))
    }

    fn build(
        &mut self,
        kind: StructuralKind,
        slots: Vec<Value>,
        raw: Vec<u8>,
    ) -> Result<ObjectId, HeapError> {
        self.alloc(HeapObject::new(kind, slots, raw)?)
    }

    /// Allocates a string.
    pub fn new_string(&mut self, text: &str) -> Result<ObjectId, HeapError> {
        self.alloc(HeapObject::string(text))
    }

    /// Allocates a boxed number.
    pub fn new_number(&mut self, value: f64) -> Result<ObjectId, HeapError> {
        self.build(
            StructuralKind::Number,
            Vec::new(),
            value.to_le_bytes().to_vec(),
        )
    }

    /// Allocates a fixed array holding `values`.
    pub fn new_fixed_array(&mut self, values: Vec<Value>) -> Result<ObjectId, HeapError> {
        self.build(StructuralKind::FixedArray, values, Vec::new())
    }

    /// Allocates a byte array.
    pub fn new_byte_array(&mut self, bytes: &[u8]) -> Result<ObjectId, HeapError> {
        self.build(StructuralKind::ByteArray, Vec::new(), bytes.to_vec())
    }

    /// Allocates bytecode with the given instructions and constant pool.
    pub fn new_bytecode(
        &mut self,
        instructions: &[u8],
        constants: Vec<Value>,
    ) -> Result<ObjectId, HeapError> {
        let pool = if constants.is_empty() {
            self.root_value(RootIndex::EmptyFixedArray)
        } else {
            Value::Ref(self.new_fixed_array(constants)?)
        };
        let positions = self.root_value(RootIndex::EmptyByteArray);
        self.build(
            StructuralKind::Bytecode,
            vec![pool, positions],
            instructions.to_vec(),
        )
    }

    /// Allocates a script for `source` with an empty artifact list.
    pub fn new_script(&mut self, source: &Source) -> Result<ObjectId, HeapError> {
        let text = Value::Ref(self.new_string(&source.text)?);
        let name = match &source.name {
            Some(name) => Value::Ref(self.new_string(name)?),
            None => self.root_value(RootIndex::Undefined),
        };
        let mut slots = vec![self.root_value(RootIndex::Undefined); layout::script::SLOT_COUNT];
        slots[layout::script::SOURCE] = text;
        slots[layout::script::NAME] = name;
        slots[layout::script::HOST_OPTIONS] = self.root_value(RootIndex::EmptyFixedArray);
        slots[layout::script::ARTIFACTS] = self.root_value(RootIndex::EmptyFixedArray);
        slots[layout::script::ORIGIN] = Value::Smi(source.origin.to_bits());
        self.build(StructuralKind::Script, slots, Vec::new())
    }

    /// Allocates an artifact and appends it to the script's artifact list.
    pub fn new_artifact(
        &mut self,
        script: ObjectId,
        name: &str,
        body: Option<ObjectId>,
        span: (u32, u32),
        toplevel: bool,
    ) -> Result<ObjectId, HeapError> {
        self.expect_kind(script, StructuralKind::Script)?;
        let name = Value::Ref(self.new_string(name)?);
        let body = match body {
            Some(body) => Value::Ref(body),
            None => self.root_value(RootIndex::Undefined),
        };
        let flags = if toplevel {
            layout::artifact::FLAG_TOPLEVEL
        } else {
            0
        };
        let artifact = self.build(
            StructuralKind::Artifact,
            vec![
                name,
                Value::Ref(script),
                body,
                Value::Smi(span.0 as i32),
                Value::Smi(span.1 as i32),
                Value::Smi(flags),
            ],
            Vec::new(),
        )?;

        let mut list: Vec<Value> = self
            .script_artifacts(script)?
            .into_iter()
            .map(Value::Ref)
            .collect();
        list.push(Value::Ref(artifact));
        let list = self.new_fixed_array(list)?;
        self.set_field(script, layout::script::ARTIFACTS, Value::Ref(list))?;
        Ok(artifact)
    }

    /// Allocates a machine-code object.
    pub fn new_code(&mut self, instructions: &[u8]) -> Result<ObjectId, HeapError> {
        self.build(StructuralKind::Code, Vec::new(), instructions.to_vec())
    }

    /// Wraps bytecode together with its own entry trampoline.
    pub fn new_interpreter_data(
        &mut self,
        bytecode: ObjectId,
        trampoline: ObjectId,
    ) -> Result<ObjectId, HeapError> {
        self.expect_kind(bytecode, StructuralKind::Bytecode)?;
        self.expect_kind(trampoline, StructuralKind::Code)?;
        self.build(
            StructuralKind::InterpreterData,
            vec![Value::Ref(bytecode), Value::Ref(trampoline)],
            Vec::new(),
        )
    }

    /// Switches an artifact to instrumented bytecode, the way a debugger does
    /// when it sets a breakpoint. Returns the overlay.
    pub fn attach_debug_overlay(
        &mut self,
        artifact: ObjectId,
        instrumented: ObjectId,
    ) -> Result<ObjectId, HeapError> {
        let script = self.script_of(artifact)?;
        let original = self.field(artifact, layout::artifact::BODY)?;
        let overlay = self.build(
            StructuralKind::DebugOverlay,
            vec![Value::Ref(script), original, Value::Ref(instrumented)],
            Vec::new(),
        )?;
        self.set_field(
            artifact,
            layout::artifact::SCRIPT_OR_OVERLAY,
            Value::Ref(overlay),
        )?;
        self.set_field(artifact, layout::artifact::BODY, Value::Ref(instrumented))?;
        Ok(overlay)
    }

    /// Allocates a closure over `artifact` bound to `context`.
    pub fn new_closure(
        &mut self,
        artifact: ObjectId,
        context: ObjectId,
    ) -> Result<ObjectId, HeapError> {
        self.build(
            StructuralKind::Closure,
            vec![Value::Ref(artifact), Value::Ref(context)],
            Vec::new(),
        )
    }

    /// Allocates a scope context, nested in `previous` if given.
    pub fn new_context(&mut self, previous: Option<ObjectId>) -> Result<ObjectId, HeapError> {
        let undefined = self.root_value(RootIndex::Undefined);
        let previous = previous.map(Value::Ref).unwrap_or(undefined);
        self.build(StructuralKind::Context, vec![previous, undefined], Vec::new())
    }

    /// Allocates a global proxy.
    pub fn new_global_proxy(&mut self) -> Result<ObjectId, HeapError> {
        self.build(StructuralKind::GlobalProxy, Vec::new(), Vec::new())
    }
}
