//! Serialization and synchronous deserialization entry points.

use std::sync::Arc;
use std::time::Instant;

use ember_config::CacheConfig;
use ember_heap::layout::{artifact, script};
use ember_heap::{
    GraphAccess, GraphBuilder, Heap, HeapError, HeapObject, LocalHeap, ObjectId, ReadOnlySpace,
    RootIndex, StructuralKind, Value,
};
use ember_source::Source;
use tracing::{debug, info, warn};

use crate::build::BuildIdentity;
use crate::cached_data::CachedData;
use crate::deserializer::{Deserializer, Reconstructed};
use crate::error::{CacheMiss, ReconstructionFailure, Rejection, SerializeError};
use crate::header::assemble;
use crate::sanity::{payload_of, SanityChecker};
use crate::serializer::{inspect_artifact, Serializer};
use crate::stats::RejectionStats;

/// A reconstructed graph waiting in its private arena to be adopted.
#[derive(Debug)]
pub(crate) struct StagedGraph {
    pub(crate) local: LocalHeap,
    pub(crate) root: ObjectId,
    pub(crate) script: ObjectId,
    /// Slots that hold the attached source.
    pub(crate) attached_slots: Vec<(ObjectId, usize)>,
    pub(crate) payload_len: usize,
}

/// Produces and consumes code cache blobs for one build configuration.
///
/// Cloning is cheap and clones share their [`RejectionStats`].
#[derive(Debug, Clone)]
pub struct CodeCache {
    config: CacheConfig,
    identity: BuildIdentity,
    stats: Arc<RejectionStats>,
}

impl CodeCache {
    /// Creates a cache for the running build under `config`.
    pub fn new(config: CacheConfig) -> Self {
        let identity = BuildIdentity::current(&config.flags);
        Self::with_identity(config, identity)
    }

    /// Creates a cache that stamps and expects an explicit build identity.
    pub fn with_identity(config: CacheConfig, identity: BuildIdentity) -> Self {
        Self {
            config,
            identity,
            stats: Arc::new(RejectionStats::new()),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The build identity stamped into and expected from blobs.
    pub fn identity(&self) -> BuildIdentity {
        self.identity
    }

    /// Rejection counters.
    pub fn stats(&self) -> &RejectionStats {
        &self.stats
    }

    /// A sanity checker for this build.
    pub fn checker(&self) -> SanityChecker {
        SanityChecker::new(self.identity, self.config.cache.verify_checksum)
    }

    /// Serializes `root` and everything it reaches into a blob.
    ///
    /// The graph is only borrowed, so it cannot change during the walk.
    ///
    /// # Panics
    ///
    /// Panics if the graph reaches executable code or environment-bound
    /// objects; see [`ContractViolation`](crate::ContractViolation).
    pub fn serialize<G: GraphAccess + ?Sized>(
        &self,
        graph: &G,
        root: ObjectId,
    ) -> Result<CachedData<'static>, SerializeError> {
        let started = Instant::now();
        let found = inspect_artifact(graph, root)?;
        if self.config.cache.trace_serializer {
            let name = graph
                .object(found.script)
                .slot(script::NAME)
                .and_then(|v| v.as_object())
                .and_then(|id| graph.object(id).as_str())
                .unwrap_or("<anonymous>");
            info!(script = name, "serializing code cache");
        }

        let payload = Serializer::new(graph)
            .attach_source(found.source)
            .serialize(root)?;
        let blob = assemble(
            self.identity,
            found.fingerprint,
            &payload,
            self.config.cache.verify_checksum,
        );

        if self.config.cache.profile {
            info!(
                bytes = blob.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "serialized code cache"
            );
        }
        Ok(CachedData::new(blob))
    }

    /// Restores the artifact in `data` into `heap`, binding it to `source`.
    ///
    /// On a rejection the container is marked rejected and the counters are
    /// bumped. A container that is already rejected is refused without
    /// being read again. Nothing is added to the heap unless the call
    /// succeeds.
    pub fn deserialize(
        &self,
        heap: &mut Heap,
        data: &mut CachedData<'_>,
        source: &Source,
    ) -> Result<ObjectId, CacheMiss> {
        if let Some(reason) = data.rejection() {
            return Err(reason.into());
        }
        if self.config.cache.stress_background_deserialize {
            let result = self
                .start_background(heap.read_only_space().clone(), data.to_shared())
                .join()
                .finish(heap, source);
            if let Err(CacheMiss::Rejected(reason)) = &result {
                data.mark_rejected(*reason);
            }
            return result;
        }

        let started = Instant::now();
        let state = self
            .checker()
            .check_full(data.as_bytes(), source.fingerprint());
        if let Err(reason) = state.into_result() {
            self.reject(reason);
            data.mark_rejected(reason);
            return Err(reason.into());
        }

        let staged = self.reconstruct(
            heap.read_only_space().clone(),
            data.as_bytes(),
            Some(&source.text),
        )?;
        let root = self.merge(heap, staged, started)?;
        if self.config.cache.profile {
            info!(
                bytes = data.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "deserialized code cache"
            );
        }
        Ok(root)
    }

    pub(crate) fn reject(&self, reason: Rejection) {
        self.stats.record(reason);
        debug!(%reason, "code cache rejected");
    }

    /// Replays the payload of a structurally valid blob into a fresh arena.
    ///
    /// With `source_text` the source string is allocated in the arena;
    /// without it the script's source is left as the empty-string root.
    pub(crate) fn reconstruct(
        &self,
        read_only: Arc<ReadOnlySpace>,
        blob: &[u8],
        source_text: Option<&str>,
    ) -> Result<StagedGraph, ReconstructionFailure> {
        let mut local = LocalHeap::new(read_only.clone(), self.config.cache.max_objects);
        let attached = match source_text {
            Some(text) => local
                .alloc(HeapObject::string(text))
                .map_err(|e| ReconstructionFailure::from_heap(0, e))?,
            None => read_only.root(RootIndex::EmptyString),
        };
        let payload = payload_of(blob);
        let result = Deserializer::new(&mut local, payload, vec![attached]).deserialize()?;
        let script = check_shape(&local, &result, attached, payload.len())?;
        debug!(
            objects = result.objects,
            bytes = payload.len(),
            "reconstructed code cache payload"
        );
        Ok(StagedGraph {
            local,
            root: result.root,
            script,
            attached_slots: result.attached_slots,
            payload_len: payload.len(),
        })
    }

    /// Points every slot that held the placeholder at `source`.
    pub(crate) fn bind_source(
        &self,
        staged: &mut StagedGraph,
        source: &Source,
    ) -> Result<(), ReconstructionFailure> {
        let payload_len = staged.payload_len;
        let at_end = move |e: HeapError| ReconstructionFailure::from_heap(payload_len, e);
        let text = staged
            .local
            .alloc(HeapObject::string(&source.text))
            .map_err(at_end)?;
        for &(object, field) in &staged.attached_slots {
            staged
                .local
                .set_field(object, field, Value::Ref(text))
                .map_err(at_end)?;
        }
        Ok(())
    }

    /// Adopts a staged graph into `heap`, registers its script, and runs the post-pass.
    pub(crate) fn merge(
        &self,
        heap: &mut Heap,
        staged: StagedGraph,
        started: Instant,
    ) -> Result<ObjectId, CacheMiss> {
        let payload_len = staged.payload_len;
        let relocation = heap
            .adopt(staged.local)
            .map_err(|e| ReconstructionFailure::from_heap(payload_len, e))?;
        let root = relocation.apply(staged.root);
        let script = relocation.apply(staged.script);
        heap.register_script(script);

        if let Err(error) = self.finalize(heap, script, started) {
            warn!(%error, ?script, "code cache post-processing incomplete");
        }
        Ok(root)
    }

    /// Post-pass over a freshly adopted script.
    fn finalize(
        &self,
        heap: &mut Heap,
        script: ObjectId,
        started: Instant,
    ) -> Result<(), HeapError> {
        let artifacts = heap.script_artifacts(script)?;

        if self.config.flags.native_stack_frames && !cfg!(target_arch = "arm") {
            let trampoline = heap.root(RootIndex::InterpreterEntryTrampoline);
            let trampoline_body = heap.raw_data(trampoline).to_vec();
            for &unit in &artifacts {
                let Some(body) = heap.field(unit, artifact::BODY)?.as_object() else {
                    continue;
                };
                if heap.kind_of(body) != StructuralKind::Bytecode {
                    continue;
                }
                let code = heap.new_code(&trampoline_body)?;
                let data = heap.new_interpreter_data(body, code)?;
                heap.set_field(unit, artifact::BODY, Value::Ref(data))?;
            }
        }

        let cache = &self.config.cache;
        if cache.eager_line_ends || cache.log_code_creation {
            heap.ensure_line_ends(script)?;
        }

        if cache.log_code_creation {
            let undefined = Value::Ref(heap.root(RootIndex::Undefined));
            for &unit in &artifacts {
                if heap.field(unit, artifact::BODY)? == undefined {
                    continue;
                }
                let start = heap
                    .field(unit, artifact::START_POSITION)?
                    .as_smi()
                    .unwrap_or(0);
                let (line, column) = heap
                    .line_column(script, start.max(0) as u32)?
                    .unwrap_or((0, 0));
                let function = heap
                    .field(unit, artifact::NAME)?
                    .as_object()
                    .and_then(|id| heap.string(id))
                    .unwrap_or("");
                debug!(
                    target: "ember_cache::code",
                    artifact = ?unit,
                    function,
                    line,
                    column,
                    "code creation"
                );
            }
        }

        if cache.log_function_events {
            let elapsed_us = started.elapsed().as_micros() as u64;
            for &unit in &artifacts {
                let start = heap.field(unit, artifact::START_POSITION)?.as_smi();
                let end = heap.field(unit, artifact::END_POSITION)?.as_smi();
                info!(
                    target: "ember_cache::function",
                    script = ?script,
                    artifact = ?unit,
                    start = ?start,
                    end = ?end,
                    elapsed_us,
                    "deserialize"
                );
            }
        }
        Ok(())
    }
}

/// Checks that a replayed payload has the shape of one cached script.
///
/// Returns the script.
fn check_shape(
    local: &LocalHeap,
    replayed: &Reconstructed,
    attached: ObjectId,
    end: usize,
) -> Result<ObjectId, ReconstructionFailure> {
    let root = replayed.root;
    let malformed = |reason: String| ReconstructionFailure::malformed(end, reason);
    let slot = |object: ObjectId, field: usize| local.object(object).slot(field);

    let root_kind = local.kind_of(root);
    if root_kind != StructuralKind::Artifact {
        return Err(malformed(format!("root is a {root_kind}, expected an artifact")));
    }
    let &[script_id] = replayed.scripts.as_slice() else {
        return Err(malformed(format!(
            "expected exactly one script, found {}",
            replayed.scripts.len()
        )));
    };
    if slot(root, artifact::SCRIPT_OR_OVERLAY) != Some(Value::Ref(script_id)) {
        return Err(malformed("root artifact belongs to another script".into()));
    }
    if slot(script_id, script::SOURCE) != Some(Value::Ref(attached))
        || !replayed
            .attached_slots
            .contains(&(script_id, script::SOURCE))
    {
        return Err(malformed("script source is not the attached source".into()));
    }

    let list = slot(script_id, script::ARTIFACTS)
        .and_then(|v| v.as_object())
        .filter(|id| local.kind_of(*id) == StructuralKind::FixedArray)
        .ok_or_else(|| malformed("script artifact list is not an array".into()))?;
    for value in local.object(list).slots() {
        let unit = value
            .as_object()
            .filter(|id| local.kind_of(*id) == StructuralKind::Artifact)
            .ok_or_else(|| malformed("script artifact list holds a non-artifact".into()))?;
        if slot(unit, artifact::SCRIPT_OR_OVERLAY) != Some(Value::Ref(script_id)) {
            return Err(malformed(format!("{unit:?} belongs to another script")));
        }
        let body_ok = match slot(unit, artifact::BODY) {
            Some(Value::Ref(body)) => matches!(
                local.kind_of(body),
                StructuralKind::Bytecode | StructuralKind::Oddball
            ),
            _ => false,
        };
        if !body_ok {
            return Err(malformed(format!("{unit:?} has an invalid body")));
        }
    }
    Ok(script_id)
}
