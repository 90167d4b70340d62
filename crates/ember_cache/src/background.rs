//! Two-phase deserialization.
//!
//! Phase A runs on a worker thread before the source text is available: it
//! checks the blob's structure and replays the payload into a private
//! arena, leaving the script's source as a placeholder. Phase B runs on the
//! owning thread once the source is known: it finishes the checks, binds
//! the source, and moves the arena into the main heap in one step.
//!
//! Each phase consumes the value produced by the one before it.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use ember_heap::{Heap, ObjectId, ReadOnlySpace};
use ember_source::Source;
use tracing::{debug, warn};

use crate::error::{CacheMiss, ReconstructionFailure, Rejection};
use crate::pipeline::{CodeCache, StagedGraph};
use crate::sanity::SanityState;

const WORKER_NAME: &str = "ember-cache-deserialize";

/// Phase A in flight.
#[must_use = "join the background deserialization to observe its result"]
pub struct BackgroundDeserialize {
    task: Task,
}

enum Task {
    Running(JoinHandle<OffloadedResult>),
    Done(OffloadedResult),
}

impl BackgroundDeserialize {
    /// Returns `true` once Phase A has completed.
    pub fn is_finished(&self) -> bool {
        match &self.task {
            Task::Running(handle) => handle.is_finished(),
            Task::Done(_) => true,
        }
    }

    /// Waits for Phase A.
    ///
    /// # Panics
    ///
    /// Resumes the worker's panic if Phase A panicked.
    pub fn join(self) -> OffloadedResult {
        match self.task {
            Task::Running(handle) => match handle.join() {
                Ok(result) => result,
                Err(payload) => std::panic::resume_unwind(payload),
            },
            Task::Done(result) => result,
        }
    }
}

enum PhaseA {
    Rejected(Rejection),
    Failed(ReconstructionFailure),
    Staged(StagedGraph),
    Settled,
}

/// The outcome of Phase A, waiting for the source.
///
/// Failures found in Phase A are reported by [`OffloadedResult::finish`].
/// Every result must be finished or explicitly discarded.
#[must_use = "finish or discard the offloaded result"]
pub struct OffloadedResult {
    cache: CodeCache,
    blob: Arc<[u8]>,
    state: SanityState,
    phase: PhaseA,
}

impl OffloadedResult {
    /// The sanity state reached without the source.
    pub fn sanity_state(&self) -> SanityState {
        self.state
    }

    /// Returns `true` if Phase A reconstructed a graph.
    pub fn is_staged(&self) -> bool {
        matches!(self.phase, PhaseA::Staged(_))
    }

    /// Phase B: checks `source`, binds it, and adopts the graph into `heap`.
    ///
    /// A rejection from Phase A is returned as is. On any failure the
    /// arena is dropped and `heap` is unchanged.
    pub fn finish(mut self, heap: &mut Heap, source: &Source) -> Result<ObjectId, CacheMiss> {
        let started = Instant::now();
        match std::mem::replace(&mut self.phase, PhaseA::Settled) {
            PhaseA::Rejected(reason) => {
                self.cache.reject(reason);
                Err(reason.into())
            }
            PhaseA::Failed(failure) => Err(failure.into()),
            PhaseA::Staged(mut staged) => {
                let state =
                    self.cache
                        .checker()
                        .check_partial(self.state, &self.blob, source.fingerprint());
                self.state = state;
                if let Err(reason) = state.into_result() {
                    self.cache.reject(reason);
                    return Err(reason.into());
                }
                self.cache.bind_source(&mut staged, source)?;
                self.cache.merge(heap, staged, started)
            }
            PhaseA::Settled => unreachable!("offloaded result settled twice"),
        }
    }

    /// Drops the result without touching any heap.
    pub fn discard(mut self) {
        self.phase = PhaseA::Settled;
        debug!("discarded offloaded code cache result");
    }
}

impl Drop for OffloadedResult {
    fn drop(&mut self) {
        if !matches!(self.phase, PhaseA::Settled) {
            warn!("offloaded code cache result dropped without finish or discard");
        }
    }
}

impl CodeCache {
    /// Starts Phase A on a worker thread.
    ///
    /// `read_only` must be the space of the heap the result will be
    /// finished into.
    pub fn start_background(
        &self,
        read_only: Arc<ReadOnlySpace>,
        blob: Arc<[u8]>,
    ) -> BackgroundDeserialize {
        let worker = self.clone();
        let (worker_space, worker_blob) = (read_only.clone(), blob.clone());
        let spawned = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || worker.phase_a(worker_space, worker_blob));
        let task = match spawned {
            Ok(handle) => Task::Running(handle),
            Err(error) => {
                warn!(%error, "deserialization worker unavailable, running inline");
                Task::Done(self.clone().phase_a(read_only, blob))
            }
        };
        BackgroundDeserialize { task }
    }

    fn phase_a(self, read_only: Arc<ReadOnlySpace>, blob: Arc<[u8]>) -> OffloadedResult {
        let state = self.checker().check_structure(&blob);
        let phase = match state {
            SanityState::Rejected(reason) => PhaseA::Rejected(reason),
            _ => match self.reconstruct(read_only, &blob, None) {
                Ok(staged) => PhaseA::Staged(staged),
                Err(failure) => PhaseA::Failed(failure),
            },
        };
        OffloadedResult {
            cache: self,
            blob,
            state,
            phase,
        }
    }
}
