//! Per-kind field projection applied while serializing.
//!
//! Host-local and debugger-only fields are emitted as placeholders. The
//! projection is computed from a copy of the slots; the live object is
//! never touched.

use ember_heap::layout::{artifact, debug_overlay, script};
use ember_heap::{GraphAccess, RootIndex, StructuralKind, Value};

/// How a single field is rewritten on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldPolicy {
    /// Always emitted as this root.
    Absent(RootIndex),
    /// Emitted as `undefined` unless already `undefined` or `uninitialized`.
    HostLocal,
    /// Emitted as the script a debug overlay stands in for.
    OverlayScript,
    /// Emitted as the uninstrumented body while a debug overlay is attached.
    OriginalBody,
}

const SCRIPT_FIELDS: &[(usize, FieldPolicy)] = &[
    (script::CONTEXT_DATA, FieldPolicy::HostLocal),
    (
        script::HOST_OPTIONS,
        FieldPolicy::Absent(RootIndex::EmptyFixedArray),
    ),
    (script::LINE_ENDS, FieldPolicy::Absent(RootIndex::Undefined)),
];

const ARTIFACT_FIELDS: &[(usize, FieldPolicy)] = &[
    (artifact::SCRIPT_OR_OVERLAY, FieldPolicy::OverlayScript),
    (artifact::BODY, FieldPolicy::OriginalBody),
];

fn field_policies(kind: StructuralKind) -> &'static [(usize, FieldPolicy)] {
    match kind {
        StructuralKind::Script => SCRIPT_FIELDS,
        StructuralKind::Artifact => ARTIFACT_FIELDS,
        _ => &[],
    }
}

/// Returns the slot values to emit for an object of `kind` whose live slots are `live`.
pub fn project_slots<G: GraphAccess + ?Sized>(
    graph: &G,
    kind: StructuralKind,
    live: &[Value],
) -> Vec<Value> {
    let mut out = live.to_vec();
    let root = |index: RootIndex| Value::Ref(graph.read_only().root(index));
    let overlay = live
        .get(artifact::SCRIPT_OR_OVERLAY)
        .and_then(|v| v.as_object())
        .filter(|id| {
            kind == StructuralKind::Artifact && graph.kind_of(*id) == StructuralKind::DebugOverlay
        })
        .map(|id| graph.object(id));

    for &(field, policy) in field_policies(kind) {
        let Some(current) = live.get(field).copied() else {
            continue;
        };
        let projected = match policy {
            FieldPolicy::Absent(index) => root(index),
            FieldPolicy::HostLocal => {
                if current == root(RootIndex::Undefined) || current == root(RootIndex::Uninitialized)
                {
                    current
                } else {
                    root(RootIndex::Undefined)
                }
            }
            FieldPolicy::OverlayScript => overlay
                .and_then(|o| o.slot(debug_overlay::SCRIPT))
                .unwrap_or(current),
            FieldPolicy::OriginalBody => match overlay {
                Some(o) if o.slot(debug_overlay::INSTRUMENTED_BODY) == Some(current) => o
                    .slot(debug_overlay::ORIGINAL_BODY)
                    .unwrap_or(current),
                _ => current,
            },
        };
        out[field] = projected;
    }
    out
}
