#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use ember_cache::CodeCache;
use ember_config::{load_config_from_str, CacheConfig};
use ember_heap::layout::bytecode;
use ember_heap::{GraphAccess, GraphBuilder, Heap, ObjectId, ReadOnlySpace, Space, Value};
use ember_source::Source;

pub const PROGRAM: &str = "function outer() {\n  return inner(1.5);\n}\nfunction inner(x) { return x; }\nlazy();\n";

/// A script with a top-level unit, two compiled functions, and one lazy function.
pub fn sample_program(heap: &mut Heap) -> (ObjectId, Source) {
    let source = Source::new(PROGRAM).with_name("app.js");
    let script = heap.new_script(&source).unwrap();

    let shared = heap.read_only_space().find_string("length").unwrap();
    let number = heap.new_number(1.5).unwrap();
    let positions = heap.new_byte_array(&[0, 2, 4]).unwrap();
    let inner_code = heap
        .new_bytecode(&[0x0B, 0x00], vec![Value::Ref(shared), Value::Smi(-7)])
        .unwrap();
    heap.set_field(inner_code, bytecode::SOURCE_POSITIONS, Value::Ref(positions))
        .unwrap();
    let outer_code = heap
        .new_bytecode(
            &[0x0A, 0x01, 0x02],
            vec![Value::Ref(number), Value::Ref(inner_code)],
        )
        .unwrap();
    let top_code = heap.new_bytecode(&[0x01], Vec::new()).unwrap();

    let len = source.char_len() as u32;
    let root = heap
        .new_artifact(script, "", Some(top_code), (0, len), true)
        .unwrap();
    heap.new_artifact(script, "outer", Some(outer_code), (0, 40), false)
        .unwrap();
    heap.new_artifact(script, "inner", Some(inner_code), (41, 73), false)
        .unwrap();
    heap.new_artifact(script, "lazy", None, (74, 80), false)
        .unwrap();
    (root, source)
}

pub fn cache_with(toml: &str) -> CodeCache {
    CodeCache::new(load_config_from_str(toml).unwrap())
}

pub fn default_cache() -> CodeCache {
    CodeCache::new(CacheConfig::default())
}

/// Serializes the sample program from a fresh heap over `ro`.
pub fn sample_blob(cache: &CodeCache, ro: &Arc<ReadOnlySpace>) -> (Vec<u8>, Source) {
    let mut heap = Heap::new(ro.clone());
    let (root, source) = sample_program(&mut heap);
    (cache.serialize(&heap, root).unwrap().into_bytes(), source)
}

/// Canonical depth-first dump of everything reachable from `root`.
///
/// Objects are numbered in first-visit order, so two graphs with the same
/// shape give the same dump regardless of where they live in their heaps.
pub fn describe(heap: &Heap, root: ObjectId) -> Vec<String> {
    let mut seen = HashMap::new();
    let mut out = Vec::new();
    walk(heap, root, &mut seen, &mut out);
    out
}

fn walk(
    heap: &Heap,
    id: ObjectId,
    seen: &mut HashMap<ObjectId, usize>,
    out: &mut Vec<String>,
) -> String {
    if id.space() == Space::ReadOnly {
        return format!("ro{}", id.index().as_raw());
    }
    if let Some(n) = seen.get(&id) {
        return format!("@{n}");
    }
    let n = seen.len();
    seen.insert(id, n);
    let object = heap.object(id);
    let slots: Vec<String> = object
        .slots()
        .iter()
        .map(|value| match value {
            Value::Smi(i) => i.to_string(),
            Value::Ref(target) => walk(heap, *target, seen, out),
        })
        .collect();
    out.push(format!(
        "#{n} {} {:?} [{}]",
        object.kind(),
        object.raw(),
        slots.join(", ")
    ));
    format!("#{n}")
}
