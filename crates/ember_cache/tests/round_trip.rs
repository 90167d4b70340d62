mod common;

use common::{cache_with, default_cache, describe, sample_program, PROGRAM};
use ember_cache::{CacheMiss, CachedData, ReconstructionFailure, Rejection};
use ember_heap::layout::{artifact, debug_overlay, script};
use ember_heap::{GraphAccess, GraphBuilder, Heap, ReadOnlySpace, RootIndex, StructuralKind, Value};
use ember_source::Source;

#[test]
fn restored_graph_matches_original() {
    let cache = default_cache();
    let ro = ReadOnlySpace::standard();
    let mut producer = Heap::new(ro.clone());
    let (root, source) = sample_program(&mut producer);
    let mut data = cache.serialize(&producer, root).unwrap();

    let mut consumer = Heap::new(ro);
    let restored = cache.deserialize(&mut consumer, &mut data, &source).unwrap();

    assert_eq!(describe(&producer, root), describe(&consumer, restored));
    let script_id = consumer.script_of(restored).unwrap();
    assert_eq!(consumer.script_artifacts(script_id).unwrap().len(), 4);
    assert_eq!(consumer.registry().scripts(), &[script_id]);
}

#[test]
fn headers_are_byte_identical() {
    let cache = default_cache();
    let ro = ReadOnlySpace::standard();
    let mut heap = Heap::new(ro);
    let (root, _) = sample_program(&mut heap);
    let first = cache.serialize(&heap, root).unwrap();
    let second = cache.serialize(&heap, root).unwrap();
    assert_eq!(
        &first.as_bytes()[..ember_cache::HEADER_SIZE],
        &second.as_bytes()[..ember_cache::HEADER_SIZE]
    );
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn blob_survives_a_fresh_read_only_space() {
    let cache = default_cache();
    let mut producer = Heap::new(ReadOnlySpace::standard());
    let (root, source) = sample_program(&mut producer);
    let bytes = cache.serialize(&producer, root).unwrap().into_bytes();

    let mut consumer = Heap::new(ReadOnlySpace::standard());
    let mut data = CachedData::borrowed(&bytes);
    let restored = cache.deserialize(&mut consumer, &mut data, &source).unwrap();
    assert_eq!(describe(&producer, root), describe(&consumer, restored));
}

#[test]
fn host_local_and_debug_fields_are_elided() {
    let cache = default_cache();
    let ro = ReadOnlySpace::standard();
    let mut producer = Heap::new(ro.clone());
    let (root, source) = sample_program(&mut producer);
    let script_id = producer.script_of(root).unwrap();

    let embedder = producer.new_string("embedder data").unwrap();
    let options = producer.new_fixed_array(vec![Value::Smi(9)]).unwrap();
    producer
        .set_field(script_id, script::CONTEXT_DATA, Value::Ref(embedder))
        .unwrap();
    producer
        .set_field(script_id, script::HOST_OPTIONS, Value::Ref(options))
        .unwrap();
    producer.ensure_line_ends(script_id).unwrap();

    let original_body = producer.field(root, artifact::BODY).unwrap();
    let instrumented = producer.new_bytecode(&[0x01, 0xBB], Vec::new()).unwrap();
    let overlay = producer.attach_debug_overlay(root, instrumented).unwrap();

    let live_script = producer.object(script_id).clone();
    let live_root = producer.object(root).clone();
    let mut data = cache.serialize(&producer, root).unwrap();
    assert_eq!(producer.object(script_id), &live_script);
    assert_eq!(producer.object(root), &live_root);
    assert_eq!(
        producer.field(root, artifact::SCRIPT_OR_OVERLAY).unwrap(),
        Value::Ref(overlay)
    );

    let mut consumer = Heap::new(ro);
    let restored = cache.deserialize(&mut consumer, &mut data, &source).unwrap();
    let restored_script = consumer.script_of(restored).unwrap();
    let undefined = Value::Ref(consumer.root(RootIndex::Undefined));
    let empty_array = Value::Ref(consumer.root(RootIndex::EmptyFixedArray));

    assert_eq!(
        consumer.field(restored, artifact::SCRIPT_OR_OVERLAY).unwrap(),
        Value::Ref(restored_script)
    );
    assert_eq!(
        consumer
            .field(restored_script, script::CONTEXT_DATA)
            .unwrap(),
        undefined
    );
    assert_eq!(
        consumer
            .field(restored_script, script::HOST_OPTIONS)
            .unwrap(),
        empty_array
    );
    assert_eq!(
        consumer.field(restored_script, script::LINE_ENDS).unwrap(),
        undefined
    );

    let restored_body = consumer
        .field(restored, artifact::BODY)
        .unwrap()
        .as_object()
        .unwrap();
    let original_body = original_body.as_object().unwrap();
    assert_eq!(
        consumer.object(restored_body).raw(),
        producer.object(original_body).raw()
    );
    assert_eq!(
        producer
            .field(overlay, debug_overlay::INSTRUMENTED_BODY)
            .unwrap(),
        Value::Ref(instrumented)
    );
}

#[test]
fn interpreter_data_round_trips_as_bytecode() {
    let cache = default_cache();
    let ro = ReadOnlySpace::standard();
    let mut producer = Heap::new(ro.clone());
    let (root, source) = sample_program(&mut producer);
    let body = producer
        .field(root, artifact::BODY)
        .unwrap()
        .as_object()
        .unwrap();
    let trampoline = producer.new_code(&[0xC3]).unwrap();
    let wrapped = producer.new_interpreter_data(body, trampoline).unwrap();
    producer
        .set_field(root, artifact::BODY, Value::Ref(wrapped))
        .unwrap();

    let mut data = cache.serialize(&producer, root).unwrap();
    let mut consumer = Heap::new(ro);
    let restored = cache.deserialize(&mut consumer, &mut data, &source).unwrap();
    let restored_body = consumer
        .field(restored, artifact::BODY)
        .unwrap()
        .as_object()
        .unwrap();
    assert_eq!(consumer.kind_of(restored_body), StructuralKind::Bytecode);
}

#[test]
#[should_panic(expected = "environment-bound closure")]
fn closures_in_constant_pools_are_fatal() {
    let cache = default_cache();
    let mut heap = Heap::new(ReadOnlySpace::standard());
    let (root, _) = sample_program(&mut heap);
    let context = heap.new_context(None).unwrap();
    let closure = heap.new_closure(root, context).unwrap();
    let script_id = heap.script_of(root).unwrap();
    let code = heap
        .new_bytecode(&[0x02], vec![Value::Ref(closure)])
        .unwrap();
    heap.new_artifact(script_id, "g", Some(code), (0, 1), false)
        .unwrap();
    let _ = cache.serialize(&heap, root);
}

#[test]
#[should_panic(expected = "code object")]
fn code_in_constant_pools_is_fatal() {
    let cache = default_cache();
    let mut heap = Heap::new(ReadOnlySpace::standard());
    let (root, _) = sample_program(&mut heap);
    let code = heap.new_code(&[0x90]).unwrap();
    let script_id = heap.script_of(root).unwrap();
    let body = heap.new_bytecode(&[0x02], vec![Value::Ref(code)]).unwrap();
    heap.new_artifact(script_id, "g", Some(body), (0, 1), false)
        .unwrap();
    let _ = cache.serialize(&heap, root);
}

#[test]
fn main_heap_allocation_limit_leaves_heap_untouched() {
    let cache = default_cache();
    let ro = ReadOnlySpace::standard();
    let mut producer = Heap::new(ro.clone());
    let (root, source) = sample_program(&mut producer);
    let mut data = cache.serialize(&producer, root).unwrap();

    let mut consumer = Heap::with_limit(ro, 4);
    let miss = cache
        .deserialize(&mut consumer, &mut data, &source)
        .unwrap_err();
    assert_eq!(
        miss,
        CacheMiss::Reconstruction(ReconstructionFailure::AllocationExhausted { limit: 4 })
    );
    assert!(consumer.is_empty());
    assert!(consumer.registry().is_empty());
}

#[test]
fn module_sources_round_trip() {
    let cache = default_cache();
    let ro = ReadOnlySpace::standard();
    let source = Source::module("export const a = 1;");
    let mut producer = Heap::new(ro.clone());
    let script_id = producer.new_script(&source).unwrap();
    let body = producer.new_bytecode(&[0x05], Vec::new()).unwrap();
    let root = producer
        .new_artifact(script_id, "", Some(body), (0, 19), true)
        .unwrap();
    let mut data = cache.serialize(&producer, root).unwrap();

    let mut consumer = Heap::new(ro.clone());
    let classic = Source::new(source.text.clone());
    assert_eq!(
        cache
            .deserialize(&mut consumer, &mut data, &classic)
            .unwrap_err()
            .rejection(),
        Some(Rejection::SourceMismatch)
    );

    let mut data = cache.serialize(&producer, root).unwrap();
    let restored = cache.deserialize(&mut consumer, &mut data, &source).unwrap();
    let restored_script = consumer.script_of(restored).unwrap();
    assert_eq!(
        consumer.field(restored_script, script::ORIGIN).unwrap(),
        Value::Smi(source.origin.to_bits())
    );
}

#[test]
fn stress_flag_routes_through_background_path() {
    let cache = cache_with("[cache]\nstress_background_deserialize = true\n");
    let ro = ReadOnlySpace::standard();
    let mut producer = Heap::new(ro.clone());
    let (root, source) = sample_program(&mut producer);
    let mut data = cache.serialize(&producer, root).unwrap();

    let mut consumer = Heap::new(ro.clone());
    let restored = cache.deserialize(&mut consumer, &mut data, &source).unwrap();
    assert_eq!(describe(&producer, root), describe(&consumer, restored));

    let mut other = Heap::new(ro);
    let miss = cache
        .deserialize(&mut other, &mut data, &Source::new(&PROGRAM[1..]))
        .unwrap_err();
    assert_eq!(miss.rejection(), Some(Rejection::SourceMismatch));
    assert!(data.is_rejected());
}
