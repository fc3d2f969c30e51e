use super::*;
use crate::cell::Cell;

/// Stages a minimal `ProcedureKey` object: ProcName, QBlockOffset, Length,
/// Key, NumLocals, then `tail_len` raw filler cells.
fn procedure_staging(tail_len: usize) -> Vec<Cell> {
    let total = 3 + 1 + 1 + tail_len; // prefix(3) + key + numlocals + tail
    let length_from_key = (total - PROC_KEY_OFFSET_FROM_START) as i64;
    let mut staging = vec![
        Cell::make_symbol(0),             // ProcName
        Cell::make_small(0),              // QBlockOffset
        Cell::make_small(length_from_key), // Length
        Cell::make_key(KeyCode::ProcedureKey),
        Cell::make_raw_u64(0), // NumLocals
    ];
    staging.extend(std::iter::repeat(Cell::make_small(7)).take(tail_len));
    staging
}

#[test]
fn allocate_object_places_staging_contiguously_and_returns_key_relative_start() {
    let mut heap = Heap::new(64);
    let staging = procedure_staging(2);
    let start = heap.allocate_object(&staging).unwrap();
    assert_eq!(start, 0);
    assert_eq!(heap.working_tip(), staging.len());
    for (i, cell) in staging.iter().enumerate() {
        assert_eq!(heap.get(start + i), *cell);
    }
}

#[test]
fn allocate_object_fails_with_heap_overflow_when_too_large() {
    let mut heap = Heap::new(4);
    let staging = procedure_staging(10);
    let err = heap.allocate_object(&staging).unwrap_err();
    assert_eq!(err.kind(), crate::mishap::Kind::HeapOverflow);
}

#[test]
fn first_and_next_object_walk_the_active_half() {
    let mut heap = Heap::new(64);
    let a = procedure_staging(1);
    let b = procedure_staging(2);
    heap.allocate_object(&a).unwrap();
    let key_a = heap.first_object().unwrap();
    assert_eq!(heap.get(key_a).key_code(), Some(KeyCode::ProcedureKey));

    heap.allocate_object(&b).unwrap();
    let key_b = heap.next_object(key_a).unwrap().unwrap();
    assert!(key_b > key_a);
    assert_eq!(heap.get(key_b).key_code(), Some(KeyCode::ProcedureKey));
    assert_eq!(heap.next_object(key_b).unwrap(), None);
}

#[test]
fn object_boundaries_match_testable_property_4() {
    let mut heap = Heap::new(64);
    let staging = procedure_staging(3);
    heap.allocate_object(&staging).unwrap();
    let key = heap.first_object().unwrap();
    let (start, end) = heap.object_boundaries(key).unwrap();
    assert_eq!(start, key - PROC_KEY_OFFSET_FROM_START);
    let length = heap.get(key - 1).get_small();
    assert_eq!(end - key, length as usize);
    let qblock_offset = heap.get(key - 2).get_small();
    assert!(qblock_offset <= length);
}

#[test]
fn pop_enqueued_object_drains_every_object_exactly_once() {
    let mut heap = Heap::new(64);
    heap.allocate_object(&procedure_staging(0)).unwrap();
    heap.allocate_object(&procedure_staging(1)).unwrap();
    heap.allocate_object(&procedure_staging(2)).unwrap();

    let mut seen = Vec::new();
    while let Some((start, end)) = heap.pop_enqueued_object().unwrap() {
        seen.push((start, end));
    }
    assert_eq!(seen.len(), 3);
    assert_eq!(heap.pop_enqueued_object().unwrap(), None);
    // boundaries are contiguous and in allocation order
    for w in seen.windows(2) {
        assert_eq!(w[0].1, w[1].0);
    }
}

#[test]
fn copy_range_bump_copies_into_current_tip() {
    let mut heap = Heap::new(64);
    let staging = procedure_staging(2);
    heap.allocate_object(&staging).unwrap();
    let key = heap.first_object().unwrap();
    let (start, end) = heap.object_boundaries(key).unwrap();

    let new_start = heap.copy_range(start, end).unwrap();
    assert_eq!(new_start, end); // copied right after the original
    for i in 0..(end - start) {
        assert_eq!(heap.get(new_start + i), heap.get(start + i));
    }
}

#[test]
fn flip_swaps_active_half_and_resets_tip_and_queue() {
    let mut heap = Heap::new(64);
    heap.allocate_object(&procedure_staging(1)).unwrap();
    assert_eq!(heap.active_base(), 0);

    heap.flip();
    assert_eq!(heap.active_base(), 64);
    assert_eq!(heap.working_tip(), 64);
    assert_eq!(heap.scan_queue(), 64);
    assert_eq!(heap.working_limit(), 128);

    heap.flip();
    assert_eq!(heap.active_base(), 0);
    assert_eq!(heap.working_tip(), 0);
}

#[test]
fn forward_installs_an_evacuated_cell() {
    let mut heap = Heap::new(64);
    heap.allocate_object(&procedure_staging(0)).unwrap();
    let key = heap.first_object().unwrap();
    heap.forward(key, 999);
    let cell = heap.get(key);
    assert!(cell.is_forwarded());
    assert_eq!(cell.deref(), 999);
}

#[test]
fn unknown_key_code_is_a_fatal_invalid_key() {
    let mut heap = Heap::new(64);
    heap.set(0, Cell::make_key(KeyCode::BooleanKey));
    // force working_tip past this manually-poked cell so boundaries logic runs
    let err = heap.object_boundaries(0).unwrap_err();
    assert_eq!(err.kind(), crate::mishap::Kind::InvalidKey);
}
