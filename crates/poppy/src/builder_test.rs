use super::*;
use crate::cell::KeyCode;
use crate::heap::Heap;

#[test]
fn add_key_records_the_offset_object_returns() {
    let mut b = Builder::new();
    b.add_cell(Cell::make_small(0)); // ProcName placeholder
    b.add_cell(Cell::make_small(0)); // QBlock placeholder
    b.add_cell(Cell::make_small(1)); // Length
    b.add_key(Cell::make_key(KeyCode::ProcedureKey));
    b.add_cell(Cell::make_raw_u64(0)); // NumLocals

    let mut heap = Heap::new(64);
    let key_ptr = b.object(&mut heap).unwrap();
    assert_eq!(heap.get(key_ptr).key_code(), Some(KeyCode::ProcedureKey));
    assert_eq!(key_ptr, 3);
}

#[test]
fn place_holder_get_set_round_trips() {
    let mut b = Builder::new();
    b.add_cell(Cell::make_small(1));
    let ph = b.place_holder_just_planted().unwrap();
    assert_eq!(b.get(ph), Cell::make_small(1));
    b.set(ph, Cell::make_small(42));
    assert_eq!(b.get(ph), Cell::make_small(42));
}

#[test]
fn place_holder_just_planted_fails_on_empty_builder() {
    let b = Builder::new();
    assert!(b.place_holder_just_planted().is_err());
}

#[test]
fn object_fails_with_heap_overflow_when_staging_does_not_fit() {
    let mut b = Builder::new();
    for _ in 0..100 {
        b.add_cell(Cell::make_small(0));
    }
    let mut heap = Heap::new(4);
    let err = b.object(&mut heap).unwrap_err();
    assert_eq!(err.kind(), crate::mishap::Kind::HeapOverflow);
}
